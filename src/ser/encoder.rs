use std::borrow::Cow;
use std::io::Write;

use crate::ser::val_writer::{FormatWriter, ScalarWriter};
use crate::{
    ElementDef, Encoding, Mesh, MeshError, MeshOptions, PlyError, PlyHeader, PlyProperty,
    PropertyType, Record, ScalarType, ScalarValue, Value,
};

/// Writes a PLY document: the header first, then records in header order.
///
/// Values are cast to the declared property types on the way out, so a
/// record built from `f64`s can be written to a `uchar` property.
pub struct PlyEncoder<W: Write> {
    writer: FormatWriter<W>,
}

impl<W: Write> PlyEncoder<W> {
    /// Writes `header` and prepares for data in its encoding.
    pub fn start(mut writer: W, header: &PlyHeader) -> Result<Self, PlyError> {
        header.write_to(&mut writer)?;
        Ok(Self {
            writer: FormatWriter::new(writer, header.encoding),
        })
    }

    pub fn write_record(&mut self, def: &ElementDef, record: &Record) -> Result<(), PlyError> {
        if record.len() != def.properties.len() {
            return Err(MeshError::RecordMismatch {
                element: def.name.clone(),
                reason: format!(
                    "expected {} values, found {}",
                    def.properties.len(),
                    record.len()
                ),
            }
            .into());
        }
        self.write_fields(
            &def.name,
            &def.properties,
            record.values().iter().map(Cow::Borrowed),
        )?;
        self.writer.write_row_end()
    }

    /// Flushes and hands back the sink.
    pub fn finish(self) -> Result<W, PlyError> {
        let mut writer = self.writer.into_inner();
        writer.flush()?;
        Ok(writer)
    }

    fn write_fields<'v>(
        &mut self,
        element: &str,
        properties: &[PlyProperty],
        values: impl IntoIterator<Item = Cow<'v, Value>>,
    ) -> Result<(), PlyError> {
        for (value, property) in values.into_iter().zip(properties) {
            match (property.property_type, value.as_ref()) {
                (PropertyType::Scalar { data_type }, Value::Scalar(v)) => {
                    self.writer.write_scalar(v.cast(data_type))?;
                }
                (PropertyType::List { .. }, Value::List(items)) => {
                    self.write_list(element, property, items.iter().copied())?;
                }
                _ => {
                    return Err(MeshError::RecordMismatch {
                        element: element.to_string(),
                        reason: format!("property '{}' has the wrong shape", property.name),
                    }
                    .into())
                }
            }
        }
        Ok(())
    }

    fn write_list(
        &mut self,
        element: &str,
        property: &PlyProperty,
        items: impl ExactSizeIterator<Item = ScalarValue>,
    ) -> Result<(), PlyError> {
        let PropertyType::List {
            count_type,
            data_type,
        } = property.property_type
        else {
            return Err(MeshError::RecordMismatch {
                element: element.to_string(),
                reason: format!("property '{}' is not a list", property.name),
            }
            .into());
        };
        if items.len() > count_type.max_count() {
            return Err(MeshError::RecordMismatch {
                element: element.to_string(),
                reason: format!(
                    "{} items do not fit the {count_type} count of '{}'",
                    items.len(),
                    property.name
                ),
            }
            .into());
        }

        self.writer
            .write_scalar(ScalarValue::from_f64(count_type, items.len() as f64))?;
        for item in items {
            self.writer.write_scalar(item.cast(data_type))?;
        }
        Ok(())
    }
}

/// Encodes `mesh` with a header regenerated from its contents.
pub fn write_mesh<W: Write>(
    writer: W,
    mesh: &Mesh,
    encoding: Encoding,
    options: &MeshOptions,
) -> Result<W, PlyError> {
    let header = mesh.header(encoding, options)?;
    let mut encoder = PlyEncoder::start(writer, &header)?;
    let mut elements = header.elements.iter();

    if let Some(def) = elements.next() {
        for vertex in mesh.vertices() {
            let triples = [Some(vertex.position), vertex.normal, vertex.color]
                .into_iter()
                .flatten()
                .flatten()
                .map(|c| Cow::Owned(Value::Scalar(ScalarValue::F64(c))));
            let values = triples.chain(vertex.extra.iter().map(Cow::Borrowed));
            encoder.write_fields(&def.name, &def.properties, values)?;
            encoder.writer.write_row_end()?;
        }
    }

    if mesh.face_layout().is_some() {
        if let Some(def) = elements.next() {
            for face in mesh.faces() {
                let Some((indices, rest)) = def.properties.split_first() else {
                    continue;
                };
                let items = face.indices.iter().map(|&i| ScalarValue::U32(i));
                encoder.write_list(&def.name, indices, items)?;
                encoder.write_fields(&def.name, rest, face.extra.iter().map(Cow::Borrowed))?;
                encoder.writer.write_row_end()?;
            }
        }
    }

    for (def, element) in elements.zip(mesh.other_elements()) {
        for record in &element.records {
            encoder.write_record(def, record)?;
        }
    }

    log::debug!(
        "Encoded {} vertices and {} faces as {encoding}",
        mesh.vertex_count(),
        mesh.face_count()
    );
    encoder.finish()
}

impl Mesh {
    /// The schema this mesh is written with.
    ///
    /// Vertex properties come first in position, normal, color order, then
    /// the extra attributes. List count types are widened when a list is
    /// longer than its declared count type can express.
    ///
    /// Fails with [`MeshError::NameConflict`] when the names in `options`
    /// would make the header ambiguous: an extra attribute named like a
    /// written property or completing an unused triple, or a pass-through
    /// element named like the vertex or face element.
    pub fn header(
        &self,
        encoding: Encoding,
        options: &MeshOptions,
    ) -> Result<PlyHeader, MeshError> {
        self.check_names(options)?;

        let mut header = PlyHeader::new(encoding);
        header.comments = self.comments().to_vec();
        header.obj_info = self.obj_info().to_vec();

        let layout = self.vertex_layout();
        let mut vertex = ElementDef::new(options.vertex_element.clone(), self.vertex_count());
        let triples = [
            (&options.position, Some(layout.position)),
            (&options.normal, layout.normal),
            (&options.color, layout.color),
        ];
        for (names, ty) in triples {
            if let Some(ty) = ty {
                for name in names {
                    vertex = vertex.with_property(PlyProperty::scalar(name.clone(), ty));
                }
            }
        }
        let extra = widen_lists(
            &layout.extra,
            self.vertices().iter().map(|v| v.extra.as_slice()),
        );
        vertex.properties.extend(extra);
        header.elements.push(vertex);

        if let Some(layout) = self.face_layout() {
            let longest = self.faces().iter().map(|f| f.indices.len()).max().unwrap_or(0);
            let highest = self.faces().iter().flat_map(|f| f.indices.iter().copied()).max();
            let indices = PlyProperty::list(
                options.face_indices_name(),
                layout.count_type.widen_count(longest),
                widen_index(layout.index_type, highest.unwrap_or(0)),
            );
            let mut face = ElementDef::new(options.face_element.clone(), self.face_count())
                .with_property(indices);
            face.properties.extend(widen_lists(
                &layout.extra,
                self.faces().iter().map(|f| f.extra.as_slice()),
            ));
            header.elements.push(face);
        }

        for element in self.other_elements() {
            let mut def = element.def.clone();
            def.row_count = element.records.len();
            def.properties = widen_lists(
                &element.def.properties,
                element.records.iter().map(Record::values),
            );
            header.elements.push(def);
        }
        Ok(header)
    }

    fn check_names(&self, options: &MeshOptions) -> Result<(), MeshError> {
        let conflict = |element: &str, name: &str, reason: String| MeshError::NameConflict {
            element: element.to_string(),
            name: name.to_string(),
            reason,
        };

        let layout = self.vertex_layout();
        let vertex = options.vertex_element.as_str();
        let triples = [
            (&options.position, true, "the position"),
            (&options.normal, layout.normal.is_some(), "the normal"),
            (&options.color, layout.color.is_some(), "the color"),
        ];
        let extra_names: Vec<&str> = layout.extra.iter().map(|p| p.name.as_str()).collect();
        check_unique(vertex, &extra_names)?;
        for (names, written, what) in triples {
            if written {
                if let Some(name) = names.iter().find(|n| extra_names.contains(&n.as_str())) {
                    return Err(conflict(vertex, name, format!("{what} property")));
                }
            } else if names.iter().all(|n| extra_names.contains(&n.as_str())) {
                return Err(conflict(
                    vertex,
                    &names[0],
                    format!("{what} triple it completes"),
                ));
            }
        }

        if let Some(layout) = self.face_layout() {
            let face = options.face_element.as_str();
            if face == vertex {
                return Err(conflict(face, face, "the vertex element".to_string()));
            }
            let extra_names: Vec<&str> = layout.extra.iter().map(|p| p.name.as_str()).collect();
            check_unique(face, &extra_names)?;
            if let Some(name) = options
                .face_indices
                .iter()
                .find(|n| extra_names.contains(&n.as_str()))
            {
                return Err(conflict(face, name, "the vertex index list".to_string()));
            }
        }

        for element in self.other_elements() {
            let name = element.name();
            if name == vertex || name == options.face_element {
                return Err(conflict(name, name, "a mesh element".to_string()));
            }
            let names: Vec<&str> = element
                .def
                .properties
                .iter()
                .map(|p| p.name.as_str())
                .collect();
            check_unique(name, &names)?;
        }
        Ok(())
    }
}

fn check_unique(element: &str, names: &[&str]) -> Result<(), MeshError> {
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(MeshError::NameConflict {
                element: element.to_string(),
                name: name.to_string(),
                reason: "another property of the element".to_string(),
            });
        }
    }
    Ok(())
}

fn widen_lists<'r>(
    properties: &[PlyProperty],
    rows: impl Iterator<Item = &'r [Value]>,
) -> Vec<PlyProperty> {
    let mut longest = vec![0; properties.len()];
    for row in rows {
        for (max, value) in longest.iter_mut().zip(row) {
            if let Value::List(items) = value {
                *max = (*max).max(items.len());
            }
        }
    }

    properties
        .iter()
        .zip(longest)
        .map(|(property, len)| match property.property_type {
            PropertyType::List {
                count_type,
                data_type,
            } => PlyProperty::list(property.name.clone(), count_type.widen_count(len), data_type),
            PropertyType::Scalar { .. } => property.clone(),
        })
        .collect()
}

/// `ty` if it can hold `highest`, otherwise `int`, or `uint` past its range.
fn widen_index(ty: ScalarType, highest: u32) -> ScalarType {
    let highest = highest as usize;
    if ty.is_integer() && highest <= ty.max_count() {
        ty
    } else if highest <= ScalarType::I32.max_count() {
        ScalarType::I32
    } else {
        ScalarType::U32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Face, FaceLayout, Vertex, VertexLayout};

    fn quad(count_type: ScalarType) -> Mesh {
        let layout = FaceLayout {
            count_type,
            ..Default::default()
        };
        let mut mesh = Mesh::new(VertexLayout::default()).with_face_layout(layout);
        for i in 0..4 {
            mesh.push_vertex(Vertex::new([i as f64, 0.0, 0.0])).unwrap();
        }
        mesh.push_face(Face::new(vec![0, 1, 2, 3])).unwrap();
        mesh
    }

    #[test]
    fn test_ascii_output() {
        let mesh = quad(ScalarType::U8);
        let bytes = write_mesh(Vec::new(), &mesh, Encoding::Ascii, &MeshOptions::default())
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let expected = "ply\n\
            format ascii 1.0\n\
            element vertex 4\n\
            property float x\n\
            property float y\n\
            property float z\n\
            element face 1\n\
            property list uchar int vertex_indices\n\
            end_header\n\
            0 0 0\n\
            1 0 0\n\
            2 0 0\n\
            3 0 0\n\
            4 0 1 2 3\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_count_type_widened() {
        let mesh = quad(ScalarType::I8);
        let header = mesh.header(Encoding::Ascii, &MeshOptions::default()).unwrap();
        assert_eq!(
            header.get_element("face").unwrap().properties[0].property_type,
            PropertyType::List {
                count_type: ScalarType::I8,
                data_type: ScalarType::I32
            }
        );

        let mut mesh = Mesh::new(VertexLayout::default());
        for i in 0..300 {
            mesh.push_vertex(Vertex::new([i as f64, 0.0, 0.0])).unwrap();
        }
        mesh.push_face(Face::new((0..300).collect())).unwrap();
        let header = mesh
            .header(Encoding::BinaryLittleEndian, &MeshOptions::default())
            .unwrap();
        assert_eq!(
            header.get_element("face").unwrap().properties[0].property_type,
            PropertyType::List {
                count_type: ScalarType::U16,
                data_type: ScalarType::I32
            }
        );
    }

    #[test]
    fn test_index_type_widened() {
        assert_eq!(widen_index(ScalarType::U8, 255), ScalarType::U8);
        assert_eq!(widen_index(ScalarType::U8, 256), ScalarType::I32);
        assert_eq!(widen_index(ScalarType::F32, 1), ScalarType::I32);
        assert_eq!(widen_index(ScalarType::I32, u32::MAX), ScalarType::U32);
    }

    #[test]
    fn test_record_shape_checked() {
        let header = PlyHeader::new(Encoding::Ascii);
        let mut encoder = PlyEncoder::start(Vec::new(), &header).unwrap();
        let def = ElementDef::new("camera", 1)
            .with_property(PlyProperty::scalar("fov", ScalarType::F32));
        let record = Record::new(vec![Value::List(vec![])]);
        assert!(matches!(
            encoder.write_record(&def, &record),
            Err(PlyError::Mesh(MeshError::RecordMismatch { .. }))
        ));
    }

    #[test]
    fn test_face_extra_named_like_indices() {
        let layout = FaceLayout {
            extra: vec![PlyProperty::scalar("vertex_index", ScalarType::U8)],
            ..Default::default()
        };
        let mesh = Mesh::new(VertexLayout::default()).with_face_layout(layout);
        assert!(matches!(
            mesh.header(Encoding::Ascii, &MeshOptions::default()),
            Err(MeshError::NameConflict { name, .. }) if name == "vertex_index"
        ));
    }

    #[test]
    fn test_repeated_extra_names() {
        let layout = VertexLayout::default()
            .with_extra(PlyProperty::scalar("quality", ScalarType::U8))
            .with_extra(PlyProperty::scalar("quality", ScalarType::F32));
        assert!(matches!(
            Mesh::new(layout).header(Encoding::Ascii, &MeshOptions::default()),
            Err(MeshError::NameConflict { name, .. }) if name == "quality"
        ));
    }
}
