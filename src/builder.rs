use std::io::BufRead;

use crate::{
    de::ElementDecoder, ElementDef, Face, FaceLayout, Mesh, MeshError, MeshOptions, OpaqueElement,
    PlyError, PlyHeader, PropertyType, Record, ScalarType, Value, Vertex, VertexLayout,
};

/// Decodes a whole document into a [`Mesh`] in one streaming pass.
pub fn read_mesh<R: BufRead>(reader: R, options: &MeshOptions) -> Result<Mesh, PlyError> {
    let mut decoder = ElementDecoder::new(reader)?;
    let mut builder = MeshBuilder::new(options);
    builder.add_header_info(decoder.header());

    while let Some(records) = decoder.next_element()? {
        let def = records.def().clone();
        builder.add_element(&def, records)?;
    }

    let mesh = builder.finish();
    log::debug!(
        "Built mesh with {} vertices, {} faces and {} other elements",
        mesh.vertex_count(),
        mesh.face_count(),
        mesh.other_elements().len()
    );
    Ok(mesh)
}

/// Assembles decoded element groups into a validated [`Mesh`].
///
/// Groups are recognized by name through [`MeshOptions`]. Face indices are
/// checked against the vertices added so far, so the vertex group has to
/// come first, as it does in any well-formed file.
pub struct MeshBuilder<'o> {
    options: &'o MeshOptions,
    mesh: Mesh,
}

impl<'o> MeshBuilder<'o> {
    pub fn new(options: &'o MeshOptions) -> Self {
        Self {
            options,
            mesh: Mesh::default(),
        }
    }

    /// Carries the header's comments and obj_info lines over to the mesh.
    pub fn add_header_info(&mut self, header: &PlyHeader) {
        for comment in &header.comments {
            self.mesh.add_comment(comment.clone());
        }
        for info in &header.obj_info {
            self.mesh.add_obj_info(info.clone());
        }
    }

    pub fn add_element<I>(&mut self, def: &ElementDef, records: I) -> Result<(), PlyError>
    where
        I: IntoIterator<Item = Result<Record, PlyError>>,
    {
        if def.name == self.options.vertex_element {
            self.add_vertices(def, records)
        } else if def.name == self.options.face_element {
            self.add_faces(def, records)
        } else {
            let records = records.into_iter().collect::<Result<Vec<_>, _>>()?;
            self.mesh.push_other_element(OpaqueElement {
                def: def.clone(),
                records,
            })?;
            Ok(())
        }
    }

    pub fn finish(self) -> Mesh {
        self.mesh
    }

    fn add_vertices<I>(&mut self, def: &ElementDef, records: I) -> Result<(), PlyError>
    where
        I: IntoIterator<Item = Result<Record, PlyError>>,
    {
        let (plan, layout) = VertexPlan::new(def, self.options)?;
        self.mesh.set_vertex_layout(layout);

        for record in records {
            let values = checked_values(def, record?)?;
            self.mesh.push_vertex(plan.vertex(values))?;
        }
        Ok(())
    }

    fn add_faces<I>(&mut self, def: &ElementDef, records: I) -> Result<(), PlyError>
    where
        I: IntoIterator<Item = Result<Record, PlyError>>,
    {
        let (plan, layout) = FacePlan::new(def, self.options)?;
        self.mesh.set_face_layout(layout);

        for record in records {
            let values = checked_values(def, record?)?;
            let face = plan.face(self.mesh.face_count(), values, self.mesh.vertex_count())?;
            self.mesh.push_face(face)?;
        }
        Ok(())
    }
}

fn checked_values(def: &ElementDef, record: Record) -> Result<Vec<Value>, MeshError> {
    if record.len() != def.properties.len() {
        return Err(MeshError::RecordMismatch {
            element: def.name.clone(),
            reason: format!(
                "expected {} values, found {}",
                def.properties.len(),
                record.len()
            ),
        });
    }
    Ok(record.into_values())
}

/// Property positions of the recognized vertex attributes.
struct VertexPlan {
    position: [usize; 3],
    normal: Option<[usize; 3]>,
    color: Option<[usize; 3]>,
    extra: Vec<usize>,
}

impl VertexPlan {
    fn new(def: &ElementDef, options: &MeshOptions) -> Result<(Self, VertexLayout), MeshError> {
        let (position, position_type) =
            find_triple(def, &options.position)?.ok_or_else(|| MeshError::MissingAttribute {
                element: def.name.clone(),
                property: options
                    .position
                    .iter()
                    .find(|name| def.get_property(name).is_none())
                    .unwrap_or(&options.position[0])
                    .clone(),
            })?;
        let normal = find_triple(def, &options.normal)?;
        let color = find_triple(def, &options.color)?;

        let used: Vec<usize> = position
            .iter()
            .chain(normal.iter().flat_map(|(idx, _)| idx))
            .chain(color.iter().flat_map(|(idx, _)| idx))
            .copied()
            .collect();
        let extra: Vec<usize> = (0..def.properties.len())
            .filter(|i| !used.contains(i))
            .collect();

        let layout = VertexLayout {
            position: position_type,
            normal: normal.map(|(_, ty)| ty),
            color: color.map(|(_, ty)| ty),
            extra: extra.iter().map(|&i| def.properties[i].clone()).collect(),
        };
        let plan = VertexPlan {
            position,
            normal: normal.map(|(idx, _)| idx),
            color: color.map(|(idx, _)| idx),
            extra,
        };
        Ok((plan, layout))
    }

    fn vertex(&self, values: Vec<Value>) -> Vertex {
        let triple = |idx: [usize; 3]| idx.map(|i| values[i].as_scalar().map_or(0.0, |v| v.as_f64()));
        Vertex {
            position: triple(self.position),
            normal: self.normal.map(triple),
            color: self.color.map(triple),
            extra: self.extra.iter().map(|&i| values[i].clone()).collect(),
        }
    }
}

/// Finds three scalar properties by name. A partial match is not an error:
/// the components found stay available as extra attributes.
fn find_triple(
    def: &ElementDef,
    names: &[String; 3],
) -> Result<Option<([usize; 3], ScalarType)>, MeshError> {
    let found = names.each_ref().map(|name| def.property_index(name));
    let present = found.iter().filter(|i| i.is_some()).count();
    if present < 3 {
        if present > 0 {
            log::warn!(
                "Element '{}' has only {present} of {names:?}, keeping them as extra properties",
                def.name
            );
        }
        return Ok(None);
    }

    let mut indices = [0; 3];
    let mut ty: Option<ScalarType> = None;
    for (slot, (index, name)) in indices.iter_mut().zip(found.iter().zip(names)) {
        let Some(index) = *index else {
            return Ok(None);
        };
        let PropertyType::Scalar { data_type } = def.properties[index].property_type else {
            return Err(MeshError::InvalidAttribute {
                element: def.name.clone(),
                property: name.clone(),
                reason: "expected a scalar, found a list".to_string(),
            });
        };
        ty = Some(ty.map_or(data_type, |t| t.unify(data_type)));
        *slot = index;
    }
    Ok(ty.map(|ty| (indices, ty)))
}

/// Property positions of the face element.
struct FacePlan {
    indices: usize,
    extra: Vec<usize>,
}

impl FacePlan {
    fn new(def: &ElementDef, options: &MeshOptions) -> Result<(Self, FaceLayout), MeshError> {
        let indices = options
            .face_indices
            .iter()
            .find_map(|name| def.property_index(name))
            .ok_or_else(|| MeshError::MissingFaceIndices {
                element: def.name.clone(),
            })?;

        let property = &def.properties[indices];
        let (count_type, index_type) = match property.property_type {
            PropertyType::List {
                count_type,
                data_type,
            } if data_type.is_integer() => (count_type, data_type),
            _ => {
                return Err(MeshError::InvalidAttribute {
                    element: def.name.clone(),
                    property: property.name.clone(),
                    reason: "expected a list of integers".to_string(),
                })
            }
        };

        let extra: Vec<usize> = (0..def.properties.len()).filter(|&i| i != indices).collect();
        let layout = FaceLayout {
            count_type,
            index_type,
            extra: extra.iter().map(|&i| def.properties[i].clone()).collect(),
        };
        Ok((FacePlan { indices, extra }, layout))
    }

    fn face(&self, face: usize, values: Vec<Value>, vertex_count: usize) -> Result<Face, MeshError> {
        let items = values[self.indices].as_list().unwrap_or_default();

        let mut indices = Vec::with_capacity(items.len());
        for item in items {
            let index = item.as_integer().unwrap_or(-1);
            let in_range = usize::try_from(index).is_ok_and(|i| i < vertex_count);
            let index_u32 = u32::try_from(index).ok().filter(|_| in_range);
            let Some(index_u32) = index_u32 else {
                return Err(MeshError::IndexOutOfRange {
                    face,
                    index,
                    vertex_count,
                });
            };
            indices.push(index_u32);
        }

        Ok(Face {
            indices,
            extra: self.extra.iter().map(|&i| values[i].clone()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PlyProperty, ScalarValue};

    fn vertex_def(props: &[(&str, ScalarType)]) -> ElementDef {
        props.iter().fold(ElementDef::new("vertex", 0), |def, (name, ty)| {
            def.with_property(PlyProperty::scalar(*name, *ty))
        })
    }

    #[test]
    fn test_vertex_plan_optional_attributes() {
        let def = vertex_def(&[
            ("x", ScalarType::F32),
            ("y", ScalarType::F32),
            ("z", ScalarType::F32),
            ("confidence", ScalarType::F32),
            ("red", ScalarType::U8),
            ("green", ScalarType::U8),
            ("blue", ScalarType::U8),
            ("nx", ScalarType::F32),
        ]);
        let (plan, layout) = VertexPlan::new(&def, &MeshOptions::default()).unwrap();

        assert_eq!(layout.position, ScalarType::F32);
        assert_eq!(layout.color, Some(ScalarType::U8));
        assert_eq!(layout.normal, None);
        assert_eq!(
            layout.extra,
            vec![
                PlyProperty::scalar("confidence", ScalarType::F32),
                PlyProperty::scalar("nx", ScalarType::F32),
            ]
        );
        assert_eq!(plan.color, Some([4, 5, 6]));
    }

    #[test]
    fn test_mixed_position_types_widen() {
        let def = vertex_def(&[
            ("x", ScalarType::F32),
            ("y", ScalarType::F64),
            ("z", ScalarType::F32),
        ]);
        let (_, layout) = VertexPlan::new(&def, &MeshOptions::default()).unwrap();
        assert_eq!(layout.position, ScalarType::F64);
    }

    #[test]
    fn test_missing_position() {
        let def = vertex_def(&[("x", ScalarType::F32), ("y", ScalarType::F32)]);
        assert!(matches!(
            VertexPlan::new(&def, &MeshOptions::default()),
            Err(MeshError::MissingAttribute { property, .. }) if property == "z"
        ));
    }

    #[test]
    fn test_custom_names() {
        let options = MeshOptions {
            vertex_element: "point".to_string(),
            position: ["px".to_string(), "py".to_string(), "pz".to_string()],
            ..Default::default()
        };
        let def = ElementDef::new("point", 1)
            .with_property(PlyProperty::scalar("px", ScalarType::I16))
            .with_property(PlyProperty::scalar("py", ScalarType::I16))
            .with_property(PlyProperty::scalar("pz", ScalarType::I16));
        let record = Record::new(vec![
            Value::Scalar(ScalarValue::I16(1)),
            Value::Scalar(ScalarValue::I16(-2)),
            Value::Scalar(ScalarValue::I16(3)),
        ]);

        let mut builder = MeshBuilder::new(&options);
        builder.add_element(&def, vec![Ok(record)]).unwrap();
        let mesh = builder.finish();
        assert_eq!(mesh.vertex_layout().position, ScalarType::I16);
        assert_eq!(mesh.vertices()[0].position, [1.0, -2.0, 3.0]);
    }

    #[test]
    fn test_negative_face_index() {
        let def = ElementDef::new("face", 1).with_property(PlyProperty::list(
            "vertex_indices",
            ScalarType::U8,
            ScalarType::I32,
        ));
        let (plan, _) = FacePlan::new(&def, &MeshOptions::default()).unwrap();
        let values = vec![Value::List(vec![
            ScalarValue::I32(0),
            ScalarValue::I32(-1),
            ScalarValue::I32(1),
        ])];
        assert_eq!(
            plan.face(0, values, 3).unwrap_err(),
            MeshError::IndexOutOfRange {
                face: 0,
                index: -1,
                vertex_count: 3
            }
        );
    }

    #[test]
    fn test_float_face_indices_rejected() {
        let def = ElementDef::new("face", 0).with_property(PlyProperty::list(
            "vertex_index",
            ScalarType::U8,
            ScalarType::F32,
        ));
        assert!(matches!(
            FacePlan::new(&def, &MeshOptions::default()),
            Err(MeshError::InvalidAttribute { .. })
        ));
    }
}
