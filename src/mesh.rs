use serde::{Deserialize, Serialize};

use crate::{ElementDef, MeshError, PlyError, PlyProperty, PropertyType, Record, ScalarType, Value};

/// Which vertex attributes a mesh carries, and the PLY type of each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexLayout {
    pub position: ScalarType,
    pub normal: Option<ScalarType>,
    pub color: Option<ScalarType>,
    /// Any other vertex properties, in file order.
    pub extra: Vec<PlyProperty>,
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self {
            position: ScalarType::F32,
            normal: None,
            color: None,
            extra: Vec::new(),
        }
    }
}

impl VertexLayout {
    pub fn with_normals(mut self, ty: ScalarType) -> Self {
        self.normal = Some(ty);
        self
    }

    pub fn with_colors(mut self, ty: ScalarType) -> Self {
        self.color = Some(ty);
        self
    }

    pub fn with_extra(mut self, property: PlyProperty) -> Self {
        self.extra.push(property);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceLayout {
    pub count_type: ScalarType,
    pub index_type: ScalarType,
    /// Any other face properties, in file order.
    pub extra: Vec<PlyProperty>,
}

impl Default for FaceLayout {
    fn default() -> Self {
        Self {
            count_type: ScalarType::U8,
            index_type: ScalarType::I32,
            extra: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: [f64; 3],
    pub normal: Option<[f64; 3]>,
    pub color: Option<[f64; 3]>,
    pub extra: Vec<Value>,
}

impl Vertex {
    pub fn new(position: [f64; 3]) -> Self {
        Self {
            position,
            normal: None,
            color: None,
            extra: Vec::new(),
        }
    }

    pub fn with_normal(mut self, normal: [f64; 3]) -> Self {
        self.normal = Some(normal);
        self
    }

    pub fn with_color(mut self, color: [f64; 3]) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_extra(mut self, value: Value) -> Self {
        self.extra.push(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub indices: Vec<u32>,
    pub extra: Vec<Value>,
}

impl Face {
    pub fn new(indices: Vec<u32>) -> Self {
        Self {
            indices,
            extra: Vec::new(),
        }
    }

    pub fn with_extra(mut self, value: Value) -> Self {
        self.extra.push(value);
        self
    }
}

/// An element the mesh does not interpret, kept so it survives a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpaqueElement {
    pub def: ElementDef,
    pub records: Vec<Record>,
}

impl OpaqueElement {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Map every record onto a serde type.
    pub fn deserialize_rows<T>(&self) -> Result<Vec<T>, PlyError>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.records
            .iter()
            .map(|record| record.deserialize_as(&self.def))
            .collect()
    }
}

/// A validated polygon mesh.
///
/// Every face references at least three distinct vertices, all of which
/// exist. Every vertex carries exactly the attributes of the layout, with
/// values already rounded to the layout's scalar types, so writing a mesh and
/// reading it back gives an equal mesh in every encoding.
///
/// Equality is plain float comparison: a NaN value is written and read back
/// as NaN, but a mesh holding one never compares equal, not even to itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Mesh {
    vertex_layout: VertexLayout,
    face_layout: Option<FaceLayout>,
    vertices: Vec<Vertex>,
    faces: Vec<Face>,
    other_elements: Vec<OpaqueElement>,
    comments: Vec<String>,
    obj_info: Vec<String>,
}

impl Mesh {
    pub fn new(vertex_layout: VertexLayout) -> Self {
        Self {
            vertex_layout,
            ..Default::default()
        }
    }

    /// Declares the face layout up front. Without this, the first pushed face
    /// installs [`FaceLayout::default`].
    pub fn with_face_layout(mut self, face_layout: FaceLayout) -> Self {
        self.face_layout = Some(face_layout);
        self
    }

    pub fn vertex_layout(&self) -> &VertexLayout {
        &self.vertex_layout
    }

    pub fn face_layout(&self) -> Option<&FaceLayout> {
        self.face_layout.as_ref()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.faces.is_empty()
    }

    pub fn other_elements(&self) -> &[OpaqueElement] {
        &self.other_elements
    }

    pub fn other_element(&self, name: &str) -> Option<&OpaqueElement> {
        self.other_elements.iter().find(|e| e.def.name == name)
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn obj_info(&self) -> &[String] {
        &self.obj_info
    }

    pub fn add_comment(&mut self, comment: impl Into<String>) {
        self.comments.push(comment.into());
    }

    pub fn add_obj_info(&mut self, info: impl Into<String>) {
        self.obj_info.push(info.into());
    }

    /// Only valid while the mesh has no vertices.
    pub(crate) fn set_vertex_layout(&mut self, layout: VertexLayout) {
        debug_assert!(self.vertices.is_empty());
        self.vertex_layout = layout;
    }

    /// Only valid while the mesh has no faces.
    pub(crate) fn set_face_layout(&mut self, layout: FaceLayout) {
        debug_assert!(self.faces.is_empty());
        self.face_layout = Some(layout);
    }

    /// Appends a vertex and returns its index.
    pub fn push_vertex(&mut self, mut vertex: Vertex) -> Result<usize, MeshError> {
        let index = self.vertices.len();
        let layout = &self.vertex_layout;
        let mismatch = |reason: String| MeshError::VertexLayoutMismatch {
            vertex: index,
            reason,
        };

        quantize_triple(&mut vertex.position, layout.position);
        match (layout.normal, vertex.normal.as_mut()) {
            (Some(ty), Some(normal)) => quantize_triple(normal, ty),
            (None, None) => {}
            (Some(_), None) => return Err(mismatch("missing normal".to_string())),
            (None, Some(_)) => return Err(mismatch("layout has no normals".to_string())),
        }
        match (layout.color, vertex.color.as_mut()) {
            (Some(ty), Some(color)) => quantize_triple(color, ty),
            (None, None) => {}
            (Some(_), None) => return Err(mismatch("missing color".to_string())),
            (None, Some(_)) => return Err(mismatch("layout has no colors".to_string())),
        }
        conform_values(&mut vertex.extra, &layout.extra).map_err(mismatch)?;

        self.vertices.push(vertex);
        Ok(index)
    }

    /// Appends a face and returns its index.
    ///
    /// Fails if the face has fewer than three distinct indices or references
    /// a vertex that has not been pushed yet.
    pub fn push_face(&mut self, mut face: Face) -> Result<usize, MeshError> {
        let index = self.faces.len();
        check_face_indices(index, &face.indices, self.vertices.len())?;

        let layout = self.face_layout.get_or_insert_with(FaceLayout::default);
        conform_values(&mut face.extra, &layout.extra)
            .map_err(|reason| MeshError::FaceLayoutMismatch {
                face: index,
                reason,
            })?;

        self.faces.push(face);
        Ok(index)
    }

    /// Keeps an element the mesh does not interpret. Element names must be
    /// unique, and each record must match the definition.
    pub fn push_other_element(&mut self, mut element: OpaqueElement) -> Result<(), MeshError> {
        if self.other_element(element.name()).is_some() {
            return Err(MeshError::DuplicateElement {
                element: element.def.name.clone(),
            });
        }
        for record in &mut element.records {
            let mut values = std::mem::take(record).into_values();
            conform_values(&mut values, &element.def.properties).map_err(|reason| {
                MeshError::RecordMismatch {
                    element: element.def.name.clone(),
                    reason,
                }
            })?;
            *record = Record::new(values);
        }
        element.def.row_count = element.records.len();
        self.other_elements.push(element);
        Ok(())
    }
}

fn quantize_triple(values: &mut [f64; 3], ty: ScalarType) {
    for v in values.iter_mut() {
        *v = ty.quantize(*v);
    }
}

/// Checks `values` against `properties` and casts each to its declared type.
fn conform_values(values: &mut [Value], properties: &[PlyProperty]) -> Result<(), String> {
    if values.len() != properties.len() {
        return Err(format!(
            "expected {} extra values, found {}",
            properties.len(),
            values.len()
        ));
    }
    for (value, property) in values.iter_mut().zip(properties) {
        match (&property.property_type, value) {
            (PropertyType::Scalar { data_type }, Value::Scalar(v)) => *v = v.cast(*data_type),
            (PropertyType::List { data_type, .. }, Value::List(items)) => {
                for item in items.iter_mut() {
                    *item = item.cast(*data_type);
                }
            }
            _ => {
                return Err(format!(
                    "property '{}' has the wrong shape",
                    property.name
                ))
            }
        }
    }
    Ok(())
}

fn check_face_indices(
    face: usize,
    indices: &[u32],
    vertex_count: usize,
) -> Result<(), MeshError> {
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(MeshError::IndexOutOfRange {
            face,
            index: index.into(),
            vertex_count,
        });
    }

    let distinct = match indices {
        [a, b, c] => 1 + usize::from(b != a) + usize::from(c != a && c != b),
        _ => {
            let mut sorted = indices.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            sorted.len()
        }
    };
    if distinct < 3 {
        return Err(MeshError::DegenerateFace { face, distinct });
    }
    Ok(())
}
