use serde::{Deserialize, Serialize};

/// Element and property names that map a PLY document onto a [`Mesh`].
///
/// Names are matched case-sensitively. The same options drive the writer, so
/// a mesh read with custom names is written back under those names.
///
/// [`Mesh`]: crate::Mesh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshOptions {
    pub vertex_element: String,
    pub face_element: String,
    pub position: [String; 3],
    pub normal: [String; 3],
    pub color: [String; 3],
    /// Accepted names of the face index list, in order of preference. The
    /// writer uses the first one.
    pub face_indices: Vec<String>,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            vertex_element: "vertex".to_string(),
            face_element: "face".to_string(),
            position: ["x".to_string(), "y".to_string(), "z".to_string()],
            normal: ["nx".to_string(), "ny".to_string(), "nz".to_string()],
            color: ["red".to_string(), "green".to_string(), "blue".to_string()],
            face_indices: vec!["vertex_indices".to_string(), "vertex_index".to_string()],
        }
    }
}

impl MeshOptions {
    pub(crate) fn face_indices_name(&self) -> &str {
        self.face_indices
            .first()
            .map_or("vertex_indices", String::as_str)
    }
}
