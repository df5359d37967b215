//! Reading and writing polygon meshes in the PLY (Polygon File Format).
//!
//! A document is read in one forward pass: the header is parsed into a
//! schema, records are decoded element by element in the declared encoding,
//! and a [`Mesh`] is assembled with every face checked against the vertex
//! list. Elements the mesh does not interpret are kept, so writing a mesh
//! back does not lose them.
//!
//! # Example
//!
//! ```rust
//! use ply_mesh::Encoding;
//!
//! let ply_data = "ply
//! format ascii 1.0
//! element vertex 3
//! property float x
//! property float y
//! property float z
//! element face 1
//! property list uchar int vertex_indices
//! end_header
//! 0 0 0
//! 1 0 0
//! 0 1 0
//! 3 0 1 2
//! ";
//!
//! let mesh = ply_mesh::from_str(ply_data).unwrap();
//! assert_eq!(mesh.vertex_count(), 3);
//! assert_eq!(mesh.faces()[0].indices, vec![0, 1, 2]);
//!
//! let bytes = ply_mesh::to_bytes(&mesh, Encoding::BinaryLittleEndian).unwrap();
//! assert_eq!(ply_mesh::from_bytes(&bytes).unwrap(), mesh);
//! ```
//!
//! Lower level access is available through [`PlyHeader::parse`],
//! [`ElementDecoder`] and [`PlyEncoder`].

use std::io::{BufReader, Read, Write};

mod builder;
pub mod de;
mod error;
mod header;
mod mesh;
mod options;
pub mod ser;
mod value;

pub use builder::{read_mesh, MeshBuilder};
pub use de::{ElementDecoder, ElementRecords};
pub use error::{FormatError, MeshError, PlyError};
pub use header::{
    ElementDef, Encoding, PlyHeader, PlyProperty, PropertyType, ScalarType, PLY_VERSION,
};
pub use mesh::{Face, FaceLayout, Mesh, OpaqueElement, Vertex, VertexLayout};
pub use options::MeshOptions;
pub use ser::{write_mesh, PlyEncoder};
pub use value::{Record, ScalarValue, Value};

/// Read a mesh using the default element and property names.
pub fn from_reader(reader: impl Read) -> Result<Mesh, PlyError> {
    from_reader_with(reader, &MeshOptions::default())
}

pub fn from_reader_with(reader: impl Read, options: &MeshOptions) -> Result<Mesh, PlyError> {
    read_mesh(BufReader::new(reader), options)
}

pub fn from_bytes(bytes: &[u8]) -> Result<Mesh, PlyError> {
    read_mesh(bytes, &MeshOptions::default())
}

pub fn from_str(text: &str) -> Result<Mesh, PlyError> {
    from_bytes(text.as_bytes())
}

/// Write a mesh using the default element and property names.
pub fn to_writer(mesh: &Mesh, encoding: Encoding, writer: impl Write) -> Result<(), PlyError> {
    to_writer_with(mesh, encoding, writer, &MeshOptions::default())
}

pub fn to_writer_with(
    mesh: &Mesh,
    encoding: Encoding,
    writer: impl Write,
    options: &MeshOptions,
) -> Result<(), PlyError> {
    write_mesh(writer, mesh, encoding, options)?;
    Ok(())
}

pub fn to_bytes(mesh: &Mesh, encoding: Encoding) -> Result<Vec<u8>, PlyError> {
    write_mesh(Vec::new(), mesh, encoding, &MeshOptions::default())
}

/// Write a mesh as an ASCII document.
pub fn to_string(mesh: &Mesh) -> Result<String, PlyError> {
    let bytes = to_bytes(mesh, Encoding::Ascii)?;
    String::from_utf8(bytes).map_err(|e| PlyError::Serde(e.to_string()))
}
