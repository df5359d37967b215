use core::fmt;

use thiserror::Error;

use crate::ScalarType;

#[derive(Error, Debug)]
pub enum PlyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error("Serde error: {0}")]
    Serde(String),
}

impl serde::de::Error for PlyError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        PlyError::Serde(msg.to_string())
    }
}

/// The input does not follow the PLY grammar.
///
/// Header errors carry the 1-based header line. Data errors carry the element
/// name and the index of the record inside that element.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("File must start with 'ply', found {found:?}")]
    BadMagic { found: String },

    #[error("Unsupported PLY version {version:?} (line {line})")]
    UnsupportedVersion { line: usize, version: String },

    #[error("Unknown PLY encoding {encoding:?} (line {line})")]
    UnknownEncoding { line: usize, encoding: String },

    #[error("Missing format specification")]
    MissingFormat,

    #[error("Invalid PLY header (line {line}): {reason}")]
    MalformedHeader { line: usize, reason: String },

    #[error("Invalid element line {line}: {reason}")]
    MalformedElement { line: usize, reason: String },

    #[error("Invalid property line {line}: {reason}")]
    MalformedProperty { line: usize, reason: String },

    #[error("Unknown header directive {directive:?} (line {line})")]
    UnknownDirective { line: usize, directive: String },

    #[error("Unexpected end of file before end_header")]
    MissingEndHeader,

    #[error("Invalid {ty} value {token:?} for property '{property}' of {element} #{record}")]
    InvalidScalar {
        element: String,
        record: usize,
        property: String,
        ty: ScalarType,
        token: String,
    },

    #[error("Missing value for property '{property}' of {element} #{record}")]
    MissingValue {
        element: String,
        record: usize,
        property: String,
    },

    #[error("Too many values for {element} #{record}")]
    TrailingValues { element: String, record: usize },

    #[error("Invalid list length {count} for property '{property}' of {element} #{record}")]
    InvalidListCount {
        element: String,
        record: usize,
        property: String,
        count: i64,
    },

    #[error("Unexpected end of data in {element} #{record} at byte {offset}")]
    UnexpectedEof {
        element: String,
        record: usize,
        offset: u64,
    },

    #[error("Element '{element}' declares {expected} rows but only {found} are present")]
    CountMismatch {
        element: String,
        expected: usize,
        found: usize,
    },
}

/// The data parsed fine but does not describe a valid mesh.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("Element '{element}' is missing property '{property}'")]
    MissingAttribute { element: String, property: String },

    #[error("Property '{property}' of element '{element}' has the wrong shape: {reason}")]
    InvalidAttribute {
        element: String,
        property: String,
        reason: String,
    },

    #[error("Element '{element}' has no vertex index list")]
    MissingFaceIndices { element: String },

    #[error("Face #{face} references only {distinct} distinct vertices")]
    DegenerateFace { face: usize, distinct: usize },

    #[error("Face #{face} references vertex {index} but there are only {vertex_count} vertices")]
    IndexOutOfRange {
        face: usize,
        index: i64,
        vertex_count: usize,
    },

    #[error("Vertex #{vertex} does not match the mesh layout: {reason}")]
    VertexLayoutMismatch { vertex: usize, reason: String },

    #[error("Element '{element}' is already present")]
    DuplicateElement { element: String },

    #[error("A record of element '{element}' does not match its definition: {reason}")]
    RecordMismatch { element: String, reason: String },

    #[error("Face #{face} does not match the mesh layout: {reason}")]
    FaceLayoutMismatch { face: usize, reason: String },

    /// Writing the mesh would produce a header that does not read back as
    /// the same mesh.
    #[error("Name '{name}' in element '{element}' clashes with {reason}")]
    NameConflict {
        element: String,
        name: String,
        reason: String,
    },
}
