//! Header parsing against hand-written documents, valid and broken.

use std::io::Cursor;

use ply_mesh::{
    Encoding, FormatError, PlyError, PlyHeader, PlyProperty, PropertyType, ScalarType,
};

fn parse(text: &str) -> Result<PlyHeader, PlyError> {
    PlyHeader::parse(&mut Cursor::new(text.as_bytes())).map(|(header, _)| header)
}

fn format_error(text: &str) -> FormatError {
    match parse(text) {
        Err(PlyError::Format(e)) => e,
        other => panic!("expected a format error, got {other:?}"),
    }
}

#[test]
fn test_all_encodings() {
    for (name, encoding) in [
        ("ascii", Encoding::Ascii),
        ("binary_little_endian", Encoding::BinaryLittleEndian),
        ("binary_big_endian", Encoding::BinaryBigEndian),
    ] {
        let text = format!("ply\nformat {name} 1.0\nend_header\n");
        let header = parse(&text).unwrap();
        assert_eq!(header.encoding, encoding);
        assert!(header.elements.is_empty());
    }
}

#[test]
fn test_all_scalar_spellings() {
    let header = parse(
        "ply
format ascii 1.0
element sample 0
property char a
property int8 b
property uchar c
property uint8 d
property short e
property int16 f
property ushort g
property uint16 h
property int i
property int32 j
property uint k
property uint32 l
property float m
property float32 n
property double o
property float64 p
end_header
",
    )
    .unwrap();

    let types: Vec<ScalarType> = header.elements[0]
        .properties
        .iter()
        .map(|p| p.data_type())
        .collect();
    assert_eq!(
        types,
        vec![
            ScalarType::I8,
            ScalarType::I8,
            ScalarType::U8,
            ScalarType::U8,
            ScalarType::I16,
            ScalarType::I16,
            ScalarType::U16,
            ScalarType::U16,
            ScalarType::I32,
            ScalarType::I32,
            ScalarType::U32,
            ScalarType::U32,
            ScalarType::F32,
            ScalarType::F32,
            ScalarType::F64,
            ScalarType::F64,
        ]
    );
}

#[test]
fn test_comments_and_obj_info() {
    let header = parse(
        "ply
format ascii 1.0
comment made by a scanner
comment   spaced   out
obj_info num_cols 640
element vertex 0
property float x
comment between properties
property float y
property float z
end_header
",
    )
    .unwrap();

    assert_eq!(
        header.comments,
        vec!["made by a scanner", "spaced   out", "between properties"]
    );
    assert_eq!(header.obj_info, vec!["num_cols 640"]);
    assert_eq!(header.elements[0].properties.len(), 3);
}

#[test]
fn test_list_property() {
    let header = parse(
        "ply
format binary_big_endian 1.0
element face 2
property list ushort uint vertex_index
property uchar flags
end_header
",
    )
    .unwrap();

    let face = header.get_element("face").unwrap();
    assert_eq!(face.row_count, 2);
    assert_eq!(
        face.properties,
        vec![
            PlyProperty::list("vertex_index", ScalarType::U16, ScalarType::U32),
            PlyProperty::scalar("flags", ScalarType::U8),
        ]
    );
    assert!(matches!(
        face.get_property("vertex_index").unwrap().property_type,
        PropertyType::List { .. }
    ));
    assert!(!header.has_element("vertex"));
}

#[test]
fn test_bad_magic() {
    assert_eq!(
        format_error("plx\nformat ascii 1.0\nend_header\n"),
        FormatError::BadMagic {
            found: "plx".to_string()
        }
    );
    assert!(matches!(format_error(""), FormatError::BadMagic { .. }));
}

#[test]
fn test_unsupported_version() {
    assert_eq!(
        format_error("ply\nformat ascii 2.0\nend_header\n"),
        FormatError::UnsupportedVersion {
            line: 2,
            version: "2.0".to_string()
        }
    );
}

#[test]
fn test_unknown_encoding() {
    assert_eq!(
        format_error("ply\nformat binary_middle_endian 1.0\nend_header\n"),
        FormatError::UnknownEncoding {
            line: 2,
            encoding: "binary_middle_endian".to_string()
        }
    );
}

#[test]
fn test_missing_format() {
    assert_eq!(
        format_error("ply\nelement vertex 0\nend_header\n"),
        FormatError::MissingFormat
    );
}

#[test]
fn test_missing_end_header() {
    assert_eq!(
        format_error("ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\n"),
        FormatError::MissingEndHeader
    );
}

#[test]
fn test_malformed_element() {
    for text in [
        "ply\nformat ascii 1.0\nelement vertex\nend_header\n",
        "ply\nformat ascii 1.0\nelement vertex -3\nend_header\n",
        "ply\nformat ascii 1.0\nelement vertex 1\nelement vertex 2\nend_header\n",
    ] {
        assert!(
            matches!(format_error(text), FormatError::MalformedElement { .. }),
            "{text:?}"
        );
    }
}

#[test]
fn test_malformed_property() {
    for text in [
        // property before any element
        "ply\nformat ascii 1.0\nproperty float x\nend_header\n",
        "ply\nformat ascii 1.0\nelement vertex 1\nproperty quad x\nend_header\n",
        "ply\nformat ascii 1.0\nelement face 1\nproperty list float int idx\nend_header\n",
        "ply\nformat ascii 1.0\nelement face 1\nproperty list uchar idx\nend_header\n",
        "ply\nformat ascii 1.0\nelement face 1\nproperty list uchar nope idx\nend_header\n",
        "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float x\nend_header\n",
    ] {
        assert!(
            matches!(format_error(text), FormatError::MalformedProperty { .. }),
            "{text:?}"
        );
    }
}

#[test]
fn test_unknown_directive() {
    assert_eq!(
        format_error("ply\nformat ascii 1.0\nelemnt vertex 1\nend_header\n"),
        FormatError::UnknownDirective {
            line: 3,
            directive: "elemnt".to_string()
        }
    );
}

#[test]
fn test_header_length_reported() {
    let text = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nend_header\n";
    let mut data = text.as_bytes().to_vec();
    data.extend_from_slice(b"1.5\n");

    let (_, len) = PlyHeader::parse(&mut Cursor::new(data)).unwrap();
    assert_eq!(len, text.len());
}

#[test]
fn test_comments_written_before_obj_info() {
    let header = parse(
        "ply
format ascii 1.0
obj_info scanner 2
comment first
element vertex 0
property float x
comment second
end_header
",
    )
    .unwrap();

    let mut out = Vec::new();
    header.write_to(&mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "ply
format ascii 1.0
comment first
comment second
obj_info scanner 2
element vertex 0
property float x
end_header
"
    );
}
