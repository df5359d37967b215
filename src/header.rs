use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{FormatError, PlyError};

/// The only PLY version in use.
pub const PLY_VERSION: &str = "1.0";

/// Storage encoding of everything after `end_header`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Ascii => write!(f, "ascii"),
            Encoding::BinaryLittleEndian => write!(f, "binary_little_endian"),
            Encoding::BinaryBigEndian => write!(f, "binary_big_endian"),
        }
    }
}

impl FromStr for Encoding {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascii" => Ok(Encoding::Ascii),
            "binary_little_endian" => Ok(Encoding::BinaryLittleEndian),
            "binary_big_endian" => Ok(Encoding::BinaryBigEndian),
            _ => Err(()),
        }
    }
}

/// PLY scalar data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarType {
    /// Parses both the classic (`uchar`) and the sized (`uint8`) spellings.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "char" | "int8" => Some(ScalarType::I8),
            "uchar" | "uint8" => Some(ScalarType::U8),
            "short" | "int16" => Some(ScalarType::I16),
            "ushort" | "uint16" => Some(ScalarType::U16),
            "int" | "int32" => Some(ScalarType::I32),
            "uint" | "uint32" => Some(ScalarType::U32),
            "float" | "float32" => Some(ScalarType::F32),
            "double" | "float64" => Some(ScalarType::F64),
            _ => None,
        }
    }

    /// Name written into generated headers.
    pub fn header_name(self) -> &'static str {
        match self {
            ScalarType::I8 => "char",
            ScalarType::U8 => "uchar",
            ScalarType::I16 => "short",
            ScalarType::U16 => "ushort",
            ScalarType::I32 => "int",
            ScalarType::U32 => "uint",
            ScalarType::F32 => "float",
            ScalarType::F64 => "double",
        }
    }

    pub fn size_bytes(self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 => 1,
            ScalarType::I16 | ScalarType::U16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::F64 => 8,
        }
    }

    pub fn is_integer(self) -> bool {
        !self.is_float()
    }

    pub fn is_float(self) -> bool {
        matches!(self, ScalarType::F32 | ScalarType::F64)
    }

    /// Largest list length this type can store as a list count.
    pub fn max_count(self) -> usize {
        match self {
            ScalarType::I8 => i8::MAX as usize,
            ScalarType::U8 => u8::MAX as usize,
            ScalarType::I16 => i16::MAX as usize,
            ScalarType::U16 => u16::MAX as usize,
            ScalarType::I32 => i32::MAX as usize,
            ScalarType::U32 => u32::MAX as usize,
            ScalarType::F32 | ScalarType::F64 => 0,
        }
    }

    /// `self` if it can count up to `len`, otherwise the smallest unsigned
    /// type that can.
    pub fn widen_count(self, len: usize) -> ScalarType {
        if self.is_integer() && len <= self.max_count() {
            return self;
        }
        [ScalarType::U8, ScalarType::U16, ScalarType::U32]
            .into_iter()
            .find(|ty| len <= ty.max_count())
            .unwrap_or(ScalarType::U32)
    }

    /// A type that holds every value of both `self` and `other` exactly.
    pub fn unify(self, other: ScalarType) -> ScalarType {
        if self == other {
            self
        } else {
            ScalarType::F64
        }
    }

    /// Rounds `value` through this type, the way it would be stored.
    pub fn quantize(self, value: f64) -> f64 {
        match self {
            ScalarType::I8 => value as i8 as f64,
            ScalarType::U8 => value as u8 as f64,
            ScalarType::I16 => value as i16 as f64,
            ScalarType::U16 => value as u16 as f64,
            ScalarType::I32 => value as i32 as f64,
            ScalarType::U32 => value as u32 as f64,
            ScalarType::F32 => value as f32 as f64,
            ScalarType::F64 => value,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_name())
    }
}

impl FromStr for ScalarType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or(())
    }
}

/// Shape of a property: one value, or a count-prefixed list of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    Scalar {
        data_type: ScalarType,
    },
    List {
        count_type: ScalarType,
        data_type: ScalarType,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlyProperty {
    pub name: String,
    pub property_type: PropertyType,
}

impl PlyProperty {
    pub fn scalar(name: impl Into<String>, data_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Scalar { data_type },
        }
    }

    pub fn list(name: impl Into<String>, count_type: ScalarType, data_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::List {
                count_type,
                data_type,
            },
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.property_type, PropertyType::List { .. })
    }

    /// Type of the value, or of the list items.
    pub fn data_type(&self) -> ScalarType {
        match self.property_type {
            PropertyType::Scalar { data_type } | PropertyType::List { data_type, .. } => data_type,
        }
    }
}

/// PLY element definition (e.g., vertex, face)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDef {
    pub name: String,
    pub row_count: usize,
    pub properties: Vec<PlyProperty>,
}

impl ElementDef {
    pub fn new(name: impl Into<String>, row_count: usize) -> Self {
        Self {
            name: name.into(),
            row_count,
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: PlyProperty) -> Self {
        self.properties.push(property);
        self
    }

    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }

    pub fn get_property(&self, name: &str) -> Option<&PlyProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// PLY header containing format information and element definitions
///
/// `comment` and `obj_info` lines are collected separately, wherever they
/// appear. [`PlyHeader::write_to`] emits all comments, then all obj_info
/// lines, right after the format line, so their interleaving with each
/// other and with element lines is not preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlyHeader {
    pub encoding: Encoding,
    pub version: String,
    pub elements: Vec<ElementDef>,
    pub comments: Vec<String>,
    pub obj_info: Vec<String>,
}

impl PlyHeader {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            version: PLY_VERSION.to_string(),
            elements: Vec::new(),
            comments: Vec::new(),
            obj_info: Vec::new(),
        }
    }

    /// Parse a PLY header, leaving `reader` positioned at the first data byte.
    ///
    /// Returns the header and the number of bytes it occupied.
    pub fn parse<R: BufRead>(reader: &mut R) -> Result<(Self, usize), PlyError> {
        let mut lines = HeaderLines::new(reader);

        let magic = lines.next_line()?.ok_or(FormatError::BadMagic {
            found: String::new(),
        })?;
        if magic.trim() != "ply" {
            return Err(FormatError::BadMagic {
                found: magic.trim().to_string(),
            }
            .into());
        }

        let mut encoding = None;
        let mut version = String::new();
        let mut elements: Vec<ElementDef> = Vec::new();
        let mut comments = Vec::new();
        let mut obj_info = Vec::new();

        loop {
            let line_no = lines.line_no + 1;
            let Some(line) = lines.next_line()? else {
                return Err(FormatError::MissingEndHeader.into());
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "end_header" {
                break;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts[0] {
                "format" => {
                    if encoding.is_some() || !elements.is_empty() {
                        return Err(FormatError::MalformedHeader {
                            line: line_no,
                            reason: "format must appear once, before any element".to_string(),
                        }
                        .into());
                    }
                    let [_, enc, ver] = parts[..] else {
                        return Err(FormatError::MalformedHeader {
                            line: line_no,
                            reason: "expected 'format <encoding> <version>'".to_string(),
                        }
                        .into());
                    };
                    encoding = Some(enc.parse::<Encoding>().map_err(|_| {
                        FormatError::UnknownEncoding {
                            line: line_no,
                            encoding: enc.to_string(),
                        }
                    })?);
                    if ver != PLY_VERSION {
                        return Err(FormatError::UnsupportedVersion {
                            line: line_no,
                            version: ver.to_string(),
                        }
                        .into());
                    }
                    version = ver.to_string();
                }
                "comment" => comments.push(directive_text(line, "comment")),
                "obj_info" => obj_info.push(directive_text(line, "obj_info")),
                "element" => elements.push(parse_element(&parts, &elements, line_no)?),
                "property" => {
                    let element =
                        elements
                            .last_mut()
                            .ok_or_else(|| FormatError::MalformedProperty {
                                line: line_no,
                                reason: "property without element".to_string(),
                            })?;
                    let property = parse_property(&parts, line_no)?;
                    if element.get_property(&property.name).is_some() {
                        return Err(FormatError::MalformedProperty {
                            line: line_no,
                            reason: format!(
                                "duplicate property '{}' in element '{}'",
                                property.name, element.name
                            ),
                        }
                        .into());
                    }
                    element.properties.push(property);
                }
                other => {
                    return Err(FormatError::UnknownDirective {
                        line: line_no,
                        directive: other.to_string(),
                    }
                    .into());
                }
            }
        }

        let encoding = encoding.ok_or(FormatError::MissingFormat)?;
        let header = PlyHeader {
            encoding,
            version,
            elements,
            comments,
            obj_info,
        };
        log::debug!(
            "Parsed {} PLY header with {} elements ({} bytes)",
            header.encoding,
            header.elements.len(),
            lines.bytes_read
        );
        Ok((header, lines.bytes_read))
    }

    /// Get element definition by name
    pub fn get_element(&self, name: &str) -> Option<&ElementDef> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// Check if this header defines an element with the given name
    pub fn has_element(&self, name: &str) -> bool {
        self.elements.iter().any(|e| e.name == name)
    }

    /// Write the header, including the trailing `end_header` line.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), PlyError> {
        writeln!(writer, "ply")?;
        writeln!(writer, "format {} {}", self.encoding, self.version)?;
        for comment in &self.comments {
            writeln!(writer, "comment {comment}")?;
        }
        for info in &self.obj_info {
            writeln!(writer, "obj_info {info}")?;
        }
        for element in &self.elements {
            writeln!(writer, "element {} {}", element.name, element.row_count)?;
            for property in &element.properties {
                match property.property_type {
                    PropertyType::Scalar { data_type } => {
                        writeln!(writer, "property {data_type} {}", property.name)?
                    }
                    PropertyType::List {
                        count_type,
                        data_type,
                    } => writeln!(
                        writer,
                        "property list {count_type} {data_type} {}",
                        property.name
                    )?,
                }
            }
        }
        writeln!(writer, "end_header")?;
        Ok(())
    }
}

/// Line reader over the header that never reads past `end_header`.
struct HeaderLines<'r, R> {
    reader: &'r mut R,
    buf: Vec<u8>,
    line_no: usize,
    bytes_read: usize,
}

impl<'r, R: BufRead> HeaderLines<'r, R> {
    fn new(reader: &'r mut R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
            bytes_read: 0,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>, PlyError> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.bytes_read += n;
        self.line_no += 1;
        let line = std::str::from_utf8(&self.buf).map_err(|_| FormatError::MalformedHeader {
            line: self.line_no,
            reason: "header is not valid UTF-8".to_string(),
        })?;
        Ok(Some(line.to_string()))
    }
}

fn directive_text(line: &str, directive: &str) -> String {
    line[directive.len()..].trim().to_string()
}

fn parse_element(
    parts: &[&str],
    existing: &[ElementDef],
    line: usize,
) -> Result<ElementDef, FormatError> {
    let malformed = |reason: String| FormatError::MalformedElement { line, reason };

    let [_, name, count] = parts[..] else {
        return Err(malformed("expected 'element <name> <count>'".to_string()));
    };
    if existing.iter().any(|e| e.name == name) {
        return Err(malformed(format!("duplicate element '{name}'")));
    }
    let row_count = count
        .parse::<usize>()
        .map_err(|_| malformed(format!("invalid element count: {count}")))?;
    Ok(ElementDef::new(name, row_count))
}

fn parse_property(parts: &[&str], line: usize) -> Result<PlyProperty, FormatError> {
    let malformed = |reason: String| FormatError::MalformedProperty { line, reason };
    let scalar_type = |s: &str| {
        ScalarType::parse(s).ok_or_else(|| malformed(format!("unknown scalar type: {s}")))
    };

    match parts[..] {
        [_, "list", count_type, data_type, name] => {
            let count_type = scalar_type(count_type)?;
            if !count_type.is_integer() {
                return Err(malformed(format!(
                    "list count type must be an integer, found {count_type}"
                )));
            }
            Ok(PlyProperty::list(name, count_type, scalar_type(data_type)?))
        }
        [_, "list", ..] => Err(malformed(
            "expected 'property list <count_type> <data_type> <name>'".to_string(),
        )),
        [_, data_type, name] => Ok(PlyProperty::scalar(name, scalar_type(data_type)?)),
        _ => Err(malformed("expected 'property <type> <name>'".to_string())),
    }
}
