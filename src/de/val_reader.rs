use std::io::{self, BufRead};
use std::marker::PhantomData;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};

use crate::{Encoding, ScalarType, ScalarValue};

/// Failure of a single read, before the decoder attaches element context.
#[derive(Debug)]
pub(crate) enum ReadError {
    /// The stream ended inside a record.
    Eof,
    /// An ASCII token did not parse as the requested type.
    Invalid(String),
    /// An ASCII line ran out of tokens.
    Missing,
    /// An ASCII line has tokens left after the last property.
    Trailing,
    Io(io::Error),
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            ReadError::Eof
        } else {
            ReadError::Io(e)
        }
    }
}

pub(crate) trait ScalarReader {
    /// Prepares the next record. `false` means the stream ended cleanly
    /// before it.
    fn begin_row(&mut self) -> Result<bool, ReadError>;

    fn read_scalar(&mut self, ty: ScalarType) -> Result<ScalarValue, ReadError>;

    fn read_row_end(&mut self) -> Result<(), ReadError>;

    /// Bytes consumed from the start of the data section.
    fn offset(&self) -> u64;
}

pub(crate) struct BinValReader<R: BufRead, E: ByteOrder> {
    reader: R,
    offset: u64,
    _endian: PhantomData<E>,
}

impl<R: BufRead, E: ByteOrder> BinValReader<R, E> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            _endian: PhantomData,
        }
    }
}

impl<R: BufRead, E: ByteOrder> ScalarReader for BinValReader<R, E> {
    fn begin_row(&mut self) -> Result<bool, ReadError> {
        Ok(!self.reader.fill_buf()?.is_empty())
    }

    fn read_scalar(&mut self, ty: ScalarType) -> Result<ScalarValue, ReadError> {
        let value = match ty {
            ScalarType::I8 => ScalarValue::I8(self.reader.read_i8()?),
            ScalarType::U8 => ScalarValue::U8(self.reader.read_u8()?),
            ScalarType::I16 => ScalarValue::I16(self.reader.read_i16::<E>()?),
            ScalarType::U16 => ScalarValue::U16(self.reader.read_u16::<E>()?),
            ScalarType::I32 => ScalarValue::I32(self.reader.read_i32::<E>()?),
            ScalarType::U32 => ScalarValue::U32(self.reader.read_u32::<E>()?),
            ScalarType::F32 => ScalarValue::F32(self.reader.read_f32::<E>()?),
            ScalarType::F64 => ScalarValue::F64(self.reader.read_f64::<E>()?),
        };
        self.offset += ty.size_bytes() as u64;
        Ok(value)
    }

    fn read_row_end(&mut self) -> Result<(), ReadError> {
        Ok(())
    }

    fn offset(&self) -> u64 {
        self.offset
    }
}

/// Reads one record per line, tokens separated by whitespace.
pub(crate) struct AsciiValReader<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
    line: String,
    pos: usize,
    offset: u64,
}

impl<R: BufRead> AsciiValReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line: String::new(),
            pos: 0,
            offset: 0,
        }
    }

    fn next_token(&mut self) -> Option<&str> {
        let rest = &self.line[self.pos..];
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            self.pos = self.line.len();
            return None;
        }
        let start = self.pos + (rest.len() - trimmed.len());
        let end = trimmed
            .find(|c: char| c.is_ascii_whitespace())
            .map_or(self.line.len(), |i| start + i);
        self.pos = end;
        Some(&self.line[start..end])
    }
}

macro_rules! parse_token {
    ($reader:expr, $variant:ident, $ty:ty) => {{
        let token = $reader.next_token().ok_or(ReadError::Missing)?;
        token
            .parse::<$ty>()
            .map(ScalarValue::$variant)
            .map_err(|_| ReadError::Invalid(token.to_string()))
    }};
}

impl<R: BufRead> ScalarReader for AsciiValReader<R> {
    fn begin_row(&mut self) -> Result<bool, ReadError> {
        loop {
            self.buf.clear();
            let n = self.reader.read_until(b'\n', &mut self.buf)?;
            if n == 0 {
                return Ok(false);
            }
            self.offset += n as u64;

            self.line.clear();
            self.line.push_str(&String::from_utf8_lossy(&self.buf));
            self.pos = 0;
            if !self.line.trim().is_empty() {
                return Ok(true);
            }
        }
    }

    fn read_scalar(&mut self, ty: ScalarType) -> Result<ScalarValue, ReadError> {
        match ty {
            ScalarType::I8 => parse_token!(self, I8, i8),
            ScalarType::U8 => parse_token!(self, U8, u8),
            ScalarType::I16 => parse_token!(self, I16, i16),
            ScalarType::U16 => parse_token!(self, U16, u16),
            ScalarType::I32 => parse_token!(self, I32, i32),
            ScalarType::U32 => parse_token!(self, U32, u32),
            ScalarType::F32 => parse_token!(self, F32, f32),
            ScalarType::F64 => parse_token!(self, F64, f64),
        }
    }

    fn read_row_end(&mut self) -> Result<(), ReadError> {
        match self.next_token() {
            Some(_) => Err(ReadError::Trailing),
            None => Ok(()),
        }
    }

    fn offset(&self) -> u64 {
        self.offset
    }
}

/// Picks the value reader for an encoding once, up front.
pub(crate) enum FormatReader<R: BufRead> {
    Ascii(AsciiValReader<R>),
    LittleEndian(BinValReader<R, LittleEndian>),
    BigEndian(BinValReader<R, BigEndian>),
}

impl<R: BufRead> FormatReader<R> {
    pub(crate) fn new(reader: R, encoding: Encoding) -> Self {
        match encoding {
            Encoding::Ascii => FormatReader::Ascii(AsciiValReader::new(reader)),
            Encoding::BinaryLittleEndian => FormatReader::LittleEndian(BinValReader::new(reader)),
            Encoding::BinaryBigEndian => FormatReader::BigEndian(BinValReader::new(reader)),
        }
    }
}

impl<R: BufRead> ScalarReader for FormatReader<R> {
    fn begin_row(&mut self) -> Result<bool, ReadError> {
        match self {
            FormatReader::Ascii(r) => r.begin_row(),
            FormatReader::LittleEndian(r) => r.begin_row(),
            FormatReader::BigEndian(r) => r.begin_row(),
        }
    }

    fn read_scalar(&mut self, ty: ScalarType) -> Result<ScalarValue, ReadError> {
        match self {
            FormatReader::Ascii(r) => r.read_scalar(ty),
            FormatReader::LittleEndian(r) => r.read_scalar(ty),
            FormatReader::BigEndian(r) => r.read_scalar(ty),
        }
    }

    fn read_row_end(&mut self) -> Result<(), ReadError> {
        match self {
            FormatReader::Ascii(r) => r.read_row_end(),
            FormatReader::LittleEndian(r) => r.read_row_end(),
            FormatReader::BigEndian(r) => r.read_row_end(),
        }
    }

    fn offset(&self) -> u64 {
        match self {
            FormatReader::Ascii(r) => r.offset(),
            FormatReader::LittleEndian(r) => r.offset(),
            FormatReader::BigEndian(r) => r.offset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_ascii_tokens() {
        let mut reader = AsciiValReader::new(Cursor::new("\n  1 -2\t3.5  \n"));
        assert!(reader.begin_row().unwrap());
        assert_eq!(reader.read_scalar(ScalarType::U8).unwrap(), ScalarValue::U8(1));
        assert_eq!(reader.read_scalar(ScalarType::I16).unwrap(), ScalarValue::I16(-2));
        assert_eq!(reader.read_scalar(ScalarType::F32).unwrap(), ScalarValue::F32(3.5));
        assert!(reader.read_row_end().is_ok());
        assert!(!reader.begin_row().unwrap());
    }

    #[test]
    fn test_ascii_exact_width() {
        let mut reader = AsciiValReader::new(Cursor::new("256 -1 1.5\n"));
        assert!(reader.begin_row().unwrap());
        assert!(matches!(
            reader.read_scalar(ScalarType::U8),
            Err(ReadError::Invalid(t)) if t == "256"
        ));
        assert!(matches!(
            reader.read_scalar(ScalarType::U32),
            Err(ReadError::Invalid(t)) if t == "-1"
        ));
        assert!(matches!(
            reader.read_scalar(ScalarType::I32),
            Err(ReadError::Invalid(t)) if t == "1.5"
        ));
        assert!(matches!(
            reader.read_scalar(ScalarType::F32),
            Err(ReadError::Missing)
        ));
    }

    #[test]
    fn test_ascii_trailing() {
        let mut reader = AsciiValReader::new(Cursor::new("1 2\n"));
        assert!(reader.begin_row().unwrap());
        reader.read_scalar(ScalarType::U8).unwrap();
        assert!(matches!(reader.read_row_end(), Err(ReadError::Trailing)));
    }

    #[test]
    fn test_binary_byte_order() {
        let data = [0x01, 0x02, 0x01, 0x02];
        let mut le = BinValReader::<_, LittleEndian>::new(Cursor::new(&data[..]));
        let mut be = BinValReader::<_, BigEndian>::new(Cursor::new(&data[..]));
        assert_eq!(le.read_scalar(ScalarType::U16).unwrap(), ScalarValue::U16(0x0201));
        assert_eq!(be.read_scalar(ScalarType::U16).unwrap(), ScalarValue::U16(0x0102));
        assert_eq!(le.offset(), 2);
    }

    #[test]
    fn test_binary_truncated() {
        let mut reader = BinValReader::<_, LittleEndian>::new(Cursor::new(&[0u8, 0, 0][..]));
        assert!(reader.begin_row().unwrap());
        assert!(matches!(
            reader.read_scalar(ScalarType::F32),
            Err(ReadError::Eof)
        ));
    }
}
