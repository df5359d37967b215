use std::io::Write;
use std::marker::PhantomData;

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

use crate::{Encoding, PlyError, ScalarValue};

pub(crate) trait ScalarWriter {
    fn write_scalar(&mut self, val: ScalarValue) -> Result<(), PlyError>;
    fn write_row_end(&mut self) -> Result<(), PlyError>;
}

pub(crate) struct BinValWriter<W: Write, E: ByteOrder> {
    writer: W,
    _endian: PhantomData<E>,
}

impl<W: Write, E: ByteOrder> BinValWriter<W, E> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            writer,
            _endian: PhantomData,
        }
    }
}

impl<W: Write, E: ByteOrder> ScalarWriter for BinValWriter<W, E> {
    fn write_scalar(&mut self, val: ScalarValue) -> Result<(), PlyError> {
        match val {
            ScalarValue::I8(v) => self.writer.write_i8(v)?,
            ScalarValue::U8(v) => self.writer.write_u8(v)?,
            ScalarValue::I16(v) => self.writer.write_i16::<E>(v)?,
            ScalarValue::U16(v) => self.writer.write_u16::<E>(v)?,
            ScalarValue::I32(v) => self.writer.write_i32::<E>(v)?,
            ScalarValue::U32(v) => self.writer.write_u32::<E>(v)?,
            ScalarValue::F32(v) => self.writer.write_f32::<E>(v)?,
            ScalarValue::F64(v) => self.writer.write_f64::<E>(v)?,
        }
        Ok(())
    }

    fn write_row_end(&mut self) -> Result<(), PlyError> {
        Ok(())
    }
}

/// Writes one record per line, values separated by a single space.
///
/// Floats use the shortest representation that parses back to the same
/// value, so ASCII output round-trips exactly.
pub(crate) struct AsciiValWriter<W: Write> {
    writer: W,
    row_started: bool,
}

impl<W: Write> AsciiValWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            writer,
            row_started: false,
        }
    }
}

impl<W: Write> ScalarWriter for AsciiValWriter<W> {
    fn write_scalar(&mut self, val: ScalarValue) -> Result<(), PlyError> {
        if self.row_started {
            self.writer.write_all(b" ")?;
        }
        self.row_started = true;
        match val {
            ScalarValue::I8(v) => write!(self.writer, "{v}")?,
            ScalarValue::U8(v) => write!(self.writer, "{v}")?,
            ScalarValue::I16(v) => write!(self.writer, "{v}")?,
            ScalarValue::U16(v) => write!(self.writer, "{v}")?,
            ScalarValue::I32(v) => write!(self.writer, "{v}")?,
            ScalarValue::U32(v) => write!(self.writer, "{v}")?,
            ScalarValue::F32(v) => write!(self.writer, "{v}")?,
            ScalarValue::F64(v) => write!(self.writer, "{v}")?,
        }
        Ok(())
    }

    fn write_row_end(&mut self) -> Result<(), PlyError> {
        self.row_started = false;
        writeln!(self.writer)?;
        Ok(())
    }
}

pub(crate) enum FormatWriter<W: Write> {
    Ascii(AsciiValWriter<W>),
    LittleEndian(BinValWriter<W, LittleEndian>),
    BigEndian(BinValWriter<W, BigEndian>),
}

impl<W: Write> FormatWriter<W> {
    pub(crate) fn new(writer: W, encoding: Encoding) -> Self {
        match encoding {
            Encoding::Ascii => FormatWriter::Ascii(AsciiValWriter::new(writer)),
            Encoding::BinaryLittleEndian => FormatWriter::LittleEndian(BinValWriter::new(writer)),
            Encoding::BinaryBigEndian => FormatWriter::BigEndian(BinValWriter::new(writer)),
        }
    }

    pub(crate) fn into_inner(self) -> W {
        match self {
            FormatWriter::Ascii(w) => w.writer,
            FormatWriter::LittleEndian(w) => w.writer,
            FormatWriter::BigEndian(w) => w.writer,
        }
    }
}

impl<W: Write> ScalarWriter for FormatWriter<W> {
    fn write_scalar(&mut self, val: ScalarValue) -> Result<(), PlyError> {
        match self {
            FormatWriter::Ascii(w) => w.write_scalar(val),
            FormatWriter::LittleEndian(w) => w.write_scalar(val),
            FormatWriter::BigEndian(w) => w.write_scalar(val),
        }
    }

    fn write_row_end(&mut self) -> Result<(), PlyError> {
        match self {
            FormatWriter::Ascii(w) => w.write_row_end(),
            FormatWriter::LittleEndian(w) => w.write_row_end(),
            FormatWriter::BigEndian(w) => w.write_row_end(),
        }
    }
}
