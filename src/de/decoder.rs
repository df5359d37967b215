use std::io::BufRead;

use crate::de::val_reader::{FormatReader, ReadError, ScalarReader};
use crate::{
    ElementDef, FormatError, PlyError, PlyHeader, PlyProperty, PropertyType, Record, ScalarType,
    Value,
};

/// Cap on list pre-allocation, so a corrupt count cannot reserve memory
/// before the items are actually read.
const MAX_LIST_PREALLOC: usize = 1024;

/// Streams the records of a PLY document, one element group at a time.
///
/// The decoder is a single forward pass: groups come out in header order and
/// each yields exactly its declared number of records. Once an error has
/// been returned, nothing further is produced.
pub struct ElementDecoder<R: BufRead> {
    header: PlyHeader,
    reader: FormatReader<R>,
    header_len: u64,
    next_element: usize,
    current: usize,
    remaining: usize,
    failed: bool,
}

impl<R: BufRead> ElementDecoder<R> {
    /// Parses the header and positions the decoder on the first record.
    pub fn new(mut reader: R) -> Result<Self, PlyError> {
        let (header, header_len) = PlyHeader::parse(&mut reader)?;
        Ok(Self::with_header(header, reader, header_len))
    }

    /// Decodes `reader` with an already parsed header. `header_len` is only
    /// used to report absolute byte offsets.
    pub fn with_header(header: PlyHeader, reader: R, header_len: usize) -> Self {
        let reader = FormatReader::new(reader, header.encoding);
        Self {
            header,
            reader,
            header_len: header_len as u64,
            next_element: 0,
            current: 0,
            remaining: 0,
            failed: false,
        }
    }

    pub fn header(&self) -> &PlyHeader {
        &self.header
    }

    /// Moves on to the next element group.
    ///
    /// Records of the previous group that were never pulled are decoded and
    /// dropped first, so the stream stays aligned.
    pub fn next_element(&mut self) -> Result<Option<ElementRecords<'_, R>>, PlyError> {
        while self.remaining > 0 && !self.failed {
            self.next_record()?;
        }
        if self.failed || self.next_element >= self.header.elements.len() {
            return Ok(None);
        }

        self.current = self.next_element;
        self.next_element += 1;
        self.remaining = self.header.elements[self.current].row_count;
        log::trace!(
            "Decoding {} '{}' records",
            self.remaining,
            self.header.elements[self.current].name
        );
        Ok(Some(ElementRecords { decoder: self }))
    }

    fn next_record(&mut self) -> Result<Record, PlyError> {
        let result = self.read_record();
        match result {
            Ok(_) => self.remaining -= 1,
            Err(_) => {
                self.failed = true;
                self.remaining = 0;
            }
        }
        result
    }

    fn read_record(&mut self) -> Result<Record, PlyError> {
        let def = &self.header.elements[self.current];
        let record = def.row_count - self.remaining;
        if def.properties.is_empty() {
            return Ok(Record::default());
        }

        let started = self
            .reader
            .begin_row()
            .map_err(|e| data_error(e, def, record, None, self.header_len + self.reader.offset()))?;
        if !started {
            return Err(FormatError::CountMismatch {
                element: def.name.clone(),
                expected: def.row_count,
                found: record,
            }
            .into());
        }

        let mut values = Vec::with_capacity(def.properties.len());
        for property in &def.properties {
            let value = read_value(&mut self.reader, property, def, record)
                .map_err(|e| {
                    data_error(e, def, record, Some(property), self.header_len + self.reader.offset())
                })?;
            values.push(value);
        }
        self.reader
            .read_row_end()
            .map_err(|e| data_error(e, def, record, None, self.header_len + self.reader.offset()))?;

        Ok(Record::new(values))
    }
}

/// Read-side failure of one property, with list-count problems already
/// turned into format errors.
enum ValueError {
    Read(ReadError),
    Format(FormatError),
}

impl From<ReadError> for ValueError {
    fn from(e: ReadError) -> Self {
        ValueError::Read(e)
    }
}

fn read_value<S: ScalarReader>(
    reader: &mut S,
    property: &PlyProperty,
    def: &ElementDef,
    record: usize,
) -> Result<Value, ValueError> {
    match property.property_type {
        PropertyType::Scalar { data_type } => Ok(Value::Scalar(reader.read_scalar(data_type)?)),
        PropertyType::List {
            count_type,
            data_type,
        } => {
            let raw = reader
                .read_scalar(count_type)
                .map_err(|e| match e {
                    ReadError::Invalid(token) => ValueError::Format(FormatError::InvalidScalar {
                        element: def.name.clone(),
                        record,
                        property: property.name.clone(),
                        ty: count_type,
                        token,
                    }),
                    e => ValueError::Read(e),
                })?
                .as_integer()
                .unwrap_or(-1);
            let count = usize::try_from(raw).map_err(|_| {
                ValueError::Format(FormatError::InvalidListCount {
                    element: def.name.clone(),
                    record,
                    property: property.name.clone(),
                    count: raw,
                })
            })?;

            let mut items = Vec::with_capacity(count.min(MAX_LIST_PREALLOC));
            for _ in 0..count {
                items.push(reader.read_scalar(data_type)?);
            }
            Ok(Value::List(items))
        }
    }
}

fn data_error<E: Into<ValueError>>(
    err: E,
    def: &ElementDef,
    record: usize,
    property: Option<&PlyProperty>,
    offset: u64,
) -> PlyError {
    let property_name = || property.map(|p| p.name.clone()).unwrap_or_default();
    match err.into() {
        ValueError::Format(e) => e.into(),
        ValueError::Read(ReadError::Io(e)) => PlyError::Io(e),
        ValueError::Read(ReadError::Eof) => FormatError::UnexpectedEof {
            element: def.name.clone(),
            record,
            offset,
        }
        .into(),
        ValueError::Read(ReadError::Invalid(token)) => FormatError::InvalidScalar {
            element: def.name.clone(),
            record,
            property: property_name(),
            ty: property.map_or(ScalarType::U8, |p| p.data_type()),
            token,
        }
        .into(),
        ValueError::Read(ReadError::Missing) => FormatError::MissingValue {
            element: def.name.clone(),
            record,
            property: property_name(),
        }
        .into(),
        ValueError::Read(ReadError::Trailing) => FormatError::TrailingValues {
            element: def.name.clone(),
            record,
        }
        .into(),
    }
}

/// The records of one element group.
pub struct ElementRecords<'d, R: BufRead> {
    decoder: &'d mut ElementDecoder<R>,
}

impl<R: BufRead> ElementRecords<'_, R> {
    pub fn def(&self) -> &ElementDef {
        &self.decoder.header.elements[self.decoder.current]
    }

    /// Records of this group not yet pulled.
    pub fn remaining(&self) -> usize {
        self.decoder.remaining
    }
}

impl<R: BufRead> Iterator for ElementRecords<'_, R> {
    type Item = Result<Record, PlyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.decoder.remaining == 0 || self.decoder.failed {
            return None;
        }
        Some(self.decoder.next_record())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.decoder.remaining))
    }
}
