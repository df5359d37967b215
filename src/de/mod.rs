mod decoder;
mod row;

pub(crate) mod val_reader;

pub use decoder::{ElementDecoder, ElementRecords};
pub(crate) use row::RecordDeserializer;
