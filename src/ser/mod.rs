mod encoder;
mod val_writer;

pub use encoder::{write_mesh, PlyEncoder};
