#![warn(clippy::indexing_slicing, clippy::unwrap_used, clippy::panic)]

mod archive;
mod bitstream;
mod block;
mod error;
mod huffman;
mod inflate;
mod static_table;
mod table_parser;

pub use crate::archive::{DatArchive, DatHeader, MftEntry, MftHeader, MftIndexEntry};
pub use crate::error::{DatError, ErrorKind};
pub use crate::inflate::decompress;
