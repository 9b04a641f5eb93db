//! Reader and writer for the subset of the RDB snapshot format this server
//! uses: string keys with optional millisecond expiry.

mod encoding;
mod file_ops;
mod opcode;
mod parser;
mod writer;

pub use file_ops::{load_rdb_file, save_rdb_file};
pub use parser::{RdbRecord, parse_rdb};
pub use writer::serialize;
