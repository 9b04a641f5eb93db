//! Whole-buffer RDB parsing for the string subset.

use crate::rdb::opcode::{RdbItem, parse_header, parse_opcode};

/// A string key recovered from a snapshot, with its absolute expiry in
/// milliseconds when one was recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct RdbRecord {
    pub key: String,
    pub value: String,
    pub expiry_ms: Option<i64>,
}

/// Parses a complete RDB image. Bookkeeping sections (metadata, DB
/// selector, hash-table sizes) are read and discarded; only string
/// key/value pairs are collected. Parsing stops at the end-of-file opcode,
/// so a trailing checksum is tolerated and ignored.
pub fn parse_rdb(bytes: &[u8]) -> tokio::io::Result<Vec<RdbRecord>> {
    let header = parse_header(bytes)?;
    let mut cursor = header.consumed;
    let mut records = Vec::new();

    while cursor < bytes.len() {
        let (item, consumed) = parse_opcode(bytes, cursor)?;
        cursor += consumed;

        match item {
            RdbItem::StringKey {
                key,
                value,
                expiry_ms,
            } => {
                records.push(RdbRecord {
                    key,
                    value,
                    expiry_ms,
                });
            }
            RdbItem::EndOfFile => break,
            RdbItem::Metadata { .. } | RdbItem::ResizeDb { .. } | RdbItem::SelectDb { .. } => {}
        }
    }

    Ok(records)
}
