//! RDB opcode parsing.

use crate::rdb::encoding::{read_length, read_string, take_bytes};

const METADATA_OPCODE: u8 = 0xFA;
const RESIZE_DB_OPCODE: u8 = 0xFB;
const EXPIRY_SECONDS_OPCODE: u8 = 0xFD;
const EXPIRY_MILLIS_OPCODE: u8 = 0xFC;
const SELECT_DB_OPCODE: u8 = 0xFE;
const END_OF_FILE_OPCODE: u8 = 0xFF;
const STRING_VALUE_TYPE: u8 = 0x00;

/// One decoded section of an RDB body. TTL opcodes wrap the key/value pair
/// they precede, so an expiring key arrives as a single item.
#[derive(Debug, PartialEq)]
pub enum RdbItem {
    Metadata {
        key: String,
        value: String,
    },
    ResizeDb {
        key_count: usize,
        expiry_count: usize,
    },
    SelectDb {
        index: usize,
    },
    StringKey {
        key: String,
        value: String,
        /// Absolute expiry in milliseconds since the epoch, when present.
        expiry_ms: Option<i64>,
    },
    EndOfFile,
}

/// Parses the opcode at `cursor`, returning the item and the number of
/// bytes consumed.
pub fn parse_opcode(bytes: &[u8], cursor: usize) -> tokio::io::Result<(RdbItem, usize)> {
    let opcode = take_bytes(bytes, cursor, 1)?[0];
    let mut consumed = 1;

    let item = match opcode {
        METADATA_OPCODE => {
            let (key, key_len) = read_string(bytes, cursor + consumed)?;
            consumed += key_len;
            let (value, value_len) = read_string(bytes, cursor + consumed)?;
            consumed += value_len;

            RdbItem::Metadata { key, value }
        }
        RESIZE_DB_OPCODE => {
            let (key_count, keys_len) = read_length(bytes, cursor + consumed)?;
            consumed += keys_len;
            let (expiry_count, expiry_len) = read_length(bytes, cursor + consumed)?;
            consumed += expiry_len;

            RdbItem::ResizeDb {
                key_count,
                expiry_count,
            }
        }
        SELECT_DB_OPCODE => {
            let (index, index_len) = read_length(bytes, cursor + consumed)?;
            consumed += index_len;

            RdbItem::SelectDb { index }
        }
        EXPIRY_SECONDS_OPCODE => {
            let raw = take_bytes(bytes, cursor + consumed, 4)?;
            consumed += 4;
            let seconds = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);

            let (inner, inner_len) = parse_opcode(bytes, cursor + consumed)?;
            consumed += inner_len;

            attach_expiry(inner, seconds as i64 * 1000)?
        }
        EXPIRY_MILLIS_OPCODE => {
            let raw = take_bytes(bytes, cursor + consumed, 8)?;
            consumed += 8;
            let millis = u64::from_le_bytes([
                raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7],
            ]);

            let (inner, inner_len) = parse_opcode(bytes, cursor + consumed)?;
            consumed += inner_len;

            attach_expiry(inner, millis as i64)?
        }
        END_OF_FILE_OPCODE => RdbItem::EndOfFile,
        STRING_VALUE_TYPE => {
            let (key, key_len) = read_string(bytes, cursor + consumed)?;
            consumed += key_len;
            let (value, value_len) = read_string(bytes, cursor + consumed)?;
            consumed += value_len;

            RdbItem::StringKey {
                key,
                value,
                expiry_ms: None,
            }
        }
        other => {
            return Err(tokio::io::Error::new(
                tokio::io::ErrorKind::InvalidData,
                format!("unknown RDB opcode 0x{:02X}", other),
            ));
        }
    };

    Ok((item, consumed))
}

fn attach_expiry(item: RdbItem, expiry_ms: i64) -> tokio::io::Result<RdbItem> {
    match item {
        RdbItem::StringKey { key, value, .. } => Ok(RdbItem::StringKey {
            key,
            value,
            expiry_ms: Some(expiry_ms),
        }),
        _ => Err(tokio::io::Error::new(
            tokio::io::ErrorKind::InvalidData,
            "expiry opcode must precede a key/value pair",
        )),
    }
}

pub struct RdbHeader {
    pub consumed: usize,
    pub version: u32,
}

/// Validates the 9-byte `REDIS00NN` preamble. Versions 1 through 12 are
/// accepted, which covers both the written format (`REDIS0012`) and older
/// snapshots such as `REDIS0011`.
pub fn parse_header(bytes: &[u8]) -> tokio::io::Result<RdbHeader> {
    let magic = take_bytes(bytes, 0, 5)?;
    if magic != b"REDIS" {
        return Err(tokio::io::Error::new(
            tokio::io::ErrorKind::InvalidData,
            "missing REDIS magic string",
        ));
    }

    let raw_version = take_bytes(bytes, 5, 4)?;
    let version = std::str::from_utf8(raw_version)
        .ok()
        .and_then(|text| text.parse::<u32>().ok())
        .ok_or_else(|| {
            tokio::io::Error::new(tokio::io::ErrorKind::InvalidData, "malformed RDB version")
        })?;

    if !(1..=12).contains(&version) {
        return Err(tokio::io::Error::new(
            tokio::io::ErrorKind::InvalidData,
            format!("unsupported RDB version {}", version),
        ));
    }

    Ok(RdbHeader {
        consumed: 9,
        version,
    })
}
