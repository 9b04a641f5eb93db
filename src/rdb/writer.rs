//! RDB serialization of the string store.

use jiff::Timestamp;

use crate::rdb::encoding::{write_length, write_string};
use crate::store::StringStore;

const EXPIRY_MILLIS_OPCODE: u8 = 0xFC;
const SELECT_DB_OPCODE: u8 = 0xFE;
const RESIZE_DB_OPCODE: u8 = 0xFB;
const END_OF_FILE_OPCODE: u8 = 0xFF;
const STRING_VALUE_TYPE: u8 = 0x00;

/// Serializes the live contents of the string store:
/// `REDIS0012`, DB selector 0, hash-table sizes, each key (TTL opcode
/// first when set), end-of-file marker.
pub fn serialize(store: &mut StringStore) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"REDIS0012");

    out.push(SELECT_DB_OPCODE);
    write_length(&mut out, 0);

    let keys = store.keys();
    let expiry_count = keys
        .iter()
        .filter(|key| store.expiry_of(key).is_some())
        .count();

    out.push(RESIZE_DB_OPCODE);
    write_length(&mut out, keys.len());
    write_length(&mut out, expiry_count);

    for key in keys {
        let Some(value) = store.get(&key) else {
            continue;
        };

        if let Some(expiry_at) = store.expiry_of(&key) {
            out.push(EXPIRY_MILLIS_OPCODE);
            out.extend_from_slice(&expiry_millis(expiry_at).to_le_bytes());
        }

        out.push(STRING_VALUE_TYPE);
        write_string(&mut out, &key);
        write_string(&mut out, &value);
    }

    out.push(END_OF_FILE_OPCODE);
    out
}

fn expiry_millis(expiry_at: Timestamp) -> u64 {
    expiry_at.as_millisecond().max(0) as u64
}
