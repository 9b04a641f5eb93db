//! RDB size and string encodings.
//!
//! The first byte's top two bits select the layout:
//!
//! - `00` — length in the low 6 bits
//! - `01` — 14-bit length: low 6 bits of byte 0 shifted left 8, plus byte 1
//! - `10` — length in the next 4 big-endian bytes
//! - `11` — special integer encoding (read side only): `0xC0` i8,
//!   `0xC1` i16 little-endian, `0xC2` i32 little-endian, decoded to the
//!   integer's decimal ASCII form

use tokio::io::{Error, ErrorKind};

#[derive(Debug, PartialEq)]
enum StringEncoding {
    Length(usize),
    Int8,
    Int16,
    Int32,
}

/// Reads `len` bytes at `cursor`, or fails with `UnexpectedEof` when the
/// buffer is short. Partial buffers surface as errors rather than panics.
pub fn take_bytes(bytes: &[u8], cursor: usize, len: usize) -> tokio::io::Result<&[u8]> {
    if cursor + len > bytes.len() {
        return Err(Error::new(
            ErrorKind::UnexpectedEof,
            "not enough bytes in RDB buffer",
        ));
    }

    Ok(&bytes[cursor..cursor + len])
}

fn read_encoding(bytes: &[u8], cursor: usize) -> tokio::io::Result<(StringEncoding, usize)> {
    let first = take_bytes(bytes, cursor, 1)?[0];
    let mut consumed = 1;

    let encoding = match first >> 6 {
        0b00 => StringEncoding::Length((first & 0x3F) as usize),
        0b01 => {
            let second = take_bytes(bytes, cursor + consumed, 1)?[0];
            consumed += 1;

            let length = (((first & 0x3F) as usize) << 8) | second as usize;
            StringEncoding::Length(length)
        }
        0b10 => {
            let raw = take_bytes(bytes, cursor + consumed, 4)?;
            consumed += 4;

            let length = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
            StringEncoding::Length(length)
        }
        _ => match first {
            0xC0 => StringEncoding::Int8,
            0xC1 => StringEncoding::Int16,
            0xC2 => StringEncoding::Int32,
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!("unsupported RDB encoding byte 0x{:02X}", first),
                ));
            }
        },
    };

    Ok((encoding, consumed))
}

/// Reads a size-encoded plain integer (used for hash-table sizes and the
/// DB selector). The special integer encodings are not valid here.
pub fn read_length(bytes: &[u8], cursor: usize) -> tokio::io::Result<(usize, usize)> {
    let (encoding, consumed) = read_encoding(bytes, cursor)?;

    match encoding {
        StringEncoding::Length(length) => Ok((length, consumed)),
        _ => Err(Error::new(
            ErrorKind::InvalidData,
            "expected a length, found an integer encoding",
        )),
    }
}

/// Reads a size-encoded string. Integer encodings decode to the decimal
/// ASCII rendering of the stored value.
pub fn read_string(bytes: &[u8], cursor: usize) -> tokio::io::Result<(String, usize)> {
    let (encoding, mut consumed) = read_encoding(bytes, cursor)?;

    let value = match encoding {
        StringEncoding::Length(length) => {
            let raw = take_bytes(bytes, cursor + consumed, length)?;
            consumed += length;

            String::from_utf8(raw.to_vec())
                .map_err(|_| Error::new(ErrorKind::InvalidData, "RDB string is not valid UTF-8"))?
        }
        StringEncoding::Int8 => {
            let raw = take_bytes(bytes, cursor + consumed, 1)?;
            consumed += 1;
            (raw[0] as i8).to_string()
        }
        StringEncoding::Int16 => {
            let raw = take_bytes(bytes, cursor + consumed, 2)?;
            consumed += 2;
            i16::from_le_bytes([raw[0], raw[1]]).to_string()
        }
        StringEncoding::Int32 => {
            let raw = take_bytes(bytes, cursor + consumed, 4)?;
            consumed += 4;
            i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]).to_string()
        }
    };

    Ok((value, consumed))
}

/// Writes a size in the shortest encoding that fits.
pub fn write_length(out: &mut Vec<u8>, length: usize) {
    if length < 0x40 {
        out.push(length as u8);
    } else if length < 0x4000 {
        out.push(0x40 | ((length >> 8) as u8 & 0x3F));
        out.push(length as u8);
    } else {
        out.push(0x80);
        out.extend_from_slice(&(length as u32).to_be_bytes());
    }
}

/// Writes a size-encoded string (length followed by raw bytes).
pub fn write_string(out: &mut Vec<u8>, value: &str) {
    write_length(out, value.len());
    out.extend_from_slice(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_round_trip() {
        let test_cases = vec![0, 1, 0x3F, 0x40, 0x1234, 0x3FFF, 0x4000, 1_000_000];

        for length in test_cases {
            let mut out = Vec::new();
            write_length(&mut out, length);

            let (decoded, consumed) = read_length(&out, 0).unwrap();
            assert_eq!(decoded, length, "round-tripping length {}", length);
            assert_eq!(consumed, out.len());
        }
    }

    #[test]
    fn test_length_wire_layout() {
        let mut short = Vec::new();
        write_length(&mut short, 10);
        assert_eq!(short, vec![0x0A]);

        let mut medium = Vec::new();
        write_length(&mut medium, 700);
        assert_eq!(medium, vec![0x42, 0xBC]);

        let mut long = Vec::new();
        write_length(&mut long, 0x0001_0000);
        assert_eq!(long, vec![0x80, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_string_round_trip() {
        let test_cases = vec![
            String::new(),
            "a".to_string(),
            "hello world".to_string(),
            "x".repeat(500),
        ];

        for value in test_cases {
            let mut out = Vec::new();
            write_string(&mut out, &value);

            let (decoded, consumed) = read_string(&out, 0).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, out.len());
        }
    }

    #[test]
    fn test_integer_encodings_decode_to_decimal_ascii() {
        let test_cases: Vec<(Vec<u8>, &str)> = vec![
            (vec![0xC0, 0x7B], "123"),
            (vec![0xC0, 0x80], "-128"),
            (vec![0xC1, 0x39, 0x30], "12345"),
            (vec![0xC1, 0xFF, 0xFF], "-1"),
            (vec![0xC2, 0x15, 0xCD, 0x5B, 0x07], "123456789"),
            (vec![0xC2, 0xFF, 0xFF, 0xFF, 0xFF], "-1"),
        ];

        for (input, expected) in test_cases {
            let (decoded, consumed) = read_string(&input, 0).unwrap();
            assert_eq!(decoded, expected, "decoding {:02X?}", input);
            assert_eq!(consumed, input.len());
        }
    }

    #[test]
    fn test_truncated_input_is_an_error() {
        let test_cases: Vec<Vec<u8>> = vec![
            vec![],
            vec![0x42],
            vec![0x80, 0x00],
            vec![0x05, b'a', b'b'],
            vec![0xC1, 0x39],
        ];

        for input in test_cases {
            let result = read_string(&input, 0);
            assert!(result.is_err(), "decoding {:02X?} should fail", input);
        }
    }

    #[test]
    fn test_lzf_encoding_is_rejected() {
        let result = read_string(&[0xC3, 0x00], 0);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidData);
    }
}
