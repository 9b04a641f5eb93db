//! RESP (Redis Serialization Protocol) framing.
//!
//! One [`RespValue`] is one wire frame. Decoding works incrementally over a
//! byte buffer: a parse attempt either consumes a whole frame, reports that
//! more bytes are needed, or fails with a protocol error. Bulk-string
//! payloads stay opaque bytes from the socket to the command layer; nothing
//! in this module interprets them as text.

use std::io::Cursor;

use bytes::{Buf, Bytes};
use thiserror::Error;

const CRLF: &[u8; 2] = b"\r\n";

#[derive(Error, Debug, PartialEq)]
pub enum RespError {
    #[error("incomplete frame")]
    Incomplete,
    #[error("unknown RESP type byte: 0x{0:02X}")]
    UnknownType(u8),
    #[error("invalid length prefix")]
    InvalidLength,
    #[error("invalid integer frame")]
    InvalidInteger,
    #[error("bulk string not terminated by CRLF")]
    UnterminatedBulkString,
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,
}

impl RespError {
    pub fn as_reply_bytes(&self) -> Vec<u8> {
        RespValue::Error(format!("ERR Protocol error: {}", self)).encode()
    }
}

/// A single RESP frame.
///
/// Commands arrive as `Array`s of `BulkString`s. `NullBulkString` and
/// `NullArray` are the RESP2 null encodings (`$-1` and `*-1`).
#[derive(Debug, PartialEq, Clone)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Bytes),
    NullBulkString,
    Array(Vec<RespValue>),
    NullArray,
}

impl RespValue {
    /// Parses one frame from the cursor.
    ///
    /// On success the cursor is left just past the frame, so the caller can
    /// drop the consumed bytes from its buffer. [`RespError::Incomplete`]
    /// means no bytes should be discarded; the caller reads more input and
    /// retries from the same start position.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<RespValue, RespError> {
        let type_byte = read_byte(src)?;

        match type_byte {
            b'+' => {
                let line = read_line(src)?;
                Ok(RespValue::SimpleString(into_utf8(line)?))
            }
            b'-' => {
                let line = read_line(src)?;
                Ok(RespValue::Error(into_utf8(line)?))
            }
            b':' => {
                let line = read_line(src)?;
                let text = into_utf8(line)?;
                let value = text.parse::<i64>().map_err(|_| RespError::InvalidInteger)?;
                Ok(RespValue::Integer(value))
            }
            b'$' => {
                let declared = read_length(src)?;

                let Some(length) = declared else {
                    return Ok(RespValue::NullBulkString);
                };

                if src.remaining() < length + CRLF.len() {
                    return Err(RespError::Incomplete);
                }

                let start = src.position() as usize;
                let payload = Bytes::copy_from_slice(&src.get_ref()[start..start + length]);
                src.advance(length);

                let mut terminator = [0u8; 2];
                terminator[0] = read_byte(src)?;
                terminator[1] = read_byte(src)?;
                if terminator != *CRLF {
                    return Err(RespError::UnterminatedBulkString);
                }

                Ok(RespValue::BulkString(payload))
            }
            b'*' => {
                let declared = read_length(src)?;

                let Some(length) = declared else {
                    return Ok(RespValue::NullArray);
                };

                let mut elements = Vec::with_capacity(length);
                for _ in 0..length {
                    elements.push(RespValue::parse(src)?);
                }

                Ok(RespValue::Array(elements))
            }
            byte => Err(RespError::UnknownType(byte)),
        }
    }

    /// Serializes the frame to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            RespValue::SimpleString(content) => {
                let mut out = Vec::with_capacity(1 + content.len() + 2);
                out.push(b'+');
                out.extend_from_slice(content.as_bytes());
                out.extend_from_slice(CRLF);
                out
            }
            RespValue::Error(message) => {
                let mut out = Vec::with_capacity(1 + message.len() + 2);
                out.push(b'-');
                out.extend_from_slice(message.as_bytes());
                out.extend_from_slice(CRLF);
                out
            }
            RespValue::Integer(value) => format!(":{}\r\n", value).into_bytes(),
            RespValue::BulkString(payload) => {
                let header = format!("${}\r\n", payload.len());
                let mut out = Vec::with_capacity(header.len() + payload.len() + 2);
                out.extend_from_slice(header.as_bytes());
                out.extend_from_slice(payload);
                out.extend_from_slice(CRLF);
                out
            }
            RespValue::NullBulkString => b"$-1\r\n".to_vec(),
            RespValue::Array(elements) => {
                let mut out = format!("*{}\r\n", elements.len()).into_bytes();
                for element in elements {
                    out.extend_from_slice(&element.encode());
                }
                out
            }
            RespValue::NullArray => b"*-1\r\n".to_vec(),
        }
    }

    /// Builds a bulk string frame from text.
    pub fn bulk_from_str(content: &str) -> RespValue {
        RespValue::BulkString(Bytes::copy_from_slice(content.as_bytes()))
    }

    /// Builds an array of bulk strings from owned text values.
    pub fn array_from_strings<I>(items: I) -> RespValue
    where
        I: IntoIterator<Item = String>,
    {
        RespValue::Array(
            items
                .into_iter()
                .map(|item| RespValue::BulkString(Bytes::from(item)))
                .collect(),
        )
    }

    /// Encodes an array of bulk strings, the reply shape used by LRANGE,
    /// KEYS, BLPOP and friends.
    pub fn encode_array_from_strings<I>(items: I) -> Vec<u8>
    where
        I: IntoIterator<Item = String>,
    {
        RespValue::array_from_strings(items).encode()
    }

    /// Builds a command array (array of bulk strings) from static parts.
    /// Used by the replication handshake and write propagation.
    pub fn command_array(parts: &[&str]) -> RespValue {
        RespValue::Array(parts.iter().map(|part| RespValue::bulk_from_str(part)).collect())
    }
}

fn read_byte(src: &mut Cursor<&[u8]>) -> Result<u8, RespError> {
    if !src.has_remaining() {
        return Err(RespError::Incomplete);
    }
    Ok(src.get_u8())
}

/// Reads up to the next CRLF, consuming the terminator but returning only
/// the line content.
fn read_line(src: &mut Cursor<&[u8]>) -> Result<Vec<u8>, RespError> {
    let start = src.position() as usize;
    let haystack = &src.get_ref()[start..];

    let Some(index) = haystack.windows(2).position(|window| window == CRLF) else {
        return Err(RespError::Incomplete);
    };

    let line = haystack[..index].to_vec();
    src.advance(index + CRLF.len());
    Ok(line)
}

/// Reads a `$`/`*` length prefix line. `-1` encodes the null value.
fn read_length(src: &mut Cursor<&[u8]>) -> Result<Option<usize>, RespError> {
    let line = read_line(src)?;
    let text = into_utf8(line)?;

    if text == "-1" {
        return Ok(None);
    }

    let length = text.parse::<usize>().map_err(|_| RespError::InvalidLength)?;
    Ok(Some(length))
}

fn into_utf8(bytes: Vec<u8>) -> Result<String, RespError> {
    String::from_utf8(bytes).map_err(|_| RespError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(input: &[u8]) -> Result<RespValue, RespError> {
        let mut cursor = Cursor::new(input);
        RespValue::parse(&mut cursor)
    }

    #[test]
    fn test_parse_frames() {
        let test_cases: Vec<(&[u8], RespValue)> = vec![
            (b"+OK\r\n", RespValue::SimpleString("OK".to_string())),
            (
                b"-ERR unknown command 'FOO'\r\n",
                RespValue::Error("ERR unknown command 'FOO'".to_string()),
            ),
            (b":42\r\n", RespValue::Integer(42)),
            (b":-7\r\n", RespValue::Integer(-7)),
            (b"$5\r\nhello\r\n", RespValue::bulk_from_str("hello")),
            (b"$0\r\n\r\n", RespValue::bulk_from_str("")),
            (b"$-1\r\n", RespValue::NullBulkString),
            (b"*-1\r\n", RespValue::NullArray),
            (b"*0\r\n", RespValue::Array(vec![])),
            (
                b"*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n",
                RespValue::Array(vec![
                    RespValue::bulk_from_str("ECHO"),
                    RespValue::bulk_from_str("hey"),
                ]),
            ),
            (
                b"*2\r\n*1\r\n:1\r\n+nested\r\n",
                RespValue::Array(vec![
                    RespValue::Array(vec![RespValue::Integer(1)]),
                    RespValue::SimpleString("nested".to_string()),
                ]),
            ),
        ];

        for (input, expected) in test_cases {
            assert_eq!(
                parse_all(input),
                Ok(expected),
                "parsing {}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn test_parse_incomplete_frames() {
        let test_cases: Vec<&[u8]> = vec![
            b"",
            b"+OK",
            b"$5\r\nhel",
            b"$5\r\nhello",
            b"*2\r\n$4\r\nECHO\r\n",
            b"*2\r\n$4\r\nECHO\r\n$3\r\nhe",
        ];

        for input in test_cases {
            assert_eq!(
                parse_all(input),
                Err(RespError::Incomplete),
                "parsing {}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn test_parse_errors() {
        let test_cases: Vec<(&[u8], RespError)> = vec![
            (b"?what\r\n", RespError::UnknownType(b'?')),
            (b":abc\r\n", RespError::InvalidInteger),
            (b"$abc\r\n", RespError::InvalidLength),
            (b"$3\r\nhelXY", RespError::UnterminatedBulkString),
        ];

        for (input, expected) in test_cases {
            assert_eq!(
                parse_all(input),
                Err(expected),
                "parsing {}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn test_bulk_payload_is_opaque() {
        // Arbitrary bytes, including invalid UTF-8, survive the codec.
        let payload: &[u8] = &[0x00, 0xFF, 0xFE, b'\r', b'\n', 0x80];
        let frame = RespValue::BulkString(Bytes::copy_from_slice(payload));
        let encoded = frame.encode();

        assert_eq!(parse_all(&encoded), Ok(frame));
    }

    #[test]
    fn test_command_array_round_trip() {
        let command = RespValue::command_array(&["RPUSH", "mylist", "a", "b", "c"]);
        let encoded = command.encode();

        let mut cursor = Cursor::new(encoded.as_slice());
        let decoded = RespValue::parse(&mut cursor).unwrap();

        assert_eq!(decoded, command);
        assert_eq!(cursor.position() as usize, encoded.len());
    }

    #[test]
    fn test_parse_consumes_exactly_one_frame() {
        let input = b"+PONG\r\n:1\r\n";
        let mut cursor = Cursor::new(&input[..]);

        assert_eq!(
            RespValue::parse(&mut cursor),
            Ok(RespValue::SimpleString("PONG".to_string()))
        );
        assert_eq!(cursor.position(), 7);
        assert_eq!(RespValue::parse(&mut cursor), Ok(RespValue::Integer(1)));
    }

    #[test]
    fn test_encode_array_from_strings() {
        let encoded =
            RespValue::encode_array_from_strings(vec!["mylist".to_string(), "hello".to_string()]);
        assert_eq!(encoded, b"*2\r\n$6\r\nmylist\r\n$5\r\nhello\r\n");
    }
}
