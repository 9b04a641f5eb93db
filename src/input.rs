//! Buffered RESP reading from sockets, and the replica-side handshake.

use std::io::Cursor;

use bytes::{Buf, BytesMut};
use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::resp::{RespError, RespValue};

#[derive(Error, Debug)]
pub enum CommandReadError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("connection closed mid-frame")]
    ConnectionClosed,
    #[error(transparent)]
    Resp(#[from] RespError),
    #[error("invalid response from master: {0}")]
    InvalidResponseFromMaster(String),
}

impl CommandReadError {
    pub fn as_reply_bytes(&self) -> Vec<u8> {
        match self {
            CommandReadError::Resp(error) => error.as_reply_bytes(),
            other => RespValue::Error(format!("ERR {}", other)).encode(),
        }
    }
}

/// Reads RESP frames off a socket, buffering partial frames between reads.
///
/// The buffer persists across calls, which matters to a replica: bytes the
/// master pipelines right behind the RDB snapshot are already sitting here
/// when the apply loop starts.
pub struct RespReader<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R> RespReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        RespReader {
            reader,
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Reads the next frame. `Ok(None)` is a clean EOF on a frame
    /// boundary; EOF in the middle of a frame is an error.
    pub async fn read_frame(&mut self) -> Result<Option<RespValue>, CommandReadError> {
        loop {
            let mut cursor = Cursor::new(&self.buffer[..]);

            match RespValue::parse(&mut cursor) {
                Ok(frame) => {
                    let consumed = cursor.position() as usize;
                    self.buffer.advance(consumed);
                    return Ok(Some(frame));
                }
                Err(RespError::Incomplete) => {}
                Err(error) => return Err(error.into()),
            }

            let read = self
                .reader
                .read_buf(&mut self.buffer)
                .await
                .map_err(|error| CommandReadError::Io(error.to_string()))?;

            if read == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(CommandReadError::ConnectionClosed);
            }
        }
    }

    /// Reads the RDB transfer that follows FULLRESYNC: a `$<n>\r\n` header
    /// and exactly `n` payload bytes with no trailing CRLF.
    pub async fn read_rdb_snapshot(&mut self) -> Result<Vec<u8>, CommandReadError> {
        let header = self.read_header_line().await?;

        let length = header
            .strip_prefix('$')
            .and_then(|digits| digits.parse::<usize>().ok())
            .ok_or_else(|| {
                CommandReadError::InvalidResponseFromMaster(format!(
                    "expected an RDB bulk header, got {:?}",
                    header
                ))
            })?;

        while self.buffer.len() < length {
            let read = self
                .reader
                .read_buf(&mut self.buffer)
                .await
                .map_err(|error| CommandReadError::Io(error.to_string()))?;

            if read == 0 {
                return Err(CommandReadError::ConnectionClosed);
            }
        }

        let payload = self.buffer.split_to(length);
        Ok(payload.to_vec())
    }

    async fn read_header_line(&mut self) -> Result<String, CommandReadError> {
        loop {
            if let Some(index) = self
                .buffer
                .windows(2)
                .position(|window| window == b"\r\n")
            {
                let line = self.buffer.split_to(index);
                self.buffer.advance(2);
                return String::from_utf8(line.to_vec())
                    .map_err(|_| CommandReadError::Resp(RespError::InvalidUtf8));
            }

            let read = self
                .reader
                .read_buf(&mut self.buffer)
                .await
                .map_err(|error| CommandReadError::Io(error.to_string()))?;

            if read == 0 {
                return Err(CommandReadError::ConnectionClosed);
            }
        }
    }
}

/// Runs the replica side of the replication handshake:
/// PING, REPLCONF listening-port, REPLCONF capa psync2, PSYNC ? -1, then
/// the RDB snapshot transfer (discarded; this server starts replicas
/// empty).
pub async fn handshake<R, W>(
    reader: &mut RespReader<R>,
    writer: &mut W,
    listening_port: u32,
) -> Result<(), CommandReadError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let ping = RespValue::command_array(&["PING"]);
    send_command(writer, &ping).await?;
    // Any single-line reply is accepted here, typically +PONG.
    expect_frame(reader).await?;

    let listening = RespValue::command_array(&[
        "REPLCONF",
        "listening-port",
        &listening_port.to_string(),
    ]);
    send_command(writer, &listening).await?;
    expect_simple_ok(reader).await?;

    let capabilities = RespValue::command_array(&["REPLCONF", "capa", "psync2"]);
    send_command(writer, &capabilities).await?;
    expect_simple_ok(reader).await?;

    let psync = RespValue::command_array(&["PSYNC", "?", "-1"]);
    send_command(writer, &psync).await?;

    let reply = expect_frame(reader).await?;
    validate_fullresync(&reply)?;

    let snapshot = reader.read_rdb_snapshot().await?;
    info!(bytes = snapshot.len(), "received RDB snapshot from master");

    Ok(())
}

async fn send_command<W>(writer: &mut W, command: &RespValue) -> Result<(), CommandReadError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(&command.encode())
        .await
        .map_err(|error| CommandReadError::Io(error.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|error| CommandReadError::Io(error.to_string()))
}

async fn expect_frame<R>(reader: &mut RespReader<R>) -> Result<RespValue, CommandReadError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_frame().await? {
        Some(frame) => Ok(frame),
        None => Err(CommandReadError::ConnectionClosed),
    }
}

async fn expect_simple_ok<R>(reader: &mut RespReader<R>) -> Result<(), CommandReadError>
where
    R: AsyncRead + Unpin,
{
    let frame = expect_frame(reader).await?;

    if frame != RespValue::SimpleString("OK".to_string()) {
        return Err(CommandReadError::InvalidResponseFromMaster(format!(
            "expected +OK, got {:?}",
            frame
        )));
    }

    Ok(())
}

/// Checks a `+FULLRESYNC <replid> <offset>` reply: a 40-character
/// alphanumeric replication ID and a numeric offset.
fn validate_fullresync(frame: &RespValue) -> Result<(), CommandReadError> {
    let RespValue::SimpleString(line) = frame else {
        return Err(CommandReadError::InvalidResponseFromMaster(format!(
            "expected FULLRESYNC, got {:?}",
            frame
        )));
    };

    let parts: Vec<&str> = line.split_whitespace().collect();
    let valid = parts.len() == 3
        && parts[0] == "FULLRESYNC"
        && is_valid_repl_id(parts[1])
        && parts[2].parse::<i64>().is_ok();

    if !valid {
        return Err(CommandReadError::InvalidResponseFromMaster(line.clone()));
    }

    Ok(())
}

fn is_valid_repl_id(repl_id: &str) -> bool {
    let pattern = Regex::new(r"^[a-zA-Z0-9]{40}$").unwrap();
    pattern.is_match(repl_id)
}
