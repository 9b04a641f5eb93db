//! Shared test harness: an in-process server environment plus reply
//! builders, and a small RESP client for socket-level tests.

// Each suite uses a different slice of these helpers.
#![allow(dead_code)]

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::RwLock;
use tokio::time::{Duration, sleep};

use redlite::commands::{CommandDispatcher, CommandHandler, DispatchOutcome};
use redlite::input::RespReader;
use redlite::resp::RespValue;
use redlite::server::RedisServer;
use redlite::store::Stores;

/// A server environment without sockets: shared stores and config, with
/// one dispatcher per simulated client connection.
#[derive(Clone)]
pub struct TestEnv {
    pub server: Arc<RwLock<RedisServer>>,
    pub stores: Stores,
}

impl TestEnv {
    pub fn new() -> Self {
        let server = RedisServer::from_args(vec!["redlite".to_string()]).unwrap();

        TestEnv {
            server: Arc::new(RwLock::new(server)),
            stores: Stores::new(),
        }
    }

    /// A fresh dispatcher standing in for one client connection.
    pub fn client(&self, address: &str) -> CommandDispatcher {
        CommandDispatcher::new(address.to_string())
    }

    /// Runs one command for the given client and returns the raw reply.
    pub async fn exec(&self, client: &mut CommandDispatcher, parts: &[&str]) -> Vec<u8> {
        let command = CommandHandler::new(RespValue::command_array(parts)).unwrap();

        match client.dispatch(command, &self.server, &self.stores).await {
            DispatchOutcome::Reply(reply) => reply,
            DispatchOutcome::FullResync { header } => header,
        }
    }
}

pub fn expected_simple_string(value: &str) -> Vec<u8> {
    format!("+{}\r\n", value).into_bytes()
}

pub fn expected_bulk_string(value: &str) -> Vec<u8> {
    format!("${}\r\n{}\r\n", value.len(), value).into_bytes()
}

pub fn expected_integer(value: i64) -> Vec<u8> {
    format!(":{}\r\n", value).into_bytes()
}

pub fn expected_null() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}

pub fn expected_array(items: &[&str]) -> Vec<u8> {
    let mut reply = format!("*{}\r\n", items.len()).into_bytes();
    for item in items {
        reply.extend_from_slice(&expected_bulk_string(item));
    }
    reply
}

pub fn expected_error(message: &str) -> Vec<u8> {
    format!("-{}\r\n", message).into_bytes()
}

pub async fn sleep_ms(millis: u64) {
    sleep(Duration::from_millis(millis)).await;
}

/// A real TCP client speaking RESP, for tests that exercise the full
/// server loop.
pub struct RespClient {
    pub reader: RespReader<OwnedReadHalf>,
    pub writer: OwnedWriteHalf,
}

impl RespClient {
    /// Connects to a server, retrying while it finishes binding.
    pub async fn connect(port: u16) -> RespClient {
        for _ in 0..50 {
            if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)).await {
                let (read_half, write_half) = stream.into_split();
                return RespClient {
                    reader: RespReader::new(read_half),
                    writer: write_half,
                };
            }
            sleep_ms(20).await;
        }
        panic!("server on port {} never came up", port);
    }

    pub async fn send(&mut self, parts: &[&str]) {
        let frame = RespValue::command_array(parts);
        self.writer.write_all(&frame.encode()).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    pub async fn read_frame(&mut self) -> RespValue {
        self.reader
            .read_frame()
            .await
            .unwrap()
            .expect("connection closed while waiting for a reply")
    }

    /// Sends a command and returns the single frame replied.
    pub async fn round_trip(&mut self, parts: &[&str]) -> RespValue {
        self.send(parts).await;
        self.read_frame().await
    }
}

/// Starts a full server on the given port inside the current runtime.
pub fn spawn_server(args: &[&str]) {
    let args: Vec<String> = std::iter::once("redlite")
        .chain(args.iter().copied())
        .map(|part| part.to_string())
        .collect();

    let server = RedisServer::from_args(args).unwrap();
    tokio::spawn(server.run());
}
