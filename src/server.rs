//! Server configuration, the replica registry, and the accept loop.

use std::process::ExitCode;
use std::sync::Arc;

use rand::RngCore;
use regex::Regex;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::commands::CommandHandler;
use crate::connection::{handle_client_connection, replicate_from_master};
use crate::rdb;
use crate::store::Stores;

/// Errors from command-line argument parsing.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum CliError {
    #[error("invalid command line flag")]
    InvalidCommandLineFlag,
    #[error("invalid port flag value")]
    InvalidPortFlagValue,
    #[error("invalid master address")]
    InvalidMasterAddress,
    #[error("invalid master port")]
    InvalidMasterPort,
}

/// The server's replication role. A replica knows its master's address;
/// `REPLICAOF NO ONE` is the only runtime transition, back to master.
#[derive(Debug, PartialEq, Clone)]
pub enum RedisRole {
    Master,
    Replica { host: String, port: u32 },
}

impl RedisRole {
    /// The role name reported by INFO, using Redis's own terminology for
    /// replicas.
    pub fn as_str(&self) -> &str {
        match self {
            RedisRole::Master => "master",
            RedisRole::Replica { .. } => "slave",
        }
    }
}

/// A registered replica: the write half of its PSYNC connection, shared
/// with the connection task that still owns the read half.
#[derive(Debug)]
pub struct ReplicaSink {
    pub client_address: String,
    pub writer: Arc<RwLock<OwnedWriteHalf>>,
}

/// Configuration and replication state for one server process.
#[derive(Debug)]
pub struct RedisServer {
    pub port: u32,
    pub role: RedisRole,
    pub rdb_directory: String,
    pub rdb_filename: String,
    /// Fixed 40-hex-character replication ID for this process lifetime.
    pub repl_id: String,
    pub repl_offset: u64,
    replicas: Vec<ReplicaSink>,
}

impl RedisServer {
    /// Builds a server from command-line arguments.
    ///
    /// Supported flags: `--port <n>`, `--dir <path>`,
    /// `--dbfilename <name>`, and `--replicaof` in both the quoted
    /// `"host port"` form and the two-argument `host port` form.
    pub fn from_args<I>(command_line_args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut iter = command_line_args.into_iter().skip(1);
        let mut port = None;
        let mut rdb_directory = None;
        let mut rdb_filename = None;
        let mut role = None;

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--port" => {
                    let value = iter.next().ok_or(CliError::InvalidCommandLineFlag)?;
                    port = Some(validate_port(&value, CliError::InvalidPortFlagValue)?);
                }
                "--dir" => {
                    let value = iter.next().ok_or(CliError::InvalidCommandLineFlag)?;
                    rdb_directory = Some(value);
                }
                "--dbfilename" => {
                    let value = iter.next().ok_or(CliError::InvalidCommandLineFlag)?;
                    rdb_filename = Some(value);
                }
                "--replicaof" => {
                    let value = iter.next().ok_or(CliError::InvalidCommandLineFlag)?;

                    let spec = if value.contains(' ') {
                        value
                    } else {
                        let master_port = iter.next().ok_or(CliError::InvalidMasterAddress)?;
                        format!("{} {}", value, master_port)
                    };

                    let (host, master_port) = validate_master_address(&spec)?;
                    role = Some(RedisRole::Replica {
                        host,
                        port: master_port,
                    });
                }
                _ => return Err(CliError::InvalidCommandLineFlag),
            }
        }

        Ok(RedisServer {
            port: port.unwrap_or(6379),
            role: role.unwrap_or(RedisRole::Master),
            rdb_directory: rdb_directory.unwrap_or_else(|| "/tmp".to_string()),
            rdb_filename: rdb_filename.unwrap_or_else(|| "dump.rdb".to_string()),
            repl_id: generate_repl_id(),
            repl_offset: 0,
            replicas: Vec::new(),
        })
    }

    /// Runs the server: load the RDB file if present, start the replica
    /// handshake when configured, then accept connections forever. Only a
    /// bind failure is fatal.
    pub async fn run(self) -> ExitCode {
        let stores = Stores::new();

        {
            let mut strings = stores.strings.lock().await;
            match rdb::load_rdb_file(&self.rdb_directory, &self.rdb_filename, &mut strings).await
            {
                Ok(0) => {}
                Ok(loaded) => info!(loaded, "restored keys from RDB file"),
                Err(error) => warn!(%error, "could not load RDB file, starting empty"),
            }
        }

        let port = self.port;
        let role = self.role.clone();
        let server = Arc::new(RwLock::new(self));

        if let RedisRole::Replica {
            host,
            port: master_port,
        } = role
        {
            let server_clone = Arc::clone(&server);
            let stores_clone = stores.clone();

            tokio::spawn(async move {
                replicate_from_master(&host, master_port, server_clone, stores_clone).await;
            });
        }

        let listener = match TcpListener::bind(format!("127.0.0.1:{}", port)).await {
            Ok(listener) => listener,
            Err(error) => {
                error!(%error, port, "failed to bind TCP listener");
                return ExitCode::FAILURE;
            }
        };
        info!(port, "listening for connections");

        loop {
            match listener.accept().await {
                Ok((stream, peer_address)) => {
                    let server_clone = Arc::clone(&server);
                    let stores_clone = stores.clone();

                    tokio::spawn(async move {
                        handle_client_connection(
                            stream,
                            server_clone,
                            peer_address.to_string(),
                            stores_clone,
                        )
                        .await;
                    });
                }
                Err(error) => {
                    error!(%error, "failed to accept connection");
                }
            }
        }
    }

    /// Adds a replica sink after its PSYNC transfer completed. Sinks keep
    /// insertion order; propagation visits them in that order.
    pub fn register_replica(
        &mut self,
        client_address: String,
        writer: Arc<RwLock<OwnedWriteHalf>>,
    ) {
        info!(replica = %client_address, "registered replica");
        self.replicas.push(ReplicaSink {
            client_address,
            writer,
        });
    }

    /// Drops a replica sink when its connection goes away.
    pub fn remove_replica(&mut self, client_address: &str) {
        self.replicas
            .retain(|sink| sink.client_address != client_address);
    }

    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    /// Forwards a successfully executed write command to every replica
    /// sink. Send failures are logged and the sink stays registered; a
    /// dead connection is reaped when its own task observes the close.
    pub async fn propagate_write(&self, command: &CommandHandler) {
        if self.role != RedisRole::Master || self.replicas.is_empty() {
            return;
        }

        let Some(frame) = command.propagation_frame() else {
            return;
        };
        let encoded = frame.encode();

        for sink in &self.replicas {
            let mut writer_guard = sink.writer.write().await;

            let written = match writer_guard.write_all(&encoded).await {
                Ok(()) => writer_guard.flush().await,
                Err(error) => Err(error),
            };

            if let Err(error) = written {
                warn!(
                    replica = %sink.client_address,
                    command = %command.name,
                    %error,
                    "failed to propagate write command"
                );
            }
        }
    }
}

fn generate_repl_id() -> String {
    let mut raw = [0u8; 20];
    rand::rng().fill_bytes(&mut raw);
    raw.iter().map(|byte| format!("{:02x}", byte)).collect()
}

fn validate_port(port: &str, error: CliError) -> Result<u32, CliError> {
    let port_number = port.parse::<u32>().map_err(|_| error.clone())?;

    if !(1..=65535).contains(&port_number) {
        return Err(error);
    }

    Ok(port_number)
}

/// Validates a `"host port"` master address. The host may be an IPv4
/// address (each octet checked) or a hostname.
fn validate_master_address(master_address: &str) -> Result<(String, u32), CliError> {
    let ipv4_pattern = Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})$").unwrap();
    let hostname_pattern = Regex::new(r"^[a-zA-Z0-9\-\.]+$").unwrap();

    let parts: Vec<&str> = master_address.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(CliError::InvalidMasterAddress);
    }

    let host = parts[0];

    let host_is_valid = if let Some(captures) = ipv4_pattern.captures(host) {
        captures.iter().skip(1).all(|octet| {
            octet
                .and_then(|m| m.as_str().parse::<u16>().ok())
                .is_some_and(|value| value <= 255)
        })
    } else {
        hostname_pattern.is_match(host)
    };

    if !host_is_valid {
        return Err(CliError::InvalidMasterAddress);
    }

    let port = validate_port(parts[1], CliError::InvalidMasterPort)?;

    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        std::iter::once("redlite")
            .chain(parts.iter().copied())
            .map(|part| part.to_string())
            .collect()
    }

    #[test]
    fn test_defaults() {
        let server = RedisServer::from_args(args(&[])).unwrap();

        assert_eq!(server.port, 6379);
        assert_eq!(server.role, RedisRole::Master);
        assert_eq!(server.rdb_directory, "/tmp");
        assert_eq!(server.rdb_filename, "dump.rdb");
        assert_eq!(server.repl_offset, 0);
        assert_eq!(server.replica_count(), 0);
    }

    #[test]
    fn test_repl_id_is_forty_hex_characters() {
        let server = RedisServer::from_args(args(&[])).unwrap();

        assert_eq!(server.repl_id.len(), 40);
        assert!(server.repl_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_flag_parsing() {
        let server = RedisServer::from_args(args(&[
            "--port",
            "7001",
            "--dir",
            "/var/data",
            "--dbfilename",
            "store.rdb",
        ]))
        .unwrap();

        assert_eq!(server.port, 7001);
        assert_eq!(server.rdb_directory, "/var/data");
        assert_eq!(server.rdb_filename, "store.rdb");
    }

    #[test]
    fn test_replicaof_quoted_form() {
        let server = RedisServer::from_args(args(&["--replicaof", "127.0.0.1 6380"])).unwrap();

        assert_eq!(
            server.role,
            RedisRole::Replica {
                host: "127.0.0.1".to_string(),
                port: 6380,
            }
        );
    }

    #[test]
    fn test_replicaof_two_argument_form() {
        let server =
            RedisServer::from_args(args(&["--replicaof", "redis-master", "6380"])).unwrap();

        assert_eq!(
            server.role,
            RedisRole::Replica {
                host: "redis-master".to_string(),
                port: 6380,
            }
        );
    }

    #[test]
    fn test_invalid_flags() {
        let test_cases = vec![
            (args(&["--port"]), CliError::InvalidCommandLineFlag),
            (args(&["--port", "abc"]), CliError::InvalidPortFlagValue),
            (args(&["--port", "0"]), CliError::InvalidPortFlagValue),
            (args(&["--port", "70000"]), CliError::InvalidPortFlagValue),
            (args(&["--banana"]), CliError::InvalidCommandLineFlag),
            (args(&["--replicaof"]), CliError::InvalidCommandLineFlag),
            (
                args(&["--replicaof", "only-host"]),
                CliError::InvalidMasterAddress,
            ),
            (
                args(&["--replicaof", "256.0.0.1 6379"]),
                CliError::InvalidMasterAddress,
            ),
            (
                args(&["--replicaof", "bad_host! 6379"]),
                CliError::InvalidMasterAddress,
            ),
            (
                args(&["--replicaof", "127.0.0.1 notaport"]),
                CliError::InvalidMasterPort,
            ),
            (
                args(&["--replicaof", "127.0.0.1 70000"]),
                CliError::InvalidMasterPort,
            ),
        ];

        for (input, expected) in test_cases {
            let result = RedisServer::from_args(input.clone());
            assert!(result.is_err(), "parsing {:?} should fail", input);
            assert_eq!(result.unwrap_err(), expected, "parsing {:?}", input);
        }
    }

    #[test]
    fn test_role_names() {
        assert_eq!(RedisRole::Master.as_str(), "master");
        assert_eq!(
            RedisRole::Replica {
                host: "h".to_string(),
                port: 1,
            }
            .as_str(),
            "slave"
        );
    }
}
