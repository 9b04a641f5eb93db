//! Per-connection loops: regular clients on one side, the link to a
//! master on the other.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::commands::{CommandDispatcher, CommandHandler, DispatchOutcome};
use crate::input::{RespReader, handshake};
use crate::rdb;
use crate::server::RedisServer;
use crate::store::Stores;

/// Serves one client connection until EOF or a framing error.
///
/// Commands are read and answered strictly in arrival order; a blocking
/// command therefore suspends the whole connection, which is exactly
/// BLPOP's contract. The write half is shared behind a lock because a
/// PSYNC turns it into a replica sink that the propagation path also
/// writes to.
pub async fn handle_client_connection(
    stream: TcpStream,
    server: Arc<RwLock<RedisServer>>,
    client_address: String,
    stores: Stores,
) {
    info!(client = %client_address, "client connected");

    let (read_half, write_half) = stream.into_split();
    let mut reader = RespReader::new(read_half);
    let writer = Arc::new(RwLock::new(write_half));
    let mut dispatcher = CommandDispatcher::new(client_address.clone());

    loop {
        let frame = match reader.read_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!(client = %client_address, "client disconnected");
                break;
            }
            Err(error) => {
                // Framing errors are unrecoverable; drop the connection.
                error!(client = %client_address, %error, "closing connection");
                break;
            }
        };

        let command = match CommandHandler::new(frame) {
            Ok(command) => command,
            Err(error) => {
                write_reply(&writer, &client_address, &error.as_reply_bytes()).await;
                continue;
            }
        };

        debug!(client = %client_address, command = %command.name, "executing command");

        match dispatcher.dispatch(command, &server, &stores).await {
            DispatchOutcome::Reply(reply) => {
                write_reply(&writer, &client_address, &reply).await;
            }
            DispatchOutcome::FullResync { header } => {
                if let Err(error) =
                    full_resync(&server, &stores, &client_address, &writer, header).await
                {
                    error!(client = %client_address, %error, "full resync failed");
                    break;
                }
            }
        }
    }

    // If this connection had become a replica sink, drop it from the
    // registry along with the connection.
    server.write().await.remove_replica(&client_address);
}

/// Completes a PSYNC: FULLRESYNC header, then the serialized string store
/// as a bulk payload with no trailing CRLF, then registration as a
/// replica sink.
async fn full_resync(
    server: &Arc<RwLock<RedisServer>>,
    stores: &Stores,
    client_address: &str,
    writer: &Arc<RwLock<OwnedWriteHalf>>,
    header: Vec<u8>,
) -> tokio::io::Result<()> {
    let snapshot = {
        let mut strings = stores.strings.lock().await;
        rdb::serialize(&mut strings)
    };

    {
        let mut writer_guard = writer.write().await;
        writer_guard.write_all(&header).await?;
        writer_guard
            .write_all(format!("${}\r\n", snapshot.len()).as_bytes())
            .await?;
        writer_guard.write_all(&snapshot).await?;
        writer_guard.flush().await?;
    }

    info!(
        replica = %client_address,
        bytes = snapshot.len(),
        "sent RDB snapshot to replica"
    );

    server
        .write()
        .await
        .register_replica(client_address.to_string(), Arc::clone(writer));

    Ok(())
}

async fn write_reply(
    writer: &Arc<RwLock<OwnedWriteHalf>>,
    client_address: &str,
    reply: &[u8],
) {
    let mut writer_guard = writer.write().await;

    let written = match writer_guard.write_all(reply).await {
        Ok(()) => writer_guard.flush().await,
        Err(error) => Err(error),
    };

    if let Err(error) = written {
        warn!(client = %client_address, %error, "failed to write reply");
    }
}

/// Replica startup: connect to the master, run the handshake, then apply
/// the propagated command stream. Failures are logged and end replication;
/// the server keeps serving reads either way.
pub async fn replicate_from_master(
    host: &str,
    port: u32,
    server: Arc<RwLock<RedisServer>>,
    stores: Stores,
) {
    let master_address = format!("{}:{}", host, port);

    let stream = match TcpStream::connect(&master_address).await {
        Ok(stream) => stream,
        Err(error) => {
            error!(master = %master_address, %error, "failed to connect to master");
            return;
        }
    };

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = RespReader::new(read_half);

    let listening_port = server.read().await.port;
    if let Err(error) = handshake(&mut reader, &mut write_half, listening_port).await {
        error!(master = %master_address, %error, "replication handshake failed");
        return;
    }

    info!(master = %master_address, "replication handshake complete");
    handle_master_connection(reader, master_address, server, stores).await;
}

/// Apply-only loop for the master link: every propagated command array is
/// executed against the local stores and its reply is discarded. The
/// master never expects answers on this channel.
async fn handle_master_connection(
    mut reader: RespReader<OwnedReadHalf>,
    master_address: String,
    server: Arc<RwLock<RedisServer>>,
    stores: Stores,
) {
    loop {
        let frame = match reader.read_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!(master = %master_address, "master closed the replication link");
                break;
            }
            Err(error) => {
                error!(master = %master_address, %error, "replication link failed");
                break;
            }
        };

        let command = match CommandHandler::new(frame) {
            Ok(command) => command,
            Err(error) => {
                warn!(master = %master_address, %error, "skipping unparsable propagated frame");
                continue;
            }
        };

        debug!(master = %master_address, command = %command.name, "applying propagated command");

        if let Err(error) = command.execute(&server, &master_address, &stores).await {
            warn!(
                master = %master_address,
                command = %command.name,
                %error,
                "propagated command failed"
            );
        }
    }
}
