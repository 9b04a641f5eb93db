use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::{CommandError, CommandResult};
use crate::server::RedisServer;

/// Handles `PSYNC ? -1`. The reply is the `+FULLRESYNC <replid> <offset>`
/// header; the connection loop follows up with the RDB snapshot transfer
/// and registers the socket as a replica sink, since only it holds the
/// writer.
pub async fn psync(
    server: &Arc<RwLock<RedisServer>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.len() != 2 {
        return Err(CommandError::WrongNumberOfArguments("psync"));
    }

    let server_guard = server.read().await;
    let header = format!(
        "+FULLRESYNC {} {}\r\n",
        server_guard.repl_id, server_guard.repl_offset
    );

    Ok(CommandResult::FullResync {
        header: header.into_bytes(),
    })
}
