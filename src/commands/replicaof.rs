use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::server::{RedisRole, RedisServer};

/// Handles `REPLICAOF NO ONE`, the only supported form: the server starts
/// acting as a master. Re-targeting replication at another host is not
/// supported.
pub async fn replicaof(
    server: &Arc<RwLock<RedisServer>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.len() != 2
        || !arguments[0].eq_ignore_ascii_case("no")
        || !arguments[1].eq_ignore_ascii_case("one")
    {
        return Err(CommandError::WrongNumberOfArguments("replicaof"));
    }

    let mut server_guard = server.write().await;
    if server_guard.role != RedisRole::Master {
        server_guard.role = RedisRole::Master;
        info!("REPLICAOF NO ONE: now acting as master");
    }

    Ok(CommandResult::Response(
        RespValue::SimpleString("OK".to_string()).encode(),
    ))
}
