use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::server::RedisServer;

/// Handles `CONFIG GET <name>`. Recognized names are `dir` and
/// `dbfilename`; anything else answers with an empty value, matching
/// Redis's behavior for unknown configuration keys.
pub async fn config_get(
    server: &Arc<RwLock<RedisServer>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.len() != 2 || !arguments[0].eq_ignore_ascii_case("get") {
        return Err(CommandError::WrongNumberOfArguments("config"));
    }

    let name = &arguments[1];
    let server_guard = server.read().await;

    let value = if name.eq_ignore_ascii_case("dir") {
        server_guard.rdb_directory.clone()
    } else if name.eq_ignore_ascii_case("dbfilename") {
        server_guard.rdb_filename.clone()
    } else {
        String::new()
    };

    Ok(CommandResult::Response(
        RespValue::encode_array_from_strings(vec![name.clone(), value]),
    ))
}
