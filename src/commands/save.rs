use tracing::info;

use crate::commands::{CommandError, CommandResult};
use crate::rdb;
use crate::resp::RespValue;
use crate::store::Stores;

/// Handles the SAVE command: serializes the string store and writes
/// `dump.rdb` in the working directory through a temp-file rename.
pub async fn save(stores: &Stores, arguments: &[String]) -> Result<CommandResult, CommandError> {
    if !arguments.is_empty() {
        return Err(CommandError::WrongNumberOfArguments("save"));
    }

    let bytes = {
        let mut strings = stores.strings.lock().await;
        rdb::serialize(&mut strings)
    };

    let path = rdb::save_rdb_file(&bytes)
        .await
        .map_err(|error| CommandError::SaveFailed(error.to_string()))?;

    info!(path = %path.display(), size = bytes.len(), "wrote RDB snapshot");

    Ok(CommandResult::Response(
        RespValue::SimpleString("OK".to_string()).encode(),
    ))
}
