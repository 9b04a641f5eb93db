use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::store::Stores;

/// Handles the KEYS command. Only the literal `*` pattern is supported and
/// only string keys are reported; list and stream keys are not part of the
/// string keyspace.
pub async fn keys(stores: &Stores, arguments: &[String]) -> Result<CommandResult, CommandError> {
    if arguments.len() != 1 {
        return Err(CommandError::WrongNumberOfArguments("keys"));
    }

    if arguments[0] != "*" {
        return Err(CommandError::UnsupportedKeysPattern);
    }

    let mut strings = stores.strings.lock().await;

    Ok(CommandResult::Response(
        RespValue::encode_array_from_strings(strings.keys()),
    ))
}
