use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::store::Stores;

/// Handles the TYPE command by asking each store in turn. A key holds at
/// most one kind because the stores own disjoint keyspaces.
pub async fn type_command(
    stores: &Stores,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.len() != 1 {
        return Err(CommandError::WrongNumberOfArguments("type"));
    }

    let key = &arguments[0];

    let kind = if stores.strings.lock().await.exists(key) {
        "string"
    } else if stores.lists.lock().await.exists(key) {
        "list"
    } else if stores.streams.lock().await.exists(key) {
        "stream"
    } else {
        "none"
    };

    Ok(CommandResult::Response(
        RespValue::SimpleString(kind.to_string()).encode(),
    ))
}
