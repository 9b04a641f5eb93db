use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::store::Stores;

/// Handles the LLEN command. Missing keys have length 0.
pub async fn llen(stores: &Stores, arguments: &[String]) -> Result<CommandResult, CommandError> {
    if arguments.len() != 1 {
        return Err(CommandError::WrongNumberOfArguments("llen"));
    }

    let lists = stores.lists.lock().await;
    let length = lists.llen(&arguments[0]);

    Ok(CommandResult::Response(
        RespValue::Integer(length as i64).encode(),
    ))
}
