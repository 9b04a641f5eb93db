use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;

/// Handles the ECHO command: the single argument comes back as a bulk
/// string.
pub fn echo(arguments: &[String]) -> Result<CommandResult, CommandError> {
    if arguments.len() != 1 {
        return Err(CommandError::WrongNumberOfArguments("echo"));
    }

    Ok(CommandResult::Response(
        RespValue::bulk_from_str(&arguments[0]).encode(),
    ))
}
