use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;

/// Handles the PING command. Replies `+PONG` regardless of arguments.
pub fn ping() -> Result<CommandResult, CommandError> {
    Ok(CommandResult::Response(
        RespValue::SimpleString("PONG".to_string()).encode(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping() {
        let result = ping().unwrap();
        assert_eq!(result, CommandResult::Response(b"+PONG\r\n".to_vec()));
    }
}
