use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;

/// Handles the REPLCONF command. Every subcommand a replica sends during
/// the handshake is acknowledged with `+OK`.
pub fn replconf() -> Result<CommandResult, CommandError> {
    Ok(CommandResult::Response(
        RespValue::SimpleString("OK".to_string()).encode(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replconf_always_ok() {
        assert_eq!(
            replconf().unwrap(),
            CommandResult::Response(b"+OK\r\n".to_vec())
        );
    }
}
