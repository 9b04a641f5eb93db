use jiff::{SignedDuration, Timestamp};

use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::store::Stores;

/// Parsed arguments for SET: `SET key value [PX milliseconds]`.
pub struct SetArguments {
    key: String,
    value: String,
    expiry_at: Option<Timestamp>,
}

impl SetArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 2 && arguments.len() != 4 {
            return Err(CommandError::WrongNumberOfArguments("set"));
        }

        let mut expiry_at = None;

        if arguments.len() == 4 {
            if !arguments[2].eq_ignore_ascii_case("px") {
                return Err(CommandError::SyntaxError);
            }

            let millis = arguments[3]
                .parse::<i64>()
                .ok()
                .filter(|&value| value >= 0)
                .ok_or(CommandError::InvalidExpireTime)?;

            expiry_at = Some(
                Timestamp::now()
                    .checked_add(SignedDuration::from_millis(millis))
                    .map_err(|_| CommandError::InvalidExpireTime)?,
            );
        }

        Ok(SetArguments {
            key: arguments[0].clone(),
            value: arguments[1].clone(),
            expiry_at,
        })
    }
}

/// Handles the SET command. Replaces any prior record; without PX the
/// stored record carries no expiry, clearing one that may have existed.
pub async fn set(stores: &Stores, arguments: &[String]) -> Result<CommandResult, CommandError> {
    let set_arguments = SetArguments::parse(arguments)?;

    let mut strings = stores.strings.lock().await;
    strings.set(
        set_arguments.key,
        set_arguments.value,
        set_arguments.expiry_at,
    );

    Ok(CommandResult::Response(
        RespValue::SimpleString("OK".to_string()).encode(),
    ))
}
