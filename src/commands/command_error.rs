//! Command-level errors and their RESP renderings.

use thiserror::Error;

use crate::resp::RespValue;
use crate::store::StreamIdError;

/// Everything a command handler can reject. Each variant's display text is
/// the exact message sent after the `ERR ` prefix, so the enum doubles as
/// the wire-error catalogue.
#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("wrong number of arguments for '{0}' command")]
    WrongNumberOfArguments(&'static str),
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("value is not an integer or out of range")]
    NotAnInteger,
    #[error("value is out of range, must be positive")]
    OutOfRangeMustBePositive,
    #[error("invalid expire time in set")]
    InvalidExpireTime,
    #[error("timeout is negative")]
    TimeoutNegative,
    #[error("timeout is not a float or out of range")]
    TimeoutNotFloat,
    #[error("timeout is not an integer or out of range")]
    TimeoutNotInteger,
    #[error("syntax error")]
    SyntaxError,
    #[error(transparent)]
    StreamId(#[from] StreamIdError),
    #[error("EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("DISCARD without MULTI")]
    DiscardWithoutMulti,
    #[error("nested MULTI")]
    NestedMulti,
    #[error("only INFO replication is supported")]
    UnsupportedInfoSection,
    #[error("only KEYS * is supported")]
    UnsupportedKeysPattern,
    #[error("invalid command")]
    InvalidCommand,
    #[error("invalid command argument")]
    InvalidCommandArgument,
    #[error("{0}")]
    SaveFailed(String),
}

impl CommandError {
    /// The encoded `-ERR ...` reply for this error.
    pub fn as_reply_bytes(&self) -> Vec<u8> {
        RespValue::Error(format!("ERR {}", self)).encode()
    }
}
