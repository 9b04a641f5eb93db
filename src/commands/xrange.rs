use crate::commands::{CommandError, CommandResult};
use crate::store::{StreamId, StreamIdError, Stores, entries_to_resp};

/// Handles the XRANGE command: `XRANGE key start end`, inclusive on both
/// ends. `-` and `+` select the smallest and largest possible IDs; a bound
/// without a sequence number defaults it to 0.
pub async fn xrange(stores: &Stores, arguments: &[String]) -> Result<CommandResult, CommandError> {
    if arguments.len() != 3 {
        return Err(CommandError::WrongNumberOfArguments("xrange"));
    }

    let start = StreamId::parse_start_bound(&arguments[1])
        .ok_or(CommandError::StreamId(StreamIdError::Malformed))?;
    let end = StreamId::parse_end_bound(&arguments[2])
        .ok_or(CommandError::StreamId(StreamIdError::Malformed))?;

    let streams = stores.streams.lock().await;
    let entries = streams.range(&arguments[0], start, end);

    Ok(CommandResult::Response(entries_to_resp(&entries).encode()))
}
