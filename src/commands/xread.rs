use std::time::Duration;

use tokio::sync::oneshot;

use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::store::{StreamId, StreamIdError, StreamStore, StreamWaiter, Stores, entries_to_resp};

/// Parsed arguments for XREAD:
/// `XREAD [BLOCK milliseconds] STREAMS key [key ...] id [id ...]`.
#[derive(Debug)]
pub struct XreadArguments {
    block_ms: Option<u64>,
    key_id_pairs: Vec<(String, String)>,
}

impl XreadArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() < 3 {
            return Err(CommandError::WrongNumberOfArguments("xread"));
        }

        let (block_ms, streams_index) = if arguments[0].eq_ignore_ascii_case("block") {
            let millis = arguments[1]
                .parse::<i64>()
                .map_err(|_| CommandError::TimeoutNotInteger)?;

            if millis < 0 {
                return Err(CommandError::TimeoutNegative);
            }

            (Some(millis as u64), 2)
        } else {
            (None, 0)
        };

        if !arguments
            .get(streams_index)
            .is_some_and(|keyword| keyword.eq_ignore_ascii_case("streams"))
        {
            return Err(CommandError::WrongNumberOfArguments("xread"));
        }

        let tail = &arguments[streams_index + 1..];
        if tail.is_empty() || tail.len() % 2 != 0 {
            return Err(CommandError::WrongNumberOfArguments("xread"));
        }

        let stream_count = tail.len() / 2;
        let key_id_pairs = (0..stream_count)
            .map(|index| (tail[index].clone(), tail[stream_count + index].clone()))
            .collect();

        Ok(XreadArguments {
            block_ms,
            key_id_pairs,
        })
    }
}

/// Handles the XREAD command.
///
/// The non-blocking form reads entries strictly after each stream's given
/// ID. With BLOCK and no data available, the connection registers one
/// waiter across all requested streams; a later XADD to any of them
/// deregisters the waiter everywhere and signals it, and this task then
/// re-reads the streams and composes the reply itself. The timeout path
/// replies with a null bulk string.
pub async fn xread(
    client_address: &str,
    stores: &Stores,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let xread_arguments = XreadArguments::parse(arguments)?;

    let (mut receiver, watches, block_ms) = {
        let mut streams = stores.streams.lock().await;
        let watches = resolve_watches(&streams, &xread_arguments.key_id_pairs)?;

        if let Some(reply) = compose_reply(&streams, &watches) {
            return Ok(CommandResult::Response(reply));
        }

        let Some(block_ms) = xread_arguments.block_ms else {
            return Ok(CommandResult::Response(
                RespValue::Array(Vec::new()).encode(),
            ));
        };

        let (sender, receiver) = oneshot::channel();
        let waiter = StreamWaiter {
            client_id: client_address.to_string(),
            watches: watches.clone(),
            sender,
        };

        if !streams.register_waiter(waiter) {
            // An entry landed between the read above and registration.
            let reply = compose_reply(&streams, &watches)
                .unwrap_or_else(|| RespValue::Array(Vec::new()).encode());
            return Ok(CommandResult::Response(reply));
        }

        (receiver, watches, block_ms)
    };

    match wait_for_entries(&mut receiver, block_ms).await {
        Some(()) => {
            let streams = stores.streams.lock().await;
            let reply = compose_reply(&streams, &watches)
                .unwrap_or_else(|| RespValue::Array(Vec::new()).encode());
            Ok(CommandResult::Response(reply))
        }
        None => {
            let mut streams = stores.streams.lock().await;

            if streams.deregister_waiter(client_address) {
                return Ok(CommandResult::Response(RespValue::NullBulkString.encode()));
            }

            // A notifier already claimed the waiter; the new entries are
            // visible now.
            let reply = compose_reply(&streams, &watches)
                .unwrap_or_else(|| RespValue::NullBulkString.encode());
            Ok(CommandResult::Response(reply))
        }
    }
}

/// Resolves the requested IDs into concrete last-seen IDs. `$` means "the
/// stream's current last ID", or `0-0` when the stream is missing or
/// empty, so a blocking read waits for the first entry. A bare `<ms>`
/// defaults the sequence to 0.
fn resolve_watches(
    streams: &StreamStore,
    key_id_pairs: &[(String, String)],
) -> Result<Vec<(String, StreamId)>, CommandError> {
    let mut watches = Vec::with_capacity(key_id_pairs.len());

    for (key, raw_id) in key_id_pairs {
        let last_seen = if raw_id == "$" {
            streams.last_id(key).unwrap_or(StreamId::MIN)
        } else if raw_id == "-" {
            // Range sentinels have no meaning in XREAD.
            return Err(CommandError::StreamId(StreamIdError::Malformed));
        } else {
            StreamId::parse_start_bound(raw_id)
                .ok_or(CommandError::StreamId(StreamIdError::Malformed))?
        };

        watches.push((key.clone(), last_seen));
    }

    Ok(watches)
}

/// Builds the XREAD reply: one `[key, entries]` pair per stream that has
/// entries past its last-seen ID. Returns `None` when no stream does.
fn compose_reply(streams: &StreamStore, watches: &[(String, StreamId)]) -> Option<Vec<u8>> {
    let mut result = Vec::new();

    for (key, last_seen) in watches {
        let entries = streams.entries_after(key, *last_seen);
        if entries.is_empty() {
            continue;
        }

        result.push(RespValue::Array(vec![
            RespValue::bulk_from_str(key),
            entries_to_resp(&entries),
        ]));
    }

    if result.is_empty() {
        None
    } else {
        Some(RespValue::Array(result).encode())
    }
}

/// Waits for the wake-up signal. A block of zero milliseconds waits
/// indefinitely.
async fn wait_for_entries(receiver: &mut oneshot::Receiver<()>, block_ms: u64) -> Option<()> {
    if block_ms == 0 {
        return receiver.await.ok();
    }

    match tokio::time::timeout(Duration::from_millis(block_ms), &mut *receiver).await {
        Ok(result) => result.ok(),
        Err(_) => None,
    }
}
