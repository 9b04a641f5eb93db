use std::time::Duration;

use tokio::sync::oneshot;

use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::store::{ListWaiter, Stores};

/// Parsed arguments for BLPOP: `BLPOP key timeout_seconds`.
#[derive(Debug)]
pub struct BlpopArguments {
    key: String,
    timeout_secs: f64,
}

impl BlpopArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() != 2 {
            return Err(CommandError::WrongNumberOfArguments("blpop"));
        }

        let timeout_secs = arguments[1]
            .parse::<f64>()
            .map_err(|_| CommandError::TimeoutNotFloat)?;

        if !timeout_secs.is_finite() {
            return Err(CommandError::TimeoutNotFloat);
        }
        if timeout_secs < 0.0 {
            return Err(CommandError::TimeoutNegative);
        }

        Ok(BlpopArguments {
            key: arguments[0].clone(),
            timeout_secs,
        })
    }
}

/// Handles the BLPOP command.
///
/// When the list has an element the reply is immediate. Otherwise this
/// connection registers a waiter and suspends on its oneshot; a later push
/// pairs the waiter with an element under the list store's lock. Exactly
/// one of the wake path and the timeout path removes the waiter, and
/// whichever side succeeds owns the reply.
pub async fn blpop(
    client_address: &str,
    stores: &Stores,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let blpop_arguments = BlpopArguments::parse(arguments)?;
    let key = &blpop_arguments.key;

    let mut receiver = {
        let mut lists = stores.lists.lock().await;

        if let Some(element) = lists.lpop(key, 1).into_iter().next() {
            return Ok(key_element_reply(key, element));
        }

        let (sender, receiver) = oneshot::channel();
        let waiter = ListWaiter {
            client_id: client_address.to_string(),
            sender,
        };

        if !lists.block_waiter(key, waiter) {
            // A push slipped in while we held the lock is impossible, but
            // the contract says a non-empty list refuses the waiter, so
            // honor it by popping after all.
            match lists.lpop(key, 1).into_iter().next() {
                Some(element) => return Ok(key_element_reply(key, element)),
                None => return Ok(null_reply()),
            }
        }

        receiver
    };

    match wait_for_element(&mut receiver, blpop_arguments.timeout_secs).await {
        Some(element) => Ok(key_element_reply(key, element)),
        None => {
            let removed = stores
                .lists
                .lock()
                .await
                .unblock_waiter(key, client_address);

            if removed {
                // We won the race against any wake-up: timeout reply.
                return Ok(null_reply());
            }

            // The wake path claimed our waiter first; the element is on
            // the channel (or arrives momentarily).
            match receiver.await {
                Ok(element) => Ok(key_element_reply(key, element)),
                Err(_) => Ok(null_reply()),
            }
        }
    }
}

/// Waits for a pushed element. A timeout of zero blocks until delivery.
async fn wait_for_element(
    receiver: &mut oneshot::Receiver<String>,
    timeout_secs: f64,
) -> Option<String> {
    if timeout_secs == 0.0 {
        return receiver.await.ok();
    }

    match tokio::time::timeout(Duration::from_secs_f64(timeout_secs), &mut *receiver).await {
        Ok(result) => result.ok(),
        Err(_) => None,
    }
}

fn key_element_reply(key: &str, element: String) -> CommandResult {
    CommandResult::Response(RespValue::encode_array_from_strings(vec![
        key.to_string(),
        element,
    ]))
}

fn null_reply() -> CommandResult {
    CommandResult::Response(RespValue::NullBulkString.encode())
}
