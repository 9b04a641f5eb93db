use tokio::sync::MutexGuard;

use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::store::{ListStore, Stores};

/// Handles the RPUSH command.
pub async fn rpush(stores: &Stores, arguments: &[String]) -> Result<CommandResult, CommandError> {
    push(stores, arguments, false).await
}

/// Handles the LPUSH command.
pub async fn lpush(stores: &Stores, arguments: &[String]) -> Result<CommandResult, CommandError> {
    push(stores, arguments, true).await
}

async fn push(
    stores: &Stores,
    arguments: &[String],
    to_front: bool,
) -> Result<CommandResult, CommandError> {
    if arguments.len() < 2 {
        let name = if to_front { "lpush" } else { "rpush" };
        return Err(CommandError::WrongNumberOfArguments(name));
    }

    let key = &arguments[0];
    let elements: Vec<String> = arguments[1..].to_vec();
    let pushed = elements.len();

    let mut lists = stores.lists.lock().await;

    let length = if to_front {
        lists.lpush(key, elements)
    } else {
        lists.rpush(key, elements)
    };

    wake_waiters(&mut lists, key, pushed);

    Ok(CommandResult::Response(
        RespValue::Integer(length as i64).encode(),
    ))
}

/// Pairs freshly pushed elements with blocked BLPOP clients, oldest waiter
/// first. At most one pairing per pushed element; each element goes to
/// exactly one waiter through its oneshot. A dead waiter (dropped
/// receiver) gives its element back to the list head.
fn wake_waiters(lists: &mut MutexGuard<'_, ListStore>, key: &str, pushed: usize) {
    for _ in 0..pushed {
        let Some((waiter, element)) = lists.pop_for_waiter(key) else {
            break;
        };

        if let Err(element) = waiter.sender.send(element) {
            lists.requeue_front(key, element);
        }
    }
}
