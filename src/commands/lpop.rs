use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::store::Stores;

/// Parsed arguments for LPOP: `LPOP key [count]`.
pub struct LpopArguments {
    key: String,
    count: usize,
    count_was_given: bool,
}

impl LpopArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.is_empty() || arguments.len() > 2 {
            return Err(CommandError::WrongNumberOfArguments("lpop"));
        }

        let mut count = 1;
        let count_was_given = arguments.len() == 2;

        if count_was_given {
            let parsed = arguments[1]
                .parse::<i64>()
                .map_err(|_| CommandError::NotAnInteger)?;

            if parsed < 0 {
                return Err(CommandError::OutOfRangeMustBePositive);
            }

            count = parsed as usize;
        }

        Ok(LpopArguments {
            key: arguments[0].clone(),
            count,
            count_was_given,
        })
    }
}

/// Handles the LPOP command. Without a count (or with count 1) the reply
/// is a bulk string or null; with any other count it is an array, empty
/// when nothing could be popped.
pub async fn lpop(stores: &Stores, arguments: &[String]) -> Result<CommandResult, CommandError> {
    let lpop_arguments = LpopArguments::parse(arguments)?;

    let mut lists = stores.lists.lock().await;
    let popped = lists.lpop(&lpop_arguments.key, lpop_arguments.count);

    let single_reply = !lpop_arguments.count_was_given || lpop_arguments.count == 1;

    let reply = if single_reply {
        match popped.into_iter().next() {
            Some(element) => RespValue::bulk_from_str(&element).encode(),
            None => RespValue::NullBulkString.encode(),
        }
    } else {
        RespValue::encode_array_from_strings(popped)
    };

    Ok(CommandResult::Response(reply))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    async fn seeded_stores() -> Stores {
        let stores = Stores::new();
        stores
            .lists
            .lock()
            .await
            .rpush("L", args(&["a", "b", "c"]));
        stores
    }

    #[tokio::test]
    async fn test_lpop_single() {
        let stores = seeded_stores().await;

        let result = lpop(&stores, &args(&["L"])).await.unwrap();
        assert_eq!(result, CommandResult::Response(b"$1\r\na\r\n".to_vec()));
    }

    #[tokio::test]
    async fn test_lpop_explicit_count_of_one_is_a_bulk() {
        let stores = seeded_stores().await;

        let result = lpop(&stores, &args(&["L", "1"])).await.unwrap();
        assert_eq!(result, CommandResult::Response(b"$1\r\na\r\n".to_vec()));
    }

    #[tokio::test]
    async fn test_lpop_with_count_returns_array() {
        let stores = seeded_stores().await;

        let result = lpop(&stores, &args(&["L", "2"])).await.unwrap();
        assert_eq!(
            result,
            CommandResult::Response(b"*2\r\n$1\r\na\r\n$1\r\nb\r\n".to_vec())
        );
    }

    #[tokio::test]
    async fn test_lpop_missing_key() {
        let stores = Stores::new();

        let single = lpop(&stores, &args(&["missing"])).await.unwrap();
        assert_eq!(single, CommandResult::Response(b"$-1\r\n".to_vec()));

        let counted = lpop(&stores, &args(&["missing", "3"])).await.unwrap();
        assert_eq!(counted, CommandResult::Response(b"*0\r\n".to_vec()));
    }

    #[tokio::test]
    async fn test_lpop_count_validation() {
        let stores = Stores::new();

        assert_eq!(
            lpop(&stores, &args(&["L", "-1"])).await,
            Err(CommandError::OutOfRangeMustBePositive)
        );
        assert_eq!(
            lpop(&stores, &args(&["L", "nope"])).await,
            Err(CommandError::NotAnInteger)
        );
    }
}
