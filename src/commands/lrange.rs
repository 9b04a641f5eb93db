use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::store::Stores;

/// Handles the LRANGE command. Indices may be negative (counted from the
/// end); the normalized range is inclusive.
pub async fn lrange(stores: &Stores, arguments: &[String]) -> Result<CommandResult, CommandError> {
    if arguments.len() != 3 {
        return Err(CommandError::WrongNumberOfArguments("lrange"));
    }

    let start = arguments[1]
        .parse::<i64>()
        .map_err(|_| CommandError::NotAnInteger)?;
    let end = arguments[2]
        .parse::<i64>()
        .map_err(|_| CommandError::NotAnInteger)?;

    let lists = stores.lists.lock().await;
    let elements = lists.lrange(&arguments[0], start, end);

    Ok(CommandResult::Response(
        RespValue::encode_array_from_strings(elements),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    #[tokio::test]
    async fn test_lrange_full_and_negative() {
        let stores = Stores::new();
        stores
            .lists
            .lock()
            .await
            .rpush("L", args(&["a", "b", "c"]));

        let full = lrange(&stores, &args(&["L", "0", "-1"])).await.unwrap();
        assert_eq!(
            full,
            CommandResult::Response(b"*3\r\n$1\r\na\r\n$1\r\nb\r\n$1\r\nc\r\n".to_vec())
        );

        let tail = lrange(&stores, &args(&["L", "-2", "-1"])).await.unwrap();
        assert_eq!(
            tail,
            CommandResult::Response(b"*2\r\n$1\r\nb\r\n$1\r\nc\r\n".to_vec())
        );
    }

    #[tokio::test]
    async fn test_lrange_empty_cases() {
        let stores = Stores::new();

        let missing = lrange(&stores, &args(&["missing", "0", "-1"]))
            .await
            .unwrap();
        assert_eq!(missing, CommandResult::Response(b"*0\r\n".to_vec()));

        stores.lists.lock().await.rpush("L", args(&["a"]));
        let inverted = lrange(&stores, &args(&["L", "2", "1"])).await.unwrap();
        assert_eq!(inverted, CommandResult::Response(b"*0\r\n".to_vec()));
    }

    #[tokio::test]
    async fn test_lrange_index_validation() {
        let stores = Stores::new();

        assert_eq!(
            lrange(&stores, &args(&["L", "zero", "-1"])).await,
            Err(CommandError::NotAnInteger)
        );
        assert_eq!(
            lrange(&stores, &args(&["L", "0"])).await,
            Err(CommandError::WrongNumberOfArguments("lrange"))
        );
    }
}
