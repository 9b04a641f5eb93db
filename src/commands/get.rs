use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::store::Stores;

/// Handles the GET command. Expired keys read as absent (and are removed
/// by the store on the way).
pub async fn get(stores: &Stores, arguments: &[String]) -> Result<CommandResult, CommandError> {
    if arguments.len() != 1 {
        return Err(CommandError::WrongNumberOfArguments("get"));
    }

    let mut strings = stores.strings.lock().await;

    let reply = match strings.get(&arguments[0]) {
        Some(value) => RespValue::bulk_from_str(&value),
        None => RespValue::NullBulkString,
    };

    Ok(CommandResult::Response(reply.encode()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_present_and_absent() {
        let stores = Stores::new();
        stores
            .strings
            .lock()
            .await
            .set("foo".to_string(), "bar".to_string(), None);

        let present = get(&stores, &["foo".to_string()]).await.unwrap();
        assert_eq!(present, CommandResult::Response(b"$3\r\nbar\r\n".to_vec()));

        let absent = get(&stores, &["missing".to_string()]).await.unwrap();
        assert_eq!(absent, CommandResult::Response(b"$-1\r\n".to_vec()));
    }

    #[tokio::test]
    async fn test_get_arity() {
        let stores = Stores::new();
        assert_eq!(
            get(&stores, &[]).await,
            Err(CommandError::WrongNumberOfArguments("get"))
        );
    }
}
