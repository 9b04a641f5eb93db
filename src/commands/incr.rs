use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::store::Stores;

/// Handles the INCR command. A missing key starts at 1; an existing value
/// must parse as a signed 64-bit integer and keeps its expiry across the
/// rewrite.
pub async fn incr(stores: &Stores, arguments: &[String]) -> Result<CommandResult, CommandError> {
    if arguments.len() != 1 {
        return Err(CommandError::WrongNumberOfArguments("incr"));
    }

    let key = &arguments[0];
    let mut strings = stores.strings.lock().await;

    let incremented = match strings.get(key) {
        Some(current) => {
            let number = current
                .parse::<i64>()
                .map_err(|_| CommandError::NotAnInteger)?;
            number.checked_add(1).ok_or(CommandError::NotAnInteger)?
        }
        None => 1,
    };

    let expiry_at = strings.expiry_of(key);
    strings.set(key.clone(), incremented.to_string(), expiry_at);

    Ok(CommandResult::Response(
        RespValue::Integer(incremented).encode(),
    ))
}

#[cfg(test)]
mod tests {
    use jiff::{SignedDuration, Timestamp};

    use super::*;

    #[tokio::test]
    async fn test_incr_missing_key_starts_at_one() {
        let stores = Stores::new();

        let result = incr(&stores, &["counter".to_string()]).await.unwrap();
        assert_eq!(result, CommandResult::Response(b":1\r\n".to_vec()));
        assert_eq!(
            stores.strings.lock().await.get("counter"),
            Some("1".to_string())
        );
    }

    #[tokio::test]
    async fn test_incr_existing_integer() {
        let stores = Stores::new();
        stores
            .strings
            .lock()
            .await
            .set("counter".to_string(), "41".to_string(), None);

        let result = incr(&stores, &["counter".to_string()]).await.unwrap();
        assert_eq!(result, CommandResult::Response(b":42\r\n".to_vec()));
    }

    #[tokio::test]
    async fn test_incr_non_integer_value() {
        let stores = Stores::new();
        stores
            .strings
            .lock()
            .await
            .set("k".to_string(), "abc".to_string(), None);

        assert_eq!(
            incr(&stores, &["k".to_string()]).await,
            Err(CommandError::NotAnInteger)
        );
    }

    #[tokio::test]
    async fn test_incr_overflow() {
        let stores = Stores::new();
        stores
            .strings
            .lock()
            .await
            .set("k".to_string(), i64::MAX.to_string(), None);

        assert_eq!(
            incr(&stores, &["k".to_string()]).await,
            Err(CommandError::NotAnInteger)
        );
    }

    #[tokio::test]
    async fn test_incr_preserves_expiry() {
        let stores = Stores::new();
        let expiry = Timestamp::now()
            .checked_add(SignedDuration::from_millis(60_000))
            .unwrap();
        stores
            .strings
            .lock()
            .await
            .set("k".to_string(), "1".to_string(), Some(expiry));

        incr(&stores, &["k".to_string()]).await.unwrap();

        assert_eq!(stores.strings.lock().await.expiry_of("k"), Some(expiry));
    }
}
