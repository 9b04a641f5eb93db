use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::server::{RedisRole, RedisServer};

/// Handles `INFO replication`, the only supported section. Masters also
/// report their replication ID and offset.
pub async fn info(
    server: &Arc<RwLock<RedisServer>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    if arguments.len() != 1 || !arguments[0].eq_ignore_ascii_case("replication") {
        return Err(CommandError::UnsupportedInfoSection);
    }

    let server_guard = server.read().await;

    let mut body = format!("role:{}\r\n", server_guard.role.as_str());
    if server_guard.role == RedisRole::Master {
        body.push_str(&format!("master_replid:{}\r\n", server_guard.repl_id));
        body.push_str(&format!(
            "master_repl_offset:{}\r\n",
            server_guard.repl_offset
        ));
    }

    Ok(CommandResult::Response(
        RespValue::bulk_from_str(&body).encode(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_info_replication_for_master() {
        let server = Arc::new(RwLock::new(
            RedisServer::from_args(vec!["redlite".to_string()]).unwrap(),
        ));

        let CommandResult::Response(reply) =
            info(&server, &["replication".to_string()]).await.unwrap()
        else {
            panic!("expected a reply");
        };

        let text = String::from_utf8(reply).unwrap();
        assert!(text.contains("role:master\r\n"), "got {:?}", text);
        assert!(text.contains("master_replid:"), "got {:?}", text);
        assert!(text.contains("master_repl_offset:0\r\n"), "got {:?}", text);
    }

    #[tokio::test]
    async fn test_info_replication_for_replica() {
        let server = Arc::new(RwLock::new(
            RedisServer::from_args(vec![
                "redlite".to_string(),
                "--replicaof".to_string(),
                "127.0.0.1 6380".to_string(),
            ])
            .unwrap(),
        ));

        let CommandResult::Response(reply) =
            info(&server, &["REPLICATION".to_string()]).await.unwrap()
        else {
            panic!("expected a reply");
        };

        let text = String::from_utf8(reply).unwrap();
        assert!(text.contains("role:slave\r\n"), "got {:?}", text);
        assert!(!text.contains("master_replid"), "got {:?}", text);
    }

    #[tokio::test]
    async fn test_info_other_sections_are_rejected() {
        let server = Arc::new(RwLock::new(
            RedisServer::from_args(vec!["redlite".to_string()]).unwrap(),
        ));

        assert_eq!(
            info(&server, &["memory".to_string()]).await,
            Err(CommandError::UnsupportedInfoSection)
        );
        assert_eq!(
            info(&server, &[]).await,
            Err(CommandError::UnsupportedInfoSection)
        );
    }
}
