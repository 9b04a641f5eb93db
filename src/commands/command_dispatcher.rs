//! Per-connection command dispatch: the transaction gate, execution, and
//! write propagation to replicas.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::{
    CommandError, CommandHandler, CommandResult, transactions::TransactionState,
};
use crate::resp::RespValue;
use crate::server::RedisServer;
use crate::store::Stores;

/// What the connection loop should do with a dispatched command.
#[derive(Debug, PartialEq)]
pub enum DispatchOutcome {
    /// Write these bytes back to the client.
    Reply(Vec<u8>),
    /// Write `header`, then perform the RDB transfer and register this
    /// connection as a replica sink.
    FullResync { header: Vec<u8> },
}

/// One dispatcher per client connection. It owns the connection's
/// transaction state; everything shared lives behind `server`/`stores`.
pub struct CommandDispatcher {
    client_address: String,
    transaction: TransactionState,
}

impl CommandDispatcher {
    pub fn new(client_address: String) -> Self {
        CommandDispatcher {
            client_address,
            transaction: TransactionState::new(),
        }
    }

    /// Runs one command through the transaction gate and, when it
    /// executes, through propagation. Command errors never bubble out of
    /// here; they become `-ERR` replies.
    pub async fn dispatch(
        &mut self,
        command: CommandHandler,
        server: &Arc<RwLock<RedisServer>>,
        stores: &Stores,
    ) -> DispatchOutcome {
        match command.name.as_str() {
            "MULTI" => DispatchOutcome::Reply(match self.transaction.begin() {
                Ok(()) => RespValue::SimpleString("OK".to_string()).encode(),
                Err(error) => error.as_reply_bytes(),
            }),
            "EXEC" => match self.transaction.take_queue() {
                Ok(queue) => self.run_queued_commands(queue, server, stores).await,
                Err(error) => DispatchOutcome::Reply(error.as_reply_bytes()),
            },
            "DISCARD" => DispatchOutcome::Reply(match self.transaction.discard() {
                Ok(()) => RespValue::SimpleString("OK".to_string()).encode(),
                Err(error) => error.as_reply_bytes(),
            }),
            _ if self.transaction.is_active() => {
                // Queued raw; validation happens when the command runs.
                self.transaction.enqueue(command);
                DispatchOutcome::Reply(RespValue::SimpleString("QUEUED".to_string()).encode())
            }
            _ => match self.execute_and_propagate(&command, server, stores).await {
                Ok(CommandResult::Response(reply)) => DispatchOutcome::Reply(reply),
                Ok(CommandResult::FullResync { header }) => DispatchOutcome::FullResync { header },
                Err(error) => DispatchOutcome::Reply(error.as_reply_bytes()),
            },
        }
    }

    /// EXEC body: each queued command runs as an ordinary command,
    /// contiguously on this connection, and its raw encoded reply (error
    /// replies included) becomes one element of the response array.
    async fn run_queued_commands(
        &mut self,
        queue: Vec<CommandHandler>,
        server: &Arc<RwLock<RedisServer>>,
        stores: &Stores,
    ) -> DispatchOutcome {
        let mut reply = format!("*{}\r\n", queue.len()).into_bytes();

        for command in queue {
            let encoded = match self.execute_and_propagate(&command, server, stores).await {
                Ok(CommandResult::Response(bytes)) => bytes,
                Ok(CommandResult::FullResync { header }) => header,
                Err(error) => error.as_reply_bytes(),
            };
            reply.extend_from_slice(&encoded);
        }

        DispatchOutcome::Reply(reply)
    }

    async fn execute_and_propagate(
        &self,
        command: &CommandHandler,
        server: &Arc<RwLock<RedisServer>>,
        stores: &Stores,
    ) -> Result<CommandResult, CommandError> {
        let result = command
            .execute(server, &self.client_address, stores)
            .await?;

        // Only successfully executed writes are forwarded, in execution
        // order, to every registered replica.
        {
            let server_guard = server.read().await;
            server_guard.propagate_write(command).await;
        }

        Ok(result)
    }
}
