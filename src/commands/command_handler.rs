//! Parsed commands and their dispatch to the per-command handlers.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::{
    CommandError,
    blpop::blpop,
    config_get::config_get,
    echo::echo,
    get::get,
    incr::incr,
    info::info,
    keys::keys,
    llen::llen,
    lpop::lpop,
    lrange::lrange,
    ping::ping,
    psync::psync,
    replconf::replconf,
    replicaof::replicaof,
    rpush_and_lpush::{lpush, rpush},
    save::save,
    set::set,
    type_command::type_command,
    xadd::xadd,
    xrange::xrange,
    xread::xread,
};
use crate::resp::RespValue;
use crate::server::RedisServer;
use crate::store::Stores;

/// What a command execution produced.
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// An encoded reply ready to be written to the client.
    Response(Vec<u8>),
    /// PSYNC was accepted: write `header`, then stream an RDB snapshot and
    /// register the connection as a replica sink. The connection loop owns
    /// that follow-up because it owns the socket writer.
    FullResync { header: Vec<u8> },
}

/// A command parsed from a RESP array: uppercased name, UTF-8 arguments,
/// and the original frame (kept for replica propagation, which forwards
/// the client's exact bytes).
#[derive(Debug, PartialEq, Clone)]
pub struct CommandHandler {
    pub name: String,
    pub arguments: Vec<String>,
    pub input: RespValue,
}

impl CommandHandler {
    /// Builds a command from a decoded frame. Commands must be non-empty
    /// arrays of bulk strings; only here are the payload bytes interpreted
    /// as text, and only the name is case-folded.
    pub fn new(input: RespValue) -> Result<Self, CommandError> {
        let RespValue::Array(elements) = &input else {
            return Err(CommandError::InvalidCommand);
        };

        let name = match elements.first() {
            Some(RespValue::BulkString(raw)) => std::str::from_utf8(raw)
                .map_err(|_| CommandError::InvalidCommandArgument)?
                .to_uppercase(),
            _ => return Err(CommandError::InvalidCommand),
        };

        let mut arguments = Vec::with_capacity(elements.len().saturating_sub(1));
        for element in &elements[1..] {
            match element {
                RespValue::BulkString(raw) => {
                    let argument = std::str::from_utf8(raw)
                        .map_err(|_| CommandError::InvalidCommandArgument)?;
                    arguments.push(argument.to_string());
                }
                _ => return Err(CommandError::InvalidCommand),
            }
        }

        Ok(CommandHandler {
            name,
            arguments,
            input,
        })
    }

    /// Executes the command against the shared stores and server state.
    ///
    /// `client_address` identifies this connection in the blocked-waiter
    /// structures, so BLPOP and XREAD BLOCK can be cancelled for exactly
    /// this client on timeout.
    pub async fn execute(
        &self,
        server: &Arc<RwLock<RedisServer>>,
        client_address: &str,
        stores: &Stores,
    ) -> Result<CommandResult, CommandError> {
        match self.name.as_str() {
            "PING" => ping(),
            "ECHO" => echo(&self.arguments),
            "GET" => get(stores, &self.arguments).await,
            "SET" => set(stores, &self.arguments).await,
            "INCR" => incr(stores, &self.arguments).await,
            "KEYS" => keys(stores, &self.arguments).await,
            "TYPE" => type_command(stores, &self.arguments).await,
            "RPUSH" => rpush(stores, &self.arguments).await,
            "LPUSH" => lpush(stores, &self.arguments).await,
            "LPOP" => lpop(stores, &self.arguments).await,
            "BLPOP" => blpop(client_address, stores, &self.arguments).await,
            "LRANGE" => lrange(stores, &self.arguments).await,
            "LLEN" => llen(stores, &self.arguments).await,
            "XADD" => xadd(stores, &self.arguments).await,
            "XRANGE" => xrange(stores, &self.arguments).await,
            "XREAD" => xread(client_address, stores, &self.arguments).await,
            "INFO" => info(server, &self.arguments).await,
            "REPLCONF" => replconf(),
            "REPLICAOF" => replicaof(server, &self.arguments).await,
            "PSYNC" => psync(server, &self.arguments).await,
            "CONFIG" => config_get(server, &self.arguments).await,
            "SAVE" => save(stores, &self.arguments).await,
            _ => Err(CommandError::UnknownCommand(self.name.clone())),
        }
    }

    /// The RESP array to forward to replicas for this command, or `None`
    /// when it is not a write command. BLPOP propagates as the equivalent
    /// non-blocking `LPOP`, since the blocking half is per-connection state
    /// a replica must not re-enact.
    pub fn propagation_frame(&self) -> Option<RespValue> {
        if !WRITE_COMMANDS.contains(&self.name.as_str()) {
            return None;
        }

        if self.name == "BLPOP" {
            let key = self.arguments.first()?;
            return Some(RespValue::command_array(&["LPOP", key]));
        }

        Some(self.input.clone())
    }
}

/// Commands whose effects must reach replicas.
pub const WRITE_COMMANDS: [&str; 7] = ["SET", "DEL", "RPUSH", "LPUSH", "LPOP", "BLPOP", "XADD"];
