//! Per-connection transaction state.
//!
//! A transaction is a batching construct: MULTI starts queueing, EXEC runs
//! the queue back-to-back on this connection, DISCARD drops it. Queued
//! commands are stored raw and only validated when they finally execute.
//! The state lives inside the connection's dispatcher, so it disappears
//! with the connection.

use crate::commands::{CommandError, CommandHandler};

#[derive(Debug, Default)]
pub struct TransactionState {
    active: bool,
    queue: Vec<CommandHandler>,
}

impl TransactionState {
    pub fn new() -> Self {
        TransactionState::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// MULTI: enters transaction mode with a fresh queue. Nested MULTI is
    /// rejected.
    pub fn begin(&mut self) -> Result<(), CommandError> {
        if self.active {
            return Err(CommandError::NestedMulti);
        }

        self.active = true;
        self.queue.clear();
        Ok(())
    }

    /// Appends a command to the queue. Only meaningful while active.
    pub fn enqueue(&mut self, command: CommandHandler) {
        self.queue.push(command);
    }

    /// EXEC: leaves transaction mode and hands back the queued commands in
    /// arrival order.
    pub fn take_queue(&mut self) -> Result<Vec<CommandHandler>, CommandError> {
        if !self.active {
            return Err(CommandError::ExecWithoutMulti);
        }

        self.active = false;
        Ok(std::mem::take(&mut self.queue))
    }

    /// DISCARD: leaves transaction mode, dropping the queue.
    pub fn discard(&mut self) -> Result<(), CommandError> {
        if !self.active {
            return Err(CommandError::DiscardWithoutMulti);
        }

        self.active = false;
        self.queue.clear();
        Ok(())
    }
}
