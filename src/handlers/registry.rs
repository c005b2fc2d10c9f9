//! Command handler registry and dispatch.

use super::server::{AwayHandler, NickHandler, QuitHandler, SjoinHandler, UidHandler};
use super::{Context, HandlerError, HandlerResult, ServerHandler};
use crate::message::RawMessage;
use crate::telemetry::spans;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Registry of server command handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn ServerHandler>>,
    /// Per-command usage counters.
    command_counts: HashMap<&'static str, AtomicU64>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn ServerHandler>> = HashMap::new();

        // Client state introduced by servers
        handlers.insert("UID", Box::new(UidHandler));
        handlers.insert("NICK", Box::new(NickHandler));
        handlers.insert("QUIT", Box::new(QuitHandler));
        handlers.insert("AWAY", Box::new(AwayHandler));

        // Channel state
        handlers.insert("SJOIN", Box::new(SjoinHandler));

        let command_counts = handlers
            .keys()
            .map(|&name| (name, AtomicU64::new(0)))
            .collect();

        Self {
            handlers,
            command_counts,
        }
    }

    /// Dispatch a message to its handler.
    pub fn dispatch(&self, ctx: &mut Context<'_>, msg: &RawMessage) -> HandlerResult {
        let Some((&name, handler)) = self.handlers.get_key_value(msg.command.as_str()) else {
            return Err(HandlerError::UnknownCommand(msg.command.clone()));
        };

        if let Some(counter) = self.command_counts.get(name) {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        let source = msg.prefix.as_deref().unwrap_or("*");
        let _span = spans::command(name, source).entered();
        let result = handler.handle(ctx, msg);
        if let Err(err) = &result {
            debug!(command = %name, code = err.error_code(), error = %err, "Command failed");
        }
        result
    }

    /// How many times `command` has been dispatched.
    pub fn command_count(&self, command: &str) -> u64 {
        self.command_counts
            .get(command)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Usage counters for every registered command, sorted by name.
    pub fn command_stats(&self) -> Vec<(&'static str, u64)> {
        let mut stats: Vec<_> = self
            .command_counts
            .iter()
            .map(|(&name, count)| (name, count.load(Ordering::Relaxed)))
            .collect();
        stats.sort_unstable();
        stats
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
