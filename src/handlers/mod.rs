//! Server command handlers.
//!
//! This module contains the [`ServerHandler`] trait and the [`Registry`]
//! that dispatches parsed server-to-server lines to their handlers.

mod registry;
pub mod server;

pub use crate::error::{HandlerError, HandlerResult};
pub use registry::Registry;

use crate::message::RawMessage;
use crate::send::Outbound;
use crate::state::network::Network;

/// Handler context passed to each command handler.
pub struct Context<'a> {
    /// Network state. Handlers run one at a time under the merge lock.
    pub net: &'a mut Network,
    /// Where emitted lines go.
    pub out: &'a mut dyn Outbound,
    /// Wall-clock time the line is processed at (Unix seconds).
    pub now: i64,
}

/// Handler for a command arriving over a server link.
///
/// Handlers run to completion; nothing in the sync path waits on I/O.
pub trait ServerHandler: Send + Sync {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage) -> HandlerResult;
}
