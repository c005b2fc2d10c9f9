//! slircd-tsync - TS6 channel synchronization core.
//!
//! Implements SJOIN timestamp conflict resolution, membership merge and
//! re-framing for server-to-server relay, plus the WHOWAS history cache
//! that backs nick chasing.

pub mod casemap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod message;
pub mod send;
pub mod state;
pub mod sync;
pub mod telemetry;

pub use error::{HandlerError, HandlerResult};
pub use state::Network;
