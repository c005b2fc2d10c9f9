//! Unified error handling for the sync daemon.
//!
//! Every failure here is per-message: the offending line is dropped, logged,
//! and processing continues with the next one.

use crate::message::ProtocolError;
use crate::state::mode::ModeParseError;
use crate::sync::frame::FrameError;
use thiserror::Error;

// ============================================================================
// Handler Errors (command processing)
// ============================================================================

/// Errors that can occur while handling a server command.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("not enough parameters")]
    NeedMoreParams,

    #[error("malformed line: {0}")]
    Parse(#[from] ProtocolError),

    #[error("command requires a server source, got {0}")]
    NotAServer(String),

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("no such client: {0}")]
    NoSuchClient(String),

    #[error("invalid channel name: {0}")]
    InvalidChannel(String),

    #[error("invalid UID: {0}")]
    InvalidUid(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("bad mode string: {0}")]
    Mode(#[from] ModeParseError),

    #[error("long SJOIN for {channel}: {source}")]
    LongSjoin {
        channel: String,
        #[source]
        source: FrameError,
    },

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NeedMoreParams => "need_more_params",
            Self::Parse(_) => "parse_error",
            Self::NotAServer(_) => "not_a_server",
            Self::UnknownSource(_) => "unknown_source",
            Self::NoSuchClient(_) => "no_such_client",
            Self::InvalidChannel(_) => "invalid_channel",
            Self::InvalidUid(_) => "invalid_uid",
            Self::InvalidTimestamp(_) => "invalid_timestamp",
            Self::Mode(_) => "bad_mode",
            Self::LongSjoin { .. } => "long_sjoin",
            Self::UnknownCommand(_) => "unknown_command",
        }
    }
}

/// Result type for server command handlers.
pub type HandlerResult = Result<(), HandlerError>;
