//! Standardized span constructors for sync observability.

pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for a dispatched server command.
    pub fn command(name: &str, source: &str) -> Span {
        info_span!("command", name = %name, source = %source)
    }

    /// Create a span for one SJOIN merge.
    pub fn sjoin(channel: &str, source: &str) -> Span {
        info_span!("sjoin", channel = %channel, source = %source)
    }
}
