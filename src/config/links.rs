//! Server-to-server link configuration.

use serde::Deserialize;

/// A directly connected server.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkBlock {
    /// Remote server name (e.g., "hub.straylight.net").
    pub name: String,
    /// Remote SID (TS6, 3 characters).
    pub sid: String,
    /// Hidden servers are never named to users; local MODE lines caused by
    /// them carry this server's name instead.
    #[serde(default)]
    pub hidden: bool,
}
