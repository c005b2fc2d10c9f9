//! Network state: channels, clients, servers and the WHOWAS cache.

pub mod channel;
pub mod client;
pub mod mode;
pub mod network;
pub mod whowas;

pub use channel::{Channel, ChannelTable, ListEntry, ListKind, MemberModes, Topic};
pub use client::{Client, ClientTable, LinkId, ServerLink, ServerTable, Uid};
pub use mode::{Mode, ModeDelta, ModeFlags};
pub use network::Network;
pub use whowas::{WhowasCache, WhowasRecord};
