//! Outbound delivery seam.
//!
//! The socket layer is not part of the sync core. Everything the core emits
//! goes through [`Outbound`]: delivery to local channel members (filtered by
//! member status and negotiated capability), relay to peer servers, and
//! operator notices. [`Recorder`] is the in-memory implementation used by
//! the replay driver and the tests.

use crate::state::channel::{Channel, MemberModes};
use crate::state::client::{Client, ClientTable, LinkId, Uid};
use std::fmt;

/// Minimum member status a recipient must hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Voiced,
    Halfops,
    Ops,
}

/// Recipient filter for local channel delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct Delivery<'a> {
    /// Never deliver to this client.
    pub skip: Option<&'a str>,
    pub status: StatusFilter,
    /// Recipient must have this capability.
    pub with_cap: Option<&'a str>,
    /// Recipient must not have this capability.
    pub without_cap: Option<&'a str>,
}

impl<'a> Delivery<'a> {
    /// Every local member.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_cap(cap: &'a str) -> Self {
        Self {
            with_cap: Some(cap),
            ..Self::default()
        }
    }

    pub fn without_cap(cap: &'a str) -> Self {
        Self {
            without_cap: Some(cap),
            ..Self::default()
        }
    }

    pub fn skipping(mut self, uid: &'a str) -> Self {
        self.skip = Some(uid);
        self
    }

    /// Whether `client`, a member holding `modes`, should get the line.
    pub fn admits(&self, client: &Client, modes: &MemberModes) -> bool {
        if !client.is_local() || self.skip == Some(client.uid.as_str()) {
            return false;
        }
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Voiced => modes.op || modes.halfop || modes.voice,
            StatusFilter::Halfops => modes.op || modes.halfop,
            StatusFilter::Ops => modes.op,
        };
        status_ok
            && self.with_cap.is_none_or(|cap| client.has_cap(cap))
            && self.without_cap.is_none_or(|cap| !client.has_cap(cap))
    }

    /// Local members of `channel` this filter admits, in member order.
    pub fn recipients(&self, channel: &Channel, clients: &ClientTable) -> Vec<Uid> {
        channel
            .members
            .iter()
            .filter(|(uid, modes)| {
                clients
                    .get(uid)
                    .is_some_and(|client| self.admits(client, modes))
            })
            .map(|(uid, _)| uid.clone())
            .collect()
    }
}

/// Operator notice classes (snomask analogues).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Routine server notices.
    Server,
    /// Protocol diagnostics only debug-subscribed operators see.
    Debug,
}

/// Where the core's output goes.
pub trait Outbound {
    /// Deliver `line` to the local members of `channel` admitted by `delivery`.
    fn channel_local(
        &mut self,
        channel: &Channel,
        clients: &ClientTable,
        delivery: &Delivery<'_>,
        line: &str,
    );

    /// Relay `line` to every linked server except those behind `except`.
    fn servers(&mut self, except: Option<LinkId>, line: &str);

    /// Send a notice to operators.
    fn opers(&mut self, level: NoticeLevel, text: &str);
}

/// One recorded emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Local {
        channel: String,
        recipients: Vec<Uid>,
        line: String,
    },
    Server {
        except: Option<LinkId>,
        line: String,
    },
    Oper {
        level: NoticeLevel,
        text: String,
    },
}

/// One line per emission, tagged with its destination:
/// `local <chan> [<uids>] <line>`, `relay !<link> <line>`, `oper <level> <text>`.
impl fmt::Display for Sent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sent::Local {
                channel,
                recipients,
                line,
            } => write!(f, "local {channel} [{}] {line}", recipients.join(",")),
            Sent::Server {
                except: Some(link),
                line,
            } => write!(f, "relay !{} {line}", link.0),
            Sent::Server { except: None, line } => write!(f, "relay * {line}"),
            Sent::Oper { level, text } => {
                let level = match level {
                    NoticeLevel::Server => "server",
                    NoticeLevel::Debug => "debug",
                };
                write!(f, "oper {level} {text}")
            }
        }
    }
}

/// Records everything in emission order.
#[derive(Debug, Default)]
pub struct Recorder {
    pub sent: Vec<Sent>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines delivered to local channel members.
    pub fn local_lines(&self) -> Vec<&str> {
        self.sent
            .iter()
            .filter_map(|s| match s {
                Sent::Local { line, .. } => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Lines relayed to servers.
    pub fn relayed(&self) -> Vec<&str> {
        self.sent
            .iter()
            .filter_map(|s| match s {
                Sent::Server { line, .. } => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Operator notice texts.
    pub fn oper_notices(&self) -> Vec<&str> {
        self.sent
            .iter()
            .filter_map(|s| match s {
                Sent::Oper { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Lines a particular local client received.
    pub fn received_by(&self, uid: &str) -> Vec<&str> {
        self.sent
            .iter()
            .filter_map(|s| match s {
                Sent::Local {
                    recipients, line, ..
                } if recipients.iter().any(|r| r == uid) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Drain everything recorded so far.
    pub fn take(&mut self) -> Vec<Sent> {
        std::mem::take(&mut self.sent)
    }
}

impl Outbound for Recorder {
    fn channel_local(
        &mut self,
        channel: &Channel,
        clients: &ClientTable,
        delivery: &Delivery<'_>,
        line: &str,
    ) {
        self.sent.push(Sent::Local {
            channel: channel.name.clone(),
            recipients: delivery.recipients(channel, clients),
            line: line.to_string(),
        });
    }

    fn servers(&mut self, except: Option<LinkId>, line: &str) {
        self.sent.push(Sent::Server {
            except,
            line: line.to_string(),
        });
    }

    fn opers(&mut self, level: NoticeLevel, text: &str) {
        self.sent.push(Sent::Oper {
            level,
            text: text.to_string(),
        });
    }
}
