//! Client and server-link records.

use crate::casemap::irc_to_lower;
use std::collections::{HashMap, HashSet};

/// Unique identifier for a user (TS6 UID string).
pub type Uid = String;

/// TS6 UID length: a 3-character SID followed by 6 characters.
pub const UIDLEN: usize = 9;

/// Capability names that change how channel traffic is shaped.
pub mod caps {
    pub const EXTENDED_JOIN: &str = "extended-join";
    pub const AWAY_NOTIFY: &str = "away-notify";
}

/// Identifies the directly connected link a client or server is reached
/// through. Local clients sit behind [`LinkId::LOCAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u32);

impl LinkId {
    pub const LOCAL: LinkId = LinkId(0);
}

/// A user on the network.
#[derive(Debug, Clone)]
pub struct Client {
    pub uid: Uid,
    pub nick: String,
    pub user: String,
    /// Visible hostname.
    pub host: String,
    /// Real socket address as text.
    pub sockhost: String,
    pub account: Option<String>,
    pub realname: String,
    /// Name of the server the client is attached to.
    pub server: String,
    /// Whether that server is hidden from users.
    pub server_hidden: bool,
    pub away: Option<String>,
    /// Negotiated capabilities (local clients only).
    pub caps: HashSet<String>,
    /// Link this client is reachable through.
    pub from: LinkId,
}

impl Client {
    pub fn is_local(&self) -> bool {
        self.from == LinkId::LOCAL
    }

    pub fn has_cap(&self, cap: &str) -> bool {
        self.caps.contains(cap)
    }

    /// `nick!user@host`
    pub fn hostmask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.user, self.host)
    }
}

/// Users indexed by UID and by lowercased nick.
#[derive(Debug, Default)]
pub struct ClientTable {
    users: HashMap<Uid, Client>,
    nicks: HashMap<String, Uid>,
}

impl ClientTable {
    pub fn insert(&mut self, client: Client) {
        self.nicks.insert(irc_to_lower(&client.nick), client.uid.clone());
        self.users.insert(client.uid.clone(), client);
    }

    pub fn remove(&mut self, uid: &str) -> Option<Client> {
        let client = self.users.remove(uid)?;
        let key = irc_to_lower(&client.nick);
        if self.nicks.get(&key).is_some_and(|owner| owner == uid) {
            self.nicks.remove(&key);
        }
        Some(client)
    }

    pub fn get(&self, uid: &str) -> Option<&Client> {
        self.users.get(uid)
    }

    pub fn get_mut(&mut self, uid: &str) -> Option<&mut Client> {
        self.users.get_mut(uid)
    }

    pub fn by_nick(&self, nick: &str) -> Option<&Client> {
        self.nicks
            .get(&irc_to_lower(nick))
            .and_then(|uid| self.users.get(uid))
    }

    /// Change a client's nick, keeping the nick index consistent.
    pub fn rename(&mut self, uid: &str, new_nick: &str) -> bool {
        let Some(client) = self.users.get_mut(uid) else {
            return false;
        };
        self.nicks.remove(&irc_to_lower(&client.nick));
        client.nick = new_nick.to_string();
        self.nicks.insert(irc_to_lower(new_nick), uid.to_string());
        true
    }

    /// Resolve a burst identity token: tokens starting with a digit are
    /// UIDs, anything else is a nick.
    pub fn find_person(&self, token: &str) -> Option<&Client> {
        if token.starts_with(|c: char| c.is_ascii_digit()) {
            self.get(token)
        } else {
            self.by_nick(token)
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// A server known to this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLink {
    pub name: String,
    pub sid: String,
    /// Link the server is reached through.
    pub link: LinkId,
    /// Hidden servers are never named to users.
    pub hidden: bool,
}

/// Known servers, indexed by SID and by lowercased name.
#[derive(Debug, Default)]
pub struct ServerTable {
    by_sid: HashMap<String, ServerLink>,
    names: HashMap<String, String>,
}

impl ServerTable {
    pub fn insert(&mut self, server: ServerLink) {
        self.names.insert(irc_to_lower(&server.name), server.sid.clone());
        self.by_sid.insert(server.sid.clone(), server);
    }

    pub fn get(&self, sid: &str) -> Option<&ServerLink> {
        self.by_sid.get(sid)
    }

    /// Resolve a message prefix naming a server by SID or by name.
    pub fn find(&self, prefix: &str) -> Option<&ServerLink> {
        self.by_sid.get(prefix).or_else(|| {
            self.names
                .get(&irc_to_lower(prefix))
                .and_then(|sid| self.by_sid.get(sid))
        })
    }

    /// The directly connected server on `link`, if any.
    pub fn by_link(&self, link: LinkId) -> Option<&ServerLink> {
        self.by_sid.values().find(|s| s.link == link)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerLink> {
        self.by_sid.values()
    }
}
