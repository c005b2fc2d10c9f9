//! Channel-related types and state.

use super::client::Uid;
use super::mode::Mode;
use crate::casemap::irc_to_lower;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Maximum channel name length, prefix included.
pub const CHANNELLEN: usize = 50;

/// An entry in a list (bans, excepts, invex).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub mask: String,
    pub set_by: String,
    pub set_at: i64,
}

/// Channel topic with metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub text: String,
    pub set_by: String,
    pub set_at: i64,
}

/// Member status flags (op, halfop, voice).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemberModes {
    pub op: bool,     // +o (@)
    pub halfop: bool, // +h (%)
    pub voice: bool,  // +v (+)
}

impl MemberModes {
    /// Split the status prefix off a burst member token, e.g. `@+00AAAAAAB`.
    pub fn split_prefix(token: &str) -> (MemberModes, &str) {
        let mut modes = MemberModes::default();
        let rest = token.trim_start_matches(|c| match c {
            '@' => {
                modes.op = true;
                true
            }
            '%' => {
                modes.halfop = true;
                true
            }
            '+' => {
                modes.voice = true;
                true
            }
            _ => false,
        });
        (modes, rest)
    }

    /// All prefix characters for this member, highest first: `@%+`.
    pub fn all_prefix_chars(&self) -> String {
        let mut s = String::with_capacity(3);
        if self.op {
            s.push('@');
        }
        if self.halfop {
            s.push('%');
        }
        if self.voice {
            s.push('+');
        }
        s
    }

    /// Mode letters for the set flags, in `o`, `h`, `v` order.
    pub fn letters(&self) -> impl Iterator<Item = char> + use<> {
        [(self.op, 'o'), (self.halfop, 'h'), (self.voice, 'v')]
            .into_iter()
            .filter_map(|(set, letter)| set.then_some(letter))
    }

    pub fn is_empty(&self) -> bool {
        !(self.op || self.halfop || self.voice)
    }

    /// Flags set in `self` but not in `other`.
    pub fn without(&self, other: &MemberModes) -> MemberModes {
        MemberModes {
            op: self.op && !other.op,
            halfop: self.halfop && !other.halfop,
            voice: self.voice && !other.voice,
        }
    }

    pub fn union(&mut self, other: &MemberModes) {
        self.op |= other.op;
        self.halfop |= other.halfop;
        self.voice |= other.voice;
    }

    /// Clear the flag for a status letter, reporting whether it was set.
    pub fn clear(&mut self, letter: char) -> bool {
        let slot = match letter {
            'o' => &mut self.op,
            'h' => &mut self.halfop,
            'v' => &mut self.voice,
            _ => return false,
        };
        std::mem::replace(slot, false)
    }
}

/// Which of the three list modes a list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Ban,
    Except,
    Invex,
}

impl ListKind {
    pub const ALL: [ListKind; 3] = [ListKind::Ban, ListKind::Except, ListKind::Invex];

    pub fn letter(self) -> char {
        match self {
            ListKind::Ban => 'b',
            ListKind::Except => 'e',
            ListKind::Invex => 'I',
        }
    }
}

/// Join-rate bookkeeping, only advanced by single-member joins.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JoinStats {
    pub count: u32,
    pub last: i64,
}

/// A channel.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Name as last announced; lookups go through the lowercased key.
    pub name: String,
    /// Creation timestamp (TS), in seconds.
    pub created: u64,
    pub mode: Mode,
    pub members: BTreeMap<Uid, MemberModes>,
    pub bans: Vec<ListEntry>,
    pub excepts: Vec<ListEntry>,
    pub invex: Vec<ListEntry>,
    /// UIDs holding a pending INVITE.
    pub invites: HashSet<Uid>,
    pub topic: Option<Topic>,
    pub joins: JoinStats,
}

impl Channel {
    pub fn new(name: &str, created: u64) -> Self {
        Self {
            name: name.to_string(),
            created,
            mode: Mode::default(),
            members: BTreeMap::new(),
            bans: Vec::new(),
            excepts: Vec::new(),
            invex: Vec::new(),
            invites: HashSet::new(),
            topic: None,
            joins: JoinStats::default(),
        }
    }

    pub fn is_member(&self, uid: &str) -> bool {
        self.members.contains_key(uid)
    }

    /// Add a member. `flood_ctrl` advances the join-rate counters; bulk
    /// burst joins leave them alone.
    pub fn add_member(&mut self, uid: &str, modes: MemberModes, flood_ctrl: bool, now: i64) {
        self.members.insert(uid.to_string(), modes);
        self.invites.remove(uid);
        if flood_ctrl {
            self.joins.count = self.joins.count.saturating_add(1);
            self.joins.last = now;
        }
    }

    pub fn remove_member(&mut self, uid: &str) -> Option<MemberModes> {
        self.members.remove(uid)
    }

    pub fn list_mut(&mut self, kind: ListKind) -> &mut Vec<ListEntry> {
        match kind {
            ListKind::Ban => &mut self.bans,
            ListKind::Except => &mut self.excepts,
            ListKind::Invex => &mut self.invex,
        }
    }

    /// Add a list entry unless an identical mask is already present.
    pub fn add_list_entry(&mut self, kind: ListKind, entry: ListEntry) -> bool {
        let list = self.list_mut(kind);
        if list.iter().any(|e| e.mask == entry.mask) {
            return false;
        }
        list.push(entry);
        true
    }
}

/// Check a channel name received from a server link.
///
/// Valid names start with `#` or `&`, are at most [`CHANNELLEN`] bytes,
/// and contain no space, comma, BEL, CR, LF or NUL. Colour and formatting
/// codes are allowed.
pub fn check_name(name: &str) -> bool {
    let mut chars = name.chars();
    if !matches!(chars.next(), Some('#' | '&')) {
        return false;
    }
    if name.len() > CHANNELLEN {
        return false;
    }
    chars.all(|c| !matches!(c, ' ' | ',' | '\x07' | '\r' | '\n' | '\0'))
}

/// All channels known to this server, keyed by lowercased name.
#[derive(Debug, Default)]
pub struct ChannelTable {
    channels: HashMap<String, Channel>,
}

impl ChannelTable {
    pub fn find(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&irc_to_lower(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(&irc_to_lower(name))
    }

    /// Create a channel (or return the existing one).
    pub fn make(&mut self, name: &str, created: u64) -> &mut Channel {
        self.channels
            .entry(irc_to_lower(name))
            .or_insert_with(|| Channel::new(name, created))
    }

    pub fn destroy(&mut self, name: &str) -> Option<Channel> {
        self.channels.remove(&irc_to_lower(name))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.channels.values_mut()
    }
}
