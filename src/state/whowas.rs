//! WHOWAS history cache.
//!
//! A bounded pool of former-identity records. Every record sits on a global
//! recency chain (newest at the head, oldest at the tail) and on a hash
//! bucket chain keyed by nick. Records created by a nick change also keep a
//! non-owning [`Uid`] back-reference to the client still using that
//! identity; [`WhowasCache::detach`] nulls it when the client goes away.
//!
//! Slots are recycled in place: once the pool is at capacity the oldest
//! record is unlinked and its slot reused, so inserts never grow the pool.

use super::client::{Client, Uid};
use crate::casemap::{irc_eq, strhash};
use std::collections::HashMap;

/// Number of nick hash buckets.
pub const WHOWAS_HASH_SIZE: usize = 4096;

/// A former identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhowasRecord {
    pub nick: String,
    pub account: Option<String>,
    pub username: String,
    pub hostname: String,
    pub sockhost: String,
    pub realname: String,
    pub servername: String,
    pub server_hidden: bool,
    /// When the identity was given up (Unix seconds).
    pub logoff: i64,
    /// Bucket this record is chained on.
    pub hashv: usize,
    /// Client still using this identity under another nick, if any.
    pub online: Option<Uid>,
}

impl WhowasRecord {
    fn heap_bytes(&self) -> usize {
        self.nick.capacity()
            + self.account.as_ref().map_or(0, String::capacity)
            + self.username.capacity()
            + self.hostname.capacity()
            + self.sockhost.capacity()
            + self.realname.capacity()
            + self.servername.capacity()
            + self.online.as_ref().map_or(0, String::capacity)
    }
}

#[derive(Debug)]
struct Slot {
    record: WhowasRecord,
    newer: Option<usize>,
    older: Option<usize>,
    bucket_prev: Option<usize>,
    bucket_next: Option<usize>,
}

/// The WHOWAS cache.
#[derive(Debug)]
pub struct WhowasCache {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    buckets: Vec<Option<usize>>,
    by_client: HashMap<Uid, Vec<usize>>,
    len: usize,
    history_length: usize,
}

impl WhowasCache {
    pub fn new(history_length: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            buckets: vec![None; WHOWAS_HASH_SIZE],
            by_client: HashMap::new(),
            len: 0,
            history_length,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn history_length(&self) -> usize {
        self.history_length
    }

    /// Change the capacity and trim down to it.
    pub fn set_history_length(&mut self, history_length: usize) {
        self.history_length = history_length;
        self.trim();
    }

    /// Snapshot `client`'s current identity.
    ///
    /// `online` is set for nick changes: the record then points back at the
    /// client until [`detach`](Self::detach) is called. On exit pass `false`.
    pub fn record(&mut self, client: &Client, online: bool, now: i64) {
        let Some(idx) = self.make() else {
            return;
        };

        let hashv = strhash(&client.nick, WHOWAS_HASH_SIZE);
        let record = WhowasRecord {
            nick: client.nick.clone(),
            account: client.account.clone(),
            username: client.user.clone(),
            hostname: client.host.clone(),
            sockhost: client.sockhost.clone(),
            realname: client.realname.clone(),
            servername: client.server.clone(),
            server_hidden: client.server_hidden,
            logoff: now,
            hashv,
            online: online.then(|| client.uid.clone()),
        };

        if online {
            self.by_client.entry(client.uid.clone()).or_default().push(idx);
        }

        let bucket_head = self.buckets[hashv];
        let newer_than = self.head;
        self.slots[idx] = Some(Slot {
            record,
            newer: None,
            older: newer_than,
            bucket_prev: None,
            bucket_next: bucket_head,
        });

        match newer_than {
            Some(old_head) => self.relink(old_head, |s| s.newer = Some(idx)),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);

        if let Some(next) = bucket_head {
            self.relink(next, |s| s.bucket_prev = Some(idx));
        }
        self.buckets[hashv] = Some(idx);

        self.len += 1;
    }

    /// Drop oldest records until the cache is within its capacity.
    pub fn trim(&mut self) {
        while self.len > self.history_length {
            let Some(oldest) = self.tail else {
                return;
            };
            self.unlink(oldest);
            self.free.push(oldest);
        }
    }

    /// Null the back-reference on every record pointing at `uid`.
    /// The records themselves stay.
    pub fn detach(&mut self, uid: &str) {
        let Some(indices) = self.by_client.remove(uid) else {
            return;
        };
        for idx in indices {
            if let Some(slot) = self.slots[idx].as_mut() {
                slot.record.online = None;
            }
        }
    }

    /// Find the client that used `name` no more than `max_age` seconds ago
    /// and is still online under another nick.
    pub fn lookup(&self, name: &str, max_age: i64, now: i64) -> Option<&Uid> {
        let oldest_allowed = now.saturating_sub(max_age);
        self.bucket_iter(name)
            .filter(|r| r.logoff >= oldest_allowed)
            .find_map(|r| r.online.as_ref())
    }

    /// All records for `name`, newest first.
    pub fn history<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a WhowasRecord> + 'a {
        self.bucket_iter(name)
    }

    /// Record count and approximate memory footprint in bytes.
    pub fn memory_stats(&self) -> (usize, usize) {
        let heap: usize = self
            .slots
            .iter()
            .flatten()
            .map(|slot| slot.record.heap_bytes())
            .sum();
        (self.len, self.len * std::mem::size_of::<Slot>() + heap)
    }

    fn bucket_iter<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a WhowasRecord> + use<'a, 'n> {
        let mut cursor = self.buckets[strhash(name, WHOWAS_HASH_SIZE)];
        std::iter::from_fn(move || {
            let slot = self.slots[cursor?].as_ref()?;
            cursor = slot.bucket_next;
            Some(&slot.record)
        })
        .filter(move |r| irc_eq(&r.nick, name))
    }

    /// Get a slot for a new record, recycling the oldest at capacity.
    fn make(&mut self) -> Option<usize> {
        if self.history_length == 0 {
            return None;
        }
        if self.len >= self.history_length {
            let oldest = self.tail?;
            self.unlink(oldest);
            return Some(oldest);
        }
        Some(self.free.pop().unwrap_or_else(|| {
            self.slots.push(None);
            self.slots.len() - 1
        }))
    }

    fn relink(&mut self, idx: usize, update: impl FnOnce(&mut Slot)) {
        if let Some(slot) = self.slots.get_mut(idx).and_then(Option::as_mut) {
            update(slot);
        }
    }

    /// Take the record at `idx` off every chain and leave the slot vacant.
    fn unlink(&mut self, idx: usize) {
        let Some(slot) = self.slots[idx].take() else {
            return;
        };

        match slot.newer {
            Some(newer) => self.relink(newer, |s| s.older = slot.older),
            None => self.head = slot.older,
        }
        match slot.older {
            Some(older) => self.relink(older, |s| s.newer = slot.newer),
            None => self.tail = slot.newer,
        }

        match slot.bucket_prev {
            Some(prev) => self.relink(prev, |s| s.bucket_next = slot.bucket_next),
            None => self.buckets[slot.record.hashv] = slot.bucket_next,
        }
        if let Some(next) = slot.bucket_next {
            self.relink(next, |s| s.bucket_prev = slot.bucket_prev);
        }

        if let Some(uid) = &slot.record.online {
            if let Some(indices) = self.by_client.get_mut(uid) {
                indices.retain(|&i| i != idx);
                if indices.is_empty() {
                    self.by_client.remove(uid);
                }
            }
        }

        self.len -= 1;
    }
}
