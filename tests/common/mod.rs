//! Integration test common infrastructure.
//!
//! A [`TestNode`] is one server's view of the network driven through the
//! command registry exactly the way `tsyncd` drives it, with a [`Recorder`]
//! capturing whatever each line emits.

#![allow(dead_code)]

use slircd_tsync::HandlerResult;
use slircd_tsync::config::Config;
use slircd_tsync::handlers::{Context, Registry};
use slircd_tsync::message::RawMessage;
use slircd_tsync::send::Recorder;
use slircd_tsync::state::channel::MemberModes;
use slircd_tsync::state::client::{Client, LinkId};
use slircd_tsync::state::mode::Mode;
use slircd_tsync::state::network::Network;
use std::collections::{BTreeMap, HashSet};

/// Default clock for test nodes.
pub const T0: i64 = 1_700_000_000;

pub struct TestNode {
    pub net: Network,
    pub registry: Registry,
    pub now: i64,
}

impl TestNode {
    /// A server named `name` with SID `sid`, linked to each `(name, sid)`
    /// peer in order. `extra` is spliced into the `[general]` table.
    pub fn new(name: &str, sid: &str, peers: &[(&str, &str)], extra: &str) -> Self {
        let mut toml = format!(
            "[server]\nname = \"{name}\"\nsid = \"{sid}\"\n\n[general]\n{extra}\n"
        );
        for (peer, peer_sid) in peers {
            toml.push_str(&format!(
                "\n[[link]]\nname = \"{peer}\"\nsid = \"{peer_sid}\"\n"
            ));
        }
        let config: Config = toml::from_str(&toml).expect("test config parses");
        config.validate().expect("test config is valid");

        Self {
            net: Network::from_config(&config),
            registry: Registry::new(),
            now: T0,
        }
    }

    /// Feed one protocol line, returning the handler result and what it emitted.
    pub fn try_feed(&mut self, line: &str) -> (HandlerResult, Recorder) {
        let mut rec = Recorder::new();
        let msg: RawMessage = line.parse().expect("test line parses");
        let mut ctx = Context {
            net: &mut self.net,
            out: &mut rec,
            now: self.now,
        };
        let result = self.registry.dispatch(&mut ctx, &msg);
        (result, rec)
    }

    /// Feed one protocol line that must be accepted.
    pub fn feed(&mut self, line: &str) -> Recorder {
        let (result, rec) = self.try_feed(line);
        if let Err(err) = result {
            panic!("line rejected ({err}): {line}");
        }
        rec
    }

    /// Introduce a client of `sid` (our own SID makes it local).
    pub fn introduce(&mut self, sid: &str, uid: &str, nick: &str) {
        self.feed(&format!(
            ":{sid} UID {nick} 1 {T0} +i {nick} {nick}.example.net 192.0.2.1 {uid} * :{nick} real"
        ));
    }

    /// Introduce a local client that negotiated `caps`.
    pub fn local_with_caps(&mut self, uid: &str, nick: &str, caps: &[&str]) {
        let sid = self.net.me.sid.clone();
        self.introduce(&sid, uid, nick);
        let client = self.net.clients.get_mut(uid).expect("just introduced");
        client.caps = caps.iter().map(|c| c.to_string()).collect::<HashSet<_>>();
    }

    /// Create a channel directly, as local joins would have.
    pub fn seed_channel(&mut self, name: &str, ts: u64, modes: &str, members: &[(&str, &str)]) {
        let mode = Mode::parse(modes, &[]).expect("seed modes parse").0;
        let now = self.now;
        let chan = self.net.channels.make(name, ts);
        chan.mode = mode;
        for (prefix, uid) in members {
            let (status, _) = MemberModes::split_prefix(prefix);
            chan.add_member(uid, status, false, now);
        }
    }

    pub fn link(&self, sid: &str) -> LinkId {
        self.net.servers.get(sid).expect("known link").link
    }

    pub fn client(&self, uid: &str) -> &Client {
        self.net.clients.get(uid).expect("known client")
    }

    /// Everything that matters for convergence: TS, mode and member flags.
    pub fn snapshot(&self, channel: &str) -> Option<ChannelSnapshot> {
        let chan = self.net.channels.find(channel)?;
        Some(ChannelSnapshot {
            created: chan.created,
            mode: chan.mode.clone(),
            members: chan.members.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSnapshot {
    pub created: u64,
    pub mode: Mode,
    pub members: BTreeMap<String, MemberModes>,
}

/// A hub `irc.test` (00A) with two leaves behind it: `a.test` (00B) and
/// `b.test` (00C), each with one client.
pub fn hub_with_two_leaves() -> TestNode {
    let mut hub = TestNode::new("irc.test", "00A", &[("a.test", "00B"), ("b.test", "00C")], "");
    hub.introduce("00A", "00AAAAAAA", "local");
    hub.introduce("00B", "00BAAAAAA", "bee");
    hub.introduce("00C", "00CAAAAAA", "cee");
    hub
}
