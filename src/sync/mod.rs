//! Channel state synchronization (SJOIN).
//!
//! An inbound SJOIN is handled in three steps:
//! 1. [`resolve`](resolve::resolve) compares timestamps and plans the final
//!    channel mode without touching state.
//! 2. The plan is applied: a losing side is wiped, the mode delta goes to
//!    local members, and the member list is merged.
//! 3. The burst is re-framed and relayed to every other server.
//!
//! A burst whose relay header, or any of whose members, would not fit a line
//! is rejected before any state changes.

pub mod burst;
pub mod frame;
pub mod merge;
pub mod resolve;

use crate::error::HandlerError;
use crate::send::{Delivery, NoticeLevel, Outbound};
use crate::state::channel::{Channel, ListKind, MemberModes, check_name};
use crate::state::client::{ClientTable, ServerLink};
use crate::state::mode::Mode;
use crate::state::network::Network;
use frame::{ModeBatch, SjoinFramer};
use merge::{MergeOptions, merge_members, parse_members};
use resolve::{Incoming, Local, Resolution, resolve};
use tracing::{debug, info};

/// A parsed SJOIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sjoin {
    pub ts: u64,
    pub channel: String,
    /// Mode letters as received; `0` means none.
    pub mode_letters: String,
    pub mode: Mode,
    /// Space-separated, status-prefixed member identities.
    pub members: String,
}

/// What processing an SJOIN did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SjoinOutcome {
    pub resolution: Resolution,
    pub joined: usize,
    pub skipped: usize,
    /// Lines relayed to other servers.
    pub relayed: usize,
    /// The channel was created by this burst and ended up empty.
    pub destroyed: bool,
}

/// Process an SJOIN from `source`.
pub fn process_sjoin(
    net: &mut Network,
    out: &mut dyn Outbound,
    source: &ServerLink,
    sjoin: &Sjoin,
    now: i64,
) -> Result<SjoinOutcome, HandlerError> {
    let via = net
        .servers
        .by_link(source.link)
        .map_or_else(|| source.name.clone(), |s| s.name.clone());

    if !check_name(&sjoin.channel) {
        out.opers(
            NoticeLevel::Debug,
            &format!(
                "*** Too long or invalid channel name from {}(via {via}): {}",
                source.name, sjoin.channel
            ),
        );
        return Err(HandlerError::InvalidChannel(sjoin.channel.clone()));
    }

    let existing = net.channels.find(&sjoin.channel);
    let is_new = existing.is_none();
    let oldts = existing.map_or_else(|| u64::try_from(now).unwrap_or(0), |c| c.created);
    let old_mode = existing.map(|c| c.mode.clone()).unwrap_or_default();
    let old_name = existing.map(|c| c.name.clone());

    let res = resolve(
        Local {
            is_new,
            ts: oldts,
            mode: &old_mode,
        },
        Incoming {
            ts: sjoin.ts,
            mode: &sjoin.mode,
        },
        net.settings.ignore_bogus_ts,
    );

    // Name the channel will carry once the burst is applied.
    let name = match old_name {
        Some(old) if res.keep_our_modes => old,
        _ => sjoin.channel.clone(),
    };

    let (relay_modes, relay_params) = if res.keep_new_modes && !sjoin.mode_letters.starts_with('0') {
        res.mode.to_burst()
    } else {
        ("0".to_string(), Vec::new())
    };
    let mut framer = match SjoinFramer::new(
        &source.sid,
        res.tstosend,
        &name,
        &relay_modes,
        &relay_params,
    ) {
        Ok(framer) => framer,
        Err(err) => {
            out.opers(
                NoticeLevel::Server,
                &format!("Long SJOIN from server: {}(via {via}) (ignored)", source.name),
            );
            return Err(HandlerError::LongSjoin {
                channel: name,
                source: err,
            });
        }
    };

    // Every member this burst would relay must fit a line of its own.
    for (flags, ident) in parse_members(&sjoin.members) {
        let Some(client) = net.clients.find_person(ident) else {
            continue;
        };
        if client.from != source.link {
            continue;
        }
        let flags = if res.keep_new_modes { flags } else { MemberModes::default() };
        if let Err(err) = framer.check_member(flags, &client.uid) {
            out.opers(
                NoticeLevel::Server,
                &format!("Long SJOIN member from server: {}(via {via}) (ignored)", source.name),
            );
            return Err(HandlerError::LongSjoin {
                channel: name,
                source: err,
            });
        }
    }

    let Network {
        me,
        settings,
        channels,
        clients,
        ..
    } = net;
    let announcer = if settings.hide_servers || source.hidden {
        me.name.as_str()
    } else {
        source.name.as_str()
    };

    let channel = channels.make(&sjoin.channel, res.creation);

    if let Some(claimed) = res.bogus {
        out.opers(
            NoticeLevel::Debug,
            &format!(
                "*** Bogus TS {claimed} on {} ignored from {}(via {via})",
                channel.name, source.name
            ),
        );
    }
    if res.zero_reset {
        out.channel_local(
            channel,
            clients,
            &Delivery::all(),
            &format!(
                ":{} NOTICE {name} :*** Notice -- TS for {name} changed from {oldts} to 0",
                me.name
            ),
        );
        out.opers(
            NoticeLevel::Server,
            &format!(
                "Server {} changing TS on {name} from {oldts} to 0",
                source.name
            ),
        );
    }

    channel.created = res.creation;
    channel.mode = res.mode.clone();

    if res.lost_ts() {
        channel.name = name.clone();
        wipe_our_side(
            channel,
            clients,
            out,
            Wipe {
                announcer,
                source_name: &source.name,
                me: &me.name,
                max_mode_params: settings.max_mode_params,
                oldts,
                newts: res.newts,
            },
        );
    }

    let (letters, params) = res.delta.render();
    if !letters.is_empty() {
        let mut line = format!(":{announcer} MODE {} {letters}", channel.name);
        for param in &params {
            line.push(' ');
            line.push_str(param);
        }
        out.channel_local(channel, clients, &Delivery::all(), &line);
    }

    let merged = merge_members(
        channel,
        clients,
        out,
        &sjoin.members,
        &MergeOptions {
            link: source.link,
            keep_new_modes: res.keep_new_modes,
            announcer,
            max_mode_params: settings.max_mode_params,
            now,
        },
    );

    let mut outcome = SjoinOutcome {
        resolution: res,
        joined: merged.joined,
        skipped: merged.skipped,
        relayed: 0,
        destroyed: false,
    };

    if is_new && channel.members.is_empty() {
        debug!(channel = %name, "SJOIN left new channel empty, destroying");
        channels.destroy(&name);
        outcome.destroyed = true;
        return Ok(outcome);
    }

    if sjoin.members.is_empty() {
        return Ok(outcome);
    }

    for (modes, uid) in &merged.members {
        framer.push_member(*modes, uid).map_err(|source| HandlerError::LongSjoin {
            channel: name.clone(),
            source,
        })?;
    }
    for line in framer.finish() {
        out.servers(Some(source.link), &line);
        outcome.relayed += 1;
    }

    info!(
        channel = %name,
        source = %source.sid,
        ts = outcome.resolution.tstosend,
        joined = outcome.joined,
        lost_ts = outcome.resolution.lost_ts(),
        "SJOIN processed"
    );
    Ok(outcome)
}

struct Wipe<'a> {
    announcer: &'a str,
    source_name: &'a str,
    me: &'a str,
    max_mode_params: usize,
    oldts: u64,
    newts: u64,
}

/// Our side lost the TS: strip status, empty the lists, drop invites and
/// the topic, then tell local members.
fn wipe_our_side(channel: &mut Channel, clients: &ClientTable, out: &mut dyn Outbound, w: Wipe<'_>) {
    let mut lines = Vec::new();

    for letter in ['o', 'h', 'v'] {
        let mut batch = ModeBatch::new(w.announcer, &channel.name, '-', w.max_mode_params);
        for (uid, modes) in channel.members.iter_mut() {
            if modes.clear(letter) {
                let nick = clients.get(uid).map_or(uid.as_str(), |c| c.nick.as_str());
                batch.push(letter, nick, &mut lines);
            }
        }
        batch.finish(&mut lines);
    }

    // Masks go out under the source's real name even when servers are hidden.
    for kind in ListKind::ALL {
        let entries = std::mem::take(channel.list_mut(kind));
        let mut batch = ModeBatch::new(w.source_name, &channel.name, '-', w.max_mode_params);
        for entry in &entries {
            batch.push(kind.letter(), &entry.mask, &mut lines);
        }
        batch.finish(&mut lines);
    }

    channel.invites.clear();

    if channel.topic.take().is_some() {
        lines.push(format!(":{} TOPIC {} :", w.announcer, channel.name));
    }

    lines.push(format!(
        ":{me} NOTICE {chan} :*** Notice -- TS for {chan} changed from {old} to {new}",
        me = w.me,
        chan = channel.name,
        old = w.oldts,
        new = w.newts,
    ));

    for line in &lines {
        out.channel_local(channel, clients, &Delivery::all(), line);
    }
    debug!(channel = %channel.name, old = w.oldts, new = w.newts, "Lost TS, local modes reset");
}
