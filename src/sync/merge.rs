//! Membership merge for SJOIN member lists.

use super::frame::ModeBatch;
use crate::send::{Delivery, Outbound};
use crate::state::channel::{Channel, MemberModes};
use crate::state::client::{Client, ClientTable, LinkId, Uid, caps};
use tracing::debug;

/// Split a burst member list into `(status, identity)` pairs.
/// Runs of spaces are tolerated.
pub fn parse_members(list: &str) -> impl Iterator<Item = (MemberModes, &str)> {
    list.split(' ')
        .filter(|token| !token.is_empty())
        .map(MemberModes::split_prefix)
}

/// How to merge one member list.
#[derive(Debug, Clone, Copy)]
pub struct MergeOptions<'a> {
    /// Link the burst arrived on. Members must be reachable through it.
    pub link: LinkId,
    /// Honour the status flags the burst carries.
    pub keep_new_modes: bool,
    /// Source name shown on the `+ohv` MODE lines.
    pub announcer: &'a str,
    pub max_mode_params: usize,
    pub now: i64,
}

/// Outcome of a merge.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Merged {
    /// Accepted members in arrival order, with the status to relay.
    pub members: Vec<(MemberModes, Uid)>,
    /// Members newly added to the channel.
    pub joined: usize,
    /// Tokens dropped as unknown or arriving from the wrong direction.
    pub skipped: usize,
}

/// Merge `list` into `channel`, announcing joins and status changes to
/// local members.
pub fn merge_members(
    channel: &mut Channel,
    clients: &ClientTable,
    out: &mut dyn Outbound,
    list: &str,
    opts: &MergeOptions<'_>,
) -> Merged {
    let mut merged = Merged::default();
    let have_many = parse_members(list).nth(1).is_some();
    let mut batch = ModeBatch::new(opts.announcer, &channel.name, '+', opts.max_mode_params);
    let mut mode_lines = Vec::new();

    for (flags, ident) in parse_members(list) {
        let Some(client) = clients.find_person(ident) else {
            debug!(channel = %channel.name, member = %ident, "Skipping unknown SJOIN member");
            merged.skipped += 1;
            continue;
        };
        if client.from != opts.link {
            debug!(
                channel = %channel.name,
                member = %ident,
                "Skipping SJOIN member from the wrong direction"
            );
            merged.skipped += 1;
            continue;
        }

        let flags = if opts.keep_new_modes {
            flags
        } else {
            MemberModes::default()
        };
        merged.members.push((flags, client.uid.clone()));

        let gained = match channel.members.get_mut(&client.uid) {
            Some(current) => {
                let gained = flags.without(current);
                current.union(&flags);
                gained
            }
            None => {
                channel.add_member(&client.uid, flags, !have_many, opts.now);
                merged.joined += 1;
                announce_join(channel, clients, out, client);
                flags
            }
        };

        for letter in gained.letters() {
            batch.push(letter, &client.nick, &mut mode_lines);
        }
        // Full batches go out as soon as they fill.
        for line in mode_lines.drain(..) {
            out.channel_local(channel, clients, &Delivery::all(), &line);
        }
    }

    batch.finish(&mut mode_lines);
    for line in mode_lines {
        out.channel_local(channel, clients, &Delivery::all(), &line);
    }

    merged
}

/// JOIN (shaped by `extended-join`) and, for an away joiner, AWAY to
/// `away-notify` members.
fn announce_join(channel: &Channel, clients: &ClientTable, out: &mut dyn Outbound, joiner: &Client) {
    let mask = joiner.hostmask();
    let account = joiner.account.as_deref().unwrap_or("*");

    out.channel_local(
        channel,
        clients,
        &Delivery::with_cap(caps::EXTENDED_JOIN),
        &format!(":{mask} JOIN {} {account} :{}", channel.name, joiner.realname),
    );
    out.channel_local(
        channel,
        clients,
        &Delivery::without_cap(caps::EXTENDED_JOIN),
        &format!(":{mask} JOIN :{}", channel.name),
    );

    if let Some(away) = &joiner.away {
        out.channel_local(
            channel,
            clients,
            &Delivery::with_cap(caps::AWAY_NOTIFY).skipping(&joiner.uid),
            &format!(":{mask} AWAY :{away}"),
        );
    }
}
