//! Timestamp conflict resolution for SJOIN.
//!
//! [`resolve`] is a pure function of the stored channel state and the
//! incoming burst. The caller applies the returned [`Resolution`]; nothing
//! here touches the network.

use crate::state::mode::{Mode, ModeDelta};

/// Channel timestamps below this are treated as corrupt when
/// `ignore_bogus_ts` is enabled. Also the value they are clamped to.
pub const BOGUS_TS_FLOOR: u64 = 800_000_000;

/// The stored side of the comparison.
#[derive(Debug, Clone, Copy)]
pub struct Local<'a> {
    /// Channel did not exist before this SJOIN.
    pub is_new: bool,
    /// Stored creation time. For a new channel, the current time.
    pub ts: u64,
    pub mode: &'a Mode,
}

/// The burst side of the comparison.
#[derive(Debug, Clone, Copy)]
pub struct Incoming<'a> {
    pub ts: u64,
    pub mode: &'a Mode,
}

/// What the SJOIN does to the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Incoming timestamp after the bogus-TS clamp.
    pub newts: u64,
    /// Timestamp carried by the relayed SJOIN.
    pub tstosend: u64,
    /// Creation time to store.
    pub creation: u64,
    /// Our modes, status flags, lists and topic survive.
    pub keep_our_modes: bool,
    /// The burst's modes and status flags are honoured.
    pub keep_new_modes: bool,
    /// Final channel mode.
    pub mode: Mode,
    /// Change from the stored mode to [`mode`](Self::mode).
    pub delta: ModeDelta,
    /// Claimed timestamp that was clamped, if any.
    pub bogus: Option<u64>,
    /// An established channel is being reset to TS 0.
    pub zero_reset: bool,
}

impl Resolution {
    /// The burst was older: our side lost and must be wiped.
    pub fn lost_ts(&self) -> bool {
        !self.keep_our_modes
    }
}

pub fn resolve(local: Local<'_>, incoming: Incoming<'_>, ignore_bogus_ts: bool) -> Resolution {
    let oldts = local.ts;
    let mut newts = incoming.ts;
    let mut bogus = None;
    let mut zero_reset = false;

    if ignore_bogus_ts {
        if newts < BOGUS_TS_FLOOR {
            bogus = Some(newts);
            newts = if oldts == 0 { 0 } else { BOGUS_TS_FLOOR };
        }
    } else {
        zero_reset = newts == 0 && !local.is_new && oldts != 0;
    }

    let mut keep_our_modes = true;
    let mut keep_new_modes = true;
    let (creation, tstosend) = if local.is_new {
        (newts, newts)
    } else if newts == 0 || oldts == 0 {
        (0, 0)
    } else if newts == oldts {
        (oldts, oldts)
    } else if newts < oldts {
        keep_our_modes = false;
        (newts, newts)
    } else {
        keep_new_modes = false;
        (oldts, oldts)
    };

    let mode = if !keep_new_modes {
        local.mode.clone()
    } else if keep_our_modes {
        incoming.mode.merge(local.mode)
    } else {
        incoming.mode.clone()
    };
    let delta = ModeDelta::diff(&mode, local.mode);

    Resolution {
        newts,
        tstosend,
        creation,
        keep_our_modes,
        keep_new_modes,
        mode,
        delta,
        bogus,
        zero_reset,
    }
}
