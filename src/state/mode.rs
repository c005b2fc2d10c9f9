//! Channel mode values and the mode differencer.
//!
//! A [`Mode`] is a plain value: a bitset of simple flags, a member limit
//! (`0` = unset) and a key (empty = unset). Deltas between two snapshots are
//! computed by walking [`CMODE_TAB`] so the emitted letter order is the same
//! on every server.

use bitflags::bitflags;
use thiserror::Error;

/// Maximum key length kept from the wire; longer keys are truncated.
pub const KEYLEN: usize = 23;

bitflags! {
    /// Simple (parameterless) channel modes.
    #[derive(Default)]
    pub struct ModeFlags: u32 {
        const NO_CTRL        = 0x0000_0001; // c
        const INVITE_ONLY    = 0x0000_0002; // i
        const MODERATED      = 0x0000_0004; // m
        const NO_EXTERNAL    = 0x0000_0008; // n
        const PRIVATE        = 0x0000_0010; // p
        const REGISTERED     = 0x0000_0020; // r
        const SECRET         = 0x0000_0040; // s
        const TOPIC_LOCK     = 0x0000_0080; // t
        const HIDE_BMASKS    = 0x0000_0100; // u
        const NO_CTCP        = 0x0000_0200; // C
        const EXT_LIMIT      = 0x0000_0400; // L
        const MOD_REG        = 0x0000_0800; // M
        const NO_NICK_CHANGE = 0x0000_1000; // N
        const OPER_ONLY      = 0x0000_2000; // O
        const REG_ONLY       = 0x0000_4000; // R
        const TLS_ONLY       = 0x0000_8000; // S
        const NO_NOTICE      = 0x0001_0000; // T
    }
}

/// Canonical mode-letter table. Every rendering of flags walks this in order.
pub const CMODE_TAB: &[(char, ModeFlags)] = &[
    ('c', ModeFlags::NO_CTRL),
    ('i', ModeFlags::INVITE_ONLY),
    ('m', ModeFlags::MODERATED),
    ('n', ModeFlags::NO_EXTERNAL),
    ('p', ModeFlags::PRIVATE),
    ('r', ModeFlags::REGISTERED),
    ('s', ModeFlags::SECRET),
    ('t', ModeFlags::TOPIC_LOCK),
    ('u', ModeFlags::HIDE_BMASKS),
    ('C', ModeFlags::NO_CTCP),
    ('L', ModeFlags::EXT_LIMIT),
    ('M', ModeFlags::MOD_REG),
    ('N', ModeFlags::NO_NICK_CHANGE),
    ('O', ModeFlags::OPER_ONLY),
    ('R', ModeFlags::REG_ONLY),
    ('S', ModeFlags::TLS_ONLY),
    ('T', ModeFlags::NO_NOTICE),
];

impl ModeFlags {
    /// Look up the flag for a mode letter.
    pub fn from_letter(c: char) -> Option<ModeFlags> {
        CMODE_TAB
            .iter()
            .find(|(letter, _)| *letter == c)
            .map(|(_, flag)| *flag)
    }

    /// Letters for the set flags, in table order.
    pub fn letters(self) -> String {
        CMODE_TAB
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(letter, _)| *letter)
            .collect()
    }
}

/// Errors while reading a mode string off the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeParseError {
    #[error("missing parameter for mode {0}")]
    MissingParam(char),
}

/// A channel mode snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mode {
    pub flags: ModeFlags,
    /// Member limit, `0` when unset.
    pub limit: u32,
    /// Channel key, empty when unset.
    pub key: String,
}

impl Mode {
    /// Parse a burst mode string (`+ntk`, `ntl`, or the `0` placeholder).
    ///
    /// `k` and `l` each consume the next entry of `params`. Returns the mode
    /// and how many parameters were consumed. Unknown letters are ignored.
    pub fn parse(letters: &str, params: &[String]) -> Result<(Mode, usize), ModeParseError> {
        let mut mode = Mode::default();
        let mut used = 0;

        for c in letters.chars() {
            match c {
                'k' => {
                    let key = params.get(used).ok_or(ModeParseError::MissingParam('k'))?;
                    mode.key = key.chars().take(KEYLEN).collect();
                    used += 1;
                }
                'l' => {
                    let limit = params.get(used).ok_or(ModeParseError::MissingParam('l'))?;
                    mode.limit = limit.parse().unwrap_or(0);
                    used += 1;
                }
                other => {
                    if let Some(flag) = ModeFlags::from_letter(other) {
                        mode.flags |= flag;
                    }
                }
            }
        }

        Ok((mode, used))
    }

    /// Equal-timestamp merge: union of flags, larger limit, and the
    /// lexicographically smaller of the two non-empty keys.
    pub fn merge(&self, other: &Mode) -> Mode {
        let key = match (self.key.is_empty(), other.key.is_empty()) {
            (true, _) => other.key.clone(),
            (_, true) => self.key.clone(),
            _ => self.key.as_str().min(other.key.as_str()).to_string(),
        };

        Mode {
            flags: self.flags | other.flags,
            limit: self.limit.max(other.limit),
            key,
        }
    }

    /// Full mode string and parameters as carried in an SJOIN burst,
    /// e.g. `("+ntlk", ["10", "secret"])`. An empty mode renders as `+`.
    pub fn to_burst(&self) -> (String, Vec<String>) {
        let mut letters = String::from("+");
        let mut params = Vec::new();

        letters.push_str(&self.flags.letters());
        if self.limit != 0 {
            letters.push('l');
            params.push(self.limit.to_string());
        }
        if !self.key.is_empty() {
            letters.push('k');
            params.push(self.key.clone());
        }

        (letters, params)
    }
}

/// Difference between two mode snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeDelta {
    pub added: ModeFlags,
    pub removed: ModeFlags,
    pub added_limit: Option<u32>,
    pub removed_limit: Option<u32>,
    pub added_key: Option<String>,
    pub removed_key: Option<String>,
}

impl ModeDelta {
    /// Compute what must change to turn `old` into `new`.
    ///
    /// The limit counts as removed only when `old` had one and `new` has
    /// none; it counts as added when `new` is set and differs. The key
    /// follows the same rule.
    pub fn diff(new: &Mode, old: &Mode) -> ModeDelta {
        ModeDelta {
            added: new.flags - old.flags,
            removed: old.flags - new.flags,
            added_limit: (new.limit != 0 && new.limit != old.limit).then_some(new.limit),
            removed_limit: (old.limit != 0 && new.limit == 0).then_some(old.limit),
            added_key: (!new.key.is_empty() && new.key != old.key).then(|| new.key.clone()),
            removed_key: (!old.key.is_empty() && new.key.is_empty()).then(|| old.key.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.added_limit.is_none()
            && self.removed_limit.is_none()
            && self.added_key.is_none()
            && self.removed_key.is_none()
    }

    /// Render as a MODE change, e.g. `("-n+tk", ["key"])`.
    ///
    /// Removals come first. A removed key carries the old key as its
    /// parameter; a removed limit carries none. Returns an empty string
    /// when nothing changed.
    pub fn render(&self) -> (String, Vec<String>) {
        let mut letters = String::new();
        let mut params = Vec::new();

        let removing = !self.removed.is_empty()
            || self.removed_limit.is_some()
            || self.removed_key.is_some();
        if removing {
            letters.push('-');
            letters.push_str(&self.removed.letters());
            if self.removed_limit.is_some() {
                letters.push('l');
            }
            if let Some(key) = &self.removed_key {
                letters.push('k');
                params.push(key.clone());
            }
        }

        let adding =
            !self.added.is_empty() || self.added_limit.is_some() || self.added_key.is_some();
        if adding {
            letters.push('+');
            letters.push_str(&self.added.letters());
            if let Some(limit) = self.added_limit {
                letters.push('l');
                params.push(limit.to_string());
            }
            if let Some(key) = &self.added_key {
                letters.push('k');
                params.push(key.clone());
            }
        }

        (letters, params)
    }
}
