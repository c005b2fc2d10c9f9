//! Wire framing for relayed SJOIN and locally delivered MODE lines.
//!
//! Every line built here fits in [`LINE_BUDGET`] bytes (the 512-byte IRC
//! buffer minus CRLF). Long member lists and long MODE batches are split
//! across several lines, each repeating the full header.

use crate::state::channel::MemberModes;
use thiserror::Error;

/// IRC line buffer, CRLF included.
pub const IRCD_BUFSIZE: usize = 512;
/// Content bytes available per line.
pub const LINE_BUDGET: usize = IRCD_BUFSIZE - 2;
/// Longest identity token the header check reserves room for.
pub const IDLEN: usize = 12;
/// Status prefix characters a member token can carry (`@%+`).
pub const MEMBER_PREFIX_MAX: usize = 3;
/// Parameters per MODE line.
pub const MAXMODEPARAMS: usize = 6;

/// An SJOIN header at or beyond this length cannot carry even one member.
pub const SJOIN_HEADER_LIMIT: usize = IRCD_BUFSIZE - IDLEN - 2 - MEMBER_PREFIX_MAX - 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("SJOIN header is {0} bytes, no room for members")]
    HeaderTooLong(usize),
    #[error("member token {0} does not fit an empty SJOIN line")]
    MemberTooLong(String),
}

/// A line with a fixed header and space-separated items.
///
/// [`push`](Self::push) appends only if the item (plus its separator) still
/// fits in the budget and reports whether it did.
#[derive(Debug, Clone)]
pub struct LineBuilder {
    buf: String,
    header_len: usize,
    budget: usize,
}

impl LineBuilder {
    pub fn new(header: &str, budget: usize) -> Self {
        let mut buf = String::with_capacity(budget);
        buf.push_str(header);
        Self {
            buf,
            header_len: header.len(),
            budget,
        }
    }

    /// True when no item has been appended since the last flush.
    pub fn is_empty(&self) -> bool {
        self.buf.len() == self.header_len
    }

    /// Whether `item` fits on a line holding nothing but the header.
    pub fn fits_alone(&self, item: &str) -> bool {
        self.header_len + item.len() <= self.budget
    }

    pub fn push(&mut self, item: &str) -> bool {
        let sep = usize::from(!self.is_empty());
        if self.buf.len() + sep + item.len() > self.budget {
            return false;
        }
        if sep == 1 {
            self.buf.push(' ');
        }
        self.buf.push_str(item);
        true
    }

    /// Take the current line and reset to the bare header.
    pub fn take(&mut self) -> String {
        let line = self.buf.clone();
        self.buf.truncate(self.header_len);
        line
    }
}

/// Builds the relayed `SJOIN` lines for one channel.
#[derive(Debug)]
pub struct SjoinFramer {
    line: LineBuilder,
    lines: Vec<String>,
}

impl SjoinFramer {
    /// Start framing `:<sid> SJOIN <ts> <channel> <modes> [<params> ]:<members>`.
    ///
    /// Fails when the header leaves no room for a single maximal member
    /// token; such a burst must not be relayed at all.
    pub fn new(
        sid: &str,
        ts: u64,
        channel: &str,
        modes: &str,
        params: &[String],
    ) -> Result<Self, FrameError> {
        let mut header = format!(":{sid} SJOIN {ts} {channel} {modes} ");
        for param in params {
            header.push_str(param);
            header.push(' ');
        }
        header.push(':');

        if header.len() >= SJOIN_HEADER_LIMIT {
            return Err(FrameError::HeaderTooLong(header.len()));
        }

        Ok(Self {
            line: LineBuilder::new(&header, LINE_BUDGET),
            lines: Vec::new(),
        })
    }

    /// Check that a member can be framed at all, without adding it.
    pub fn check_member(&self, modes: MemberModes, uid: &str) -> Result<(), FrameError> {
        let token = format!("{}{uid}", modes.all_prefix_chars());
        if self.line.fits_alone(&token) {
            Ok(())
        } else {
            Err(FrameError::MemberTooLong(token))
        }
    }

    /// Append a member, starting a new line when the current one is full.
    pub fn push_member(&mut self, modes: MemberModes, uid: &str) -> Result<(), FrameError> {
        self.check_member(modes, uid)?;
        let token = format!("{}{uid}", modes.all_prefix_chars());
        if !self.line.push(&token) {
            self.lines.push(self.line.take());
            self.line.push(&token);
        }
        Ok(())
    }

    /// All lines, the last one possibly carrying no members.
    pub fn finish(mut self) -> Vec<String> {
        if !self.line.is_empty() || self.lines.is_empty() {
            self.lines.push(self.line.take());
        }
        self.lines
    }
}

/// Accumulates one-parameter MODE changes of a single sign for local
/// delivery, e.g. `:srv MODE #chan -bbb a b c`.
///
/// A line is flushed before an item that would push it past the byte
/// budget, and right after it reaches `max_params` parameters.
#[derive(Debug)]
pub struct ModeBatch {
    head: String,
    sign: char,
    letters: String,
    params: Vec<String>,
    max_params: usize,
    len: usize,
}

impl ModeBatch {
    pub fn new(source: &str, channel: &str, sign: char, max_params: usize) -> Self {
        let head = format!(":{source} MODE {channel} ");
        let len = head.len() + 1;
        Self {
            head,
            sign,
            letters: String::new(),
            params: Vec::new(),
            max_params: max_params.max(1),
            len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Add `letter param`, appending any completed lines to `out`.
    pub fn push(&mut self, letter: char, param: &str, out: &mut Vec<String>) {
        let added = letter.len_utf8() + 1 + param.len();
        if !self.is_empty() && self.len + added > LINE_BUDGET {
            out.push(self.take());
        }
        self.letters.push(letter);
        self.params.push(param.to_string());
        self.len += added;
        if self.params.len() >= self.max_params {
            out.push(self.take());
        }
    }

    /// Flush whatever is left.
    pub fn finish(mut self, out: &mut Vec<String>) {
        if !self.is_empty() {
            out.push(self.take());
        }
    }

    fn take(&mut self) -> String {
        let line = format!(
            "{}{}{} {}",
            self.head,
            self.sign,
            self.letters,
            self.params.join(" ")
        );
        self.letters.clear();
        self.params.clear();
        self.len = self.head.len() + 1;
        line
    }
}
