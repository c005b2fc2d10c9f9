//! Minimal IRC line model for server-to-server traffic.
//!
//! Server links exchange plain `:<prefix> COMMAND arg arg :trailing` lines.
//! The routing layer hands handlers a parsed parameter vector; this type is
//! that vector plus the prefix, with just enough parsing and serialization
//! for the sync engine and its replay driver.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors encountered when parsing a protocol line.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Line was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Command was invalid or missing.
    #[error("invalid command")]
    InvalidCommand,

    /// Invalid message prefix.
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    /// Tags section was not followed by a message.
    #[error("unterminated tags section")]
    UnterminatedTags,
}

/// Top-level failures turning a line into a [`RawMessage`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// A line terminator or NUL inside the line.
    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),

    /// Failed to parse the line.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The offending line.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// A parsed protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Source without the leading `:` (SID, server name or UID).
    pub prefix: Option<String>,
    /// Command name, uppercased.
    pub command: String,
    /// Parameters; the trailing parameter (if any) is the last element.
    pub params: Vec<String>,
}

impl RawMessage {
    pub fn new(prefix: Option<&str>, command: &str, params: Vec<String>) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            command: command.to_ascii_uppercase(),
            params,
        }
    }

    /// Parameter at `idx`, if present.
    #[inline]
    pub fn arg(&self, idx: usize) -> Option<&str> {
        self.params.get(idx).map(String::as_str)
    }

    /// All parameters.
    #[inline]
    pub fn args(&self) -> &[String] {
        &self.params
    }
}

/// Skip IRCv3 tags; links may send them but nothing here reads them.
fn skip_tags(input: &str) -> Result<&str, MessageParseError> {
    match input.strip_prefix('@') {
        Some(tagged) => tagged
            .split_once(' ')
            .map(|(_, rest)| rest.trim_start_matches(' '))
            .ok_or(MessageParseError::UnterminatedTags),
        None => Ok(input),
    }
}

/// Message prefix, the part after `:` and before the first space.
fn parse_prefix(input: &str) -> Result<(Option<&str>, &str), MessageParseError> {
    let Some(stripped) = input.strip_prefix(':') else {
        return Ok((None, input));
    };
    let (prefix, rest) = stripped.split_once(' ').unwrap_or((stripped, ""));
    if prefix.is_empty() {
        return Err(MessageParseError::InvalidPrefix(prefix.to_string()));
    }
    Ok((Some(prefix), rest.trim_start_matches(' ')))
}

/// Command name: 1*letter or 3digit.
fn parse_command(input: &str) -> Result<(&str, &str), MessageParseError> {
    let (cmd, rest) = input.split_once(' ').unwrap_or((input, ""));
    let is_all_letters = !cmd.is_empty() && cmd.chars().all(|c| c.is_ascii_alphabetic());
    let is_three_digits = cmd.len() == 3 && cmd.chars().all(|c| c.is_ascii_digit());
    if is_all_letters || is_three_digits {
        Ok((cmd, rest))
    } else {
        Err(MessageParseError::InvalidCommand)
    }
}

/// Space-separated parameters; runs of spaces count as one separator and
/// a `:` parameter takes the rest of the line.
fn parse_params(mut rest: &str) -> Vec<String> {
    let mut params = Vec::new();
    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }
        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing.to_string());
            break;
        }
        let (param, r) = rest.split_once(' ').unwrap_or((rest, ""));
        params.push(param.to_string());
        rest = r;
    }
    params
}

impl FromStr for RawMessage {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim_end_matches(['\r', '\n']);
        if let Some(ch) = line.chars().find(|c| matches!(c, '\r' | '\n' | '\0')) {
            return Err(ProtocolError::IllegalControlChar(ch));
        }

        let invalid = |cause| ProtocolError::InvalidMessage {
            string: s.to_owned(),
            cause,
        };

        let rest = line.trim_start_matches(' ');
        if rest.is_empty() {
            return Err(invalid(MessageParseError::EmptyMessage));
        }
        let rest = skip_tags(rest).map_err(invalid)?;
        let (prefix, rest) = parse_prefix(rest).map_err(invalid)?;
        let (command, rest) = parse_command(rest).map_err(invalid)?;

        Ok(Self {
            prefix: prefix.map(str::to_string),
            command: command.to_ascii_uppercase(),
            params: parse_params(rest),
        })
    }
}

impl fmt::Display for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            let needs_colon =
                i == last && (param.is_empty() || param.contains(' ') || param.starts_with(':'));
            if needs_colon {
                write!(f, " :{}", param)?;
            } else {
                write!(f, " {}", param)?;
            }
        }
        Ok(())
    }
}
