//! Operator command vocabulary and line framing.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// A recognized operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    RelayOn,
    RelayOff,
    Interrupt,
    Resume,
    Toggle,
    Status,
    Calibrate,
    Arm,
    Disarm,
    Predict,
}

impl Command {
    pub const ALL: [Command; 10] = [
        Command::RelayOn,
        Command::RelayOff,
        Command::Interrupt,
        Command::Resume,
        Command::Toggle,
        Command::Status,
        Command::Calibrate,
        Command::Arm,
        Command::Disarm,
        Command::Predict,
    ];

    /// Canonical wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Command::RelayOn => "RELAY ON",
            Command::RelayOff => "RELAY OFF",
            Command::Interrupt => "INTERRUPT",
            Command::Resume => "RESUME",
            Command::Toggle => "TOGGLE",
            Command::Status => "STATUS",
            Command::Calibrate => "CALIBRATE",
            Command::Arm => "ARM",
            Command::Disarm => "DISARM",
            Command::Predict => "PREDICT",
        }
    }

    /// Comma-separated list of every command, for help and error text.
    pub fn vocabulary() -> String {
        Self::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command '{input}'")]
pub struct UnknownCommand {
    pub input: String,
}

impl FromStr for Command {
    type Err = UnknownCommand;

    /// Case-insensitive; surrounding and repeated inner whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| UnknownCommand {
                input: s.trim().to_string(),
            })
    }
}

/// Bounded accumulator turning a byte stream into command lines.
///
/// `\n` and `\r` both end a line. A line longer than `max_len` keeps its first
/// `max_len` characters; the rest is dropped up to the next terminator.
/// Partial lines persist across `push` calls.
#[derive(Debug, Clone)]
pub struct LineAccumulator {
    buf: String,
    max_len: usize,
    truncated: bool,
}

impl LineAccumulator {
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.max(1);
        Self {
            buf: String::with_capacity(max_len),
            max_len,
            truncated: false,
        }
    }

    /// Feed raw bytes, returning every non-blank line they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            match b {
                b'\n' | b'\r' => {
                    let line = std::mem::take(&mut self.buf);
                    self.truncated = false;
                    if !line.trim().is_empty() {
                        lines.push(line);
                    }
                }
                _ if self.buf.len() >= self.max_len => {
                    if !self.truncated {
                        self.truncated = true;
                        tracing::warn!(max_len = self.max_len, "command line too long; truncating");
                    }
                }
                _ => self.buf.push(if b.is_ascii() { char::from(b) } else { '?' }),
            }
        }
        lines
    }

    /// Characters buffered for the unfinished line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn is_truncating(&self) -> bool {
        self.truncated
    }
}
