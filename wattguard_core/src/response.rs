//! Operator-facing replies to commands.

use std::fmt;

use serde::Serialize;

use crate::command::{Command, UnknownCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Command applied.
    Ack,
    /// Command understood but refused in the current state.
    Rejected,
    /// Input did not match any command; nothing changed.
    Unknown,
    /// Read-only report (STATUS, PREDICT).
    Info,
}

/// One reply: a single line, or a short block for STATUS and PREDICT.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub command: Option<Command>,
    pub kind: ResponseKind,
    pub lines: Vec<String>,
}

impl Response {
    pub fn ack(command: Command, line: impl Into<String>) -> Self {
        Self {
            command: Some(command),
            kind: ResponseKind::Ack,
            lines: vec![line.into()],
        }
    }

    pub fn rejected(command: Command, line: impl Into<String>) -> Self {
        Self {
            command: Some(command),
            kind: ResponseKind::Rejected,
            lines: vec![line.into()],
        }
    }

    pub fn info(command: Command, lines: Vec<String>) -> Self {
        Self {
            command: Some(command),
            kind: ResponseKind::Info,
            lines,
        }
    }

    pub fn unknown(err: &UnknownCommand) -> Self {
        Self {
            command: None,
            kind: ResponseKind::Unknown,
            lines: vec![format!("ERR {err}; valid: {}", Command::vocabulary())],
        }
    }

    /// Ack or info; false for rejections and unknown input.
    pub fn is_ok(&self) -> bool {
        matches!(self.kind, ResponseKind::Ack | ResponseKind::Info)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_relists_vocabulary() {
        let err = "FOO".parse::<Command>().unwrap_err();
        let r = Response::unknown(&err);
        assert!(!r.is_ok());
        let text = r.to_string();
        assert!(text.contains("FOO"));
        for c in Command::ALL {
            assert!(text.contains(c.as_str()), "missing {c}");
        }
    }

    #[test]
    fn serializes_for_json_sinks() {
        let r = Response::ack(Command::RelayOn, "OK relay ON");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["command"], "RELAY ON");
        assert_eq!(v["kind"], "ack");
        assert_eq!(v["lines"][0], "OK relay ON");
    }
}
