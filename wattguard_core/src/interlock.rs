//! Relay interlock state machine.
//!
//! Holds the operator's commanded state and a latched `interrupted` flag. The
//! physical output is ON only when commanded on and not interrupted. Only
//! `RELAY ON`, `RELAY OFF` and `RESUME` clear the latch.

use serde::Serialize;

/// Effective relay output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelayState {
    On,
    Off,
}

impl RelayState {
    pub fn is_on(self) -> bool {
        self == RelayState::On
    }
}

impl std::fmt::Display for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RelayState::On => "ON",
            RelayState::Off => "OFF",
        })
    }
}

/// `TOGGLE` refused because the interlock is latched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("toggle rejected: relay is interrupted; send RESUME, RELAY ON or RELAY OFF first")]
pub struct ToggleRejected;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayInterlock {
    commanded_on: bool,
    interrupted: bool,
}

impl Default for RelayInterlock {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RelayInterlock {
    pub fn new(commanded_on: bool) -> Self {
        Self {
            commanded_on,
            interrupted: false,
        }
    }

    pub fn commanded_on(&self) -> bool {
        self.commanded_on
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn output(&self) -> RelayState {
        if self.commanded_on && !self.interrupted {
            RelayState::On
        } else {
            RelayState::Off
        }
    }

    /// Detector latch: force the output off and hold it there.
    pub fn latch(&mut self) {
        self.interrupted = true;
        self.commanded_on = false;
    }

    pub fn relay_on(&mut self) {
        self.interrupted = false;
        self.commanded_on = true;
    }

    pub fn relay_off(&mut self) {
        self.interrupted = false;
        self.commanded_on = false;
    }

    /// Operator-initiated interrupt; same effect as a detector latch.
    pub fn interrupt(&mut self) {
        self.latch();
    }

    /// Clear the latch, keeping the commanded state.
    pub fn resume(&mut self) {
        self.interrupted = false;
    }

    /// Flip the commanded state unless latched. Returns the new commanded state.
    pub fn toggle(&mut self) -> Result<bool, ToggleRejected> {
        if self.interrupted {
            return Err(ToggleRejected);
        }
        self.commanded_on = !self.commanded_on;
        Ok(self.commanded_on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boots_on_and_not_interrupted() {
        let i = RelayInterlock::default();
        assert!(i.commanded_on());
        assert!(!i.interrupted());
        assert_eq!(i.output(), RelayState::On);
    }

    #[test]
    fn latch_survives_toggles() {
        let mut i = RelayInterlock::default();
        i.latch();
        for _ in 0..3 {
            assert_eq!(i.toggle(), Err(ToggleRejected));
            assert_eq!(i.output(), RelayState::Off);
            assert!(i.interrupted());
        }
    }

    #[test]
    fn resume_keeps_commanded_state() {
        let mut i = RelayInterlock::default();
        i.relay_on();
        i.interrupt();
        i.resume();
        // interrupt cleared commanded_on, resume does not restore it
        assert!(!i.commanded_on());
        assert_eq!(i.output(), RelayState::Off);

        let mut j = RelayInterlock::new(false);
        j.relay_on();
        j.resume();
        assert_eq!(j.output(), RelayState::On);
    }

    #[test]
    fn off_then_on_round_trip() {
        let mut i = RelayInterlock::default();
        i.latch();
        i.relay_off();
        i.relay_on();
        assert_eq!(i, RelayInterlock::new(true));
    }

    #[test]
    fn toggle_flips_when_clear() {
        let mut i = RelayInterlock::default();
        assert_eq!(i.toggle(), Ok(false));
        assert_eq!(i.output(), RelayState::Off);
        assert_eq!(i.toggle(), Ok(true));
        assert_eq!(i.output(), RelayState::On);
    }

    #[test]
    fn relay_state_serializes_uppercase() {
        assert_eq!(RelayState::On.to_string(), "ON");
        assert_eq!(RelayState::Off.to_string(), "OFF");
    }
}
