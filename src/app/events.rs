//! Outbound key events.
//!
//! The button state machine reports transitions through the
//! [`EventSink`](super::ports::EventSink) port as `(code, pressed)` pairs.
//! Adapters that buffer or forward them use [`KeyEvent`] as the record type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// One key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Output identifier (input key code) of the button.
    pub code: u16,
    /// `true` for press, `false` for release.
    pub pressed: bool,
}

impl KeyEvent {
    pub const fn press(code: u16) -> Self {
        Self {
            code,
            pressed: true,
        }
    }

    pub const fn release(code: u16) -> Self {
        Self {
            code,
            pressed: false,
        }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = if self.pressed { "press" } else { "release" };
        write!(f, "key {} {}", self.code, action)
    }
}
