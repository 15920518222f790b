//! Device lifecycle state machine.
//!
//! ```text
//!                 init()
//!  Uninitialized ───────▶ Resetting ──▶ Programming ──▶ Calibrating ──▶ Armed
//!                            ▲                                          │  ▲
//!                            │ init() / resume()          suspend()     │  │ resume()
//!                            └───────────────────────── Suspended ◀─────┘  │
//!                                                            └─────────────┘
//!
//!   any transition ──(bus error)──▶ Degraded ──init()──▶ Resetting
//!   any state ──remove()──▶ Removed (terminal)
//! ```
//!
//! [`Lifecycle`] only records where the device is and logs every move; the
//! steps that drive the hardware between states live in
//! [`lifecycle`](crate::lifecycle).

use log::info;

use crate::error::StateError;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Uninitialized,
    Resetting,
    Programming,
    Calibrating,
    Armed,
    Suspended,
    /// A bus failure aborted a transition. The fail-safe touch has been
    /// reported and interrupts stay masked until the next `init()`.
    Degraded,
    Removed,
}

impl LifecycleState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Resetting => "Resetting",
            Self::Programming => "Programming",
            Self::Calibrating => "Calibrating",
            Self::Armed => "Armed",
            Self::Suspended => "Suspended",
            Self::Degraded => "Degraded",
            Self::Removed => "Removed",
        }
    }

    /// States from which a full `init()` may start.
    pub const fn accepts_init(self) -> bool {
        matches!(
            self,
            Self::Uninitialized | Self::Armed | Self::Suspended | Self::Degraded
        )
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Current lifecycle position plus a transition counter.
#[derive(Debug)]
pub struct Lifecycle {
    current: LifecycleState,
    /// Monotonically increasing transition counter.
    transitions: u32,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            current: LifecycleState::Uninitialized,
            transitions: 0,
        }
    }

    /// The current state.
    pub fn current(&self) -> LifecycleState {
        self.current
    }

    /// Number of transitions taken since construction.
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Move to `next`, logging the edge.  Self-transitions are ignored.
    pub fn transition(&mut self, next: LifecycleState) {
        if next == self.current {
            return;
        }
        info!(
            "Lifecycle transition: {} -> {}",
            self.current.name(),
            next.name()
        );
        self.current = next;
        self.transitions = self.transitions.wrapping_add(1);
    }

    /// Reject `op` unless the current state is one of `allowed`.
    pub fn require(
        &self,
        op: &'static str,
        allowed: &[LifecycleState],
    ) -> Result<(), StateError> {
        if allowed.contains(&self.current) {
            Ok(())
        } else {
            Err(StateError {
                op,
                state: self.current,
            })
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
