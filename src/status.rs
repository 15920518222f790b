//! Status decoding and per-bit dispatch.
//!
//! ```text
//!   IRQ source register ──read_status()──▶ StatusBits
//!                                              │
//!                     ┌────────────────────────┘
//!                     ▼  bit 0 → bit 7 (ascending)
//!   HandlerTable ┌─────┬─────┬─────┬─────┬─────┬───────┬───────┬─────┐
//!                │  -  │  -  │  -  │  -  │  -  │ Scan  │ Scan  │  -  │
//!                └─────┴─────┴─────┴─────┴─────┴───────┴───────┴─────┘
//! ```
//!
//! The decoder only reads; it never triggers the fail-safe path.  The
//! dispatcher holds no state: it walks the snapshot in ascending bit order
//! and invokes the handler registered at each asserted position once.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::app::ports::RegisterTransport;
use crate::error::BusError;

/// Number of dispatchable status bits (one handler slot per bit).
pub const MAX_STATUS_BITS: usize = 8;

// ---------------------------------------------------------------------------
// Status snapshot
// ---------------------------------------------------------------------------

/// One read of a status register.  Consumed within a single dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusBits(u16);

impl StatusBits {
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Whether bit `bit` is asserted.
    pub const fn is_set(self, bit: u8) -> bool {
        bit < 16 && (self.0 >> bit) & 1 != 0
    }

    /// True when **every** bit of `mask` is asserted.
    pub const fn contains_all(self, mask: u16) -> bool {
        self.0 & mask == mask
    }

    /// Asserted bit positions below [`MAX_STATUS_BITS`], ascending.
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..MAX_STATUS_BITS as u8).filter(move |&bit| self.is_set(bit))
    }
}

// ---------------------------------------------------------------------------
// Handler table
// ---------------------------------------------------------------------------

/// What to run when a status bit is asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusHandler {
    /// No handler; the bit is ignored.
    #[default]
    Unassigned,
    /// Re-read touch status and run the button state machine.
    ButtonScan,
}

/// Fixed per-bit handler table, indexed by bit position.
/// Read-only once the device is probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerTable {
    slots: [StatusHandler; MAX_STATUS_BITS],
}

impl HandlerTable {
    pub const fn new(slots: [StatusHandler; MAX_STATUS_BITS]) -> Self {
        Self { slots }
    }

    /// A table with every slot unassigned.
    pub const fn empty() -> Self {
        Self {
            slots: [StatusHandler::Unassigned; MAX_STATUS_BITS],
        }
    }

    /// Handler at `bit`; out-of-range bits read as unassigned.
    pub fn get(&self, bit: u8) -> StatusHandler {
        self.slots
            .get(bit as usize)
            .copied()
            .unwrap_or(StatusHandler::Unassigned)
    }

    /// Bitmask of positions that carry a handler.
    pub fn assigned_mask(&self) -> u16 {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, h)| **h != StatusHandler::Unassigned)
            .fold(0, |acc, (bit, _)| acc | (1 << bit))
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Read the status register at `reg` and mask it to the valid bits.
pub fn read_status<B: RegisterTransport + ?Sized>(
    bus: &mut B,
    reg: u8,
    mask: u8,
) -> Result<StatusBits, BusError> {
    let raw = bus.read(reg)?;
    Ok(StatusBits::from_raw(u16::from(raw & mask)))
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Fan `status` out to `table`, calling `invoke(bit, handler)` once for each
/// asserted bit that has a handler, in ascending bit order.
///
/// Returns the number of handler invocations.
pub fn dispatch(
    status: StatusBits,
    table: &HandlerTable,
    mut invoke: impl FnMut(u8, StatusHandler),
) -> usize {
    let mut invoked = 0;
    for bit in status.iter() {
        match table.get(bit) {
            StatusHandler::Unassigned => {
                debug!("dispatch: bit {} asserted, no handler", bit);
            }
            handler => {
                debug!("dispatch: bit {} -> {:?}", bit, handler);
                invoke(bit, handler);
                invoked += 1;
            }
        }
    }
    invoked
}
