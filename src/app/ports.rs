//! Port traits: the boundary between the touch core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DeviceHandle (core)
//! ```
//!
//! Driven adapters (bus transport, input sink, interrupt line) implement
//! these traits.  The [`DeviceHandle`](crate::device::DeviceHandle) consumes
//! them via generics, so the core never touches hardware directly.
//!
//! ## Context rules
//!
//! - [`InterruptSource`] methods may be called from the interrupt
//!   notification context and must not block.
//! - [`RegisterTransport`] calls may block on the bus; they are only made
//!   from the worker or host-call context while the device mutex is held.

use crate::error::{BusError, ResourceError};
use crate::scheduler::IrqNotifier;

// ───────────────────────────────────────────────────────────────
// Register transport (driven adapter: core ↔ bus)
// ───────────────────────────────────────────────────────────────

/// Fixed 8-bit address / 8-bit value register access.
pub trait RegisterTransport {
    /// Write `value` into the register at `reg`.
    fn write(&mut self, reg: u8, value: u8) -> Result<(), BusError>;

    /// Read the register at `reg`.
    fn read(&mut self, reg: u8) -> Result<u8, BusError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: core → input subsystem)
// ───────────────────────────────────────────────────────────────

/// Consumer of key transitions.
///
/// `report` calls are batched; `sync` publishes the batch as one observable
/// update.  The core calls `sync` exactly once per button scan, after every
/// `report` of that scan.
pub trait EventSink {
    /// Record a key transition for `code`.
    fn report(&mut self, code: u16, pressed: bool);

    /// Flush the batched reports.
    fn sync(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Interrupt source (driven adapter: interrupt line ↔ core)
// ───────────────────────────────────────────────────────────────

/// The device's interrupt line.
///
/// The source stores the [`IrqNotifier`] handed over in `register` and
/// calls [`IrqNotifier::notify`] on every active edge.
pub trait InterruptSource {
    /// Attach the notifier.  Fails with
    /// [`ResourceError::IrqRegistration`] when the line is unavailable.
    fn register(&mut self, notifier: IrqNotifier) -> Result<(), ResourceError>;

    /// Drop the notifier.  No notifications may be delivered afterwards.
    fn unregister(&mut self);

    /// Unmask delivery.
    fn enable(&mut self);

    /// Mask delivery.
    fn disable(&mut self);

    /// Level of the line: `Some(true)` while the device holds it asserted,
    /// `None` when no level query is wired.
    fn is_asserted(&mut self) -> Option<bool>;
}
