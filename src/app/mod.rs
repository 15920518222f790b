//! Port boundary of the touch core.
//!
//! Everything the core needs from the outside world (bus, interrupt line,
//! input consumer) is expressed as a **port trait** in [`ports`], keeping
//! the dispatch and lifecycle logic testable without real peripherals.

pub mod events;
pub mod ports;
