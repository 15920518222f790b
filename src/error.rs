//! Unified error types for the SX93xx touch core.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! host-facing API uniform. All variants are `Copy` so they can be passed
//! out of interrupt and worker contexts without allocation.

use core::fmt;

use embedded_hal::i2c::ErrorKind;

use crate::fsm::LifecycleState;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A register read or write failed on the bus.
    Bus(BusError),
    /// Platform configuration is missing or invalid.
    Config(ConfigError),
    /// An OS or platform resource could not be acquired.
    Resource(ResourceError),
    /// The operation is not valid in the current lifecycle state.
    State(StateError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Resource(e) => write!(f, "resource: {e}"),
            Self::State(e) => write!(f, "state: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

/// A register transfer failed.
///
/// Carries the register address so the log line points at the failing
/// access, plus the transport's own classification of the fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// Reading the register at `reg` failed.
    Read { reg: u8, kind: ErrorKind },
    /// Writing the register at `reg` failed.
    Write { reg: u8, kind: ErrorKind },
}

impl BusError {
    /// Register address of the failed transfer.
    pub const fn reg(&self) -> u8 {
        match self {
            Self::Read { reg, .. } | Self::Write { reg, .. } => *reg,
        }
    }

    /// Transport-level fault classification.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Read { kind, .. } | Self::Write { kind, .. } => *kind,
        }
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { reg, kind } => write!(f, "read of reg 0x{reg:02x} failed ({kind})"),
            Self::Write { reg, kind } => write!(f, "write of reg 0x{reg:02x} failed ({kind})"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors raised while validating or loading a [`DeviceConfig`](crate::config::DeviceConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No buttons are configured.
    NoButtons,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// The serialized profile could not be parsed.
    Malformed,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoButtons => write!(f, "no buttons configured"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Malformed => write!(f, "malformed profile"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Resource errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    /// The interrupt source refused the handler registration (line busy).
    IrqRegistration,
    /// The deferred-work thread could not be spawned.
    WorkerSpawn,
    /// Teardown found the device state still referenced elsewhere.
    StillShared,
    /// The event sink has been detached from the button set.
    SinkDetached,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IrqRegistration => write!(f, "interrupt registration failed"),
            Self::WorkerSpawn => write!(f, "worker spawn failed"),
            Self::StillShared => write!(f, "device state still shared"),
            Self::SinkDetached => write!(f, "event sink detached"),
        }
    }
}

impl From<ResourceError> for Error {
    fn from(e: ResourceError) -> Self {
        Self::Resource(e)
    }
}

// ---------------------------------------------------------------------------
// Lifecycle state errors
// ---------------------------------------------------------------------------

/// An operation was requested in a lifecycle state that does not allow it.
/// Reported and otherwise treated as a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateError {
    /// Name of the rejected operation.
    pub op: &'static str,
    /// State the device was in.
    pub state: LifecycleState,
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} not allowed in {}", self.op, self.state.name())
    }
}

impl From<StateError> for Error {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
