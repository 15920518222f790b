//! Control core for Semtech SX93xx capacitive touch/proximity sensors.
//!
//! Turns interrupt-line activity into debounced key press/release events:
//! status-bit dispatch, the per-button state machine, the reset/program/
//! calibrate bring-up sequence, and the threaded or deferred interrupt
//! scheduling that ties them together.  Bus, interrupt line and event
//! consumer are supplied by the host through the port traits in
//! [`app::ports`]; ready-made adapters for `embedded-hal` live in
//! [`adapters`].
//!
//! ```no_run
//! use embassy_time::Delay;
//! use sx93xx::adapters::{gpio::GpioIrqLine, i2c::{I2cTransport, SX9310_I2C_ADDR}, log_sink::LogEventSink};
//! use sx93xx::{DeviceConfig, DeviceHandle};
//!
//! fn bring_up<I, P>(i2c: I, nirq: P) -> sx93xx::Result<()>
//! where
//!     I: embedded_hal::i2c::I2c + Send + 'static,
//!     P: embedded_hal::digital::InputPin + Send + 'static,
//! {
//!     let line = GpioIrqLine::new(nirq);
//!     let _edges = line.trigger();
//!     let dev = DeviceHandle::probe(
//!         DeviceConfig::default(),
//!         I2cTransport::new(i2c, SX9310_I2C_ADDR),
//!         LogEventSink::new(),
//!         line,
//!         Delay,
//!     )?;
//!     dev.calibrate()?;
//!     Ok(())
//! }
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod buttons;
pub mod config;
pub mod device;
pub mod error;
pub mod fsm;
pub mod lifecycle;
pub mod scheduler;
pub mod status;
pub mod sx9310;

pub use config::{ButtonConfig, DeviceConfig, IrqMode, RegisterMap, RegisterWrite};
pub use device::DeviceHandle;
pub use error::{BusError, ConfigError, Error, ResourceError, Result, StateError};
pub use fsm::LifecycleState;
