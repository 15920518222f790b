//! Device configuration.
//!
//! Everything a host supplies at probe time: interrupt line and scheduling
//! discipline, the register program applied during init, the button table,
//! and the policy knobs (hold timer, settle delays, fail-safe button).
//! `Default` is the SX9310 reference profile.  Hosts that ship profiles as
//! data load them with [`DeviceConfig::from_json`].

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::status::{MAX_STATUS_BITS, StatusHandler};
use crate::sx9310::*;

/// Maximum number of buttons per device.
pub const MAX_BUTTONS: usize = 8;
/// Maximum number of entries in the register program.
pub const MAX_PROGRAM: usize = 32;

/// One `(address, value)` pair of the register program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterWrite {
    pub reg: u8,
    pub value: u8,
}

impl RegisterWrite {
    pub const fn new(reg: u8, value: u8) -> Self {
        Self { reg, value }
    }
}

/// One button of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonConfig {
    /// Touch-status bits that must all be set.
    pub mask: u16,
    /// Key code reported to the sink.
    pub code: u16,
}

/// How interrupt notifications turn into status cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IrqMode {
    /// The notification runs the cycle itself, under the device mutex.
    Threaded,
    /// The notification only schedules work; the worker runs the cycle.
    #[default]
    Deferred,
}

/// Register addresses and trigger values the core uses directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMap {
    /// Interrupt-source register; read once per cycle and dispatched.
    pub irq_status: u8,
    /// Per-sensor touch flags; read by every button scan.
    pub touch_status: u8,
    pub soft_reset: u8,
    pub soft_reset_value: u8,
    /// Register written to start an offset calibration.
    pub calibrate: u8,
    pub calibrate_value: u8,
    /// Valid bits of the status registers.
    pub status_mask: u8,
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self {
            irq_status: REG_IRQ_SRC,
            touch_status: REG_STAT0,
            soft_reset: REG_SOFT_RESET,
            soft_reset_value: SOFT_RESET_VALUE,
            calibrate: REG_IRQ_SRC,
            calibrate_value: CALIBRATE_VALUE,
            status_mask: 0xff,
        }
    }
}

/// Full device profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Interrupt ---
    /// Host identifier of the interrupt line (for logs only).
    pub irq_line: u32,
    pub irq_mode: IrqMode,
    /// Re-check period while the line stays asserted; `None` disables the
    /// hold timer.
    pub hold_timer_ms: Option<u32>,

    // --- Timing ---
    /// Wait after the soft-reset write.
    pub reset_settle_ms: u32,
    /// Wait before the calibration trigger write.
    pub calibration_settle_ms: u32,

    // --- Policy ---
    /// Button forced Active on bus failure; `None` disables the fail-safe.
    pub fail_safe_button: Option<u8>,

    // --- Registers ---
    pub registers: RegisterMap,
    /// Handler per interrupt-source bit, indexed by bit position.
    pub status_handlers: [StatusHandler; MAX_STATUS_BITS],
    /// Applied verbatim, in order, after the soft reset.
    pub program: Vec<RegisterWrite, MAX_PROGRAM>,

    pub buttons: Vec<ButtonConfig, MAX_BUTTONS>,
}

/// SX9310 register program.  `PROX_CTRL0` goes last: it enables the
/// sensors once everything else is set.
const SX9310_PROGRAM: [RegisterWrite; 25] = [
    RegisterWrite::new(REG_IRQ_MSK, 0x70),
    RegisterWrite::new(REG_IRQ_FUNC, 0x00),
    RegisterWrite::new(REG_PROX_CTRL1, 0x00),
    RegisterWrite::new(REG_PROX_CTRL2, 0x04),
    RegisterWrite::new(REG_PROX_CTRL3, 0x0a),
    RegisterWrite::new(REG_PROX_CTRL4, 0x0d),
    RegisterWrite::new(REG_PROX_CTRL5, 0xc1),
    RegisterWrite::new(REG_PROX_CTRL6, 0x20),
    RegisterWrite::new(REG_PROX_CTRL7, 0x4c),
    RegisterWrite::new(REG_PROX_CTRL8, 0x7e),
    RegisterWrite::new(REG_PROX_CTRL9, 0x7d),
    RegisterWrite::new(REG_PROX_CTRL10, 0x00),
    RegisterWrite::new(REG_PROX_CTRL11, 0x00),
    RegisterWrite::new(REG_PROX_CTRL12, 0x00),
    RegisterWrite::new(REG_PROX_CTRL13, 0x00),
    RegisterWrite::new(REG_PROX_CTRL14, 0x00),
    RegisterWrite::new(REG_PROX_CTRL15, 0x00),
    RegisterWrite::new(REG_PROX_CTRL16, 0x00),
    RegisterWrite::new(REG_PROX_CTRL17, 0x00),
    RegisterWrite::new(REG_PROX_CTRL18, 0x00),
    RegisterWrite::new(REG_PROX_CTRL19, 0x00),
    RegisterWrite::new(REG_SAR_CTRL0, 0x00),
    RegisterWrite::new(REG_SAR_CTRL1, 0x80),
    RegisterWrite::new(REG_SAR_CTRL2, 0x0c),
    RegisterWrite::new(REG_PROX_CTRL0, 0x57),
];

const SX9310_BUTTONS: [ButtonConfig; 4] = [
    ButtonConfig { mask: TOUCH_CS0 as u16, code: KEY_0 },
    ButtonConfig { mask: TOUCH_CS1 as u16, code: KEY_1 },
    ButtonConfig { mask: TOUCH_CS2 as u16, code: KEY_2 },
    ButtonConfig { mask: TOUCH_CS3 as u16, code: KEY_3 },
];

/// Release (bit 5) and touch (bit 6) both rescan the buttons.
const fn sx9310_handlers() -> [StatusHandler; MAX_STATUS_BITS] {
    let mut slots = [StatusHandler::Unassigned; MAX_STATUS_BITS];
    slots[IRQ_RELEASE as usize] = StatusHandler::ButtonScan;
    slots[IRQ_TOUCH as usize] = StatusHandler::ButtonScan;
    slots
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            irq_line: 0,
            irq_mode: IrqMode::Deferred,
            hold_timer_ms: None,

            reset_settle_ms: 300,
            calibration_settle_ms: 100,

            fail_safe_button: Some(0),

            registers: RegisterMap::default(),
            status_handlers: sx9310_handlers(),
            program: SX9310_PROGRAM.iter().copied().collect(),
            buttons: SX9310_BUTTONS.iter().copied().collect(),
        }
    }
}

impl DeviceConfig {
    /// Check the profile before any hardware is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buttons.is_empty() {
            return Err(ConfigError::NoButtons);
        }
        if self.buttons.iter().any(|b| b.mask == 0) {
            return Err(ConfigError::ValidationFailed("button mask must be non-zero"));
        }
        for (i, b) in self.buttons.iter().enumerate() {
            if self.buttons[..i].iter().any(|o| o.code == b.code) {
                return Err(ConfigError::ValidationFailed("duplicate button code"));
            }
        }
        if let Some(idx) = self.fail_safe_button {
            if usize::from(idx) >= self.buttons.len() {
                return Err(ConfigError::ValidationFailed(
                    "fail_safe_button out of range",
                ));
            }
        }
        if self.hold_timer_ms == Some(0) {
            return Err(ConfigError::ValidationFailed("hold_timer_ms must be non-zero"));
        }
        if self.registers.status_mask == 0 {
            return Err(ConfigError::ValidationFailed("status_mask must be non-zero"));
        }
        let visible = u16::from(self.registers.status_mask);
        if self.buttons.iter().any(|b| b.mask & !visible != 0) {
            return Err(ConfigError::ValidationFailed(
                "button mask outside status_mask",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON profile.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    /// Reference profile with a different scheduling discipline.
    pub fn with_mode(mut self, mode: IrqMode) -> Self {
        self.irq_mode = mode;
        self
    }
}
