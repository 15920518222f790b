//! Lifecycle controller and the status cycle.
//!
//! [`Controller`] owns everything a cycle or a lifecycle step touches: the
//! bus, the button set, the settle-delay provider and the state tracker.
//! It always runs under the device mutex, so the methods here take
//! `&mut self` and never lock anything themselves.
//!
//! ## Init sequence
//!
//! ```text
//!   mask irq ─▶ soft reset ─▶ settle ─▶ program[0..n] ─▶ settle ─▶ calibrate
//!      └─────────────────────────────────────────────────────────────┐
//!                                     unmask irq ─▶ discard status read
//! ```
//!
//! A bus error at any step stops the sequence, forces the fail-safe touch,
//! leaves interrupts masked and parks the device in `Degraded`.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use log::{debug, error, info, warn};

use crate::app::ports::{EventSink, RegisterTransport};
use crate::buttons::{ButtonSet, ButtonState};
use crate::config::{DeviceConfig, MAX_BUTTONS, MAX_PROGRAM, RegisterMap, RegisterWrite};
use crate::error::{BusError, Error, StateError};
use crate::fsm::{Lifecycle, LifecycleState};
use crate::status::{HandlerTable, StatusHandler, dispatch, read_status};

/// Interrupt masking as seen by the controller.
///
/// The device implements this over its interrupt line; tests use a
/// recording stub.
pub trait IrqGate {
    fn mask(&mut self);
    fn unmask(&mut self);
}

pub struct Controller<B, K, D> {
    bus: B,
    buttons: ButtonSet<K>,
    delay: D,
    handlers: HandlerTable,
    registers: RegisterMap,
    program: Vec<RegisterWrite, MAX_PROGRAM>,
    reset_settle_ms: u32,
    calibration_settle_ms: u32,
    fail_safe: Option<usize>,
    lifecycle: Lifecycle,
    cycles: u32,
}

impl<B, K, D> Controller<B, K, D>
where
    B: RegisterTransport,
    K: EventSink,
    D: DelayNs,
{
    /// Build the controller in `Uninitialized`.  `config` is expected to be
    /// validated already.
    pub fn new(config: &DeviceConfig, bus: B, sink: K, delay: D) -> Self {
        Self {
            bus,
            buttons: ButtonSet::new(&config.buttons, sink),
            delay,
            handlers: HandlerTable::new(config.status_handlers),
            registers: config.registers,
            program: config.program.clone(),
            reset_settle_ms: config.reset_settle_ms,
            calibration_settle_ms: config.calibration_settle_ms,
            fail_safe: config.fail_safe_button.map(usize::from),
            lifecycle: Lifecycle::new(),
            cycles: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.current()
    }

    /// Completed status cycles, including ones that failed on the bus.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn button_states(&self) -> Vec<ButtonState, MAX_BUTTONS> {
        self.buttons.states()
    }

    /// Mark the device removed.  Terminal.
    pub fn mark_removed(&mut self) {
        self.lifecycle.transition(LifecycleState::Removed);
    }

    /// Hand back the bus and the sink.
    pub fn into_parts(mut self) -> (B, Option<K>) {
        let sink = self.buttons.detach_sink();
        (self.bus, sink)
    }

    // -----------------------------------------------------------------------
    // Status cycle
    // -----------------------------------------------------------------------

    /// One full cycle: read the interrupt source, dispatch every asserted
    /// bit.  Returns the number of handlers invoked.
    ///
    /// A failed status read forces the fail-safe touch and ends the cycle;
    /// there is no retry.  A failed touch-status read inside a button scan
    /// forces the fail-safe and skips that scan only.
    ///
    /// The sink sees one `sync()` per button scan, not per cycle: with both
    /// the touch and release bits asserted the scan runs twice and syncs
    /// twice, the second scan reporting no edges.
    pub fn run_cycle(&mut self) -> Result<usize, BusError> {
        self.cycles = self.cycles.wrapping_add(1);
        let regs = self.registers;
        let status = match read_status(&mut self.bus, regs.irq_status, regs.status_mask) {
            Ok(status) => status,
            Err(e) => {
                error!("status read failed: {}", e);
                self.force_fail_safe();
                return Err(e);
            }
        };
        debug!("cycle {}: status 0x{:02x}", self.cycles, status.raw());

        let handlers = self.handlers;
        let mut first_err = None;
        let invoked = dispatch(status, &handlers, |_, handler| match handler {
            StatusHandler::ButtonScan => {
                if let Err(e) = self.scan_buttons() {
                    first_err.get_or_insert(e);
                }
            }
            StatusHandler::Unassigned => {}
        });
        match first_err {
            Some(e) => Err(e),
            None => Ok(invoked),
        }
    }

    fn scan_buttons(&mut self) -> Result<(), BusError> {
        let regs = self.registers;
        let touch = match read_status(&mut self.bus, regs.touch_status, regs.status_mask) {
            Ok(touch) => touch,
            Err(e) => {
                error!("touch status read failed: {}", e);
                self.force_fail_safe();
                return Err(e);
            }
        };
        if let Err(e) = self.buttons.update(touch) {
            warn!("button scan aborted: {}", e);
        }
        Ok(())
    }

    /// Report the configured fail-safe button as touched.
    pub fn force_fail_safe(&mut self) {
        let Some(idx) = self.fail_safe else {
            return;
        };
        match self.buttons.force_touch(idx) {
            Ok(()) => error!("bus failure: forcing button {} touched", idx),
            Err(e) => warn!("fail-safe touch not reported: {}", e),
        }
    }

    fn write(&mut self, reg: u8, value: u8) -> Result<(), BusError> {
        debug!("write reg 0x{:02x} = 0x{:02x}", reg, value);
        let result = self.bus.write(reg, value);
        if let Err(e) = result {
            error!("{}", e);
            self.force_fail_safe();
        }
        result
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn reject(&self, op: &'static str, allowed: &[LifecycleState]) -> Result<(), Error> {
        self.lifecycle.require(op, allowed).map_err(|e| {
            warn!("{}", e);
            Error::from(e)
        })
    }

    fn degrade<G: IrqGate + ?Sized>(&mut self, gate: &mut G, e: BusError) -> Error {
        gate.mask();
        error!("init failed in {}: {}", self.lifecycle.current().name(), e);
        self.lifecycle.transition(LifecycleState::Degraded);
        e.into()
    }

    /// Full reset, program, calibrate and arm.
    ///
    /// Allowed from `Uninitialized`, `Armed`, `Suspended` and `Degraded`.
    pub fn init<G: IrqGate + ?Sized>(&mut self, gate: &mut G) -> Result<(), Error> {
        let state = self.lifecycle.current();
        if !state.accepts_init() {
            let e = StateError { op: "init", state };
            warn!("{}", e);
            return Err(e.into());
        }

        self.lifecycle.transition(LifecycleState::Resetting);
        gate.mask();
        let regs = self.registers;
        if let Err(e) = self.write(regs.soft_reset, regs.soft_reset_value) {
            return Err(self.degrade(gate, e));
        }
        self.delay.delay_ms(self.reset_settle_ms);

        self.lifecycle.transition(LifecycleState::Programming);
        for idx in 0..self.program.len() {
            let RegisterWrite { reg, value } = self.program[idx];
            if let Err(e) = self.write(reg, value) {
                warn!(
                    "register program aborted at entry {} of {}",
                    idx,
                    self.program.len()
                );
                return Err(self.degrade(gate, e));
            }
        }

        self.lifecycle.transition(LifecycleState::Calibrating);
        self.delay.delay_ms(self.calibration_settle_ms);
        if let Err(e) = self.write(regs.calibrate, regs.calibrate_value) {
            return Err(self.degrade(gate, e));
        }

        gate.unmask();
        // Only the next edge raises the line again; clear whatever is latched.
        if let Err(e) = self.bus.read(regs.irq_status) {
            self.force_fail_safe();
            return Err(self.degrade(gate, e));
        }
        self.lifecycle.transition(LifecycleState::Armed);
        Ok(())
    }

    /// `Armed -> Suspended`.  Masks interrupts and nothing else.
    pub fn suspend<G: IrqGate + ?Sized>(&mut self, gate: &mut G) -> Result<(), Error> {
        self.reject("suspend", &[LifecycleState::Armed])?;
        gate.mask();
        self.lifecycle.transition(LifecycleState::Suspended);
        Ok(())
    }

    /// `Suspended -> Armed`.  Drains whatever the device latched while
    /// suspended, then reinitializes from scratch.
    pub fn resume<G: IrqGate + ?Sized>(&mut self, gate: &mut G) -> Result<(), Error> {
        self.reject("resume", &[LifecycleState::Suspended])?;
        if let Err(e) = self.run_cycle() {
            warn!("resume: pending status not drained: {}", e);
        }
        self.init(gate)
    }

    /// Trigger an offset calibration.  Idempotent, no state change.
    pub fn calibrate(&mut self) -> Result<(), Error> {
        self.reject("calibrate", &[LifecycleState::Armed])?;
        info!("performing manual offset calibration");
        let regs = self.registers;
        self.write(regs.calibrate, regs.calibrate_value)?;
        Ok(())
    }

    /// Raw interrupt-source value, unmasked.  Read-only diagnostics: a
    /// failure is returned to the caller without the fail-safe.
    pub fn calibration_status(&mut self) -> Result<u8, Error> {
        self.reject(
            "calibration read",
            &[LifecycleState::Armed, LifecycleState::Suspended, LifecycleState::Degraded],
        )?;
        Ok(self.bus.read(self.registers.irq_status)?)
    }
}
