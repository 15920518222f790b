//! Device handle: probe, host lifecycle calls, interrupt entry points.
//!
//! ```text
//!  DeviceHandle ──Arc──▶ Shared ─┬─ Mutex<Controller>         (cycles, lifecycle)
//!        │                       ├─ CS Mutex<RefCell<Line>>   (level, mask)
//!        │                       ├─ irq_enabled: AtomicBool
//!        │                       └─ Arc<WorkSlot>             (pending work)
//!        └── Worker (thread, holds Arc<Shared>)
//!
//!  InterruptSource ──IrqNotifier (Weak<Shared>)──▶ Shared::on_interrupt
//! ```
//!
//! Every cycle and every lifecycle step runs with the controller mutex
//! held, so cycles are strictly serialized no matter which context
//! triggered them.  The interrupt line sits behind a critical-section
//! mutex instead, so level queries and masking never block on a running
//! cycle.

use core::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::delay::DelayNs;
use heapless::Vec;
use log::{debug, error, info, warn};

use crate::app::ports::{EventSink, InterruptSource, RegisterTransport};
use crate::buttons::ButtonState;
use crate::config::{DeviceConfig, IrqMode, MAX_BUTTONS};
use crate::error::{Error, ResourceError, Result};
use crate::fsm::LifecycleState;
use crate::lifecycle::{Controller, IrqGate};
use crate::scheduler::{IrqNotifier, IrqTarget, WorkSlot, WorkTarget, Worker};

type Line<L> = BlockingMutex<CriticalSectionRawMutex, RefCell<L>>;

struct Shared<B, K, D, L> {
    core: Mutex<Controller<B, K, D>>,
    line: Line<L>,
    irq_enabled: AtomicBool,
    work: Arc<WorkSlot>,
    mode: IrqMode,
    hold_timer_ms: Option<u32>,
    irq_line: u32,
}

/// [`IrqGate`] over the device's interrupt line and its enabled flag.
struct LineGate<'a, L> {
    line: &'a Line<L>,
    enabled: &'a AtomicBool,
}

impl<L: InterruptSource> IrqGate for LineGate<'_, L> {
    fn mask(&mut self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.line.lock(|l| l.borrow_mut().disable());
    }

    fn unmask(&mut self) {
        self.line.lock(|l| l.borrow_mut().enable());
        self.enabled.store(true, Ordering::SeqCst);
    }
}

impl<B, K, D, L> Shared<B, K, D, L>
where
    B: RegisterTransport,
    K: EventSink,
    D: DelayNs,
    L: InterruptSource,
{
    fn lock_core(&self) -> MutexGuard<'_, Controller<B, K, D>> {
        // Button state is only mutated between complete reports, so a
        // panic inside a cycle leaves it consistent.
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn gate(&self) -> LineGate<'_, L> {
        LineGate {
            line: &self.line,
            enabled: &self.irq_enabled,
        }
    }

    fn line_asserted(&self) -> Option<bool> {
        self.line.lock(|l| l.borrow_mut().is_asserted())
    }

    fn cycle_if_armed(&self, core: &mut Controller<B, K, D>) {
        if core.state() != LifecycleState::Armed {
            debug!("irq {}: cycle skipped in {}", self.irq_line, core.state().name());
            return;
        }
        if let Err(e) = core.run_cycle() {
            warn!("irq {}: cycle ended early: {}", self.irq_line, e);
        }
    }
}

impl<B, K, D, L> IrqTarget for Shared<B, K, D, L>
where
    B: RegisterTransport,
    K: EventSink,
    D: DelayNs,
    L: InterruptSource,
{
    fn on_interrupt(&self) {
        if !self.irq_enabled.load(Ordering::SeqCst) {
            debug!("irq {}: masked, ignored", self.irq_line);
            return;
        }
        if self.line_asserted() == Some(false) {
            error!("irq {}: line read de-asserted", self.irq_line);
            return;
        }
        match self.mode {
            IrqMode::Threaded => {
                let mut core = self.lock_core();
                self.cycle_if_armed(&mut core);
                if let Some(ms) = self.hold_timer_ms {
                    self.work.schedule(ms);
                    debug!("irq {}: hold timer armed ({} ms)", self.irq_line, ms);
                }
            }
            IrqMode::Deferred => self.work.schedule(0),
        }
    }
}

impl<B, K, D, L> WorkTarget for Shared<B, K, D, L>
where
    B: RegisterTransport,
    K: EventSink,
    D: DelayNs,
    L: InterruptSource,
{
    fn work_slot(&self) -> &WorkSlot {
        &self.work
    }

    fn run_deferred(&self) {
        match self.mode {
            IrqMode::Threaded => {
                // Hold re-check: only once the line is released.
                if self.line_asserted() == Some(true) {
                    debug!("irq {}: still held", self.irq_line);
                    return;
                }
                let mut core = self.lock_core();
                self.cycle_if_armed(&mut core);
            }
            IrqMode::Deferred => {
                let held = self.hold_timer_ms.is_some() && self.line_asserted() != Some(false);
                let mut core = self.lock_core();
                if core.state() != LifecycleState::Armed {
                    debug!("irq {}: deferred cycle skipped in {}", self.irq_line, core.state().name());
                    return;
                }
                if let Err(e) = core.run_cycle() {
                    warn!("irq {}: cycle ended early: {}", self.irq_line, e);
                }
                drop(core);
                if let (true, Some(ms)) = (held, self.hold_timer_ms) {
                    self.work.schedule(ms);
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Public handle
// ═══════════════════════════════════════════════════════════════

/// One probed device.
///
/// Owns the bus transport, the event sink, the interrupt line and the
/// delay provider for as long as it lives.  Dropping the handle stops the
/// worker; [`DeviceHandle::remove`] additionally releases the interrupt
/// registration and hands the peripherals back.
pub struct DeviceHandle<B, K, D, L>
where
    B: RegisterTransport + Send + 'static,
    K: EventSink + Send + 'static,
    D: DelayNs + Send + 'static,
    L: InterruptSource + Send + 'static,
{
    shared: Arc<Shared<B, K, D, L>>,
    worker: Worker,
}

impl<B, K, D, L> DeviceHandle<B, K, D, L>
where
    B: RegisterTransport + Send + 'static,
    K: EventSink + Send + 'static,
    D: DelayNs + Send + 'static,
    L: InterruptSource + Send + 'static,
{
    /// Validate `config`, start the worker, register with the interrupt
    /// line and run the first `init()`.
    ///
    /// Configuration and resource failures abort the probe with nothing
    /// left registered.  A bus failure during init does not: the handle is
    /// returned in `Degraded` so the host can retry [`init`](Self::init).
    pub fn probe(config: DeviceConfig, bus: B, sink: K, line: L, delay: D) -> Result<Self> {
        config.validate().inspect_err(|e| error!("probe: {}", e))?;

        let work = Arc::new(WorkSlot::new());
        let shared = Arc::new(Shared {
            core: Mutex::new(Controller::new(&config, bus, sink, delay)),
            line: BlockingMutex::new(RefCell::new(line)),
            irq_enabled: AtomicBool::new(false),
            work: work.clone(),
            mode: config.irq_mode,
            hold_timer_ms: config.hold_timer_ms,
            irq_line: config.irq_line,
        });

        let mut worker = Worker::spawn(
            format!("sx93xx-irq{}", config.irq_line),
            shared.clone(),
            work,
        )?;

        let notifier = IrqNotifier::new(&shared);
        let registered = shared.line.lock(|l| l.borrow_mut().register(notifier));
        if let Err(e) = registered {
            error!("irq {} busy?", config.irq_line);
            worker.stop();
            return Err(e.into());
        }
        info!(
            "registered with {} irq ({})",
            match config.irq_mode {
                IrqMode::Threaded => "threaded",
                IrqMode::Deferred => "deferred",
            },
            config.irq_line
        );

        let handle = Self { shared, worker };
        if let Err(e) = handle.init() {
            error!("probe: device left in Degraded: {}", e);
        }
        Ok(handle)
    }

    /// Full reinitialization.  The only way out of `Degraded`.
    pub fn init(&self) -> Result<()> {
        let mut core = self.shared.lock_core();
        core.init(&mut self.shared.gate())
    }

    /// Mask interrupts.  `Armed` only.
    pub fn suspend(&self) -> Result<()> {
        let mut core = self.shared.lock_core();
        core.suspend(&mut self.shared.gate())
    }

    /// Drain latched status, reinitialize and unmask.  `Suspended` only.
    pub fn resume(&self) -> Result<()> {
        let mut core = self.shared.lock_core();
        core.resume(&mut self.shared.gate())
    }

    /// Trigger an offset calibration.
    pub fn calibrate(&self) -> Result<()> {
        self.shared.lock_core().calibrate()
    }

    /// Raw interrupt-source register, for the calibration surface.
    pub fn calibration_status(&self) -> Result<u8> {
        self.shared.lock_core().calibration_status()
    }

    /// Calibration surface write: any non-zero value triggers a
    /// calibration, zero is accepted and ignored.
    pub fn set_calibration(&self, value: u32) -> Result<()> {
        if value == 0 {
            return Ok(());
        }
        self.calibrate()
    }

    /// Schedule a deferred cycle `delay_ms` from now, replacing any pending
    /// one.
    pub fn schedule_cycle(&self, delay_ms: u32) {
        self.shared.work.schedule(delay_ms);
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.lock_core().state()
    }

    /// Status cycles run so far.
    pub fn cycle_count(&self) -> u32 {
        self.shared.lock_core().cycles()
    }

    pub fn button_states(&self) -> Vec<ButtonState, MAX_BUTTONS> {
        self.shared.lock_core().button_states()
    }

    /// A scheduled cycle has not started yet.
    pub fn work_pending(&self) -> bool {
        self.shared.work.is_pending()
    }

    pub fn irq_enabled(&self) -> bool {
        self.shared.irq_enabled.load(Ordering::SeqCst)
    }

    pub fn irq_mode(&self) -> IrqMode {
        self.shared.mode
    }

    /// Tear down: mask, cancel and await deferred work, release the
    /// interrupt registration, then return the bus, sink and line.
    pub fn remove(self) -> Result<(B, K, L)> {
        let Self { shared, mut worker } = self;
        shared.gate().mask();
        worker.stop();
        shared.line.lock(|l| l.borrow_mut().unregister());
        shared.lock_core().mark_removed();

        let shared = Arc::try_unwrap(shared).map_err(|_| {
            error!("remove: device state still referenced");
            Error::from(ResourceError::StillShared)
        })?;
        let core = shared.core.into_inner().unwrap_or_else(PoisonError::into_inner);
        let line = shared.line.into_inner().into_inner();
        let (bus, sink) = core.into_parts();
        let sink = sink.ok_or(ResourceError::SinkDetached)?;
        info!("irq {}: removed", shared.irq_line);
        Ok((bus, sink, line))
    }
}
