//! Mock hardware for integration tests.
//!
//! Every mock is a cheap cloneable handle over shared state: one clone goes
//! into the device, the test keeps another to script failures and inspect
//! the full bus / event history.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::ErrorKind;
use sx93xx::app::events::KeyEvent;
use sx93xx::app::ports::{EventSink, InterruptSource, RegisterTransport};
use sx93xx::scheduler::IrqNotifier;
use sx93xx::{BusError, ResourceError};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ── Bus ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    Write(u8, u8),
    Read(u8),
}

pub struct BusState {
    pub log: Vec<BusOp>,
    pub regs: [u8; 256],
    /// Fail the write with this zero-based index (counting every write).
    pub fail_write_at: Option<usize>,
    pub fail_reads: bool,
    /// Fail only reads of this register.
    pub fail_reads_of: Option<u8>,
    pub read_delay: Option<Duration>,
    writes: usize,
}

#[derive(Clone)]
pub struct MockBus {
    pub state: Arc<Mutex<BusState>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl MockBus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BusState {
                log: Vec::new(),
                regs: [0; 256],
                fail_write_at: None,
                fail_reads: false,
                fail_reads_of: None,
                read_delay: None,
                writes: 0,
            })),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, BusState> {
        lock(&self.state)
    }

    pub fn set_reg(&self, reg: u8, value: u8) {
        self.state().regs[usize::from(reg)] = value;
    }

    pub fn log(&self) -> Vec<BusOp> {
        self.state().log.clone()
    }

    pub fn clear_log(&self) {
        self.state().log.clear();
    }

    pub fn reads_of(&self, reg: u8) -> usize {
        self.state()
            .log
            .iter()
            .filter(|op| **op == BusOp::Read(reg))
            .count()
    }

    /// Highest number of overlapping reads observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl RegisterTransport for MockBus {
    fn write(&mut self, reg: u8, value: u8) -> Result<(), BusError> {
        let mut s = self.state();
        let n = s.writes;
        s.writes += 1;
        if s.fail_write_at == Some(n) {
            return Err(BusError::Write {
                reg,
                kind: ErrorKind::Bus,
            });
        }
        s.log.push(BusOp::Write(reg, value));
        Ok(())
    }

    fn read(&mut self, reg: u8) -> Result<u8, BusError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = self.state().read_delay;
        if let Some(d) = delay {
            std::thread::sleep(d);
        }
        let result = {
            let mut s = self.state();
            if s.fail_reads || s.fail_reads_of == Some(reg) {
                Err(BusError::Read {
                    reg,
                    kind: ErrorKind::NoAcknowledge(
                        embedded_hal::i2c::NoAcknowledgeSource::Address,
                    ),
                })
            } else {
                s.log.push(BusOp::Read(reg));
                Ok(s.regs[usize::from(reg)])
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct SinkState {
    pub events: Vec<KeyEvent>,
    pub syncs: usize,
}

#[derive(Clone, Default)]
pub struct MockSink {
    pub state: Arc<Mutex<SinkState>>,
}

#[allow(dead_code)]
impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<KeyEvent> {
        lock(&self.state).events.clone()
    }

    pub fn syncs(&self) -> usize {
        lock(&self.state).syncs
    }
}

impl EventSink for MockSink {
    fn report(&mut self, code: u16, pressed: bool) {
        lock(&self.state).events.push(KeyEvent { code, pressed });
    }

    fn sync(&mut self) {
        lock(&self.state).syncs += 1;
    }
}

// ── Interrupt line ────────────────────────────────────────────

#[derive(Default)]
pub struct LineState {
    pub notifier: Option<IrqNotifier>,
    pub enabled: bool,
    /// `None` models a line without a level query.
    pub level: Option<bool>,
    pub refuse_register: bool,
    pub registrations: usize,
}

#[derive(Clone, Default)]
pub struct MockLine {
    pub state: Arc<Mutex<LineState>>,
}

#[allow(dead_code)]
impl MockLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_level(&self, level: Option<bool>) {
        lock(&self.state).level = level;
    }

    pub fn is_enabled(&self) -> bool {
        lock(&self.state).enabled
    }

    pub fn is_registered(&self) -> bool {
        lock(&self.state).notifier.is_some()
    }

    /// Deliver one edge, as the host interrupt controller would.
    pub fn fire(&self) -> bool {
        let notifier = {
            let s = lock(&self.state);
            if !s.enabled {
                return false;
            }
            s.notifier.clone()
        };
        notifier.is_some_and(|n| n.notify())
    }
}

impl InterruptSource for MockLine {
    fn register(&mut self, notifier: IrqNotifier) -> Result<(), ResourceError> {
        let mut s = lock(&self.state);
        if s.refuse_register {
            return Err(ResourceError::IrqRegistration);
        }
        s.notifier = Some(notifier);
        s.registrations += 1;
        Ok(())
    }

    fn unregister(&mut self) {
        let mut s = lock(&self.state);
        s.notifier = None;
        s.enabled = false;
    }

    fn enable(&mut self) {
        lock(&self.state).enabled = true;
    }

    fn disable(&mut self) {
        lock(&self.state).enabled = false;
    }

    fn is_asserted(&mut self) -> Option<bool> {
        lock(&self.state).level
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Settle delays are recorded, not slept.
#[derive(Clone, Default)]
pub struct NoDelay {
    pub ms: Arc<Mutex<Vec<u32>>>,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        lock(&self.ms).push(ms);
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// Poll `cond` for up to two seconds.
#[allow(dead_code)]
pub fn wait_for(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

// ── Rig ───────────────────────────────────────────────────────

pub type Dev = sx93xx::DeviceHandle<MockBus, MockSink, NoDelay, MockLine>;

/// Test-side handles to everything a probed device owns.
#[derive(Clone, Default)]
pub struct Rig {
    pub bus: MockBus,
    pub sink: MockSink,
    pub line: MockLine,
    pub delay: NoDelay,
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self, config: sx93xx::DeviceConfig) -> sx93xx::Result<Dev> {
        Dev::probe(
            config,
            self.bus.clone(),
            self.sink.clone(),
            self.line.clone(),
            self.delay.clone(),
        )
    }
}
