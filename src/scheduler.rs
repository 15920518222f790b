//! Interrupt notification and deferred work.
//!
//! ```text
//!  ┌───────────────┐  notify()   ┌─────────────────┐
//!  │ InterruptSrc  │───────────▶│   IrqTarget      │  Threaded: run cycle here
//!  └───────────────┘  (Weak)     │ (device shared)  │  Deferred: schedule(0)
//!                                └────────┬─────────┘
//!                                         │ WorkSlot::schedule(delay)
//!                                         ▼
//!  ┌──────────────────────────────────────────────────────────┐
//!  │  Worker thread                                           │
//!  │  futures_lite::block_on                                  │
//!  │    wait(slot) ─▶ or(Timer::after(delay), wait(slot)) ─▶  │
//!  │                  run_deferred()                          │
//!  └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The pending slot is an `embassy-sync` [`Signal`]: signalling overwrites
//! any request not yet taken, so at most one cycle is ever pending and the
//! last schedule wins.  A request that arrives while the worker sleeps on
//! a delay replaces the sleeping one.

use core::cell::Cell;
use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use futures_lite::future;
use log::{debug, error, info};

use crate::error::ResourceError;

pub use crate::config::IrqMode;

/// What the worker should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkRequest {
    /// Run one deferred cycle after `delay_ms`.
    Run { delay_ms: u32 },
    /// Exit the worker loop.
    Shutdown,
}

// ═══════════════════════════════════════════════════════════════
//  Interrupt notification
// ═══════════════════════════════════════════════════════════════

/// Receiver of interrupt notifications.
pub trait IrqTarget {
    /// Called by the interrupt source on every active edge.  Must not
    /// assume any particular thread.
    fn on_interrupt(&self);
}

/// Handle an [`InterruptSource`](crate::app::ports::InterruptSource) keeps
/// to reach its device.
///
/// Holds only a weak reference, so a registered source never keeps a
/// removed device alive.
#[derive(Clone)]
pub struct IrqNotifier {
    target: Weak<dyn IrqTarget + Send + Sync>,
}

impl IrqNotifier {
    pub fn new<T>(target: &Arc<T>) -> Self
    where
        T: IrqTarget + Send + Sync + 'static,
    {
        let weak = Arc::downgrade(target);
        Self { target: weak }
    }

    /// Deliver one notification.  Returns `false` when the device is gone.
    pub fn notify(&self) -> bool {
        match self.target.upgrade() {
            Some(target) => {
                target.on_interrupt();
                true
            }
            None => false,
        }
    }
}

impl core::fmt::Debug for IrqNotifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IrqNotifier")
            .field("live", &(self.target.strong_count() > 0))
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Pending-work slot
// ═══════════════════════════════════════════════════════════════

/// Single-entry pending-work slot shared by the notifier side and the
/// worker.  Safe to use from interrupt context.
pub struct WorkSlot {
    signal: Signal<CriticalSectionRawMutex, WorkRequest>,
    /// A `Run` request has been scheduled and its cycle has not started.
    /// Updated together with the signal under one critical section.
    armed: BlockingMutex<CriticalSectionRawMutex, Cell<bool>>,
    /// Sticky: once closed, no request other than shutdown is accepted.
    closed: AtomicBool,
}

impl WorkSlot {
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
            armed: BlockingMutex::new(Cell::new(false)),
            closed: AtomicBool::new(false),
        }
    }

    /// Replace any pending request with a cycle `delay_ms` from now.
    /// Ignored once the slot is closed.
    pub fn schedule(&self, delay_ms: u32) {
        if self.is_closed() {
            debug!("schedule({}) after shutdown ignored", delay_ms);
            return;
        }
        self.armed.lock(|armed| {
            armed.set(true);
            self.signal.signal(WorkRequest::Run { delay_ms });
        });
    }

    /// Cancel whatever is pending and stop the worker.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.armed.lock(|armed| {
            armed.set(false);
            self.signal.signal(WorkRequest::Shutdown);
        });
    }

    /// A scheduled cycle has not started yet.
    pub fn is_pending(&self) -> bool {
        self.armed.lock(Cell::get)
    }

    /// The taken request is about to run.  Still pending only if a newer
    /// one was signalled after the take.
    fn begin_cycle(&self) {
        self.armed.lock(|armed| {
            armed.set(self.signal.signaled() && !self.is_closed());
        });
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Take the pending request without waiting.
    pub fn try_take(&self) -> Option<WorkRequest> {
        self.signal.try_take()
    }

    async fn next(&self) -> WorkRequest {
        let req = self.signal.wait().await;
        if self.is_closed() {
            WorkRequest::Shutdown
        } else {
            req
        }
    }
}

impl Default for WorkSlot {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Worker
// ═══════════════════════════════════════════════════════════════

/// Side the worker runs deferred cycles on.
pub trait WorkTarget {
    fn work_slot(&self) -> &WorkSlot;

    /// Run one deferred cycle.  Called on the worker thread.
    fn run_deferred(&self);
}

async fn worker_loop<T: WorkTarget + ?Sized>(target: &T) {
    let slot = target.work_slot();
    let mut req = slot.next().await;
    loop {
        match req {
            WorkRequest::Shutdown => break,
            WorkRequest::Run { delay_ms } => {
                if delay_ms > 0 {
                    let elapsed = async {
                        Timer::after(Duration::from_millis(u64::from(delay_ms))).await;
                        None
                    };
                    let superseded = async { Some(slot.next().await) };
                    if let Some(newer) = future::or(elapsed, superseded).await {
                        debug!("deferred cycle superseded by {:?}", newer);
                        req = newer;
                        continue;
                    }
                }
                slot.begin_cycle();
                target.run_deferred();
                req = slot.next().await;
            }
        }
    }
    debug!("worker loop exited");
}

/// Owned worker thread.  Dropping it shuts the worker down and joins it.
pub struct Worker {
    slot: Arc<WorkSlot>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn the worker thread for `target`.
    pub fn spawn<T>(name: String, target: Arc<T>, slot: Arc<WorkSlot>) -> Result<Self, ResourceError>
    where
        T: WorkTarget + Send + Sync + 'static,
    {
        let handle = std::thread::Builder::new()
            .name(name)
            .spawn(move || future::block_on(worker_loop(&*target)))
            .map_err(|e| {
                error!("worker spawn failed: {}", e);
                ResourceError::WorkerSpawn
            })?;
        info!("deferred-work worker started");
        Ok(Self {
            slot,
            handle: Some(handle),
        })
    }

    /// Cancel pending work and wait for the worker to exit.  A cycle that
    /// is already running completes first.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.slot.shutdown();
        if handle.join().is_err() {
            error!("worker thread panicked");
        }
        info!("deferred-work worker stopped");
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}
