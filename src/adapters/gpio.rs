//! [`InterruptSource`] over an active-low NIRQ input pin.
//!
//! The pin only answers level queries.  Edge delivery comes from whatever
//! the host uses for GPIO interrupts: its handler calls
//! [`EdgeTrigger::fire`] on every falling edge.  The trigger is a separate,
//! cloneable handle because the line itself is owned by the device once
//! probed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use embedded_hal::digital::InputPin;
use log::{debug, warn};

use crate::app::ports::InterruptSource;
use crate::error::ResourceError;
use crate::scheduler::IrqNotifier;

#[derive(Default)]
struct EdgeState {
    notifier: Mutex<Option<IrqNotifier>>,
    enabled: AtomicBool,
}

/// Host-side handle for delivering edges.
#[derive(Clone, Default)]
pub struct EdgeTrigger {
    state: Arc<EdgeState>,
}

impl EdgeTrigger {
    /// Deliver one edge.  Returns `false` when the line is masked or no
    /// device is registered.
    pub fn fire(&self) -> bool {
        if !self.state.enabled.load(Ordering::SeqCst) {
            return false;
        }
        let notifier = self
            .state
            .notifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        notifier.is_some_and(|n| n.notify())
    }
}

pub struct GpioIrqLine<P> {
    pin: P,
    trigger: EdgeTrigger,
}

impl<P: InputPin> GpioIrqLine<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            trigger: EdgeTrigger::default(),
        }
    }

    /// Handle for the host's edge handler.
    pub fn trigger(&self) -> EdgeTrigger {
        self.trigger.clone()
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: InputPin> InterruptSource for GpioIrqLine<P> {
    fn register(&mut self, notifier: IrqNotifier) -> Result<(), ResourceError> {
        let mut slot = self
            .trigger
            .state
            .notifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            warn!("NIRQ line already registered");
            return Err(ResourceError::IrqRegistration);
        }
        *slot = Some(notifier);
        Ok(())
    }

    fn unregister(&mut self) {
        self.trigger.state.enabled.store(false, Ordering::SeqCst);
        *self
            .trigger
            .state
            .notifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn enable(&mut self) {
        self.trigger.state.enabled.store(true, Ordering::SeqCst);
    }

    fn disable(&mut self) {
        self.trigger.state.enabled.store(false, Ordering::SeqCst);
    }

    fn is_asserted(&mut self) -> Option<bool> {
        match self.pin.is_low() {
            Ok(low) => Some(low),
            Err(_) => {
                debug!("NIRQ level read failed");
                None
            }
        }
    }
}
