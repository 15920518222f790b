//! Per-button edge-detecting state machine.
//!
//! ## Transitions
//!
//! | State  | Touched (`status & mask == mask`) | Action                     |
//! |--------|-----------------------------------|----------------------------|
//! | Idle   | yes                               | report press, go Active    |
//! | Idle   | no                                | none (already released)    |
//! | Active | no                                | report release, go Idle    |
//! | Active | yes                               | none (still held)          |
//!
//! All buttons are evaluated in table order and the sink is synced once per
//! scan, so a consumer never sees half of one status read.
//!
//! [`ButtonSet::force_touch`] is the fail-safe hook: it marks a button
//! Active and reports a press without consulting any status.

use heapless::Vec;
use log::{debug, error, info};

use crate::app::ports::EventSink;
use crate::config::{ButtonConfig, MAX_BUTTONS};
use crate::error::{ConfigError, Error, ResourceError};
use crate::status::StatusBits;

/// Debounced state of one button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    #[default]
    Idle,
    Active,
}

/// One logical capacitive button or zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button {
    /// Status bits that must **all** be set for the button to count as touched.
    pub mask: u16,
    /// Output identifier reported to the sink.
    pub code: u16,
    state: ButtonState,
}

impl Button {
    pub const fn new(mask: u16, code: u16) -> Self {
        Self {
            mask,
            code,
            state: ButtonState::Idle,
        }
    }

    pub const fn state(&self) -> ButtonState {
        self.state
    }
}

impl From<&ButtonConfig> for Button {
    fn from(cfg: &ButtonConfig) -> Self {
        Self::new(cfg.mask, cfg.code)
    }
}

/// Ordered button table plus the sink it reports into.
///
/// Sized once at construction and never resized; only the per-button state
/// changes afterwards.
pub struct ButtonSet<K> {
    buttons: Vec<Button, MAX_BUTTONS>,
    sink: Option<K>,
}

impl<K: EventSink> ButtonSet<K> {
    /// Build the table from configuration.  Every button starts Idle.
    /// Entries beyond [`MAX_BUTTONS`] are dropped; configuration validation
    /// rejects such tables before they get here.
    pub fn new(config: &[ButtonConfig], sink: K) -> Self {
        let buttons = config.iter().take(MAX_BUTTONS).map(Button::from).collect();
        Self {
            buttons,
            sink: Some(sink),
        }
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    /// State of the button at `idx`.
    pub fn state(&self, idx: usize) -> Option<ButtonState> {
        self.buttons.get(idx).map(Button::state)
    }

    /// Snapshot of every button's state, in table order.
    pub fn states(&self) -> Vec<ButtonState, MAX_BUTTONS> {
        self.buttons.iter().map(Button::state).collect()
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    /// Borrow the sink, if still attached.
    pub fn sink(&self) -> Option<&K> {
        self.sink.as_ref()
    }

    /// Detach and return the sink.  Later scans fail with
    /// [`ResourceError::SinkDetached`].
    pub fn detach_sink(&mut self) -> Option<K> {
        self.sink.take()
    }

    /// Run one scan against `status`.  Returns the number of transitions
    /// reported.
    ///
    /// Fails without reporting anything when the table is empty or the sink
    /// has been detached.
    pub fn update(&mut self, status: StatusBits) -> Result<usize, Error> {
        if self.buttons.is_empty() {
            error!("button scan: no buttons configured");
            return Err(ConfigError::NoButtons.into());
        }
        let Some(sink) = self.sink.as_mut() else {
            error!("button scan: event sink detached");
            return Err(ResourceError::SinkDetached.into());
        };

        let mut reported = 0;
        for (idx, button) in self.buttons.iter_mut().enumerate() {
            let touched = status.contains_all(button.mask);
            match (button.state, touched) {
                (ButtonState::Idle, true) => {
                    info!("cap button {} touched", idx);
                    sink.report(button.code, true);
                    button.state = ButtonState::Active;
                    reported += 1;
                }
                (ButtonState::Idle, false) => {
                    debug!("button {} already released", idx);
                }
                (ButtonState::Active, false) => {
                    info!("cap button {} released", idx);
                    sink.report(button.code, false);
                    button.state = ButtonState::Idle;
                    reported += 1;
                }
                (ButtonState::Active, true) => {
                    debug!("button {} still touched", idx);
                }
            }
        }
        sink.sync();
        Ok(reported)
    }

    /// Fail-safe: mark button `idx` Active and report a press regardless of
    /// its current state.
    pub fn force_touch(&mut self, idx: usize) -> Result<(), Error> {
        let Some(button) = self.buttons.get_mut(idx) else {
            error!("forced touch: no button at index {}", idx);
            return Err(ConfigError::ValidationFailed("fail_safe_button out of range").into());
        };
        let Some(sink) = self.sink.as_mut() else {
            error!("forced touch: event sink detached");
            return Err(ResourceError::SinkDetached.into());
        };
        sink.report(button.code, true);
        button.state = ButtonState::Active;
        sink.sync();
        Ok(())
    }
}
