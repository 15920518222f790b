//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing key transitions to the `log` facade.
//! Useful on bring-up boards before an input subsystem exists; a real
//! input adapter implements the same trait.

use heapless::Vec;
use log::info;

use crate::app::events::KeyEvent;
use crate::app::ports::EventSink;

/// Reports batched per scan, flushed as one log line on `sync`.
const BATCH: usize = 8;

/// Adapter that logs every [`KeyEvent`] batch.
#[derive(Default)]
pub struct LogEventSink {
    batch: Vec<KeyEvent, BATCH>,
    flushed: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-empty batches flushed so far.
    pub fn flushed(&self) -> u32 {
        self.flushed
    }
}

impl EventSink for LogEventSink {
    fn report(&mut self, code: u16, pressed: bool) {
        let event = KeyEvent { code, pressed };
        if self.batch.push(event).is_err() {
            // Table never exceeds BATCH buttons; log rather than drop.
            info!("KEY | {}", event);
        }
    }

    fn sync(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        for event in &self.batch {
            info!("KEY | {}", event);
        }
        info!("KEY | sync ({} events)", self.batch.len());
        self.batch.clear();
        self.flushed = self.flushed.wrapping_add(1);
    }
}
