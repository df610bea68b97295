//! Transient note-on indicator.

use igem_midi::Timestamp;
use std::time::Duration;

/// Flag that lights on trigger and clears itself after a fixed duration.
///
/// Re-triggering while lit restarts the timer instead of stacking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    duration: Duration,
    lit_until: Option<Timestamp>,
}

impl Pulse {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            lit_until: None,
        }
    }

    pub fn trigger(&mut self, now: Timestamp) {
        self.lit_until = now.checked_add(self.duration);
    }

    #[inline]
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.lit_until.is_some_and(|until| now < until)
    }

    /// Clears an expired pulse. Returns `true` if it went dark on this call.
    pub fn update(&mut self, now: Timestamp) -> bool {
        match self.lit_until {
            Some(until) if now >= until => {
                self.lit_until = None;
                true
            }
            _ => false,
        }
    }
}
