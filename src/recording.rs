//! Recording sessions and takes.

use igem_midi::{TaggedEvent, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Length of the timeline, in bars.
pub const BAR_COUNT: u32 = 16;
pub const BEATS_PER_BAR: u32 = 4;
pub const DEFAULT_TAKE_NAME: &str = "Your MIDI Take";

/// `clamp(ceil(elapsed / bar_length), 1, 16)`, 4/4 time.
pub fn estimate_bars(elapsed: Duration, bpm: f32) -> u32 {
    let bar_secs = BEATS_PER_BAR as f64 * 60.0 / bpm as f64;
    if !(bar_secs.is_finite() && bar_secs > 0.0) {
        return 1;
    }
    let bars = (elapsed.as_secs_f64() / bar_secs).ceil();
    (bars as u32).clamp(1, BAR_COUNT)
}

/// Captured events from one start/stop cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Take {
    pub name: String,
    /// Arrival order.
    pub events: Vec<TaggedEvent>,
    pub started_at: Timestamp,
    pub duration: Duration,
    pub bars: u32,
}

impl Take {
    pub fn note_on_count(&self) -> usize {
        self.events.iter().filter(|e| e.event.is_note_on()).count()
    }
}

#[derive(Debug, Clone)]
pub struct RecordingSession {
    bpm: f32,
    started_at: Option<Timestamp>,
    events: Vec<TaggedEvent>,
}

impl RecordingSession {
    pub fn new(bpm: f32) -> Self {
        Self {
            bpm,
            started_at: None,
            events: Vec::new(),
        }
    }

    /// No-op while already recording.
    pub fn start(&mut self, now: Timestamp) {
        if self.started_at.is_some() {
            return;
        }
        debug!("Recording started");
        self.started_at = Some(now);
        self.events.clear();
    }

    /// `None` if not recording.
    pub fn stop(&mut self, now: Timestamp) -> Option<Take> {
        let started_at = self.started_at.take()?;
        let duration = now.saturating_since(started_at);
        let take = Take {
            name: DEFAULT_TAKE_NAME.to_string(),
            events: std::mem::take(&mut self.events),
            started_at,
            duration,
            bars: estimate_bars(duration, self.bpm),
        };
        debug!(
            "Recording stopped: {} events, {} bars",
            take.events.len(),
            take.bars
        );
        Some(take)
    }

    /// Captures `event` if recording.
    pub fn capture(&mut self, event: &TaggedEvent) {
        if self.started_at.is_some() {
            self.events.push(*event);
        }
    }

    pub fn is_recording(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn elapsed(&self, now: Timestamp) -> Duration {
        self.started_at
            .map_or(Duration::ZERO, |start| now.saturating_since(start))
    }

    pub fn captured(&self) -> &[TaggedEvent] {
        &self.events
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }
}
