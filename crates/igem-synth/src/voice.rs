//! Voices and the pitch-keyed voice table.
//!
//! The table is the sole authority on whether a pitch is sounding: at most
//! one voice per note number, indexed directly by note.

use crate::graph::{GainId, OscillatorId};
use igem_midi::velocity_to_gain;

/// Envelope floor. Exponential ramps cannot reach zero.
pub const ENVELOPE_FLOOR: f32 = 0.0001;

/// Attack peak, as a fraction of the voice amplitude.
pub const ATTACK_PEAK_RATIO: f32 = 0.6;
/// Level the attack settles to, as a fraction of the voice amplitude.
pub const SUSTAIN_RATIO: f32 = 0.35;

/// Seconds from note-on to the attack peak.
pub const ATTACK_TIME: f64 = 0.01;
/// Seconds from note-on to the settled level.
pub const SETTLE_TIME: f64 = 0.12;
/// Seconds from note-off to the floor.
pub const RELEASE_TIME: f64 = 0.08;
/// Seconds after the release completes before the generator stops.
pub const STOP_TAIL: f64 = 0.01;

const MIN_AMPLITUDE: f32 = 0.02;
const MAX_AMPLITUDE: f32 = 1.0;
const NOTE_COUNT: usize = 128;

/// `clamp(velocity / 127, 0.02, 1.0)`
#[inline]
pub fn velocity_to_amplitude(velocity: u8) -> f32 {
    velocity_to_gain(velocity).clamp(MIN_AMPLITUDE, MAX_AMPLITUDE)
}

/// A live sound-producing unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    pub note: u8,
    pub oscillator: OscillatorId,
    /// Per-voice amplitude control.
    pub gain: GainId,
    pub frequency: f32,
    /// Target amplitude derived from velocity.
    pub amplitude: f32,
    /// Engine time of note-on, seconds.
    pub started_at: f64,
}

/// Note-indexed voice table.
#[derive(Debug, Clone)]
pub struct VoiceTable {
    slots: [Option<Voice>; NOTE_COUNT],
    active: usize,
}

impl VoiceTable {
    pub fn new() -> Self {
        Self {
            slots: [None; NOTE_COUNT],
            active: 0,
        }
    }

    #[inline]
    pub fn get(&self, note: u8) -> Option<&Voice> {
        self.slots.get(note as usize).and_then(|s| s.as_ref())
    }

    #[inline]
    pub fn contains(&self, note: u8) -> bool {
        self.get(note).is_some()
    }

    /// Registers `voice` unless its pitch is already sounding.
    ///
    /// Returns `false` (and drops `voice`) when the slot is occupied.
    pub fn insert(&mut self, voice: Voice) -> bool {
        let Some(slot) = self.slots.get_mut(voice.note as usize) else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(voice);
        self.active += 1;
        true
    }

    pub fn remove(&mut self, note: u8) -> Option<Voice> {
        let voice = self.slots.get_mut(note as usize)?.take()?;
        self.active -= 1;
        Some(voice)
    }

    /// Sounding pitches in ascending order.
    pub fn notes(&self) -> Vec<u8> {
        self.slots
            .iter()
            .filter_map(|s| s.as_ref().map(|v| v.note))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.active
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }
}

impl Default for VoiceTable {
    fn default() -> Self {
        Self::new()
    }
}
