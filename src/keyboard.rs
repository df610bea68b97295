//! Pointer-driven on-screen keyboard.
//!
//! One octave of keys is visible at a time. Pointer handlers return the
//! note event to feed to the arbiter, or `None` when the gesture produces
//! nothing. Presses are gated on the input mode; releases never are.

use crate::arbiter::InputMode;
use crate::config::{DEFAULT_OCTAVE, DEFAULT_ON_SCREEN_VELOCITY};
use igem_midi::{is_sharp, note_name, Clock, NoteEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

pub const MIN_OCTAVE: u8 = 1;
pub const MAX_OCTAVE: u8 = 7;

/// The on-screen keyboard always sends on channel 0.
pub const ON_SCREEN_CHANNEL: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDef {
    pub note: u8,
    pub name: String,
    pub black: bool,
}

/// Lowest note of `octave`, scientific pitch (octave 4 starts at 60).
#[inline]
pub fn octave_base(octave: u8) -> u8 {
    (octave.clamp(MIN_OCTAVE, MAX_OCTAVE) + 1) * 12
}

#[derive(Debug, Clone)]
pub struct OnScreenKeyboard {
    octave: u8,
    velocity: u8,
    active: BTreeSet<u8>,
    // One flag for all keys, so a drag from any pressed key glides.
    pointer_down: bool,
    clock: Clock,
}

impl OnScreenKeyboard {
    pub fn new(clock: Clock) -> Self {
        Self {
            octave: DEFAULT_OCTAVE,
            velocity: DEFAULT_ON_SCREEN_VELOCITY,
            active: BTreeSet::new(),
            pointer_down: false,
            clock,
        }
    }

    pub fn with_octave(mut self, octave: u8) -> Self {
        self.set_octave(octave);
        self
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity.clamp(1, 127);
        self
    }

    pub fn octave(&self) -> u8 {
        self.octave
    }

    /// Clamped to 1-7. Held keys stay held.
    pub fn set_octave(&mut self, octave: u8) {
        self.octave = octave.clamp(MIN_OCTAVE, MAX_OCTAVE);
    }

    pub fn octave_up(&mut self) {
        self.set_octave(self.octave.saturating_add(1));
    }

    pub fn octave_down(&mut self) {
        self.set_octave(self.octave.saturating_sub(1));
    }

    pub fn base_note(&self) -> u8 {
        octave_base(self.octave)
    }

    /// The 12 keys of the visible octave, sorted by note.
    pub fn keys(&self) -> Vec<KeyDef> {
        let base = self.base_note();
        (base..base + 12)
            .map(|note| KeyDef {
                note,
                name: note_name(note),
                black: is_sharp(note),
            })
            .collect()
    }

    /// e.g. `"Oct 4 (C4)"`
    pub fn octave_label(&self) -> String {
        format!("Oct {} ({})", self.octave, note_name(self.base_note()))
    }

    pub fn pointer_down(&mut self, note: u8, mode: InputMode) -> Option<NoteEvent> {
        self.pointer_down = true;
        self.press(note, mode)
    }

    /// Glissando: presses only while a pointer-down is in progress.
    pub fn pointer_enter(&mut self, note: u8, mode: InputMode) -> Option<NoteEvent> {
        if !self.pointer_down {
            return None;
        }
        self.press(note, mode)
    }

    pub fn pointer_up(&mut self, note: u8) -> Option<NoteEvent> {
        self.pointer_down = false;
        self.release(note)
    }

    pub fn pointer_leave(&mut self, note: u8) -> Option<NoteEvent> {
        self.release(note)
    }

    /// Releases every active key and ends any press in progress.
    pub fn stop_notes(&mut self) -> Vec<NoteEvent> {
        self.pointer_down = false;
        let held = std::mem::take(&mut self.active);
        if !held.is_empty() {
            debug!("Releasing {} on-screen keys", held.len());
        }
        let now = self.clock.now();
        held.into_iter()
            .map(|note| NoteEvent::note_off(note, 0, ON_SCREEN_CHANNEL, now))
            .collect()
    }

    pub fn is_active(&self, note: u8) -> bool {
        self.active.contains(&note)
    }

    /// Active keys in ascending order.
    pub fn active_notes(&self) -> Vec<u8> {
        self.active.iter().copied().collect()
    }

    pub fn is_pointer_down(&self) -> bool {
        self.pointer_down
    }

    fn press(&mut self, note: u8, mode: InputMode) -> Option<NoteEvent> {
        if mode == InputMode::HardwareOnly || note > 127 {
            return None;
        }
        self.active.insert(note);
        Some(NoteEvent::note_on(
            note,
            self.velocity,
            ON_SCREEN_CHANNEL,
            self.clock.now(),
        ))
    }

    fn release(&mut self, note: u8) -> Option<NoteEvent> {
        if note > 127 {
            return None;
        }
        self.active.remove(&note);
        Some(NoteEvent::note_off(
            note,
            0,
            ON_SCREEN_CHANNEL,
            self.clock.now(),
        ))
    }
}
