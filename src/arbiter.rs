//! Input arbitration and the merged event log.
//!
//! The arbiter is the single merge point between the two producers
//! (hardware listener, on-screen keyboard) and the two consumers (the
//! synth and the display log). It is invoked once per incoming event.

use crate::pulse::Pulse;
use igem_midi::{EventLog, InputSource, NoteEvent, NoteKind, TaggedEvent, Timestamp};
use igem_midi_io::ConnectionStatus;
use igem_synth::ToneSynth;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Which producer is authoritative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InputMode {
    /// Hardware when a device is bound, otherwise on-screen.
    #[default]
    Auto,
    OnScreenOnly,
    HardwareOnly,
}

impl InputMode {
    pub const ALL: [InputMode; 3] = [
        InputMode::Auto,
        InputMode::OnScreenOnly,
        InputMode::HardwareOnly,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            InputMode::Auto => "Auto",
            InputMode::OnScreenOnly => "On-screen",
            InputMode::HardwareOnly => "MIDI",
        }
    }
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Hardware connection facts the arbiter gates on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HardwareState {
    pub status: ConnectionStatus,
    /// A real device is bound (not the "no devices" sentinel).
    pub has_device: bool,
}

impl HardwareState {
    pub const DISCONNECTED: HardwareState = HardwareState {
        status: ConnectionStatus::Idle,
        has_device: false,
    };
}

/// `mode == HardwareOnly || (mode == Auto && status == Ready && has_device)`
#[inline]
pub fn allow_hardware(mode: InputMode, hardware: HardwareState) -> bool {
    match mode {
        InputMode::HardwareOnly => true,
        InputMode::Auto => hardware.status == ConnectionStatus::Ready && hardware.has_device,
        InputMode::OnScreenOnly => false,
    }
}

/// Consumer of accepted note events.
pub trait NoteSink {
    fn note_on(&mut self, note: u8, velocity: u8);
    fn note_off(&mut self, note: u8);
}

impl NoteSink for ToneSynth {
    fn note_on(&mut self, note: u8, velocity: u8) {
        ToneSynth::note_on(self, note, velocity);
    }

    fn note_off(&mut self, note: u8) {
        ToneSynth::note_off(self, note);
    }
}

#[derive(Debug, Clone)]
pub struct InputArbiter {
    mode: InputMode,
    log: EventLog<TaggedEvent>,
    last_hardware: Option<Timestamp>,
    pulse: Pulse,
}

impl InputArbiter {
    pub fn new(mode: InputMode, log_capacity: usize, pulse_duration: Duration) -> Self {
        Self {
            mode,
            log: EventLog::new(log_capacity),
            last_hardware: None,
            pulse: Pulse::new(pulse_duration),
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Takes effect for the next event. Held notes are left alone.
    pub fn set_mode(&mut self, mode: InputMode) {
        if self.mode != mode {
            debug!("Input mode: {} -> {}", self.mode, mode);
            self.mode = mode;
        }
    }

    /// Forwards a hardware event if the mode allows it and it is not a replay
    /// of the last one observed.
    pub fn handle_hardware(
        &mut self,
        event: NoteEvent,
        hardware: HardwareState,
        sink: &mut impl NoteSink,
    ) -> Option<TaggedEvent> {
        if !allow_hardware(self.mode, hardware) {
            return None;
        }
        if self.last_hardware == Some(event.timestamp) {
            return None;
        }
        self.last_hardware = Some(event.timestamp);
        Some(self.accept(event.tagged(InputSource::Hardware), sink))
    }

    /// Forwards an on-screen event unless the mode is hardware-only.
    pub fn handle_on_screen(
        &mut self,
        event: NoteEvent,
        sink: &mut impl NoteSink,
    ) -> Option<TaggedEvent> {
        if self.mode == InputMode::HardwareOnly {
            return None;
        }
        Some(self.accept(event.tagged(InputSource::OnScreen), sink))
    }

    fn accept(&mut self, tagged: TaggedEvent, sink: &mut impl NoteSink) -> TaggedEvent {
        match tagged.kind() {
            NoteKind::NoteOn => {
                sink.note_on(tagged.note(), tagged.velocity());
                self.pulse.trigger(tagged.timestamp());
            }
            NoteKind::NoteOff => sink.note_off(tagged.note()),
        }
        self.log.push(tagged);
        tagged
    }

    /// Merged log, newest first.
    pub fn log(&self) -> &EventLog<TaggedEvent> {
        &self.log
    }

    /// Empties the log. Voices and the de-duplication marker are kept.
    pub fn clear(&mut self) {
        self.log.clear();
    }

    pub fn is_pulsing(&self, now: Timestamp) -> bool {
        self.pulse.is_active(now)
    }

    /// Clears an expired pulse; `true` if it went dark on this call.
    pub fn update_pulse(&mut self, now: Timestamp) -> bool {
        self.pulse.update(now)
    }

    pub fn last_hardware_timestamp(&self) -> Option<Timestamp> {
        self.last_hardware
    }
}
