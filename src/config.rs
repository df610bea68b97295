//! Engine configuration.

use crate::arbiter::InputMode;
use crate::error::{Error, Result};
use crate::keyboard::{MAX_OCTAVE, MIN_OCTAVE};
use igem_midi::DEFAULT_LOG_CAPACITY;
use igem_synth::{SynthConfig, Waveform, DEFAULT_MASTER_GAIN};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Velocity of every on-screen key press.
pub const DEFAULT_ON_SCREEN_VELOCITY: u8 = 110;
pub const DEFAULT_OCTAVE: u8 = 4;
pub const DEFAULT_PULSE_DURATION: Duration = Duration::from_millis(120);
pub const DEFAULT_BPM: f32 = 124.0;

const MIN_BPM: f32 = 40.0;
const MAX_BPM: f32 = 220.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgemConfig {
    /// Cap of the merged display log and the hardware rolling buffer.
    pub log_capacity: usize,
    /// How long the note-on pulse stays lit.
    pub pulse_duration: Duration,
    pub on_screen_velocity: u8,
    /// Clamped to 1-7 when applied.
    pub default_octave: u8,
    pub master_gain: f32,
    pub waveform: Waveform,
    /// Only used to estimate recording length in bars.
    pub bpm: f32,
    pub initial_mode: InputMode,
}

impl Default for IgemConfig {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            pulse_duration: DEFAULT_PULSE_DURATION,
            on_screen_velocity: DEFAULT_ON_SCREEN_VELOCITY,
            default_octave: DEFAULT_OCTAVE,
            master_gain: DEFAULT_MASTER_GAIN,
            waveform: Waveform::Sine,
            bpm: DEFAULT_BPM,
            initial_mode: InputMode::Auto,
        }
    }
}

impl IgemConfig {
    pub fn validate(&self) -> Result<()> {
        if self.log_capacity == 0 {
            return Err(Error::InvalidConfig("log_capacity must be at least 1".into()));
        }
        if !(1..=127).contains(&self.on_screen_velocity) {
            return Err(Error::InvalidConfig(format!(
                "on_screen_velocity must be within 1..=127, got {}",
                self.on_screen_velocity
            )));
        }
        if !(MIN_BPM..=MAX_BPM).contains(&self.bpm) {
            return Err(Error::InvalidConfig(format!(
                "bpm must be within {MIN_BPM}..={MAX_BPM}, got {}",
                self.bpm
            )));
        }
        self.synth_config().validate()?;
        Ok(())
    }

    pub fn synth_config(&self) -> SynthConfig {
        SynthConfig {
            master_gain: self.master_gain,
            waveform: self.waveform,
        }
    }

    /// `default_octave` clamped into the keyboard's range.
    pub fn octave(&self) -> u8 {
        self.default_octave.clamp(MIN_OCTAVE, MAX_OCTAVE)
    }
}
