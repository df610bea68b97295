//! Builder for configuring and constructing an [`IgemEngine`].

use crate::arbiter::{InputArbiter, InputMode};
use crate::config::IgemConfig;
use crate::keyboard::OnScreenKeyboard;
use crate::recording::RecordingSession;
use crate::{IgemEngine, Result};
use igem_midi::Clock;
use igem_midi_io::{HardwareListener, MidiAccess};
use igem_synth::{AudioBackend, ToneSynth, Waveform};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

enum Capability<T> {
    /// Probe the platform backend (if compiled in) at build time.
    Platform,
    Provided(T),
    Absent,
}

/// Hardware input and audio output default to the platform backends
/// compiled in through the `midi-hardware` and `audio-output` features.
/// Either can be replaced (e.g. with `FakeMidiAccess` / `OfflineOutput`)
/// or switched off.
///
/// # Example
///
/// ```
/// use igem::prelude::*;
///
/// let output = OfflineOutput::new(48_000.0);
/// let mut engine = IgemEngine::builder()
///     .midi_access(FakeMidiAccess::with_devices(["Keystation 49"]))
///     .audio_backend(output.clone())
///     .clock(Clock::manual())
///     .build()?;
///
/// engine.key_down(60);
/// assert_eq!(engine.synth().voice_count(), 1);
/// # Ok::<(), igem::Error>(())
/// ```
pub struct IgemEngineBuilder {
    config: IgemConfig,
    midi: Capability<Arc<dyn MidiAccess>>,
    audio: Capability<Box<dyn AudioBackend>>,
    clock: Option<Clock>,
    connect_midi: bool,
}

impl Default for IgemEngineBuilder {
    fn default() -> Self {
        Self {
            config: IgemConfig::default(),
            midi: Capability::Platform,
            audio: Capability::Platform,
            clock: None,
            connect_midi: true,
        }
    }
}

impl IgemEngineBuilder {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: IgemConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 64
    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.config.log_capacity = capacity;
        self
    }

    /// Default: 120 ms
    pub fn pulse_duration(mut self, duration: Duration) -> Self {
        self.config.pulse_duration = duration;
        self
    }

    /// Default: 110
    pub fn on_screen_velocity(mut self, velocity: u8) -> Self {
        self.config.on_screen_velocity = velocity;
        self
    }

    /// Default: 4
    pub fn octave(mut self, octave: u8) -> Self {
        self.config.default_octave = octave;
        self
    }

    /// Default: 0.8
    pub fn master_gain(mut self, gain: f32) -> Self {
        self.config.master_gain = gain;
        self
    }

    pub fn waveform(mut self, waveform: Waveform) -> Self {
        self.config.waveform = waveform;
        self
    }

    /// Default: 124
    pub fn bpm(mut self, bpm: f32) -> Self {
        self.config.bpm = bpm;
        self
    }

    /// Default: [`InputMode::Auto`]
    pub fn mode(mut self, mode: InputMode) -> Self {
        self.config.initial_mode = mode;
        self
    }

    pub fn midi_access(mut self, access: impl MidiAccess + 'static) -> Self {
        self.midi = Capability::Provided(Arc::new(access));
        self
    }

    /// Behave as a runtime without note-input capability.
    pub fn no_midi(mut self) -> Self {
        self.midi = Capability::Absent;
        self
    }

    pub fn audio_backend(mut self, backend: impl AudioBackend + 'static) -> Self {
        self.audio = Capability::Provided(Box::new(backend));
        self
    }

    /// Behave as a runtime without audio output capability.
    pub fn no_audio(mut self) -> Self {
        self.audio = Capability::Absent;
        self
    }

    /// Default: system clock starting at build time
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Request hardware access on build (default). When off, call
    /// [`IgemEngine::connect_midi`] later.
    pub fn connect_midi(mut self, connect: bool) -> Self {
        self.connect_midi = connect;
        self
    }

    pub fn build(self) -> Result<IgemEngine> {
        self.config.validate()?;
        let config = self.config;
        let clock = self.clock.unwrap_or_default();

        let access = match self.midi {
            Capability::Platform => platform_midi(),
            Capability::Provided(access) => Some(access),
            Capability::Absent => None,
        };
        let backend = match self.audio {
            Capability::Platform => platform_audio(),
            Capability::Provided(backend) => Some(backend),
            Capability::Absent => None,
        };
        debug!(
            "Building engine (midi: {}, audio: {})",
            access.is_some(),
            backend.is_some()
        );

        let mut listener =
            HardwareListener::new(access, clock.clone()).with_capacity(config.log_capacity);
        if self.connect_midi {
            listener.activate();
        }

        let synth = ToneSynth::with_config(backend, config.synth_config());
        let keyboard = OnScreenKeyboard::new(clock.clone())
            .with_octave(config.octave())
            .with_velocity(config.on_screen_velocity);
        let arbiter = InputArbiter::new(
            config.initial_mode,
            config.log_capacity,
            config.pulse_duration,
        );
        let recording = RecordingSession::new(config.bpm);

        Ok(IgemEngine::from_parts(
            config, clock, listener, synth, keyboard, arbiter, recording,
        ))
    }
}

#[cfg(feature = "midi-hardware")]
fn platform_midi() -> Option<Arc<dyn MidiAccess>> {
    igem_midi_io::MidirAccess::detect().map(|access| Arc::new(access) as Arc<dyn MidiAccess>)
}

#[cfg(not(feature = "midi-hardware"))]
fn platform_midi() -> Option<Arc<dyn MidiAccess>> {
    None
}

#[cfg(feature = "audio-output")]
fn platform_audio() -> Option<Box<dyn AudioBackend>> {
    igem_synth::CpalOutput::detect().map(|output| Box::new(output) as Box<dyn AudioBackend>)
}

#[cfg(not(feature = "audio-output"))]
fn platform_audio() -> Option<Box<dyn AudioBackend>> {
    None
}
