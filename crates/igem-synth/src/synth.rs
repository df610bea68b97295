//! Polyphonic tone synthesizer.
//!
//! One sine (or other [`Waveform`]) generator per sounding pitch, each
//! through its own enveloped gain into a shared master gain. The output
//! engine is opened lazily on first use.

use crate::backend::{AudioBackend, AudioEngine, EngineState};
use crate::error::{Error, Result};
use crate::graph::{GainId, NodeRef, Waveform};
use crate::voice::{
    velocity_to_amplitude, Voice, VoiceTable, ATTACK_PEAK_RATIO, ATTACK_TIME, ENVELOPE_FLOOR,
    RELEASE_TIME, SETTLE_TIME, STOP_TAIL, SUSTAIN_RATIO,
};
use igem_midi::note_to_hz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_MASTER_GAIN: f32 = 0.8;
pub const DEFAULT_VELOCITY: u8 = 100;

/// Audio output state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SynthStatus {
    #[default]
    Idle,
    Ready,
    /// Output exists but the engine is not running yet (e.g. awaiting a gesture).
    Blocked,
    Error,
}

impl SynthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthStatus::Idle => "idle",
            SynthStatus::Ready => "ready",
            SynthStatus::Blocked => "blocked",
            SynthStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for SynthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Master level, 0.0 - 1.0.
    pub master_gain: f32,
    pub waveform: Waveform,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            master_gain: DEFAULT_MASTER_GAIN,
            waveform: Waveform::Sine,
        }
    }
}

impl SynthConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.master_gain) {
            return Err(Error::InvalidConfig(format!(
                "master_gain must be within 0.0..=1.0, got {}",
                self.master_gain
            )));
        }
        Ok(())
    }
}

struct Output {
    engine: Box<dyn AudioEngine>,
    master: GainId,
}

/// Tone synthesizer driven by note-on/note-off calls.
///
/// Never returns errors from the note path: engine failures set
/// [`SynthStatus::Error`] and the call does nothing.
pub struct ToneSynth {
    backend: Option<Box<dyn AudioBackend>>,
    output: Option<Output>,
    voices: VoiceTable,
    status: SynthStatus,
    config: SynthConfig,
}

impl ToneSynth {
    /// `backend` is `None` when the runtime has no audio output capability.
    pub fn new(backend: Option<Box<dyn AudioBackend>>) -> Self {
        Self::with_config(backend, SynthConfig::default())
    }

    pub fn with_config(backend: Option<Box<dyn AudioBackend>>, config: SynthConfig) -> Self {
        Self {
            backend,
            output: None,
            voices: VoiceTable::new(),
            status: SynthStatus::Idle,
            config,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.backend.is_some()
    }

    pub fn status(&self) -> SynthStatus {
        self.status
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Applies to voices started from now on.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.config.waveform = waveform;
    }

    /// Opens the output graph if needed and resumes a suspended engine.
    ///
    /// Returns `true` only if the engine is running.
    pub fn ensure_started(&mut self) -> bool {
        match self.try_start() {
            Ok(running) => {
                self.set_status(if running {
                    SynthStatus::Ready
                } else {
                    SynthStatus::Blocked
                });
                running
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    fn try_start(&mut self) -> Result<bool> {
        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| Error::Unavailable("no audio output in this runtime".into()))?;

        if self.output.is_none() {
            let engine = backend.open()?;
            let master = {
                let mut graph = engine.graph().lock();
                let master = graph.create_gain(self.config.master_gain);
                graph.connect(master.into(), NodeRef::Destination)?;
                master
            };
            debug!(
                "Audio output opened at {} Hz",
                engine.graph().sample_rate()
            );
            self.output = Some(Output { engine, master });
        }

        let Some(output) = self.output.as_mut() else {
            return Ok(false);
        };
        if output.engine.state() == EngineState::Suspended {
            output.engine.resume()?;
        }
        Ok(output.engine.state() == EngineState::Running)
    }

    /// Starts a voice for `note` unless one is already sounding.
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        if note > 127 || !self.ensure_started() {
            return;
        }
        if self.voices.contains(note) {
            return;
        }

        match self.start_voice(note, velocity) {
            Ok(voice) => {
                self.voices.insert(voice);
                debug!("Voice on: note {} ({} active)", note, self.voices.len());
            }
            Err(e) => self.fail(e),
        }
    }

    /// `note_on` at [`DEFAULT_VELOCITY`].
    pub fn note_on_default(&mut self, note: u8) {
        self.note_on(note, DEFAULT_VELOCITY);
    }

    fn start_voice(&self, note: u8, velocity: u8) -> Result<Voice> {
        let output = self.output.as_ref().ok_or(Error::Closed)?;
        let frequency = note_to_hz(note as f32);
        let amplitude = velocity_to_amplitude(velocity);

        let mut graph = output.engine.graph().lock();
        let now = graph.current_time();

        let gain = graph.create_gain(ENVELOPE_FLOOR);
        graph.set_value_at_time(gain, ENVELOPE_FLOOR, now)?;
        let peak = amplitude * ATTACK_PEAK_RATIO;
        graph.exponential_ramp_to_value_at_time(gain, peak, now + ATTACK_TIME)?;
        let sustain = amplitude * SUSTAIN_RATIO;
        graph.exponential_ramp_to_value_at_time(gain, sustain, now + SETTLE_TIME)?;

        let oscillator = graph.create_oscillator(self.config.waveform, frequency);
        graph.connect(oscillator.into(), gain.into())?;
        graph.connect(gain.into(), output.master.into())?;
        graph.start(oscillator, now)?;

        Ok(Voice {
            note,
            oscillator,
            gain,
            frequency,
            amplitude,
            started_at: now,
        })
    }

    /// Releases the voice for `note`.
    ///
    /// The voice leaves the table immediately; its generator keeps sounding
    /// through the release tail. A new note-on for the same pitch during the
    /// tail starts an independent voice.
    pub fn note_off(&mut self, note: u8) {
        let Some(output) = &self.output else {
            return;
        };
        let Some(voice) = self.voices.get(note).copied() else {
            return;
        };

        let released = Self::release_voice(output, &voice);
        self.voices.remove(note);
        debug!("Voice off: note {} ({} active)", note, self.voices.len());

        if let Err(e) = released {
            self.fail(e);
        }
    }

    fn release_voice(output: &Output, voice: &Voice) -> Result<()> {
        let mut graph = output.engine.graph().lock();
        let now = graph.current_time();

        // Snapshot before cancelling so a mid-ramp release starts from what is heard.
        let current = graph.gain_value(voice.gain)?.max(ENVELOPE_FLOOR);
        graph.cancel_scheduled_values(voice.gain, now)?;
        graph.set_value_at_time(voice.gain, current, now)?;
        graph.exponential_ramp_to_value_at_time(voice.gain, ENVELOPE_FLOOR, now + RELEASE_TIME)?;

        if let Err(e) = graph.stop(voice.oscillator, now + RELEASE_TIME + STOP_TAIL) {
            debug!("Voice stop not scheduled: {}", e);
        }
        Ok(())
    }

    /// Releases every sounding voice. No-op before the output exists.
    pub fn stop_all(&mut self) {
        if self.output.is_none() {
            return;
        }
        for note in self.voices.notes() {
            self.note_off(note);
        }
    }

    /// Releases all voices and closes the engine. The next note-on reopens it.
    pub fn close(&mut self) {
        self.stop_all();
        if let Some(mut output) = self.output.take() {
            output.engine.close();
        }
        self.set_status(SynthStatus::Idle);
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn is_sounding(&self, note: u8) -> bool {
        self.voices.contains(note)
    }

    pub fn voice(&self, note: u8) -> Option<&Voice> {
        self.voices.get(note)
    }

    /// Sounding pitches in ascending order.
    pub fn active_notes(&self) -> Vec<u8> {
        self.voices.notes()
    }

    /// Engine clock, `None` before the output is opened.
    pub fn current_time(&self) -> Option<f64> {
        self.output
            .as_ref()
            .map(|o| o.engine.graph().current_time())
    }

    /// Graph of the opened output, for inspection.
    pub fn graph(&self) -> Option<&crate::GraphHandle> {
        self.output.as_ref().map(|o| o.engine.graph())
    }

    fn set_status(&mut self, status: SynthStatus) {
        if self.status != status {
            debug!("Synth status: {} -> {}", self.status, status);
            self.status = status;
        }
    }

    fn fail(&mut self, e: Error) {
        if self.status != SynthStatus::Error {
            warn!("Audio output error: {}", e);
        }
        self.set_status(SynthStatus::Error);
    }
}

impl std::fmt::Debug for ToneSynth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToneSynth")
            .field("status", &self.status)
            .field("voices", &self.voices.len())
            .field("config", &self.config)
            .finish()
    }
}
