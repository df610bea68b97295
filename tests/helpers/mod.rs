//! Test helpers and fixtures for igem integration tests
//!
//! Every fixture runs against the fake MIDI backend, the offline audio
//! backend and a manual clock, so no device is ever touched.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (reference pitch, unity gain)
//! - `DSP_EPSILON` (1e-4): Envelope and oscillator values
//! - `PERCEPTUAL_EPSILON` (0.001): Perceptual equivalence (-60dB)
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)

#![allow(dead_code)]

pub mod tolerances;

use igem::prelude::*;
use std::time::Duration;

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// How long to wait for the fake access thread to report.
pub const ACCESS_TIMEOUT: Duration = Duration::from_secs(2);

/// Engine wired to fakes, with the handles needed to drive it.
pub struct Rig {
    pub engine: IgemEngine,
    pub midi: FakeMidiAccess,
    pub output: OfflineOutput,
    pub clock: Clock,
}

impl Rig {
    /// Sends raw bytes from device 0 and pumps, then advances the clock 1 ms.
    pub fn play(&mut self, bytes: &[u8]) -> Vec<TaggedEvent> {
        assert!(self.midi.send(0, bytes), "fake device not connected");
        let accepted = self.engine.pump();
        self.clock.advance(Duration::from_millis(1));
        accepted
    }

    pub fn render(&self, duration: Duration) -> Vec<f32> {
        let frames = (duration.as_secs_f64() * TEST_SAMPLE_RATE) as usize;
        self.output.render(frames)
    }
}

pub fn rig_with(midi: FakeMidiAccess, mode: InputMode) -> Rig {
    let output = OfflineOutput::new(TEST_SAMPLE_RATE);
    let clock = Clock::manual();
    let mut engine = IgemEngine::builder()
        .midi_access(midi.clone())
        .audio_backend(output.clone())
        .clock(clock.clone())
        .mode(mode)
        .build()
        .expect("Failed to create test engine");
    engine.wait_for_midi(ACCESS_TIMEOUT);
    Rig {
        engine,
        midi,
        output,
        clock,
    }
}

/// Auto mode with one connected device.
pub fn connected_rig() -> Rig {
    rig_with(FakeMidiAccess::with_devices(["Test Keys"]), InputMode::Auto)
}

/// Auto mode, access granted but nothing plugged in.
pub fn deviceless_rig() -> Rig {
    rig_with(FakeMidiAccess::with_devices(Vec::<String>::new()), InputMode::Auto)
}

/// Calculate RMS (root mean square) of a buffer.
pub fn rms(buffer: &[f32]) -> f32 {
    if buffer.is_empty() {
        return 0.0;
    }
    let sum: f32 = buffer.iter().map(|x| x * x).sum();
    (sum / buffer.len() as f32).sqrt()
}

/// Calculate peak (absolute maximum) of a buffer.
pub fn peak(buffer: &[f32]) -> f32 {
    buffer.iter().map(|x| x.abs()).fold(0.0f32, |a, b| a.max(b))
}

/// Check if buffer is silent (all samples below threshold).
pub fn is_silent(buffer: &[f32]) -> bool {
    peak(buffer) < tolerances::SILENCE_THRESHOLD
}
