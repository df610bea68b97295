//! Tone synthesizer for igem.
//!
//! - **[`ToneSynth`]** - per-pitch voices with a two-stage attack and exponential release
//! - **[`AutomationLane`]** - set-value / exponential-ramp scheduling against the engine clock
//! - **[`RenderGraph`]** - gain and oscillator nodes, rendered sample by sample
//! - **[`AudioBackend`]** / **[`AudioEngine`]** - output capability interface
//! - **[`OfflineOutput`]** - manually clocked backend for tests
//! - **[`CpalOutput`]** - physical output (feature: `cpal-output`)
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `cpal-output` | CPAL audio output (default) |

pub mod error;
pub use error::{Error, Result};

mod automation;
pub use automation::{AutomationEvent, AutomationLane};

mod graph;
pub use graph::{GainId, GraphHandle, NodeRef, OscillatorId, RenderGraph, Waveform};

mod backend;
pub use backend::{AudioBackend, AudioEngine, EngineState};

mod offline;
pub use offline::OfflineOutput;

#[cfg(feature = "cpal-output")]
mod output;
#[cfg(feature = "cpal-output")]
pub use output::CpalOutput;

pub mod voice;
pub use voice::{velocity_to_amplitude, Voice, VoiceTable};

mod synth;
pub use synth::{SynthConfig, SynthStatus, ToneSynth, DEFAULT_MASTER_GAIN, DEFAULT_VELOCITY};
