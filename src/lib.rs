//! # igem - note-input pipeline
//!
//! Hardware MIDI and an on-screen keyboard merged into one event bus that
//! drives a polyphonic tone synth and a bounded display log.
//!
//! ## Architecture
//!
//! igem is an umbrella crate that coordinates:
//! - **igem-midi** - note events, clock, raw-message decoding, event logs
//! - **igem-midi-io** - hardware listener (access, first-device binding, decoding)
//! - **igem-synth** - tone synth (voices, envelopes, render graph, audio output)
//!
//! and adds the arbitration layer ([`InputArbiter`]), the on-screen keyboard
//! ([`OnScreenKeyboard`]), recording sessions and monitor formatting, all
//! behind [`IgemEngine`].
//!
//! ## Quick Start
//!
//! ```
//! use igem::prelude::*;
//!
//! let mut engine = IgemEngine::builder()
//!     .no_midi()
//!     .audio_backend(OfflineOutput::new(48_000.0))
//!     .build()?;
//!
//! // Auto mode without a device: the on-screen keyboard plays.
//! let event = engine.key_down(60).unwrap();
//! assert_eq!(event.source, InputSource::OnScreen);
//! assert_eq!(engine.monitor_lines()[0].to_string(), "On • C4  vel 110");
//! # Ok::<(), igem::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `midi-hardware` - hardware input through midir (default)
//! - `audio-output` - audio output through CPAL (default)

pub mod error;
pub use error::{Error, Result};

pub mod arbiter;
pub use arbiter::{allow_hardware, HardwareState, InputArbiter, InputMode, NoteSink};

pub mod config;
pub use config::IgemConfig;

pub mod keyboard;
pub use keyboard::{KeyDef, OnScreenKeyboard};

pub mod monitor;
pub use monitor::{monitor_lines, status_label, MonitorLine};

mod pulse;
pub use pulse::Pulse;

pub mod recording;
pub use recording::{estimate_bars, RecordingSession, Take};

mod builder;
pub use builder::IgemEngineBuilder;

mod engine;
pub use engine::{EngineSnapshot, IgemEngine};

/// Re-export of igem-midi for direct access
pub use igem_midi as midi;
/// Re-export of igem-midi-io for direct access
pub use igem_midi_io as midi_io;
/// Re-export of igem-synth for direct access
pub use igem_synth as synth;

pub use igem_midi::{
    note_name, note_to_hz, Clock, EventLog, InputSource, NoteEvent, NoteKind, TaggedEvent,
    Timestamp,
};
pub use igem_midi_io::{ConnectionStatus, FakeMidiAccess, HardwareListener, MidiAccess};
pub use igem_synth::{
    AudioBackend, OfflineOutput, SynthConfig, SynthStatus, ToneSynth, Waveform,
};

#[cfg(feature = "midi-hardware")]
pub use igem_midi_io::MidirAccess;

#[cfg(feature = "audio-output")]
pub use igem_synth::CpalOutput;

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{Error, Result};
    pub use crate::{IgemConfig, IgemEngine, IgemEngineBuilder};
    pub use crate::{InputMode, MonitorLine, OnScreenKeyboard, Take};
    pub use crate::{Clock, InputSource, NoteEvent, NoteKind, TaggedEvent, Timestamp};
    pub use crate::{ConnectionStatus, FakeMidiAccess, MidiAccess};
    pub use crate::{AudioBackend, OfflineOutput, SynthStatus, Waveform};

    #[cfg(feature = "midi-hardware")]
    pub use crate::MidirAccess;

    #[cfg(feature = "audio-output")]
    pub use crate::CpalOutput;
}
