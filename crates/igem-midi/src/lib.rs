//! Note-input types shared by every igem subsystem.
//!
//! - [`NoteEvent`] / [`TaggedEvent`]: discrete note-on/note-off occurrences
//! - [`Clock`] / [`Timestamp`]: the monotonic clock both input sources stamp events with
//! - [`EventLog`]: bounded, newest-first history used by monitors and buffers
//! - Note utilities: [`note_to_hz`], [`note_name`], [`velocity_to_gain`]
//!
//! # Example
//!
//! ```
//! use igem_midi::{Clock, NoteEvent, NoteKind};
//!
//! let clock = Clock::manual();
//! let event = NoteEvent::from_bytes(&[0x90, 60, 0], clock.now()).unwrap();
//!
//! // Velocity zero on a note-on is a note-off.
//! assert_eq!(event.kind, NoteKind::NoteOff);
//! ```

mod clock;
pub use clock::{Clock, Timestamp};

pub(crate) mod event;
pub use event::{InputSource, NoteEvent, NoteKind, TaggedEvent};

mod log;
pub use log::{EventLog, DEFAULT_LOG_CAPACITY};

pub mod note;
pub use note::{is_sharp, note_name, note_to_hz, velocity_to_gain, A4_FREQ, A4_NOTE};

// Re-export the upstream message types used for encoding.
pub use midi_msg::{Channel, ChannelVoiceMsg, MidiMsg};
