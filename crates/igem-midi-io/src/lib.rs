//! Hardware note input for igem.
//!
//! - [`HardwareListener`]: acquires access, binds the first device, decodes its messages
//! - [`MidiAccess`] / [`MidiInputPort`]: capability interface the listener talks to
//! - [`MidirAccess`]: platform backend (feature `midi-io`)
//! - [`FakeMidiAccess`]: scripted backend for tests and demos
//!
//! Feature gates: `midi-io` (hardware I/O through `midir`).

pub mod error;
pub use error::{AccessError, Error, Result};

mod access;
pub use access::{AccessOptions, InputConnection, MessageHandler, MidiAccess, MidiInputPort};

mod listener;
pub use listener::{ConnectionStatus, HardwareListener, DEFAULT_DEVICE_NAME, NO_DEVICE_NAME};

mod fake;
pub use fake::{AccessGate, FakeMidiAccess};

#[cfg(feature = "midi-io")]
pub(crate) mod io;

#[cfg(feature = "midi-io")]
pub use io::{MidiInputDevice, MidirAccess};

pub use igem_midi::{Clock, NoteEvent, NoteKind, Timestamp};
