//! Text formatting for note monitors.

use igem_midi::{note_name, InputSource, NoteEvent, NoteKind, TaggedEvent};
use igem_midi_io::ConnectionStatus;
use std::fmt;

/// Monitors show at most this many of the newest entries.
pub const MONITOR_LINES: usize = 10;
pub const EMPTY_MONITOR_TEXT: &str = "Play your MIDI keyboard…";

/// One displayed event, e.g. `On • C4` with `vel 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorLine {
    pub kind: NoteKind,
    pub note: u8,
    pub velocity: u8,
    /// `None` for untagged hardware buffer entries.
    pub source: Option<InputSource>,
}

impl MonitorLine {
    /// `On • C4`
    pub fn label(&self) -> String {
        let kind = match self.kind {
            NoteKind::NoteOn => "On",
            NoteKind::NoteOff => "Off",
        };
        format!("{kind} • {}", note_name(self.note))
    }

    /// `vel 100`
    pub fn velocity_label(&self) -> String {
        format!("vel {}", self.velocity)
    }
}

impl fmt::Display for MonitorLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.label(), self.velocity_label())
    }
}

impl From<&NoteEvent> for MonitorLine {
    fn from(event: &NoteEvent) -> Self {
        Self {
            kind: event.kind,
            note: event.note,
            velocity: event.velocity,
            source: None,
        }
    }
}

impl From<&TaggedEvent> for MonitorLine {
    fn from(tagged: &TaggedEvent) -> Self {
        Self {
            source: Some(tagged.source),
            ..MonitorLine::from(&tagged.event)
        }
    }
}

/// The newest [`MONITOR_LINES`] entries of a newest-first sequence.
pub fn monitor_lines<'a, T>(entries: impl IntoIterator<Item = &'a T>) -> Vec<MonitorLine>
where
    T: 'a,
    MonitorLine: From<&'a T>,
{
    entries
        .into_iter()
        .take(MONITOR_LINES)
        .map(MonitorLine::from)
        .collect()
}

/// Connection status text, with the bound device name when there is one.
pub fn status_label(status: ConnectionStatus, input_name: Option<&str>) -> String {
    match input_name {
        Some(name) if !name.is_empty() => format!("{status} • {name}"),
        _ => status.to_string(),
    }
}
