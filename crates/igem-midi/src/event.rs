//! Note events and raw-message decoding.

use crate::clock::Timestamp;
use midi_msg::{Channel, ChannelVoiceMsg, MidiMsg};
use serde::{Deserialize, Serialize};

const STATUS_NOTE_OFF: u8 = 0x80;
const STATUS_NOTE_ON: u8 = 0x90;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteKind {
    NoteOn,
    NoteOff,
}

/// Which producer an accepted event came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputSource {
    Hardware,
    OnScreen,
}

/// Immutable record of a single note-on or note-off.
///
/// Producers create untagged events; the arbitration layer attaches the
/// [`InputSource`] when it accepts one (see [`TaggedEvent`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteEvent {
    pub kind: NoteKind,
    /// 0-127, 60 = middle C.
    pub note: u8,
    /// 0-127.
    pub velocity: u8,
    /// 0-15. The on-screen keyboard always uses 0.
    pub channel: u8,
    pub timestamp: Timestamp,
}

impl NoteEvent {
    #[inline]
    pub fn note_on(note: u8, velocity: u8, channel: u8, timestamp: Timestamp) -> Self {
        Self {
            kind: NoteKind::NoteOn,
            note: note & 0x7F,
            velocity: velocity & 0x7F,
            channel: channel.min(15),
            timestamp,
        }
    }

    #[inline]
    pub fn note_off(note: u8, velocity: u8, channel: u8, timestamp: Timestamp) -> Self {
        Self {
            kind: NoteKind::NoteOff,
            note: note & 0x7F,
            velocity: velocity & 0x7F,
            channel: channel.min(15),
            timestamp,
        }
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        self.kind == NoteKind::NoteOn
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        self.kind == NoteKind::NoteOff
    }

    /// Decodes a raw hardware message.
    ///
    /// Returns `None` for anything that is not a note message: buffers shorter
    /// than three bytes, other commands, and malformed data bytes. A note-on
    /// with velocity 0 decodes as a note-off.
    pub fn from_bytes(bytes: &[u8], timestamp: Timestamp) -> Option<Self> {
        if bytes.len() < 3 {
            return None;
        }

        let command = bytes[0] & 0xF0;
        if command != STATUS_NOTE_ON && command != STATUS_NOTE_OFF {
            return None;
        }

        let (msg, _len) = MidiMsg::from_midi(&bytes[..3]).ok()?;
        let MidiMsg::ChannelVoice { channel, msg } = msg else {
            return None;
        };
        let channel = channel as u8;

        match msg {
            ChannelVoiceMsg::NoteOn { note, velocity } if velocity > 0 => {
                Some(Self::note_on(note, velocity, channel, timestamp))
            }
            ChannelVoiceMsg::NoteOn { note, velocity }
            | ChannelVoiceMsg::NoteOff { note, velocity } => {
                Some(Self::note_off(note, velocity, channel, timestamp))
            }
            _ => None,
        }
    }

    /// Encodes the event as a 3-byte channel-voice message.
    pub fn to_bytes(&self) -> Vec<u8> {
        let msg = match self.kind {
            NoteKind::NoteOn => ChannelVoiceMsg::NoteOn {
                note: self.note,
                velocity: self.velocity,
            },
            NoteKind::NoteOff => ChannelVoiceMsg::NoteOff {
                note: self.note,
                velocity: self.velocity,
            },
        };
        MidiMsg::ChannelVoice {
            channel: Channel::from_u8(self.channel),
            msg,
        }
        .to_midi()
    }

    #[inline]
    pub fn tagged(self, source: InputSource) -> TaggedEvent {
        TaggedEvent {
            source,
            event: self,
        }
    }
}

/// A [`NoteEvent`] accepted by arbitration, tagged with its producer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaggedEvent {
    pub source: InputSource,
    pub event: NoteEvent,
}

impl TaggedEvent {
    #[inline]
    pub fn kind(&self) -> NoteKind {
        self.event.kind
    }

    #[inline]
    pub fn note(&self) -> u8 {
        self.event.note
    }

    #[inline]
    pub fn velocity(&self) -> u8 {
        self.event.velocity
    }

    #[inline]
    pub fn timestamp(&self) -> Timestamp {
        self.event.timestamp
    }
}
