//! `midir` hardware backend.

use crate::access::{AccessOptions, InputConnection, MessageHandler, MidiAccess, MidiInputPort};
use crate::error::{AccessError, Error, Result};
use midir::{Ignore, MidiInput, MidiInputConnection};
use tracing::debug;

const CLIENT_NAME: &str = "igem-midi-input";
const PORT_NAME: &str = "igem-input";

/// Information about an available MIDI input device
#[derive(Debug, Clone)]
pub struct MidiInputDevice {
    /// Device index (for connection)
    pub index: usize,
    pub name: String,
}

/// Platform MIDI input through `midir`.
#[derive(Debug, Clone)]
pub struct MidirAccess {
    client_name: String,
}

impl MidirAccess {
    /// Fails if the platform MIDI service cannot be opened.
    pub fn new() -> Result<Self> {
        MidiInput::new(CLIENT_NAME)?;
        Ok(Self {
            client_name: CLIENT_NAME.to_string(),
        })
    }

    /// `None` when the runtime has no usable MIDI service.
    pub fn detect() -> Option<Self> {
        match Self::new() {
            Ok(access) => Some(access),
            Err(e) => {
                debug!("MIDI input unavailable: {}", e);
                None
            }
        }
    }

    pub fn list_devices(&self) -> Result<Vec<MidiInputDevice>> {
        let midi_input = MidiInput::new(&self.client_name)?;
        let devices = midi_input
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| MidiInputDevice {
                index,
                name: midi_input
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {}", index)),
            })
            .collect();
        Ok(devices)
    }
}

impl MidiAccess for MidirAccess {
    fn request_access(
        &self,
        options: AccessOptions,
    ) -> std::result::Result<Vec<Box<dyn MidiInputPort>>, AccessError> {
        let midi_input = MidiInput::new(&self.client_name).map_err(Error::from)?;
        let ports = midi_input
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| {
                Box::new(MidirPort {
                    client_name: self.client_name.clone(),
                    index,
                    name: midi_input.port_name(port).ok(),
                    sysex: options.sysex,
                }) as Box<dyn MidiInputPort>
            })
            .collect();
        Ok(ports)
    }
}

struct MidirPort {
    client_name: String,
    index: usize,
    name: Option<String>,
    sysex: bool,
}

impl MidirPort {
    fn open(self, mut handler: MessageHandler) -> Result<MidiInputConnection<()>> {
        let mut midi_input = MidiInput::new(&self.client_name)?;
        midi_input.ignore(if self.sysex {
            Ignore::None
        } else {
            Ignore::Sysex
        });

        let ports = midi_input.ports();
        let port = ports
            .get(self.index)
            .ok_or_else(|| Error::MidiPort(format!("MIDI device {} not found", self.index)))?;

        let connection = midi_input.connect(
            port,
            PORT_NAME,
            move |_timestamp, message, _| handler(message),
            (),
        )?;
        Ok(connection)
    }
}

impl MidiInputPort for MidirPort {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn connect(
        self: Box<Self>,
        handler: MessageHandler,
    ) -> std::result::Result<Box<dyn InputConnection>, AccessError> {
        let connection = (*self).open(handler)?;
        Ok(Box::new(MidirConnection(connection)))
    }
}

struct MidirConnection(MidiInputConnection<()>);

impl InputConnection for MidirConnection {
    fn close(self: Box<Self>) {
        let _ = self.0.close();
    }
}
