//! Capability interface over the platform's hardware note input.
//!
//! The listener only talks to these traits, so it can run against the
//! `midir` backend or a scripted fake without any real device.

use crate::error::AccessError;

/// Receives each raw incoming message, on whatever thread the backend uses.
pub type MessageHandler = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Options passed with an access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessOptions {
    /// Raw system-exclusive passthrough. igem always declines it.
    pub sysex: bool,
}

/// Entry point to hardware note input.
///
/// `request_access` may block for an arbitrary time (e.g. a permission
/// prompt); the listener calls it off the owner's thread.
pub trait MidiAccess: Send + Sync {
    /// Acquires access and enumerates connected input devices.
    fn request_access(
        &self,
        options: AccessOptions,
    ) -> Result<Vec<Box<dyn MidiInputPort>>, AccessError>;
}

/// An enumerated input device.
pub trait MidiInputPort: Send {
    fn name(&self) -> Option<String>;

    /// Subscribes `handler` to this device's messages.
    fn connect(
        self: Box<Self>,
        handler: MessageHandler,
    ) -> Result<Box<dyn InputConnection>, AccessError>;
}

/// A live subscription. Closing it detaches the message handler.
pub trait InputConnection {
    fn close(self: Box<Self>);
}
