//! Scripted hardware backend.
//!
//! Stands in for a real device in tests and demos: devices, the permission
//! outcome and raw message delivery are all driven by the caller.

use crate::access::{AccessOptions, InputConnection, MessageHandler, MidiAccess, MidiInputPort};
use crate::error::AccessError;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Outcome {
    Granted,
    NotAllowed,
    Security,
    Failed(String),
}

struct FakeDevice {
    name: Option<String>,
    handler: Option<MessageHandler>,
}

struct FakeState {
    outcome: Outcome,
    devices: Vec<FakeDevice>,
    requests: usize,
    last_options: Option<AccessOptions>,
    gate: Option<Receiver<()>>,
}

/// Scripted [`MidiAccess`]. Clones share state.
#[derive(Clone)]
pub struct FakeMidiAccess {
    state: Arc<Mutex<FakeState>>,
}

/// Holds a gated [`FakeMidiAccess`] request pending until opened.
pub struct AccessGate {
    tx: Sender<()>,
}

impl AccessGate {
    /// Lets the pending request resolve.
    pub fn open(&self) {
        let _ = self.tx.try_send(());
    }
}

impl FakeMidiAccess {
    fn from_parts(outcome: Outcome, devices: Vec<FakeDevice>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                outcome,
                devices,
                requests: 0,
                last_options: None,
                gate: None,
            })),
        }
    }

    /// Grants access and enumerates the named devices in order.
    pub fn with_devices<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let devices = names
            .into_iter()
            .map(|name| FakeDevice {
                name: Some(name.into()),
                handler: None,
            })
            .collect();
        Self::from_parts(Outcome::Granted, devices)
    }

    /// Grants access with a single device that reports no name.
    pub fn with_unnamed_device() -> Self {
        Self::from_parts(
            Outcome::Granted,
            vec![FakeDevice {
                name: None,
                handler: None,
            }],
        )
    }

    /// The user refuses the permission prompt.
    pub fn denied() -> Self {
        Self::from_parts(Outcome::NotAllowed, Vec::new())
    }

    pub fn security_rejected() -> Self {
        Self::from_parts(Outcome::Security, Vec::new())
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self::from_parts(Outcome::Failed(reason.into()), Vec::new())
    }

    /// Like [`with_devices`](Self::with_devices), but requests block until
    /// the returned gate is opened (a pending permission prompt).
    pub fn gated<I, S>(names: I) -> (Self, AccessGate)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let access = Self::with_devices(names);
        let (tx, rx) = bounded(1);
        access.state.lock().gate = Some(rx);
        (access, AccessGate { tx })
    }

    /// Delivers a raw message from device `index`.
    ///
    /// Returns `false` if that device has no subscribed handler.
    pub fn send(&self, index: usize, bytes: &[u8]) -> bool {
        let mut state = self.state.lock();
        match state.devices.get_mut(index).and_then(|d| d.handler.as_mut()) {
            Some(handler) => {
                handler(bytes);
                true
            }
            None => false,
        }
    }

    pub fn is_connected(&self, index: usize) -> bool {
        self.state
            .lock()
            .devices
            .get(index)
            .is_some_and(|d| d.handler.is_some())
    }

    /// Number of access requests received.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests
    }

    pub fn last_options(&self) -> Option<AccessOptions> {
        self.state.lock().last_options
    }
}

impl MidiAccess for FakeMidiAccess {
    fn request_access(
        &self,
        options: AccessOptions,
    ) -> Result<Vec<Box<dyn MidiInputPort>>, AccessError> {
        // Wait outside the lock so the test thread can keep using the fake.
        let gate = self.state.lock().gate.clone();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }

        let mut state = self.state.lock();
        state.requests += 1;
        state.last_options = Some(options);

        match &state.outcome {
            Outcome::Granted => Ok((0..state.devices.len())
                .map(|index| {
                    Box::new(FakePort {
                        state: Arc::clone(&self.state),
                        index,
                    }) as Box<dyn MidiInputPort>
                })
                .collect()),
            Outcome::NotAllowed => {
                Err(AccessError::NotAllowed("permission prompt dismissed".into()))
            }
            Outcome::Security => Err(AccessError::Security("blocked by policy".into())),
            Outcome::Failed(reason) => Err(AccessError::Failed(reason.clone())),
        }
    }
}

struct FakePort {
    state: Arc<Mutex<FakeState>>,
    index: usize,
}

impl MidiInputPort for FakePort {
    fn name(&self) -> Option<String> {
        self.state
            .lock()
            .devices
            .get(self.index)
            .and_then(|d| d.name.clone())
    }

    fn connect(
        self: Box<Self>,
        handler: MessageHandler,
    ) -> Result<Box<dyn InputConnection>, AccessError> {
        let FakePort { state, index } = *self;
        {
            let mut guard = state.lock();
            let device = guard
                .devices
                .get_mut(index)
                .ok_or_else(|| AccessError::Failed(format!("device {} unplugged", index)))?;
            device.handler = Some(handler);
        }

        Ok(Box::new(FakeConnection { state, index }))
    }
}

struct FakeConnection {
    state: Arc<Mutex<FakeState>>,
    index: usize,
}

impl InputConnection for FakeConnection {
    fn close(self: Box<Self>) {
        if let Some(device) = self.state.lock().devices.get_mut(self.index) {
            device.handler = None;
        }
    }
}
