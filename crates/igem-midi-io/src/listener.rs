//! Hardware Input Listener
//!
//! Acquires the platform's note-input capability off the owner's thread,
//! binds the first enumerated device and decodes its raw messages into
//! [`NoteEvent`]s. All state changes are applied on the owner's thread in
//! [`HardwareListener::poll`].

use crate::access::{AccessOptions, InputConnection, MidiAccess, MidiInputPort};
use crate::error::AccessError;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TrySendError};
use igem_midi::{Clock, EventLog, NoteEvent, DEFAULT_LOG_CAPACITY};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Reported as the device name when access succeeds with nothing plugged in.
pub const NO_DEVICE_NAME: &str = "No MIDI devices found";

/// Used when the bound device has no name.
pub const DEFAULT_DEVICE_NAME: &str = "MIDI Input";

const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Hardware connection state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Connecting,
    Ready,
    Unsupported,
    PermissionDenied,
    Error,
}

impl ConnectionStatus {
    /// States that never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Unsupported
                | ConnectionStatus::PermissionDenied
                | ConnectionStatus::Error
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Idle => "idle",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Ready => "connected",
            ConnectionStatus::Unsupported => "unsupported",
            ConnectionStatus::PermissionDenied => "denied",
            ConnectionStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

type AccessOutcome = Result<Vec<Box<dyn MidiInputPort>>, AccessError>;

/// Raw message captured on the backend's callback thread.
struct RawMessage {
    bytes: Vec<u8>,
    received: Instant,
}

/// Listens to the first hardware input device.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use igem_midi::Clock;
/// use igem_midi_io::{ConnectionStatus, FakeMidiAccess, HardwareListener};
///
/// let access = FakeMidiAccess::with_devices(["Keystation 49"]);
/// let mut listener = HardwareListener::new(Some(Arc::new(access.clone())), Clock::manual());
///
/// listener.activate();
/// listener.wait_for_access(Duration::from_secs(1));
/// assert_eq!(listener.status(), ConnectionStatus::Ready);
///
/// access.send(0, &[0x90, 60, 100]);
/// let events = listener.poll();
/// assert_eq!(events[0].note, 60);
/// ```
pub struct HardwareListener {
    access: Option<Arc<dyn MidiAccess>>,
    clock: Clock,
    status: ConnectionStatus,
    input_name: Option<String>,
    buffer: EventLog<NoteEvent>,
    pending: Option<Receiver<AccessOutcome>>,
    disposed: Arc<AtomicBool>,
    connection: Option<Box<dyn InputConnection>>,
    messages: Option<Receiver<RawMessage>>,
    queue_capacity: usize,
}

impl HardwareListener {
    /// `access` is `None` when the runtime has no note-input capability.
    pub fn new(access: Option<Arc<dyn MidiAccess>>, clock: Clock) -> Self {
        Self {
            access,
            clock,
            status: ConnectionStatus::Idle,
            input_name: None,
            buffer: EventLog::new(DEFAULT_LOG_CAPACITY),
            pending: None,
            disposed: Arc::new(AtomicBool::new(false)),
            connection: None,
            messages: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Capacity of the rolling buffer (0 is treated as 1).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.buffer = EventLog::new(capacity);
        self
    }

    /// Capacity of the callback-to-owner message queue.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Starts acquisition. Only acts from `Idle`; later calls are no-ops.
    pub fn activate(&mut self) {
        if self.status != ConnectionStatus::Idle || self.disposed.load(Ordering::Acquire) {
            return;
        }

        let Some(access) = self.access.clone() else {
            warn!("MIDI input not supported in this runtime");
            self.status = ConnectionStatus::Unsupported;
            return;
        };

        let (tx, rx) = bounded::<AccessOutcome>(1);
        let disposed = Arc::clone(&self.disposed);

        let spawned = thread::Builder::new()
            .name("igem-midi-access".into())
            .spawn(move || {
                let outcome = access.request_access(AccessOptions { sysex: false });
                // The receiver may already be gone after teardown.
                if !disposed.load(Ordering::Acquire) {
                    let _ = tx.send(outcome);
                }
            });

        match spawned {
            Ok(_) => {
                self.pending = Some(rx);
                self.status = ConnectionStatus::Connecting;
            }
            Err(e) => {
                warn!("Failed to spawn MIDI access thread: {}", e);
                self.status = ConnectionStatus::Error;
            }
        }
    }

    /// Applies a resolved acquisition and drains raw messages.
    ///
    /// Returns the events decoded during this call, oldest first. They are
    /// also prepended to the rolling buffer.
    pub fn poll(&mut self) -> Vec<NoteEvent> {
        if let Some(rx) = &self.pending {
            match rx.try_recv() {
                Ok(outcome) => {
                    self.pending = None;
                    self.apply(outcome);
                }
                Err(crossbeam_channel::TryRecvError::Empty) => {}
                Err(crossbeam_channel::TryRecvError::Disconnected) => {
                    // Acquisition thread exited without reporting
                    self.pending = None;
                    if !self.disposed.load(Ordering::Acquire) {
                        self.fail(AccessError::Failed("access request abandoned".into()));
                    }
                }
            }
        }

        self.drain()
    }

    /// Blocks until a pending acquisition resolves (or `timeout` passes),
    /// applies it and returns the resulting status.
    pub fn wait_for_access(&mut self, timeout: Duration) -> ConnectionStatus {
        if let Some(rx) = &self.pending {
            match rx.recv_timeout(timeout) {
                Ok(outcome) => {
                    self.pending = None;
                    self.apply(outcome);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.pending = None;
                    if !self.disposed.load(Ordering::Acquire) {
                        self.fail(AccessError::Failed("access request abandoned".into()));
                    }
                }
            }
        }
        self.status
    }

    fn apply(&mut self, outcome: AccessOutcome) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }

        let ports = match outcome {
            Ok(ports) => ports,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        // Only the first device is bound.
        let Some(port) = ports.into_iter().next() else {
            debug!("MIDI access granted, no input devices");
            self.input_name = Some(NO_DEVICE_NAME.to_string());
            self.status = ConnectionStatus::Ready;
            return;
        };

        let name = port
            .name()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string());

        let (tx, rx) = bounded::<RawMessage>(self.queue_capacity);
        let handler = Box::new(move |bytes: &[u8]| {
            let message = RawMessage {
                bytes: bytes.to_vec(),
                received: Instant::now(),
            };
            match tx.try_send(message) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    trace!("MIDI input queue full, dropping message");
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        });

        match port.connect(handler) {
            Ok(connection) => {
                debug!("Bound MIDI input: {}", name);
                self.connection = Some(connection);
                self.messages = Some(rx);
                self.input_name = Some(name);
                self.status = ConnectionStatus::Ready;
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, e: AccessError) {
        if e.is_permission_denied() {
            warn!("MIDI access denied: {}", e);
            self.status = ConnectionStatus::PermissionDenied;
        } else {
            warn!("MIDI access error: {}", e);
            self.status = ConnectionStatus::Error;
        }
    }

    fn drain(&mut self) -> Vec<NoteEvent> {
        let Some(rx) = &self.messages else {
            return Vec::new();
        };

        let mut decoded = Vec::new();
        while let Ok(raw) = rx.try_recv() {
            let timestamp = self.clock.stamp(raw.received);
            // Anything that is not a note message is dropped here.
            if let Some(event) = NoteEvent::from_bytes(&raw.bytes, timestamp) {
                decoded.push(event);
            }
        }
        for event in &decoded {
            self.buffer.push(*event);
        }
        decoded
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Bound device name, or [`NO_DEVICE_NAME`] when none is attached.
    pub fn input_name(&self) -> Option<&str> {
        self.input_name.as_deref()
    }

    /// Ready and bound to an actual device (not the "no device" sentinel).
    pub fn has_device(&self) -> bool {
        self.status == ConnectionStatus::Ready && self.connection.is_some()
    }

    /// Rolling buffer of decoded events, newest first.
    pub fn events(&self) -> &EventLog<NoteEvent> {
        &self.buffer
    }

    /// Most recently decoded event.
    pub fn latest(&self) -> Option<&NoteEvent> {
        self.buffer.head()
    }

    /// Empties the rolling buffer. Connection state is unaffected.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Detaches the message handler and ignores any late acquisition result.
    ///
    /// The access object itself is not released.
    pub fn teardown(&mut self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.pending = None;
        self.messages = None;
        if let Some(connection) = self.connection.take() {
            connection.close();
            debug!("MIDI input handler detached");
        }
    }
}

impl Drop for HardwareListener {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for HardwareListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareListener")
            .field("status", &self.status)
            .field("input_name", &self.input_name)
            .field("buffered", &self.buffer.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
