//! IgemEngine that wires both input sources to the synth and the log.

use crate::arbiter::{allow_hardware, HardwareState, InputArbiter, InputMode};
use crate::builder::IgemEngineBuilder;
use crate::config::IgemConfig;
use crate::keyboard::{KeyDef, OnScreenKeyboard};
use crate::monitor::{monitor_lines, status_label, MonitorLine};
use crate::recording::{RecordingSession, Take};
use igem_midi::{Clock, EventLog, NoteEvent, TaggedEvent};
use igem_midi_io::{ConnectionStatus, HardwareListener};
use igem_synth::{SynthStatus, ToneSynth, Waveform};
use std::time::Duration;
use tracing::debug;

/// Read-only view for a display layer.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub mode: InputMode,
    pub hardware_status: ConnectionStatus,
    pub input_name: Option<String>,
    pub allow_hardware: bool,
    pub synth_status: SynthStatus,
    pub pulsing: bool,
    pub recording: bool,
    pub octave_label: String,
    pub keys: Vec<KeyDef>,
    pub active_keys: Vec<u8>,
    pub sounding: Vec<u8>,
    /// Merged log, newest first.
    pub log: Vec<TaggedEvent>,
}

/// Note-input pipeline: hardware listener and on-screen keyboard in,
/// synth and merged log out.
///
/// Single-threaded: call [`pump`](Self::pump) once per UI tick to apply a
/// resolved hardware acquisition and drain incoming messages. Pointer
/// handlers dispatch immediately.
///
/// # Example
///
/// ```
/// use igem::prelude::*;
///
/// let midi = FakeMidiAccess::with_devices(["Keystation 49"]);
/// let clock = Clock::manual();
/// let mut engine = IgemEngine::builder()
///     .midi_access(midi.clone())
///     .audio_backend(OfflineOutput::new(48_000.0))
///     .clock(clock.clone())
///     .build()?;
///
/// engine.wait_for_midi(std::time::Duration::from_secs(1));
/// midi.send(0, &[0x90, 64, 100]);
/// let accepted = engine.pump();
///
/// assert_eq!(accepted[0].source, InputSource::Hardware);
/// assert!(engine.synth().is_sounding(64));
/// # Ok::<(), igem::Error>(())
/// ```
pub struct IgemEngine {
    config: IgemConfig,
    clock: Clock,
    listener: HardwareListener,
    synth: ToneSynth,
    keyboard: OnScreenKeyboard,
    arbiter: InputArbiter,
    recording: RecordingSession,
    last_take: Option<Take>,
}

impl IgemEngine {
    pub fn builder() -> IgemEngineBuilder {
        IgemEngineBuilder::default()
    }

    pub(crate) fn from_parts(
        config: IgemConfig,
        clock: Clock,
        listener: HardwareListener,
        synth: ToneSynth,
        keyboard: OnScreenKeyboard,
        arbiter: InputArbiter,
        recording: RecordingSession,
    ) -> Self {
        Self {
            config,
            clock,
            listener,
            synth,
            keyboard,
            arbiter,
            recording,
            last_take: None,
        }
    }

    /// Requests hardware access if it has not been requested yet.
    pub fn connect_midi(&mut self) {
        self.listener.activate();
    }

    /// Blocks until hardware acquisition resolves or `timeout` passes.
    pub fn wait_for_midi(&mut self, timeout: Duration) -> ConnectionStatus {
        self.listener.wait_for_access(timeout)
    }

    /// Starts audio output (a user gesture on platforms that gate it).
    pub fn ensure_audio(&mut self) -> SynthStatus {
        self.synth.ensure_started();
        self.synth.status()
    }

    /// Applies pending hardware work and arbitrates each new hardware event.
    ///
    /// Returns the events accepted during this call, oldest first.
    pub fn pump(&mut self) -> Vec<TaggedEvent> {
        let events = self.listener.poll();
        let hardware = self.hardware_state();

        let mut accepted = Vec::with_capacity(events.len());
        for event in events {
            if let Some(tagged) = self.arbiter.handle_hardware(event, hardware, &mut self.synth) {
                self.recording.capture(&tagged);
                accepted.push(tagged);
            }
        }
        self.arbiter.update_pulse(self.clock.now());
        accepted
    }

    // --- On-screen keyboard ---

    pub fn key_down(&mut self, note: u8) -> Option<TaggedEvent> {
        let event = self.keyboard.pointer_down(note, self.arbiter.mode())?;
        self.dispatch_on_screen(event)
    }

    pub fn key_enter(&mut self, note: u8) -> Option<TaggedEvent> {
        let event = self.keyboard.pointer_enter(note, self.arbiter.mode())?;
        self.dispatch_on_screen(event)
    }

    pub fn key_up(&mut self, note: u8) -> Option<TaggedEvent> {
        let event = self.keyboard.pointer_up(note)?;
        self.dispatch_on_screen(event)
    }

    pub fn key_leave(&mut self, note: u8) -> Option<TaggedEvent> {
        let event = self.keyboard.pointer_leave(note)?;
        self.dispatch_on_screen(event)
    }

    /// Releases every active on-screen key.
    pub fn stop_notes(&mut self) -> Vec<TaggedEvent> {
        self.keyboard
            .stop_notes()
            .into_iter()
            .filter_map(|event| self.dispatch_on_screen(event))
            .collect()
    }

    /// Releases on-screen keys, then every voice still sounding.
    pub fn stop_all(&mut self) {
        self.stop_notes();
        self.synth.stop_all();
    }

    fn dispatch_on_screen(&mut self, event: NoteEvent) -> Option<TaggedEvent> {
        let tagged = self.arbiter.handle_on_screen(event, &mut self.synth)?;
        self.recording.capture(&tagged);
        Some(tagged)
    }

    /// Empties the hardware buffer and the merged log.
    pub fn clear(&mut self) {
        self.listener.clear();
        self.arbiter.clear();
    }

    // --- Controls ---

    pub fn mode(&self) -> InputMode {
        self.arbiter.mode()
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        self.arbiter.set_mode(mode);
    }

    pub fn octave(&self) -> u8 {
        self.keyboard.octave()
    }

    pub fn set_octave(&mut self, octave: u8) {
        self.keyboard.set_octave(octave);
    }

    pub fn octave_up(&mut self) {
        self.keyboard.octave_up();
    }

    pub fn octave_down(&mut self) {
        self.keyboard.octave_down();
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.synth.set_waveform(waveform);
    }

    // --- Recording ---

    pub fn start_recording(&mut self) {
        self.recording.start(self.clock.now());
    }

    /// Ends the session; the take is also kept as [`last_take`](Self::last_take).
    pub fn stop_recording(&mut self) -> Option<Take> {
        let take = self.recording.stop(self.clock.now())?;
        self.last_take = Some(take.clone());
        Some(take)
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_recording()
    }

    pub fn recording_elapsed(&self) -> Duration {
        self.recording.elapsed(self.clock.now())
    }

    pub fn last_take(&self) -> Option<&Take> {
        self.last_take.as_ref()
    }

    // --- Snapshots ---

    pub fn hardware_state(&self) -> HardwareState {
        HardwareState {
            status: self.listener.status(),
            has_device: self.listener.has_device(),
        }
    }

    pub fn allow_hardware(&self) -> bool {
        allow_hardware(self.arbiter.mode(), self.hardware_state())
    }

    pub fn hardware_status(&self) -> ConnectionStatus {
        self.listener.status()
    }

    pub fn input_name(&self) -> Option<&str> {
        self.listener.input_name()
    }

    /// e.g. `"connected • Keystation 49"`
    pub fn hardware_label(&self) -> String {
        status_label(self.listener.status(), self.listener.input_name())
    }

    pub fn synth_status(&self) -> SynthStatus {
        self.synth.status()
    }

    pub fn is_pulsing(&self) -> bool {
        self.arbiter.is_pulsing(self.clock.now())
    }

    /// Merged log, newest first.
    pub fn log(&self) -> &EventLog<TaggedEvent> {
        self.arbiter.log()
    }

    /// The newest merged-log entries, formatted.
    pub fn monitor_lines(&self) -> Vec<MonitorLine> {
        monitor_lines(self.arbiter.log().iter())
    }

    /// The newest hardware-buffer entries, formatted.
    pub fn hardware_monitor_lines(&self) -> Vec<MonitorLine> {
        monitor_lines(self.listener.events().iter())
    }

    pub fn keys(&self) -> Vec<KeyDef> {
        self.keyboard.keys()
    }

    pub fn octave_label(&self) -> String {
        self.keyboard.octave_label()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            mode: self.mode(),
            hardware_status: self.hardware_status(),
            input_name: self.input_name().map(str::to_string),
            allow_hardware: self.allow_hardware(),
            synth_status: self.synth_status(),
            pulsing: self.is_pulsing(),
            recording: self.is_recording(),
            octave_label: self.octave_label(),
            keys: self.keys(),
            active_keys: self.keyboard.active_notes(),
            sounding: self.synth.active_notes(),
            log: self.arbiter.log().snapshot(),
        }
    }

    pub fn config(&self) -> &IgemConfig {
        &self.config
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn synth(&self) -> &ToneSynth {
        &self.synth
    }

    pub fn listener(&self) -> &HardwareListener {
        &self.listener
    }

    pub fn keyboard(&self) -> &OnScreenKeyboard {
        &self.keyboard
    }
}

impl Drop for IgemEngine {
    fn drop(&mut self) {
        debug!("Shutting down engine");
        self.listener.teardown();
        self.synth.close();
    }
}
