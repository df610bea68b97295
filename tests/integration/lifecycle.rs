//! Access outcomes, teardown and recording sessions

use crate::helpers::*;
use igem::prelude::*;
use std::time::Duration;

#[test]
fn test_access_outcomes_reach_status() {
    let cases = [
        (FakeMidiAccess::denied(), ConnectionStatus::PermissionDenied),
        (FakeMidiAccess::security_rejected(), ConnectionStatus::PermissionDenied),
        (FakeMidiAccess::failing("driver crashed"), ConnectionStatus::Error),
        (FakeMidiAccess::with_unnamed_device(), ConnectionStatus::Ready),
    ];
    for (midi, expected) in cases {
        let rig = rig_with(midi, InputMode::Auto);
        assert_eq!(rig.engine.hardware_status(), expected);
    }
}

#[test]
fn test_failed_access_falls_back_to_on_screen() {
    let mut rig = rig_with(FakeMidiAccess::denied(), InputMode::Auto);
    assert!(!rig.engine.allow_hardware());
    assert_eq!(rig.engine.hardware_label(), "denied");

    rig.engine.key_down(60);
    assert_eq!(rig.engine.synth().voice_count(), 1);
    // Terminal: pumping never retries.
    rig.engine.pump();
    assert_eq!(rig.midi.request_count(), 1);
}

#[test]
fn test_sysex_never_requested() {
    let rig = connected_rig();
    assert_eq!(rig.midi.last_options().map(|o| o.sysex), Some(false));
}

#[test]
fn test_first_device_bound_only() {
    let mut rig = rig_with(FakeMidiAccess::with_devices(["First", "Second"]), InputMode::Auto);
    assert_eq!(rig.engine.input_name(), Some("First"));
    assert!(rig.midi.is_connected(0));
    assert!(!rig.midi.is_connected(1));
    assert!(!rig.midi.send(1, &[0x90, 60, 100]));
    assert!(rig.engine.pump().is_empty());
}

#[test]
fn test_audio_gesture_gate() {
    let output = OfflineOutput::new(TEST_SAMPLE_RATE).gesture_required();
    let mut engine = IgemEngine::builder()
        .no_midi()
        .audio_backend(output.clone())
        .clock(Clock::manual())
        .build()
        .unwrap();

    // Accepted and logged, but silent.
    assert!(engine.key_down(60).is_some());
    assert_eq!(engine.synth_status(), SynthStatus::Blocked);
    assert_eq!(engine.synth().voice_count(), 0);
    engine.key_up(60);

    output.grant_gesture();
    assert_eq!(engine.ensure_audio(), SynthStatus::Ready);
    engine.key_down(62);
    assert_eq!(engine.synth().active_notes(), vec![62]);
    assert!(peak(&output.render(4_800)) > 0.05);
}

#[test]
fn test_unsupported_audio_reports_error() {
    let mut engine = IgemEngine::builder()
        .no_midi()
        .audio_backend(OfflineOutput::unavailable())
        .clock(Clock::manual())
        .build()
        .unwrap();
    engine.key_down(60);
    assert_eq!(engine.synth_status(), SynthStatus::Error);
    assert_eq!(engine.log().len(), 1);
}

#[test]
fn test_teardown_detaches_device() {
    let rig = connected_rig();
    let Rig { engine, midi, .. } = rig;
    assert!(midi.is_connected(0));
    drop(engine);
    assert!(!midi.is_connected(0));
    assert!(!midi.send(0, &[0x90, 60, 100]));
}

#[test]
fn test_teardown_before_access_resolves() {
    let (midi, gate) = FakeMidiAccess::gated(["Keys"]);
    let engine = IgemEngine::builder()
        .midi_access(midi.clone())
        .no_audio()
        .clock(Clock::manual())
        .build()
        .unwrap();
    drop(engine);

    gate.open();
    std::thread::sleep(Duration::from_millis(50));
    assert!(!midi.is_connected(0));
}

#[test]
fn test_recording_take() {
    let mut rig = connected_rig();
    rig.engine.start_recording();
    rig.play(&[0x90, 60, 100]);
    rig.clock.advance(Duration::from_secs(4));
    rig.play(&[0x80, 60, 0]);
    rig.engine.key_down(67);
    rig.engine.key_up(67);

    let take = rig.engine.stop_recording().unwrap();
    assert_eq!(take.name, "Your MIDI Take");
    assert_eq!(take.events.len(), 4);
    assert_eq!(take.note_on_count(), 2);
    assert_eq!(take.events[0].source, InputSource::Hardware);
    assert_eq!(take.events[3].source, InputSource::OnScreen);
    // 124 bpm, ~4 s
    assert_eq!(take.bars, 3);
    assert!(!rig.engine.is_recording());
}

#[test]
fn test_clear_empties_monitors() {
    let mut rig = connected_rig();
    rig.play(&[0x90, 60, 100]);
    rig.engine.key_down(72);
    assert_eq!(rig.engine.monitor_lines().len(), 2);

    rig.engine.clear();
    assert!(rig.engine.monitor_lines().is_empty());
    assert!(rig.engine.hardware_monitor_lines().is_empty());
    assert_eq!(rig.engine.synth().voice_count(), 2);
}
