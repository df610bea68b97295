//! Input-mode gating and hardware de-duplication

use crate::helpers::*;
use igem::prelude::*;
use std::time::Duration;

#[test]
fn test_auto_prefers_bound_hardware() {
    let mut rig = connected_rig();
    assert!(rig.engine.allow_hardware());

    let accepted = rig.play(&[0x90, 60, 90]);
    assert_eq!(accepted[0].source, InputSource::Hardware);

    // On-screen input is still fed in Auto.
    let tagged = rig.engine.key_down(72).unwrap();
    assert_eq!(tagged.source, InputSource::OnScreen);
    assert_eq!(rig.engine.synth().active_notes(), vec![60, 72]);
}

#[test]
fn test_on_and_off_in_one_pump_both_accepted() {
    let mut rig = connected_rig();
    // The clock does not move between the two messages.
    rig.midi.send(0, &[0x90, 60, 100]);
    rig.midi.send(0, &[0x80, 60, 0]);
    let accepted = rig.engine.pump();

    assert_eq!(accepted.len(), 2);
    assert_eq!(accepted[0].kind(), NoteKind::NoteOn);
    assert_eq!(accepted[1].kind(), NoteKind::NoteOff);
    assert!(accepted[0].timestamp() < accepted[1].timestamp());
    assert!(rig.engine.synth().active_notes().is_empty());
    assert_eq!(rig.engine.log().len(), 2);
}

#[test]
fn test_chord_in_one_pump_fully_released() {
    let mut rig = connected_rig();
    for note in [60u8, 64, 67] {
        rig.midi.send(0, &[0x90, note, 100]);
    }
    assert_eq!(rig.engine.pump().len(), 3);
    assert_eq!(rig.engine.synth().active_notes(), vec![60, 64, 67]);

    for note in [60u8, 64, 67] {
        rig.midi.send(0, &[0x80, note, 0]);
    }
    assert_eq!(rig.engine.pump().len(), 3);
    assert_eq!(rig.engine.synth().voice_count(), 0);
}

#[test]
fn test_distinct_timestamps_accepted() {
    let mut rig = connected_rig();
    rig.play(&[0x90, 60, 100]);
    rig.play(&[0x80, 60, 0]);
    rig.play(&[0x90, 60, 100]);
    assert_eq!(rig.engine.log().len(), 3);
}

#[test]
fn test_hardware_only_blocks_on_screen() {
    let mut rig = rig_with(FakeMidiAccess::with_devices(["Keys"]), InputMode::HardwareOnly);

    assert!(rig.engine.key_down(60).is_none());
    assert!(rig.engine.key_enter(62).is_none());
    assert!(rig.engine.key_up(60).is_none());
    assert!(rig.engine.log().is_empty());
    assert_eq!(rig.engine.synth().voice_count(), 0);
    assert!(rig.engine.keyboard().active_notes().is_empty());
    assert!(is_silent(&rig.render(Duration::from_millis(50))));

    let accepted = rig.play(&[0x90, 60, 100]);
    assert_eq!(accepted.len(), 1);
}

#[test]
fn test_on_screen_only_ignores_connected_hardware() {
    let mut rig = rig_with(FakeMidiAccess::with_devices(["Keys"]), InputMode::OnScreenOnly);
    assert_eq!(rig.engine.hardware_status(), ConnectionStatus::Ready);
    assert!(!rig.engine.allow_hardware());

    assert!(rig.play(&[0x90, 60, 100]).is_empty());
    assert!(rig.engine.log().is_empty());
    assert_eq!(rig.engine.synth().voice_count(), 0);
    // Still decoded into the hardware monitor.
    assert_eq!(rig.engine.hardware_monitor_lines().len(), 1);
}

#[test]
fn test_hardware_only_forwards_without_device() {
    let midi = FakeMidiAccess::with_devices(Vec::<String>::new());
    let mut rig = rig_with(midi, InputMode::HardwareOnly);
    assert!(rig.engine.allow_hardware());
    assert_eq!(rig.engine.input_name(), Some(igem::midi_io::NO_DEVICE_NAME));
    assert!(rig.engine.key_down(60).is_none());
}

#[test]
fn test_auto_ignores_hardware_until_bound() {
    let (midi, gate) = FakeMidiAccess::gated(["Keys"]);
    let output = OfflineOutput::new(TEST_SAMPLE_RATE);
    let mut engine = IgemEngine::builder()
        .midi_access(midi.clone())
        .audio_backend(output)
        .clock(Clock::manual())
        .build()
        .unwrap();

    assert_eq!(engine.hardware_status(), ConnectionStatus::Connecting);
    assert!(!engine.allow_hardware());
    assert!(engine.key_down(60).is_some());

    gate.open();
    assert_eq!(engine.wait_for_midi(ACCESS_TIMEOUT), ConnectionStatus::Ready);
    assert!(engine.allow_hardware());
}

#[test]
fn test_mode_switch_applies_to_next_event() {
    let mut rig = connected_rig();
    rig.play(&[0x90, 60, 100]);

    rig.engine.set_mode(InputMode::OnScreenOnly);
    // The release is dropped: the voice keeps sounding.
    assert!(rig.play(&[0x80, 60, 0]).is_empty());
    assert!(rig.engine.synth().is_sounding(60));

    rig.engine.set_mode(InputMode::Auto);
    assert_eq!(rig.play(&[0x80, 60, 0]).len(), 1);
    assert!(!rig.engine.synth().is_sounding(60));
}
