//! End-to-end pipeline tests
//!
//! Raw bytes or pointer gestures in; voices, rendered samples and log
//! entries out.

use crate::helpers::tolerances::{DSP_EPSILON, FLOAT_EPSILON, SILENCE_THRESHOLD};
use crate::helpers::*;
use approx::assert_relative_eq;
use igem::prelude::*;
use igem::synth::velocity_to_amplitude;
use std::time::Duration;

#[test]
fn test_voice_frequency_follows_equal_temperament() {
    let mut rig = connected_rig();
    for note in [21u8, 60, 69, 108] {
        rig.play(&[0x90, note, 100]);
        let voice = *rig.engine.synth().voice(note).unwrap();
        let expected = 440.0 * 2f32.powf((note as f32 - 69.0) / 12.0);
        assert_relative_eq!(voice.frequency, expected, max_relative = 1e-5);
    }
    let a4 = rig.engine.synth().voice(69).unwrap().frequency;
    assert_relative_eq!(a4, 440.0, epsilon = FLOAT_EPSILON);
}

#[test]
fn test_repeated_note_on_keeps_one_voice() {
    let mut rig = connected_rig();
    rig.play(&[0x90, 60, 100]);
    let first = *rig.engine.synth().voice(60).unwrap();
    rig.play(&[0x90, 60, 30]);

    assert_eq!(rig.engine.synth().voice_count(), 1);
    assert_eq!(rig.engine.synth().voice(60), Some(&first));
    // Both events still reach the log.
    assert_eq!(rig.engine.log().len(), 2);
}

#[test]
fn test_note_off_without_voice_leaves_others() {
    let mut rig = connected_rig();
    rig.play(&[0x90, 64, 100]);
    let held = *rig.engine.synth().voice(64).unwrap();

    rig.play(&[0x80, 60, 0]);
    assert_eq!(rig.engine.synth().voice_count(), 1);
    assert_eq!(rig.engine.synth().voice(64), Some(&held));
    assert_eq!(rig.engine.synth_status(), SynthStatus::Ready);
}

#[test]
fn test_velocity_zero_note_on_releases() {
    let mut rig = connected_rig();
    rig.play(&[0x90, 60, 100]);
    let accepted = rig.play(&[0x90, 60, 0]);

    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].kind(), NoteKind::NoteOff);
    assert!(!rig.engine.synth().is_sounding(60));
}

#[test]
fn test_note_off_command_ignores_velocity() {
    let mut rig = connected_rig();
    rig.play(&[0x91, 60, 100]);
    let accepted = rig.play(&[0x81, 60, 64]);

    assert_eq!(accepted[0].kind(), NoteKind::NoteOff);
    assert_eq!(accepted[0].note(), 60);
    assert_eq!(accepted[0].event.channel, 1);
    assert!(!rig.engine.synth().is_sounding(60));
}

#[test]
fn test_malformed_and_foreign_messages_dropped() {
    let mut rig = connected_rig();
    for bytes in [&[0x90, 60][..], &[0x90][..], &[0xB0, 7, 100][..], &[0xE0, 0, 64][..]] {
        assert!(rig.play(bytes).is_empty());
    }
    assert!(rig.engine.log().is_empty());
    assert!(rig.engine.listener().events().is_empty());
    assert_eq!(rig.engine.synth().voice_count(), 0);
}

#[test]
fn test_log_keeps_newest_64() {
    let mut rig = deviceless_rig();
    for i in 0..100u8 {
        let note = 30 + (i % 50);
        rig.engine.key_down(note);
        rig.engine.key_up(note);
        rig.clock.advance(Duration::from_millis(1));
    }

    let log = rig.engine.log();
    assert_eq!(log.len(), 64);
    // The head is the release of the last key.
    let last = 30 + (99 % 50);
    assert_eq!(log.head().map(|e| (e.kind(), e.note())), Some((NoteKind::NoteOff, last)));
    let stamps: Vec<Timestamp> = log.iter().map(|e| e.timestamp()).collect();
    assert!(stamps.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_on_screen_key_without_device() {
    let mut rig = deviceless_rig();
    assert_eq!(rig.engine.hardware_status(), ConnectionStatus::Ready);
    assert!(!rig.engine.allow_hardware());

    rig.engine.key_down(60);

    let head = *rig.engine.log().head().unwrap();
    assert_eq!(head.kind(), NoteKind::NoteOn);
    assert_eq!(head.note(), 60);
    assert_eq!(head.velocity(), 110);
    assert_eq!(head.source, InputSource::OnScreen);
    assert_eq!(rig.engine.log().len(), 1);

    assert_eq!(rig.engine.synth().voice_count(), 1);
    let voice = rig.engine.synth().voice(60).unwrap();
    assert_relative_eq!(voice.amplitude, 110.0 / 127.0, epsilon = DSP_EPSILON);
    assert_relative_eq!(voice.amplitude, 0.866, epsilon = 1e-3);
}

#[test]
fn test_stop_all_releases_three_voices() {
    let mut rig = connected_rig();
    for note in [60u8, 64, 67] {
        rig.play(&[0x90, note, 100]);
    }
    rig.render(Duration::from_millis(200));
    assert_eq!(rig.engine.synth().voice_count(), 3);

    rig.engine.stop_all();
    assert_eq!(rig.engine.synth().voice_count(), 0);

    // All three fade out rather than cutting.
    let tail = rig.render(Duration::from_millis(100));
    assert!(rms(&tail[..480]) > 0.05);
    assert!(is_silent(&rig.render(Duration::from_millis(50))));

    rig.engine.stop_all();
    assert_eq!(rig.engine.synth().voice_count(), 0);
    assert_eq!(rig.engine.synth_status(), SynthStatus::Ready);
}

#[test]
fn test_hardware_note_is_audible_at_sustain_level() {
    let mut rig = connected_rig();
    rig.play(&[0x90, 69, 127]);
    rig.render(Duration::from_millis(300));
    let sustained = rig.render(Duration::from_millis(100));

    // amplitude 1.0 x sustain 0.35 x master 0.8
    let expected = velocity_to_amplitude(127) * 0.35 * 0.8;
    assert!((peak(&sustained) - expected).abs() < 0.01, "peak {}", peak(&sustained));
    assert!(rms(&sustained) > expected * 0.6);
}

#[test]
fn test_release_reaches_silence() {
    let mut rig = deviceless_rig();
    rig.engine.key_down(60);
    rig.render(Duration::from_millis(200));
    rig.engine.key_up(60);

    let release = rig.render(Duration::from_millis(90));
    assert!(peak(&release[..240]) > 0.1);
    let after = rig.render(Duration::from_millis(50));
    assert!(peak(&after) < SILENCE_THRESHOLD);
}
