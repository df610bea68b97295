//! On-screen keyboard gestures through the engine

use crate::helpers::*;
use igem::prelude::*;

#[test]
fn test_glissando_across_keys() {
    let mut rig = deviceless_rig();
    assert!(rig.engine.key_enter(60).is_none());

    rig.engine.key_down(60);
    rig.engine.key_leave(60);
    rig.engine.key_enter(62);
    rig.engine.key_leave(62);
    rig.engine.key_enter(64);

    assert_eq!(rig.engine.synth().active_notes(), vec![64]);
    let kinds: Vec<(NoteKind, u8)> = rig
        .engine
        .log()
        .iter()
        .map(|e| (e.kind(), e.note()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (NoteKind::NoteOn, 64),
            (NoteKind::NoteOff, 62),
            (NoteKind::NoteOn, 62),
            (NoteKind::NoteOff, 60),
            (NoteKind::NoteOn, 60),
        ]
    );

    rig.engine.key_up(64);
    assert!(rig.engine.key_enter(65).is_none());
    assert_eq!(rig.engine.synth().voice_count(), 0);
}

#[test]
fn test_stop_notes_escape_hatch() {
    let mut rig = deviceless_rig();
    rig.engine.key_down(60);
    rig.engine.key_enter(64);
    rig.engine.key_enter(67);

    let released = rig.engine.stop_notes();
    assert_eq!(released.len(), 3);
    assert!(released.iter().all(|e| e.kind() == NoteKind::NoteOff));
    assert_eq!(rig.engine.synth().voice_count(), 0);
    assert!(rig.engine.keyboard().active_notes().is_empty());
    assert!(!rig.engine.keyboard().is_pointer_down());
}

#[test]
fn test_octave_controls_layout() {
    let mut rig = deviceless_rig();
    assert_eq!(rig.engine.octave_label(), "Oct 4 (C4)");

    rig.engine.octave_down();
    assert_eq!(rig.engine.keys()[0].note, 48);
    assert_eq!(rig.engine.octave_label(), "Oct 3 (C3)");

    rig.engine.set_octave(0);
    assert_eq!(rig.engine.octave(), 1);
    rig.engine.set_octave(200);
    assert_eq!(rig.engine.octave(), 7);
}

// Held keys are not released by a mode change. Pinned current behavior:
// the release is dropped in hardware-only mode and the voice sticks
// until stop_all.
#[test]
fn test_mode_change_does_not_release_held_key() {
    let mut rig = deviceless_rig();
    rig.engine.key_down(60);

    rig.engine.set_mode(InputMode::HardwareOnly);
    assert!(rig.engine.keyboard().is_active(60));
    assert!(rig.engine.synth().is_sounding(60));

    assert!(rig.engine.key_up(60).is_none());
    assert!(!rig.engine.keyboard().is_active(60));
    assert!(rig.engine.synth().is_sounding(60));

    rig.engine.stop_all();
    assert!(!rig.engine.synth().is_sounding(60));
}

// Pinned: changing octave keeps the off-screen key active and sounding.
#[test]
fn test_octave_change_does_not_release_held_key() {
    let mut rig = deviceless_rig();
    rig.engine.key_down(60);
    rig.engine.octave_up();

    assert!(rig.engine.keys().iter().all(|k| k.note != 60));
    assert!(rig.engine.keyboard().is_active(60));
    assert!(rig.engine.synth().is_sounding(60));

    let released = rig.engine.stop_notes();
    assert_eq!(released.iter().map(|e| e.note()).collect::<Vec<_>>(), vec![60]);
    assert!(!rig.engine.synth().is_sounding(60));
}

// Pinned: the voice entry is removed at note-off, so a replay during the
// release tail starts a second generator that overlaps the fading one.
#[test]
fn test_replay_during_release_overlaps() {
    let mut rig = deviceless_rig();
    rig.engine.key_down(60);
    rig.render(std::time::Duration::from_millis(50));
    rig.engine.key_up(60);
    rig.engine.key_down(60);

    assert_eq!(rig.engine.synth().voice_count(), 1);
    let graph = rig.engine.synth().graph().unwrap();
    assert_eq!(graph.lock().sounding_count(), 2);

    rig.render(std::time::Duration::from_millis(100));
    assert_eq!(graph.lock().sounding_count(), 1);
}
