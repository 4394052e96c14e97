use crate::utils::{chord_root_pitch_class, format_time, midi_note_name};

#[test]
fn test_format_time() {
    assert_eq!(format_time(0.0), "00:00");
    assert_eq!(format_time(75.0), "01:15");
    assert_eq!(format_time(3600.0), "1:00:00");
    assert_eq!(format_time(-10.0), "00:00");
    assert_eq!(format_time(f32::NAN), "00:00");
    assert_eq!(format_time(f32::INFINITY), "00:00");
    assert_eq!(format_time(59.999), "00:59");
}

#[test]
fn test_midi_note_name() {
    assert_eq!(midi_note_name(60), "C4");
    assert_eq!(midi_note_name(21), "A0");
    assert_eq!(midi_note_name(108), "C8");
}

#[test]
fn test_chord_root_pitch_class() {
    assert_eq!(chord_root_pitch_class("C"), Some(0));
    assert_eq!(chord_root_pitch_class("F#m7"), Some(6));
    assert_eq!(chord_root_pitch_class("Bb"), Some(10));
    assert_eq!(chord_root_pitch_class("Cb"), Some(11));
    assert_eq!(chord_root_pitch_class(""), None);
    assert_eq!(chord_root_pitch_class("?"), None);
}
