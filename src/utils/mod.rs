#[cfg(test)]
mod tests;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Format a position in seconds as `mm:ss`, growing to `h:mm:ss` past one
/// hour. Negative or non-finite input renders as `00:00`.
pub fn format_time(seconds: f32) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00".to_string();
    }
    let total = seconds.floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}:{:0>2}:{:0>2}", hours, minutes, secs)
    } else {
        format!("{:0>2}:{:0>2}", minutes, secs)
    }
}

/// Note name with octave for a midi number, e.g. 60 -> "C4".
pub fn midi_note_name(midi: u8) -> String {
    let name = NOTE_NAMES[(midi % 12) as usize];
    let octave = (midi as i32 / 12) - 1;
    format!("{}{}", name, octave)
}

/// Root pitch class of a chord label ("F#m7" -> 6). This is the boundary to
/// the chord symbol engine; only the root is needed for degree labels.
pub fn chord_root_pitch_class(label: &str) -> Option<u8> {
    let mut chars = label.trim().chars();
    let letter = chars.next()?;
    let base: i32 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let accidental = match chars.next() {
        Some('#') => 1,
        Some('b') => -1,
        _ => 0,
    };
    Some(((base + accidental).rem_euclid(12)) as u8)
}
