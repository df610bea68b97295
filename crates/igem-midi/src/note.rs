//! Pitch and velocity conversions.
//!
//! Notes use scientific pitch naming: middle C (60) is `C4`, concert A (69)
//! is `A4` at 440 Hz.

/// Reference pitch for equal temperament.
pub const A4_FREQ: f32 = 440.0;
pub const A4_NOTE: u8 = 69;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// `440 × 2^((note − 69) / 12)`.
#[inline]
pub fn note_to_hz(note: f32) -> f32 {
    A4_FREQ * 2.0_f32.powf((note - A4_NOTE as f32) / 12.0)
}

#[inline]
pub fn velocity_to_gain(velocity: u8) -> f32 {
    velocity as f32 / 127.0
}

/// Octave number in scientific pitch notation (note 0 is octave -1).
#[inline]
pub fn octave_of(note: u8) -> i8 {
    (note / 12) as i8 - 1
}

/// Whether the pitch class is a sharp (black key).
#[inline]
pub fn is_sharp(note: u8) -> bool {
    matches!(note % 12, 1 | 3 | 6 | 8 | 10)
}

/// `note_name(60) == "C4"`, `note_name(61) == "C#4"`.
pub fn note_name(note: u8) -> String {
    format!("{}{}", NOTE_NAMES[(note % 12) as usize], octave_of(note))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_pitch() {
        assert_relative_eq!(note_to_hz(69.0), 440.0);
        assert_relative_eq!(note_to_hz(81.0), 880.0, epsilon = 1e-3);
        assert_relative_eq!(note_to_hz(57.0), 220.0, epsilon = 1e-3);
    }

    #[test]
    fn test_frequency_formula_across_range() {
        for note in 0..=127u8 {
            let expected = 440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0);
            assert_relative_eq!(note_to_hz(note as f32) as f64, expected, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_note_names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(69), "A4");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_name(127), "G9");
    }

    #[test]
    fn test_sharps() {
        let sharps: Vec<u8> = (60..72).filter(|&n| is_sharp(n)).collect();
        assert_eq!(sharps, vec![61, 63, 66, 68, 70]);
    }

    #[test]
    fn test_velocity_to_gain() {
        assert_relative_eq!(velocity_to_gain(127), 1.0);
        assert_relative_eq!(velocity_to_gain(0), 0.0);
    }
}
