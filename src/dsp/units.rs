//! Pitch and gain unit conversions shared across the engine.

/// Convert a (fractional) MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69.
#[inline]
pub fn midi_note_to_hz(note: f32) -> f32 {
    440.0 * 2.0_f32.powf((note - 69.0) / 12.0)
}

/// Inverse of [`midi_note_to_hz`]: frequency in Hz to fractional MIDI pitch.
#[inline]
pub fn hz_to_midi_note(hz: f32) -> f32 {
    69.0 + 12.0 * (hz.max(1.0e-6) / 440.0).log2()
}

/// Decibels to linear gain. Anything at or below -100 dB is treated as
/// silence so level faders can reach true zero.
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    if db <= -100.0 {
        0.0
    } else {
        10.0_f32.powf(db / 20.0)
    }
}

/// Fixed mapping from normalized note-on velocity (0..1) to gain.
///
/// Soft notes fall off faster than a linear map would give, full velocity
/// maps to exactly unity gain.
#[inline]
pub fn velocity_to_gain(velocity: f32) -> f32 {
    let v = velocity.clamp(0.0, 1.0);
    v * 25.0_f32.powf(v) * 0.04
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_69_is_concert_a() {
        assert!((midi_note_to_hz(69.0) - 440.0).abs() < 1e-3);
        assert!((midi_note_to_hz(81.0) - 880.0).abs() < 1e-2);
    }

    #[test]
    fn pitch_conversion_roundtrips() {
        for note in [0.0_f32, 36.5, 60.0, 69.0, 100.25, 127.0] {
            let back = hz_to_midi_note(midi_note_to_hz(note));
            assert!((back - note).abs() < 1e-3, "note {note} came back as {back}");
        }
    }

    #[test]
    fn db_floor_is_silence() {
        assert_eq!(db_to_gain(-100.0), 0.0);
        assert!((db_to_gain(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_gain(-6.0) - 0.501187).abs() < 1e-4);
    }

    #[test]
    fn full_velocity_is_unity_gain() {
        assert!((velocity_to_gain(1.0) - 1.0).abs() < 1e-6);
        assert_eq!(velocity_to_gain(0.0), 0.0);
        assert!(velocity_to_gain(0.5) < 0.5);
    }
}
