//! Normalized note and controller events.
//!
//! The engine does not parse raw MIDI bytes; callers translate their input
//! stream into these events and deliver them before each `process` call.
//! Values arrive pre-normalized: velocity, pressure and timbre in 0..1,
//! pitch bend in signed semitones.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MidiEvent {
    NoteOn {
        note: u8,
        /// Normalized velocity, 0..1.
        velocity: f32,
    },
    NoteOff {
        note: u8,
        /// True rides the release envelope out; false cuts the voice at
        /// the next block boundary.
        tail_off: bool,
    },
    /// Polyphonic aftertouch for one held note, 0..1.
    Pressure { note: u8, value: f32 },
    /// Per-note timbre (MPE CC74 style), 0..1.
    Timbre { note: u8, value: f32 },
    /// Bend in signed semitones, already scaled by the caller's bend range.
    PitchBend { semitones: f32 },
    ControlChange {
        controller: u8,
        /// Normalized controller value, 0..1.
        value: f32,
    },
    /// Panic stop: every voice is cut at the next block boundary and all
    /// held-note state is cleared. No release tails.
    AllNotesOff,
}
