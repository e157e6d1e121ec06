//! Musical time: rational note durations and the host transport snapshot.

pub mod duration;

pub use duration::{note_duration, Duration, NoteDuration, NOTE_DURATIONS};

/// Host transport state captured once per block. The engine never talks to
/// a host directly; callers hand it a fresh snapshot before `process`.
#[derive(Debug, Clone, Copy)]
pub struct Playhead {
    pub bpm: f64,
    pub playing: bool,
}

impl Default for Playhead {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            playing: false,
        }
    }
}

impl Playhead {
    /// Tempo guarded against zero/negative/NaN host values.
    pub fn safe_bpm(&self) -> f64 {
        if self.bpm.is_finite() && self.bpm > 0.0 {
            self.bpm
        } else {
            120.0
        }
    }
}
