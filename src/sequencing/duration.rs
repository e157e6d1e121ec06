use crate::sequencing::Playhead;

/// Musical note duration represented as a rational fraction of a whole note.
/// All operations preserve exact ratios; floats only appear at the final
/// conversion to seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    pub numerator: u32,
    pub denominator: u32,
}

impl Duration {
    pub const WHOLE: Duration = Duration::new(1, 1);
    pub const HALF: Duration = Duration::new(1, 2);
    pub const QUARTER: Duration = Duration::new(1, 4);
    pub const EIGHTH: Duration = Duration::new(1, 8);
    pub const SIXTEENTH: Duration = Duration::new(1, 16);
    pub const THIRTY_SECOND: Duration = Duration::new(1, 32);
    pub const SIXTY_FOURTH: Duration = Duration::new(1, 64);

    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Apply a dot: multiply the duration by 3/2.
    pub const fn dotted(self) -> Self {
        Duration::new(self.numerator * 3, self.denominator * 2)
    }

    /// Triplet: three notes in the time of two.
    pub const fn triplet(self) -> Self {
        Duration::new(self.numerator * 2, self.denominator * 3)
    }

    /// Whole-note multiples, for bar-length durations.
    pub const fn bars(count: u32) -> Self {
        Duration::new(count, 1)
    }

    /// Length in seconds at the playhead's tempo. A whole note is four
    /// beats; the beat is the quarter note.
    pub fn to_seconds(&self, playhead: &Playhead) -> f32 {
        let beats = 4.0 * self.numerator as f64 / self.denominator.max(1) as f64;
        (beats * 60.0 / playhead.safe_bpm()) as f32
    }
}

/// A named entry in the tempo-sync menu.
#[derive(Debug, Clone, Copy)]
pub struct NoteDuration {
    pub name: &'static str,
    pub duration: Duration,
}

const fn entry(name: &'static str, duration: Duration) -> NoteDuration {
    NoteDuration { name, duration }
}

/// The tempo-sync menu. Triplet, straight, dotted for each base value,
/// then bar multiples. Rate parameters store an index into this table.
pub const NOTE_DURATIONS: [NoteDuration; 28] = [
    entry("1/64T", Duration::SIXTY_FOURTH.triplet()),
    entry("1/64", Duration::SIXTY_FOURTH),
    entry("1/64D", Duration::SIXTY_FOURTH.dotted()),
    entry("1/32T", Duration::THIRTY_SECOND.triplet()),
    entry("1/32", Duration::THIRTY_SECOND),
    entry("1/32D", Duration::THIRTY_SECOND.dotted()),
    entry("1/16T", Duration::SIXTEENTH.triplet()),
    entry("1/16", Duration::SIXTEENTH),
    entry("1/16D", Duration::SIXTEENTH.dotted()),
    entry("1/8T", Duration::EIGHTH.triplet()),
    entry("1/8", Duration::EIGHTH),
    entry("1/8D", Duration::EIGHTH.dotted()),
    entry("1/4T", Duration::QUARTER.triplet()),
    entry("1/4", Duration::QUARTER),
    entry("1/4D", Duration::QUARTER.dotted()),
    entry("1/2T", Duration::HALF.triplet()),
    entry("1/2", Duration::HALF),
    entry("1/2D", Duration::HALF.dotted()),
    entry("1T", Duration::WHOLE.triplet()),
    entry("1", Duration::WHOLE),
    entry("1D", Duration::WHOLE.dotted()),
    entry("2T", Duration::bars(2).triplet()),
    entry("2", Duration::bars(2)),
    entry("2D", Duration::bars(2).dotted()),
    entry("4T", Duration::bars(4).triplet()),
    entry("4", Duration::bars(4)),
    entry("4D", Duration::bars(4).dotted()),
    entry("8", Duration::bars(8)),
];

/// Look up a rate parameter's value, clamping out-of-range indices.
pub fn note_duration(index: usize) -> &'static NoteDuration {
    &NOTE_DURATIONS[index.min(NOTE_DURATIONS.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_note_sits_at_index_13() {
        assert_eq!(NOTE_DURATIONS[13].name, "1/4");
        assert_eq!(NOTE_DURATIONS[13].duration, Duration::QUARTER);
    }

    #[test]
    fn quarter_note_matches_the_beat() {
        let playhead = Playhead {
            bpm: 120.0,
            playing: true,
        };
        let seconds = Duration::QUARTER.to_seconds(&playhead);
        assert!((seconds - 0.5).abs() < 1e-6);
    }

    #[test]
    fn dotted_and_triplet_scale_correctly() {
        let playhead = Playhead::default();
        let quarter = Duration::QUARTER.to_seconds(&playhead);
        let dotted = Duration::QUARTER.dotted().to_seconds(&playhead);
        let triplet = Duration::QUARTER.triplet().to_seconds(&playhead);
        assert!((dotted - quarter * 1.5).abs() < 1e-6);
        assert!((triplet - quarter * 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn garbage_tempo_falls_back_to_default() {
        let playhead = Playhead {
            bpm: 0.0,
            playing: true,
        };
        let seconds = Duration::QUARTER.to_seconds(&playhead);
        assert!((seconds - 0.5).abs() < 1e-6);

        let nan = Playhead {
            bpm: f64::NAN,
            playing: true,
        };
        assert!(Duration::QUARTER.to_seconds(&nan).is_finite());
    }

    #[test]
    fn straight_values_double_up_the_table() {
        let playhead = Playhead::default();
        let straight = ["1/64", "1/32", "1/16", "1/8", "1/4", "1/2", "1", "2", "4", "8"];
        let mut last = 0.0;
        for name in straight {
            let entry = NOTE_DURATIONS
                .iter()
                .find(|e| e.name == name)
                .unwrap_or_else(|| panic!("missing {name}"));
            let s = entry.duration.to_seconds(&playhead);
            if last > 0.0 {
                assert!((s - last * 2.0).abs() < 1e-6, "{name} is not double");
            }
            last = s;
        }
    }

    #[test]
    fn lookup_clamps_out_of_range() {
        assert_eq!(note_duration(9999).name, "8");
    }
}
