//! Step-sequencer LFO.
//!
//! A pattern of 2 to 32 hand-drawn levels, stepped through at a rate the
//! caller derives from the tempo. Unlike `Lfo` there is no waveform math;
//! the output is simply the level of the current step.

pub const MIN_STEPS: usize = 2;
pub const MAX_STEPS: usize = 32;

pub struct StepLfo {
    sample_rate: f32,
    /// Steps per second.
    freq: f32,
    num_points: usize,
    points: [f32; MAX_STEPS],
    /// Position in steps; wraps at `num_points`.
    phase: f32,
}

impl StepLfo {
    pub fn new() -> Self {
        Self {
            sample_rate: 44_100.0,
            freq: 1.0,
            num_points: 8,
            points: [0.0; MAX_STEPS],
            phase: 0.0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Step advance rate in steps per second.
    pub fn set_freq(&mut self, steps_per_second: f32) {
        self.freq = steps_per_second.max(0.0);
    }

    pub fn set_num_points(&mut self, n: usize) {
        self.num_points = n.clamp(MIN_STEPS, MAX_STEPS);
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Set one step's level, -1..1. Out-of-range indices are ignored.
    pub fn set_point(&mut self, index: usize, level: f32) {
        if let Some(p) = self.points.get_mut(index) {
            *p = level.clamp(-1.0, 1.0);
        }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    pub fn note_on(&mut self) {
        self.reset();
    }

    pub fn process(&mut self, num_samples: usize) {
        self.phase += self.freq * num_samples as f32 / self.sample_rate;
        let span = self.num_points as f32;
        while self.phase >= span {
            self.phase -= span;
        }
    }

    pub fn output(&self) -> f32 {
        let step = (self.phase as usize).min(self.num_points - 1);
        self.points[step]
    }

    pub fn current_step(&self) -> usize {
        (self.phase as usize).min(self.num_points - 1)
    }
}

impl Default for StepLfo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_through_the_pattern_in_order() {
        let mut lfo = StepLfo::new();
        lfo.set_sample_rate(1_000.0);
        lfo.set_freq(10.0); // One step per 100 samples.
        lfo.set_num_points(4);
        for (i, level) in [0.1, -0.5, 1.0, 0.25].iter().enumerate() {
            lfo.set_point(i, *level);
        }

        assert_eq!(lfo.output(), 0.1);
        lfo.process(100);
        assert_eq!(lfo.output(), -0.5);
        lfo.process(200);
        assert_eq!(lfo.output(), 0.25);
        lfo.process(100); // Wraps to the first step.
        assert_eq!(lfo.output(), 0.1);
    }

    #[test]
    fn point_count_clamps_to_valid_range() {
        let mut lfo = StepLfo::new();
        lfo.set_num_points(1);
        assert_eq!(lfo.num_points(), MIN_STEPS);
        lfo.set_num_points(100);
        assert_eq!(lfo.num_points(), MAX_STEPS);
    }

    #[test]
    fn levels_clamp_and_bad_indices_are_ignored() {
        let mut lfo = StepLfo::new();
        lfo.set_num_points(2);
        lfo.set_point(0, 5.0);
        lfo.set_point(999, 1.0);
        assert_eq!(lfo.output(), 1.0);
    }

    #[test]
    fn reset_returns_to_the_first_step() {
        let mut lfo = StepLfo::new();
        lfo.set_sample_rate(1_000.0);
        lfo.set_freq(4.0);
        lfo.set_num_points(4);
        lfo.set_point(0, 0.9);
        lfo.process(700);
        lfo.reset();
        assert_eq!(lfo.current_step(), 0);
        assert_eq!(lfo.output(), 0.9);
    }
}
