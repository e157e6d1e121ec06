use std::f32::consts::TAU;

/*
Stereo state-variable filter with selectable slope.

The core is the TPT (topology-preserving transform) SVF: two integrators
whose memories (ic1eq/ic2eq) give simultaneous low/band/high/notch
outputs, stable under block-rate cutoff sweeps. A 24 dB/oct response is
two identical 12 dB stages in series.

Coefficients are computed once per `set_params` call (block rate), not per
sample. Cutoff must arrive already clamped to [MIN_CUTOFF_HZ, Nyquist];
`clamp_cutoff` is the one runtime safety clamp the voice applies before
calling in, since an unstable coefficient is worse than a wrong pitch.
*/

pub const MIN_CUTOFF_HZ: f32 = 4.0;
pub const MAX_CUTOFF_HZ: f32 = 20_000.0;

/// Base quality factor at zero resonance.
pub const BASE_Q: f32 = 0.70710678;

/// Clamp a requested cutoff to the stable range for `sample_rate`.
#[inline]
pub fn clamp_cutoff(cutoff_hz: f32, sample_rate: f32) -> f32 {
    let max = MAX_CUTOFF_HZ.min(sample_rate / 2.0);
    cutoff_hz.clamp(MIN_CUTOFF_HZ, max)
}

/// Map the resonance parameter (0..100 %) to a Q value. The input is
/// clamped below the pole so 100 % stays finite.
#[inline]
pub fn resonance_to_q(resonance_pct: f32) -> f32 {
    let r = (resonance_pct / 100.0).clamp(0.0, 1.0);
    BASE_Q / (1.0 - r * 0.99)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSlope {
    Db12,
    Db24,
}

/// Resolve the filter-type parameter (0..7) into mode and slope. Out of
/// range clamps to the last valid type.
pub fn filter_type_from_index(index: usize) -> (FilterMode, FilterSlope) {
    match index {
        0 => (FilterMode::LowPass, FilterSlope::Db12),
        1 => (FilterMode::LowPass, FilterSlope::Db24),
        2 => (FilterMode::HighPass, FilterSlope::Db12),
        3 => (FilterMode::HighPass, FilterSlope::Db24),
        4 => (FilterMode::BandPass, FilterSlope::Db12),
        5 => (FilterMode::BandPass, FilterSlope::Db24),
        6 => (FilterMode::Notch, FilterSlope::Db12),
        _ => (FilterMode::Notch, FilterSlope::Db24),
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SvfState {
    ic1eq: f32,
    ic2eq: f32,
}

impl SvfState {
    #[inline]
    fn tick(&mut self, sample: f32, g: f32, k: f32, mode: FilterMode) -> f32 {
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        match mode {
            FilterMode::LowPass => v2,
            FilterMode::BandPass => v1,
            FilterMode::HighPass => sample - k * v1 - v2,
            FilterMode::Notch => sample - k * v1,
        }
    }
}

pub struct StereoFilter {
    // [channel][cascade stage]
    states: [[SvfState; 2]; 2],
    mode: FilterMode,
    slope: FilterSlope,
    sample_rate: f32,
    g: f32,
    k: f32,
    cutoff_hz: f32,
}

impl StereoFilter {
    pub fn new() -> Self {
        Self {
            states: [[SvfState::default(); 2]; 2],
            mode: FilterMode::LowPass,
            slope: FilterSlope::Db12,
            sample_rate: 44_100.0,
            g: 0.1,
            k: 1.0 / BASE_Q,
            cutoff_hz: 1_000.0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }

    pub fn set_mode(&mut self, mode: FilterMode) {
        self.mode = mode;
    }

    pub fn set_slope(&mut self, slope: FilterSlope) {
        self.slope = slope;
    }

    /// Block-rate coefficient update. `cutoff_hz` is clamped again here as
    /// a last line of defense.
    pub fn set_params(&mut self, cutoff_hz: f32, q: f32) {
        self.cutoff_hz = clamp_cutoff(cutoff_hz, self.sample_rate);
        self.k = 1.0 / q.max(1.0e-3);
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        let wd = TAU * clamp_cutoff(self.cutoff_hz, self.sample_rate);
        let wa = (2.0 * self.sample_rate) * (wd / (2.0 * self.sample_rate)).tan();
        self.g = wa / (2.0 * self.sample_rate);
    }

    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        let stages = match self.slope {
            FilterSlope::Db12 => 1,
            FilterSlope::Db24 => 2,
        };

        for (channel, buffer) in [left, right].into_iter().enumerate() {
            for sample in buffer.iter_mut() {
                let mut s = *sample;
                for stage in 0..stages {
                    s = self.states[channel][stage].tick(s, self.g, self.k, self.mode);
                }
                *sample = s;
            }
        }
    }

    pub fn reset(&mut self) {
        self.states = [[SvfState::default(); 2]; 2];
    }
}

impl Default for StereoFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU as TAU32;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| (TAU32 * freq * n as f32 / sample_rate).sin())
            .collect()
    }

    fn peak_after_transient(buffer: &[f32]) -> f32 {
        buffer[buffer.len().min(64)..]
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn cutoff_clamps_to_nyquist() {
        assert_eq!(clamp_cutoff(30_000.0, 44_100.0), 20_000.0);
        assert_eq!(clamp_cutoff(25_000.0, 32_000.0), 16_000.0);
        assert_eq!(clamp_cutoff(0.5, 44_100.0), MIN_CUTOFF_HZ);
    }

    #[test]
    fn resonance_pole_is_guarded() {
        let q = resonance_to_q(100.0);
        assert!(q.is_finite());
        assert!(q > BASE_Q);
        // Even garbage beyond the range stays finite.
        assert!(resonance_to_q(250.0).is_finite());
        assert!((resonance_to_q(0.0) - BASE_Q).abs() < 1e-6);
    }

    #[test]
    fn lowpass_attenuates_above_cutoff() {
        let sample_rate = 48_000.0;
        let mut filter = StereoFilter::new();
        filter.set_sample_rate(sample_rate);
        filter.set_params(500.0, BASE_Q);

        let mut l = sine(5_000.0, sample_rate, 512);
        let mut r = l.clone();
        filter.process(&mut l, &mut r);
        assert!(peak_after_transient(&l) < 0.3);
    }

    #[test]
    fn steeper_slope_attenuates_more() {
        let sample_rate = 48_000.0;
        let run = |slope| {
            let mut filter = StereoFilter::new();
            filter.set_sample_rate(sample_rate);
            filter.set_slope(slope);
            filter.set_params(500.0, BASE_Q);
            let mut l = sine(4_000.0, sample_rate, 1024);
            let mut r = l.clone();
            filter.process(&mut l, &mut r);
            peak_after_transient(&l)
        };
        assert!(run(FilterSlope::Db24) < run(FilterSlope::Db12) * 0.5);
    }

    #[test]
    fn highpass_passes_above_cutoff() {
        let sample_rate = 48_000.0;
        let mut filter = StereoFilter::new();
        filter.set_sample_rate(sample_rate);
        filter.set_mode(FilterMode::HighPass);
        filter.set_params(500.0, BASE_Q);

        let mut l = sine(5_000.0, sample_rate, 512);
        let mut r = l.clone();
        filter.process(&mut l, &mut r);
        assert!(peak_after_transient(&l) > 0.7);
    }

    #[test]
    fn reset_clears_history() {
        let mut filter = StereoFilter::new();
        filter.set_sample_rate(48_000.0);
        filter.set_params(1_000.0, BASE_Q);

        let mut l = sine(1_000.0, 48_000.0, 128);
        let mut r = l.clone();
        filter.process(&mut l, &mut r);
        filter.reset();

        // After reset, silence in gives silence out.
        let mut l2 = vec![0.0; 128];
        let mut r2 = vec![0.0; 128];
        filter.process(&mut l2, &mut r2);
        assert!(l2.iter().all(|&s| s == 0.0));
    }
}
