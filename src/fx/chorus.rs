//! Stereo chorus.
//!
//! One modulated delay tap per channel, with the right channel's LFO a
//! quarter cycle behind the left, spread apart by the width control. Depth
//! and base delay are in milliseconds; the modulated tap is read with
//! linear interpolation.

use std::f32::consts::TAU;

use crate::dsp::delay::DelayLine;
use crate::fx::mix_into;

/// Enough for max delay + max depth at 192 kHz.
const MAX_CHORUS_DELAY_SAMPLES: usize = 16_384;

#[derive(Debug, Clone, Copy)]
pub struct ChorusParams {
    /// LFO rate in Hz.
    pub rate: f32,
    /// Modulation depth in milliseconds.
    pub depth_ms: f32,
    /// Base delay in milliseconds.
    pub delay_ms: f32,
    /// Stereo spread of the two taps, 0..1.
    pub width: f32,
    /// Dry/wet, 0..1.
    pub mix: f32,
}

impl Default for ChorusParams {
    fn default() -> Self {
        Self {
            rate: 0.3,
            depth_ms: 2.0,
            delay_ms: 7.0,
            width: 0.5,
            mix: 0.5,
        }
    }
}

pub struct Chorus {
    sample_rate: f32,
    params: ChorusParams,
    line_l: DelayLine,
    line_r: DelayLine,
    phase: f32,
    scratch_l: Vec<f32>,
    scratch_r: Vec<f32>,
}

impl Chorus {
    pub fn new(max_block: usize) -> Self {
        Self {
            sample_rate: 44_100.0,
            params: ChorusParams::default(),
            line_l: DelayLine::new(MAX_CHORUS_DELAY_SAMPLES),
            line_r: DelayLine::new(MAX_CHORUS_DELAY_SAMPLES),
            phase: 0.0,
            scratch_l: vec![0.0; max_block],
            scratch_r: vec![0.0; max_block],
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn set_params(&mut self, params: ChorusParams) {
        self.params = params;
    }

    pub fn reset(&mut self) {
        self.line_l.reset();
        self.line_r.reset();
        self.phase = 0.0;
    }

    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        debug_assert!(left.len() <= self.scratch_l.len());

        let ms = self.sample_rate / 1_000.0;
        let base = self.params.delay_ms.max(0.0) * ms;
        let depth = self.params.depth_ms.max(0.0) * ms;
        let phase_inc = self.params.rate.max(0.0) / self.sample_rate;
        // Width pushes the right tap up to a quarter cycle behind.
        let right_offset = 0.25 * self.params.width.clamp(0.0, 1.0);

        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            self.line_l.write(*l);
            self.line_r.write(*r);

            let mod_l = (TAU * self.phase).sin();
            let mod_r = (TAU * (self.phase - right_offset)).sin();

            self.scratch_l[i] = self.line_l.read_fractional(base + depth * (0.5 + 0.5 * mod_l));
            self.scratch_r[i] = self.line_r.read_fractional(base + depth * (0.5 + 0.5 * mod_r));

            self.phase += phase_inc;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
        }

        let n = left.len();
        mix_into(left, &self.scratch_l[..n], self.params.mix);
        mix_into(right, &self.scratch_r[..n], self.params.mix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_mix_is_transparent() {
        let mut chorus = Chorus::new(256);
        chorus.set_sample_rate(48_000.0);
        chorus.set_params(ChorusParams {
            mix: 0.0,
            ..ChorusParams::default()
        });
        let dry: Vec<f32> = (0..256).map(|n| (n as f32 * 0.1).sin()).collect();
        let mut l = dry.clone();
        let mut r = dry.clone();
        chorus.process(&mut l, &mut r);
        assert_eq!(l, dry);
    }

    #[test]
    fn full_mix_delays_the_signal() {
        let mut chorus = Chorus::new(64);
        chorus.set_sample_rate(48_000.0);
        chorus.set_params(ChorusParams {
            mix: 1.0,
            delay_ms: 5.0,
            depth_ms: 0.0,
            ..ChorusParams::default()
        });
        let mut l = vec![0.0; 64];
        l[0] = 1.0;
        let mut r = l.clone();
        chorus.process(&mut l, &mut r);
        // The impulse has not reached the 5 ms tap inside 64 samples.
        assert!(l.iter().all(|&s| s.abs() < 1e-6));
    }

    #[test]
    fn output_stays_finite_under_modulation() {
        let mut chorus = Chorus::new(512);
        chorus.set_sample_rate(48_000.0);
        chorus.set_params(ChorusParams {
            rate: 5.0,
            depth_ms: 10.0,
            delay_ms: 20.0,
            width: 1.0,
            mix: 0.5,
        });
        let mut l: Vec<f32> = (0..512).map(|n| (n as f32 * 0.3).sin()).collect();
        let mut r = l.clone();
        for _ in 0..20 {
            chorus.process(&mut l, &mut r);
        }
        assert!(l.iter().all(|s| s.is_finite()));
    }
}
