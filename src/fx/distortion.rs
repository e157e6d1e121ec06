//! Saturating distortion stage.
//!
//! Soft clipping with the x / (1 + |x|) transfer function, preceded by an
//! optional one-pole highpass that keeps low end out of the clipper.
//! Output gain compensates for the level added by the drive.

use crate::fx::mix_into;

/// Soft clipping transfer function. Drive of 1 leaves small signals
/// nearly untouched; the output approaches ±1 asymptotically.
#[inline]
pub fn soft_clip(sample: f32, drive: f32) -> f32 {
    let x = sample * drive;
    x / (1.0 + x.abs())
}

#[derive(Debug, Clone, Copy)]
pub struct DistortionParams {
    /// Drive amount, 0..1 mapped onto 1..16x gain into the clipper.
    pub amount: f32,
    /// Pre-clip highpass cutoff in Hz; 0 disables it.
    pub highpass_hz: f32,
    /// Linear output gain (already converted from dB).
    pub output_gain: f32,
    pub mix: f32,
}

impl Default for DistortionParams {
    fn default() -> Self {
        Self {
            amount: 0.2,
            highpass_hz: 0.0,
            output_gain: 1.0,
            mix: 1.0,
        }
    }
}

pub struct Distortion {
    sample_rate: f32,
    params: DistortionParams,
    hp_state: [f32; 2],
    scratch_l: Vec<f32>,
    scratch_r: Vec<f32>,
}

impl Distortion {
    pub fn new(max_block: usize) -> Self {
        Self {
            sample_rate: 44_100.0,
            params: DistortionParams::default(),
            hp_state: [0.0; 2],
            scratch_l: vec![0.0; max_block],
            scratch_r: vec![0.0; max_block],
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn set_params(&mut self, params: DistortionParams) {
        self.params = params;
    }

    pub fn reset(&mut self) {
        self.hp_state = [0.0; 2];
    }

    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        debug_assert!(left.len() <= self.scratch_l.len());

        let drive = 1.0 + self.params.amount.clamp(0.0, 1.0) * 15.0;
        let hp_coeff = if self.params.highpass_hz > 0.0 {
            let x = (-std::f32::consts::TAU * self.params.highpass_hz / self.sample_rate).exp();
            Some(x)
        } else {
            None
        };
        let out_gain = self.params.output_gain;

        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            let (mut sl, mut sr) = (*l, *r);
            if let Some(a) = hp_coeff {
                // One-pole highpass per channel: input minus the lowpassed input.
                self.hp_state[0] = sl * (1.0 - a) + self.hp_state[0] * a;
                self.hp_state[1] = sr * (1.0 - a) + self.hp_state[1] * a;
                sl -= self.hp_state[0];
                sr -= self.hp_state[1];
            }
            self.scratch_l[i] = soft_clip(sl, drive) * out_gain;
            self.scratch_r[i] = soft_clip(sr, drive) * out_gain;
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
    fn soft_clip_bounds_the_output() {
        assert!(soft_clip(10.0, 10.0) < 1.0);
        assert!(soft_clip(-10.0, 10.0) > -1.0);
        // Small signal at unity drive passes nearly unchanged.
        assert!((soft_clip(0.1, 1.0) - 0.0909).abs() < 0.01);
    }

    #[test]
    fn amount_increases_saturation() {
        let quiet = soft_clip(0.5, 1.0);
        let driven = soft_clip(0.5, 16.0);
        assert!(driven > quiet);
        assert!(driven < 1.0);
    }

    #[test]
    fn highpass_removes_dc() {
        let mut dist = Distortion::new(2_048);
        dist.set_sample_rate(48_000.0);
        dist.set_params(DistortionParams {
            amount: 0.0,
            highpass_hz: 100.0,
            output_gain: 1.0,
            mix: 1.0,
        });
        let mut l = vec![0.5; 2_048];
        let mut r = vec![0.5; 2_048];
        dist.process(&mut l, &mut r);
        // DC settles toward zero by the end of the block.
        assert!(l[2_000].abs() < 0.05);
    }

    #[test]
    fn zero_mix_is_transparent() {
        let mut dist = Distortion::new(64);
        dist.set_params(DistortionParams {
            amount: 1.0,
            mix: 0.0,
            ..DistortionParams::default()
        });
        let dry: Vec<f32> = (0..64).map(|n| (n as f32 * 0.2).sin()).collect();
        let mut l = dry.clone();
        let mut r = dry.clone();
        dist.process(&mut l, &mut r);
        assert_eq!(l, dry);
    }
}
