//! Dynamics: compressor and limiter.
//!
//! A feed-forward compressor with a soft knee. The detector tracks the
//! stereo peak through attack/release one-pole smoothing; gain reduction
//! is computed in dB and applied to both channels so the image does not
//! wander. The limiter is the same engine pinned to a brick-wall ratio
//! with a fast attack.

use crate::dsp::units::db_to_gain;
use crate::MIN_TIME;

#[derive(Debug, Clone, Copy)]
pub struct CompressorParams {
    pub attack: f32,
    pub release: f32,
    pub threshold_db: f32,
    pub ratio: f32,
    /// Soft knee width in dB.
    pub knee_db: f32,
    /// Linear gains (already converted from dB).
    pub input_gain: f32,
    pub output_gain: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            attack: 0.01,
            release: 0.1,
            threshold_db: -12.0,
            ratio: 4.0,
            knee_db: 6.0,
            input_gain: 1.0,
            output_gain: 1.0,
        }
    }
}

pub struct Compressor {
    sample_rate: f32,
    params: CompressorParams,
    /// Detector level in dB.
    envelope_db: f32,
}

impl Compressor {
    pub fn new() -> Self {
        Self {
            sample_rate: 44_100.0,
            params: CompressorParams::default(),
            envelope_db: -120.0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn set_params(&mut self, params: CompressorParams) {
        self.params = CompressorParams {
            attack: params.attack.max(MIN_TIME),
            release: params.release.max(MIN_TIME),
            ratio: params.ratio.max(1.0),
            knee_db: params.knee_db.max(0.0),
            ..params
        };
    }

    pub fn reset(&mut self) {
        self.envelope_db = -120.0;
    }

    /// Static transfer curve: desired gain change in dB for an input level.
    fn gain_reduction_db(&self, level_db: f32) -> f32 {
        let t = self.params.threshold_db;
        let knee = self.params.knee_db;
        let slope = 1.0 / self.params.ratio - 1.0;

        if knee > 0.0 && (level_db - t).abs() <= knee / 2.0 {
            let x = level_db - t + knee / 2.0;
            slope * x * x / (2.0 * knee)
        } else if level_db > t {
            slope * (level_db - t)
        } else {
            0.0
        }
    }

    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());

        let attack_coeff = (-1.0 / (self.params.attack * self.sample_rate)).exp();
        let release_coeff = (-1.0 / (self.params.release * self.sample_rate)).exp();
        let in_gain = self.params.input_gain;
        let out_gain = self.params.output_gain;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let sl = *l * in_gain;
            let sr = *r * in_gain;

            let peak = sl.abs().max(sr.abs()).max(1.0e-6);
            let level_db = 20.0 * peak.log10();

            let coeff = if level_db > self.envelope_db {
                attack_coeff
            } else {
                release_coeff
            };
            self.envelope_db = level_db + coeff * (self.envelope_db - level_db);

            let gain = db_to_gain(self.gain_reduction_db(self.envelope_db)) * out_gain;
            *l = sl * gain;
            *r = sr * gain;
        }
    }

    /// Current detector level, for metering.
    pub fn envelope_db(&self) -> f32 {
        self.envelope_db
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

/// Brick-wall limiter built on the compressor engine.
pub struct Limiter {
    inner: Compressor,
}

impl Limiter {
    pub fn new() -> Self {
        let mut inner = Compressor::new();
        inner.set_params(CompressorParams {
            attack: 0.001,
            release: 0.05,
            threshold_db: -0.3,
            ratio: 100.0,
            knee_db: 0.0,
            input_gain: 1.0,
            output_gain: 1.0,
        });
        Self { inner }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.inner.set_sample_rate(sample_rate);
    }

    /// Only the ceiling and time constants are adjustable.
    pub fn set_params(&mut self, attack: f32, release: f32, ceiling_db: f32) {
        self.inner.set_params(CompressorParams {
            attack,
            release,
            threshold_db: ceiling_db,
            ratio: 100.0,
            knee_db: 0.0,
            input_gain: 1.0,
            output_gain: 1.0,
        });
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.inner.process(left, right);
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self::new()
    }
}
