//! Stereo feedback delay.
//!
//! Two delay lines with per-channel feedback and crossfeed between the
//! channels. Delay time may come from a time parameter or from a tempo
//! synced note duration; either way the caller hands in seconds.

use crate::dsp::delay::DelayLine;
use crate::fx::mix_into;

/// 10 seconds at 192 kHz.
const MAX_DELAY_SAMPLES: usize = 1_920_000;

#[derive(Debug, Clone, Copy)]
pub struct StereoDelayParams {
    pub time_seconds: f32,
    /// Same-channel feedback, 0..1.
    pub feedback: f32,
    /// Opposite-channel feedback, 0..1.
    pub crossfeed: f32,
    pub mix: f32,
}

impl Default for StereoDelayParams {
    fn default() -> Self {
        Self {
            time_seconds: 0.25,
            feedback: 0.3,
            crossfeed: 0.0,
            mix: 0.5,
        }
    }
}

pub struct StereoDelay {
    sample_rate: f32,
    params: StereoDelayParams,
    line_l: DelayLine,
    line_r: DelayLine,
    scratch_l: Vec<f32>,
    scratch_r: Vec<f32>,
}

impl StereoDelay {
    pub fn new(max_block: usize) -> Self {
        Self {
            sample_rate: 44_100.0,
            params: StereoDelayParams::default(),
            line_l: DelayLine::new(MAX_DELAY_SAMPLES),
            line_r: DelayLine::new(MAX_DELAY_SAMPLES),
            scratch_l: vec![0.0; max_block],
            scratch_r: vec![0.0; max_block],
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn set_params(&mut self, params: StereoDelayParams) {
        self.params = StereoDelayParams {
            time_seconds: params.time_seconds.max(0.0),
            feedback: params.feedback.clamp(0.0, 0.99),
            crossfeed: params.crossfeed.clamp(0.0, 0.99),
            mix: params.mix,
        };
    }

    pub fn reset(&mut self) {
        self.line_l.reset();
        self.line_r.reset();
    }

    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        debug_assert!(left.len() <= self.scratch_l.len());

        let delay = ((self.params.time_seconds * self.sample_rate) as usize)
            .min(MAX_DELAY_SAMPLES - 1);
        let fb = self.params.feedback;
        let xf = self.params.crossfeed;

        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            let tap_l = self.line_l.read(delay.saturating_sub(1));
            let tap_r = self.line_r.read(delay.saturating_sub(1));

            self.line_l.write(l + tap_l * fb + tap_r * xf);
            self.line_r.write(r + tap_r * fb + tap_l * xf);

            self.scratch_l[i] = tap_l;
            self.scratch_r[i] = tap_r;
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
    fn impulse_returns_after_the_delay_time() {
        let mut delay = StereoDelay::new(512);
        delay.set_sample_rate(1_000.0);
        delay.set_params(StereoDelayParams {
            time_seconds: 0.1, // 100 samples
            feedback: 0.0,
            crossfeed: 0.0,
            mix: 1.0,
        });
        let mut l = vec![0.0; 512];
        l[0] = 1.0;
        let mut r = vec![0.0; 512];
        delay.process(&mut l, &mut r);
        assert!((l[100] - 1.0).abs() < 1e-6, "echo not at 100: {}", l[100]);
        assert!(l[50].abs() < 1e-6);
    }

    #[test]
    fn feedback_produces_decaying_repeats() {
        let mut delay = StereoDelay::new(512);
        delay.set_sample_rate(1_000.0);
        delay.set_params(StereoDelayParams {
            time_seconds: 0.05, // 50 samples
            feedback: 0.5,
            crossfeed: 0.0,
            mix: 1.0,
        });
        let mut l = vec![0.0; 512];
        l[0] = 1.0;
        let mut r = vec![0.0; 512];
        delay.process(&mut l, &mut r);
        assert!((l[50] - 1.0).abs() < 1e-6);
        assert!((l[100] - 0.5).abs() < 1e-6);
        assert!((l[150] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn crossfeed_bounces_between_channels() {
        let mut delay = StereoDelay::new(512);
        delay.set_sample_rate(1_000.0);
        delay.set_params(StereoDelayParams {
            time_seconds: 0.05,
            feedback: 0.0,
            crossfeed: 0.5,
            mix: 1.0,
        });
        let mut l = vec![0.0; 512];
        l[0] = 1.0;
        let mut r = vec![0.0; 512];
        delay.process(&mut l, &mut r);
        // First repeat stays left, second crosses to the right.
        assert!((l[50] - 1.0).abs() < 1e-6);
        assert!((r[100] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn reset_silences_the_tail() {
        let mut delay = StereoDelay::new(256);
        delay.set_sample_rate(1_000.0);
        delay.set_params(StereoDelayParams {
            time_seconds: 0.05,
            feedback: 0.9,
            crossfeed: 0.0,
            mix: 1.0,
        });
        let mut l = vec![1.0; 256];
        let mut r = vec![1.0; 256];
        delay.process(&mut l, &mut r);
        delay.reset();
        let mut l2 = vec![0.0; 256];
        let mut r2 = vec![0.0; 256];
        delay.process(&mut l2, &mut r2);
        assert!(l2.iter().all(|&s| s == 0.0));
    }
}
