//! Stereo Schroeder reverb.
//!
//! Four parallel damped comb filters into two series allpasses per
//! channel. The right channel's delay lengths are offset by a small fixed
//! amount so the two tails decorrelate; the width control blends between
//! the decorrelated and the mid-only image. Freeze pins comb feedback at
//! unity and mutes the input so the current tail sustains indefinitely.

use crate::fx::mix_into;

const COMB_TUNINGS_MS: [f32; 4] = [29.7, 37.1, 41.1, 43.7];
const ALLPASS_TUNINGS_MS: [f32; 2] = [5.0, 1.7];
/// Right-channel detune, in milliseconds.
const STEREO_SPREAD_MS: f32 = 0.52;

struct Comb {
    buffer: Vec<f32>,
    pos: usize,
    feedback: f32,
    damp: f32,
    lp_state: f32,
}

impl Comb {
    fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            pos: 0,
            feedback: 0.8,
            damp: 0.5,
            lp_state: 0.0,
        }
    }

    #[inline]
    fn tick(&mut self, input: f32) -> f32 {
        let out = self.buffer[self.pos];
        self.lp_state = out * (1.0 - self.damp) + self.lp_state * self.damp;
        self.buffer[self.pos] = input + self.lp_state * self.feedback;
        self.pos = (self.pos + 1) % self.buffer.len();
        out
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.lp_state = 0.0;
        self.pos = 0;
    }
}

struct Allpass {
    buffer: Vec<f32>,
    pos: usize,
}

impl Allpass {
    const FEEDBACK: f32 = 0.5;

    fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            pos: 0,
        }
    }

    #[inline]
    fn tick(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.pos];
        let out = delayed - Self::FEEDBACK * input;
        self.buffer[self.pos] = input + Self::FEEDBACK * delayed;
        self.pos = (self.pos + 1) % self.buffer.len();
        out
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
    }
}

struct ReverbChannel {
    combs: [Comb; 4],
    allpasses: [Allpass; 2],
}

impl ReverbChannel {
    fn new(sample_rate: f32, spread_ms: f32) -> Self {
        let samples = |ms: f32| ((ms + spread_ms) * sample_rate / 1_000.0) as usize;
        Self {
            combs: [
                Comb::new(samples(COMB_TUNINGS_MS[0])),
                Comb::new(samples(COMB_TUNINGS_MS[1])),
                Comb::new(samples(COMB_TUNINGS_MS[2])),
                Comb::new(samples(COMB_TUNINGS_MS[3])),
            ],
            allpasses: [
                Allpass::new(samples(ALLPASS_TUNINGS_MS[0])),
                Allpass::new(samples(ALLPASS_TUNINGS_MS[1])),
            ],
        }
    }

    #[inline]
    fn tick(&mut self, input: f32) -> f32 {
        let mut out = 0.0;
        for comb in &mut self.combs {
            out += comb.tick(input);
        }
        out *= 0.25;
        for allpass in &mut self.allpasses {
            out = allpass.tick(out);
        }
        out
    }

    fn reset(&mut self) {
        for comb in &mut self.combs {
            comb.reset();
        }
        for allpass in &mut self.allpasses {
            allpass.reset();
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReverbParams {
    /// Room size, 0..1; scales comb feedback.
    pub size: f32,
    /// High-frequency absorption, 0..1.
    pub damping: f32,
    /// Stereo width, 0..1.
    pub width: f32,
    /// Sustain the current tail forever.
    pub freeze: bool,
    pub mix: f32,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            size: 0.5,
            damping: 0.5,
            width: 1.0,
            freeze: false,
            mix: 0.3,
        }
    }
}

pub struct StereoReverb {
    sample_rate: f32,
    params: ReverbParams,
    channel_l: ReverbChannel,
    channel_r: ReverbChannel,
    scratch_l: Vec<f32>,
    scratch_r: Vec<f32>,
}

impl StereoReverb {
    pub fn new(max_block: usize) -> Self {
        let sample_rate = 44_100.0;
        let mut reverb = Self {
            sample_rate,
            params: ReverbParams::default(),
            channel_l: ReverbChannel::new(sample_rate, 0.0),
            channel_r: ReverbChannel::new(sample_rate, STEREO_SPREAD_MS),
            scratch_l: vec![0.0; max_block],
            scratch_r: vec![0.0; max_block],
        };
        reverb.apply_params();
        reverb
    }

    /// Rebuilds the delay network; allocates, so call from setup only.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.channel_l = ReverbChannel::new(sample_rate, 0.0);
        self.channel_r = ReverbChannel::new(sample_rate, STEREO_SPREAD_MS);
        self.apply_params();
    }

    pub fn set_params(&mut self, params: ReverbParams) {
        self.params = params;
        self.apply_params();
    }

    fn apply_params(&mut self) {
        let (feedback, damp) = if self.params.freeze {
            (1.0, 0.0)
        } else {
            (
                0.7 + self.params.size.clamp(0.0, 1.0) * 0.28,
                self.params.damping.clamp(0.0, 1.0),
            )
        };
        for channel in [&mut self.channel_l, &mut self.channel_r] {
            for comb in &mut channel.combs {
                comb.feedback = feedback;
                comb.damp = damp;
            }
        }
    }

    pub fn reset(&mut self) {
        self.channel_l.reset();
        self.channel_r.reset();
    }

    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        debug_assert!(left.len() <= self.scratch_l.len());

        let input_scale = if self.params.freeze { 0.0 } else { 1.0 };
        let width = self.params.width.clamp(0.0, 1.0);
        let wet1 = 0.5 + width / 2.0;
        let wet2 = 0.5 - width / 2.0;

        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            // Mono sum drives both channels; decorrelation comes from the
            // offset delay lengths.
            let input = (l + r) * 0.5 * input_scale;
            let out_l = self.channel_l.tick(input);
            let out_r = self.channel_r.tick(input);
            self.scratch_l[i] = out_l * wet1 + out_r * wet2;
            self.scratch_r[i] = out_r * wet1 + out_l * wet2;
        }

        let n = left.len();
        mix_into(left, &self.scratch_l[..n], self.params.mix);
        mix_into(right, &self.scratch_r[..n], self.params.mix);
    }
}
