//! Four-band parametric EQ.
//!
//! Low shelf, two peaking bands, high shelf, in series. Coefficients use
//! the RBJ cookbook forms and are recomputed only when `set_params` runs,
//! so modulated sweeps cost one coefficient update per sub-block.

use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BandKind {
    LowShelf,
    Peak,
    HighShelf,
}

#[derive(Debug, Clone, Copy)]
pub struct BandParams {
    pub freq_hz: f32,
    pub gain_db: f32,
    pub q: f32,
}

impl Default for BandParams {
    fn default() -> Self {
        Self {
            freq_hz: 1_000.0,
            gain_db: 0.0,
            q: 0.707,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EqParams {
    pub low: BandParams,
    pub mid1: BandParams,
    pub mid2: BandParams,
    pub high: BandParams,
}

impl Default for EqParams {
    fn default() -> Self {
        Self {
            low: BandParams {
                freq_hz: 80.0,
                ..BandParams::default()
            },
            mid1: BandParams {
                freq_hz: 500.0,
                ..BandParams::default()
            },
            mid2: BandParams {
                freq_hz: 3_000.0,
                ..BandParams::default()
            },
            high: BandParams {
                freq_hz: 8_000.0,
                ..BandParams::default()
            },
        }
    }
}

/// Direct-form-1 biquad with per-channel history.
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    // [channel][tap]
    x: [[f32; 2]; 2],
    y: [[f32; 2]; 2],
}

impl Biquad {
    fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x: [[0.0; 2]; 2],
            y: [[0.0; 2]; 2],
        }
    }

    fn configure(&mut self, kind: BandKind, band: &BandParams, sample_rate: f32) {
        let freq = band.freq_hz.clamp(10.0, sample_rate * 0.49);
        let a = 10.0_f32.powf(band.gain_db / 40.0);
        let w0 = TAU * freq / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let q = band.q.max(0.05);
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match kind {
            BandKind::Peak => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            BandKind::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            BandKind::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    #[inline]
    fn tick(&mut self, channel: usize, input: f32) -> f32 {
        let x = &mut self.x[channel];
        let y = &mut self.y[channel];
        let out = self.b0 * input + self.b1 * x[0] + self.b2 * x[1] - self.a1 * y[0] - self.a2 * y[1];
        x[1] = x[0];
        x[0] = input;
        y[1] = y[0];
        y[0] = out;
        out
    }

    fn reset(&mut self) {
        self.x = [[0.0; 2]; 2];
        self.y = [[0.0; 2]; 2];
    }
}

pub struct ParametricEq {
    sample_rate: f32,
    bands: [Biquad; 4],
}

impl ParametricEq {
    pub fn new() -> Self {
        Self {
            sample_rate: 44_100.0,
            bands: [Biquad::identity(); 4],
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn set_params(&mut self, params: EqParams) {
        self.bands[0].configure(BandKind::LowShelf, &params.low, self.sample_rate);
        self.bands[1].configure(BandKind::Peak, &params.mid1, self.sample_rate);
        self.bands[2].configure(BandKind::Peak, &params.mid2, self.sample_rate);
        self.bands[3].configure(BandKind::HighShelf, &params.high, self.sample_rate);
    }

    pub fn reset(&mut self) {
        for band in &mut self.bands {
            band.reset();
        }
    }

    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            for band in &mut self.bands {
                *l = band.tick(0, *l);
                *r = band.tick(1, *r);
            }
        }
    }
}

impl Default for ParametricEq {
    fn default() -> Self {
        Self::new()
    }
}
