use std::f32::consts::TAU;

use crate::dsp::rand::NoiseGen;
use crate::MIN_TIME;

/*
Block-rate LFO with the full virtual-analog shape set.

The LFO never renders per-sample audio; it advances its phase once per
sub-block and exposes a single output value that the caller publishes into
a modulation source. Shapes therefore only need to be evaluated at the
current phase.

Beyond the basic shapes there are stepped variants (3/4/8-level
staircases, up or down), quantized pyramids, sample-and-hold and noise.
Delay holds the output at zero for a time after (re)trigger, fade then
ramps the amplitude in (positive fade) or out (negative fade).

Frequency is whatever the caller says: a free-running rate parameter or
1/duration for tempo-synced operation. The sync decision lives with the
voice/engine, not here.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoShape {
    None,
    Sine,
    Triangle,
    SawUp,
    SawDown,
    Square,
    SquarePos,
    SampleAndHold,
    Noise,
    StepUp3,
    StepUp4,
    StepUp8,
    StepDown3,
    StepDown4,
    StepDown8,
    Pyramid3,
    Pyramid5,
    Pyramid9,
}

impl LfoShape {
    /// Map the wave parameter's integer value; out of range clamps.
    pub fn from_index(index: usize) -> Self {
        use LfoShape::*;
        match index {
            0 => None,
            1 => Sine,
            2 => Triangle,
            3 => SawUp,
            4 => SawDown,
            5 => Square,
            6 => SquarePos,
            7 => SampleAndHold,
            8 => Noise,
            9 => StepUp3,
            10 => StepUp4,
            11 => StepUp8,
            12 => StepDown3,
            13 => StepDown4,
            14 => StepDown8,
            15 => Pyramid3,
            16 => Pyramid5,
            _ => Pyramid9,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LfoParams {
    pub shape: LfoShape,
    pub frequency: f32,
    /// Phase offset in cycles, -1..1.
    pub phase: f32,
    /// Constant added to the shaped output.
    pub offset: f32,
    /// Output scale, -1..1 (negative inverts).
    pub depth: f32,
    /// Seconds of silence after trigger.
    pub delay: f32,
    /// Seconds to fade in (positive) or out (negative) after the delay.
    pub fade: f32,
}

impl Default for LfoParams {
    fn default() -> Self {
        Self {
            shape: LfoShape::Sine,
            frequency: 1.0,
            phase: 0.0,
            offset: 0.0,
            depth: 1.0,
            delay: 0.0,
            fade: 0.0,
        }
    }
}

pub struct Lfo {
    sample_rate: f32,
    params: LfoParams,
    phase: f32,
    /// Seconds since (re)trigger, drives delay/fade.
    elapsed: f32,
    held_value: f32,
    noise: NoiseGen,
}

impl Lfo {
    pub fn new() -> Self {
        let mut lfo = Self {
            sample_rate: 44_100.0,
            params: LfoParams::default(),
            phase: 0.0,
            elapsed: 0.0,
            held_value: 0.0,
            noise: NoiseGen::new(0x10f0),
        };
        lfo.reset();
        lfo
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn set_parameters(&mut self, params: LfoParams) {
        self.params = params;
    }

    /// Back to initial phase, timers cleared, noise reseeded. Idempotent.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.elapsed = 0.0;
        self.noise.reseed(0x10f0);
        self.held_value = self.noise.next_bipolar();
    }

    /// Retrigger for a new note (poly usage).
    pub fn note_on(&mut self) {
        self.reset();
    }

    /// Advance by `num_samples`.
    pub fn process(&mut self, num_samples: usize) {
        let dt = num_samples as f32 / self.sample_rate;
        self.elapsed += dt;

        self.phase += self.params.frequency.max(0.0) * dt;
        let wrapped = self.phase >= 1.0;
        while self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        match self.params.shape {
            LfoShape::SampleAndHold if wrapped => {
                self.held_value = self.noise.next_bipolar();
            }
            LfoShape::Noise => {
                self.held_value = self.noise.next_bipolar();
            }
            _ => {}
        }
    }

    /// Amplitude scale from the delay/fade stage, 0..1.
    fn fade_scale(&self) -> f32 {
        if self.elapsed < self.params.delay {
            return 0.0;
        }
        let after_delay = self.elapsed - self.params.delay;
        let fade = self.params.fade;
        if fade > MIN_TIME {
            (after_delay / fade).min(1.0)
        } else if fade < -MIN_TIME {
            (1.0 - after_delay / -fade).max(0.0)
        } else {
            1.0
        }
    }

    #[inline]
    fn staircase(phase: f32, levels: usize, descending: bool) -> f32 {
        let step = ((phase * levels as f32) as usize).min(levels - 1);
        let v = -1.0 + 2.0 * step as f32 / (levels - 1) as f32;
        if descending {
            -v
        } else {
            v
        }
    }

    #[inline]
    fn pyramid(phase: f32, levels: usize) -> f32 {
        let tri = if phase < 0.5 {
            4.0 * phase - 1.0
        } else {
            3.0 - 4.0 * phase
        };
        let n = (levels - 1) as f32;
        (((tri + 1.0) / 2.0 * n).round() / n) * 2.0 - 1.0
    }

    fn shape_value(&self, phase: f32) -> f32 {
        use LfoShape::*;
        let p = {
            let mut p = (phase + self.params.phase).fract();
            if p < 0.0 {
                p += 1.0;
            }
            p
        };
        match self.params.shape {
            None => 0.0,
            Sine => (TAU * p).sin(),
            Triangle => {
                if p < 0.5 {
                    4.0 * p - 1.0
                } else {
                    3.0 - 4.0 * p
                }
            }
            SawUp => 2.0 * p - 1.0,
            SawDown => 1.0 - 2.0 * p,
            Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            SquarePos => {
                if p < 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            SampleAndHold | Noise => self.held_value,
            StepUp3 => Self::staircase(p, 3, false),
            StepUp4 => Self::staircase(p, 4, false),
            StepUp8 => Self::staircase(p, 8, false),
            StepDown3 => Self::staircase(p, 3, true),
            StepDown4 => Self::staircase(p, 4, true),
            StepDown8 => Self::staircase(p, 8, true),
            Pyramid3 => Self::pyramid(p, 3),
            Pyramid5 => Self::pyramid(p, 5),
            Pyramid9 => Self::pyramid(p, 9),
        }
    }

    /// Current output value at the current phase.
    pub fn output(&self) -> f32 {
        (self.shape_value(self.phase) * self.params.depth + self.params.offset)
            * self.fade_scale()
    }

    pub fn current_phase(&self) -> f32 {
        self.phase
    }
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn make(params: LfoParams) -> Lfo {
        let mut lfo = Lfo::new();
        lfo.set_sample_rate(SAMPLE_RATE);
        lfo.set_parameters(params);
        lfo.reset();
        lfo
    }

    #[test]
    fn sine_hits_quarter_cycle_peak() {
        let mut lfo = make(LfoParams {
            frequency: 2.0,
            ..LfoParams::default()
        });
        // 2 Hz at 1 kHz: 125 samples = quarter cycle.
        lfo.process(125);
        assert!((lfo.output() - 1.0).abs() < 1e-3);
        lfo.process(250);
        assert!((lfo.output() + 1.0).abs() < 1e-3);
    }

    #[test]
    fn depth_and_offset_shape_the_output() {
        let mut lfo = make(LfoParams {
            shape: LfoShape::Square,
            frequency: 1.0,
            depth: 0.5,
            offset: 0.25,
            ..LfoParams::default()
        });
        lfo.process(100); // First half-cycle: square = 1.
        assert!((lfo.output() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn delay_silences_then_fade_ramps_in() {
        let mut lfo = make(LfoParams {
            shape: LfoShape::Square,
            frequency: 0.1,
            delay: 0.1,
            fade: 0.2,
            ..LfoParams::default()
        });
        lfo.process(50); // 0.05 s, still in delay
        assert_eq!(lfo.output(), 0.0);
        lfo.process(150); // 0.2 s: 0.1 s past delay = half the fade
        let mid = lfo.output().abs();
        assert!(mid > 0.2 && mid < 0.8, "expected mid-fade, got {mid}");
        lfo.process(400); // well past the fade
        assert!((lfo.output().abs() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn sample_and_hold_holds_within_a_cycle() {
        let mut lfo = make(LfoParams {
            shape: LfoShape::SampleAndHold,
            frequency: 1.0,
            ..LfoParams::default()
        });
        lfo.process(100);
        let a = lfo.output();
        lfo.process(100);
        assert_eq!(a, lfo.output());
        lfo.process(900); // crosses the cycle boundary
        assert_ne!(a, lfo.output());
    }

    #[test]
    fn staircase_step_counts() {
        let mut lfo = make(LfoParams {
            shape: LfoShape::StepUp3,
            frequency: 1.0,
            ..LfoParams::default()
        });
        let mut seen = Vec::new();
        for _ in 0..20 {
            lfo.process(50);
            let v = lfo.output();
            if !seen.iter().any(|&s: &f32| (s - v).abs() < 1e-6) {
                seen.push(v);
            }
        }
        assert_eq!(seen.len(), 3, "3-step staircase produced {seen:?}");
    }

    #[test]
    fn reset_restores_initial_output() {
        let mut lfo = make(LfoParams {
            shape: LfoShape::SampleAndHold,
            frequency: 3.0,
            ..LfoParams::default()
        });
        let initial = lfo.output();
        lfo.process(5_000);
        lfo.reset();
        assert_eq!(lfo.output(), initial);
        assert_eq!(lfo.current_phase(), 0.0);
    }
}
