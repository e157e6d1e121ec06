//! Rhythmic gate.
//!
//! A 32-step on/off pattern per channel, stepped at a tempo-derived rate.
//! Attack and release times smooth the gain transitions so the gate chops
//! without clicking.

use crate::MIN_TIME;

pub const MAX_GATE_STEPS: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct GateParams {
    /// Steps per second, derived from a note duration by the caller.
    pub steps_per_second: f32,
    pub num_steps: usize,
    pub attack: f32,
    pub release: f32,
}

impl Default for GateParams {
    fn default() -> Self {
        Self {
            steps_per_second: 8.0,
            num_steps: 8,
            attack: 0.001,
            release: 0.01,
        }
    }
}

pub struct Gate {
    sample_rate: f32,
    params: GateParams,
    pattern_l: [bool; MAX_GATE_STEPS],
    pattern_r: [bool; MAX_GATE_STEPS],
    /// Position in steps.
    phase: f32,
    gain_l: f32,
    gain_r: f32,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            sample_rate: 44_100.0,
            params: GateParams::default(),
            pattern_l: [true; MAX_GATE_STEPS],
            pattern_r: [true; MAX_GATE_STEPS],
            phase: 0.0,
            gain_l: 1.0,
            gain_r: 1.0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn set_params(&mut self, params: GateParams) {
        self.params = GateParams {
            steps_per_second: params.steps_per_second.max(0.0),
            num_steps: params.num_steps.clamp(1, MAX_GATE_STEPS),
            attack: params.attack.max(MIN_TIME),
            release: params.release.max(MIN_TIME),
        };
    }

    pub fn set_step(&mut self, index: usize, left: bool, right: bool) {
        if index < MAX_GATE_STEPS {
            self.pattern_l[index] = left;
            self.pattern_r[index] = right;
        }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.gain_l = 1.0;
        self.gain_r = 1.0;
    }

    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        let step_inc = self.params.steps_per_second / self.sample_rate;
        let attack_inc = 1.0 / (self.params.attack * self.sample_rate);
        let release_inc = 1.0 / (self.params.release * self.sample_rate);
        let span = self.params.num_steps as f32;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let step = (self.phase as usize).min(self.params.num_steps - 1);
            let target_l = if self.pattern_l[step] { 1.0 } else { 0.0 };
            let target_r = if self.pattern_r[step] { 1.0 } else { 0.0 };

            self.gain_l = slew(self.gain_l, target_l, attack_inc, release_inc);
            self.gain_r = slew(self.gain_r, target_r, attack_inc, release_inc);

            *l *= self.gain_l;
            *r *= self.gain_r;

            self.phase += step_inc;
            if self.phase >= span {
                self.phase -= span;
            }
        }
    }
}

#[inline]
fn slew(current: f32, target: f32, attack_inc: f32, release_inc: f32) -> f32 {
    if target > current {
        (current + attack_inc).min(target)
    } else {
        (current - release_inc).max(target)
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(steps_per_second: f32, num_steps: usize) -> Gate {
        let mut gate = Gate::new();
        gate.set_sample_rate(1_000.0);
        gate.set_params(GateParams {
            steps_per_second,
            num_steps,
            attack: 0.001,
            release: 0.001,
        });
        gate
    }

    #[test]
    fn closed_steps_mute_the_signal() {
        let mut gate = make(10.0, 2); // 100 samples per step
        gate.set_step(0, true, true);
        gate.set_step(1, false, false);

        let mut l = vec![1.0; 200];
        let mut r = vec![1.0; 200];
        gate.process(&mut l, &mut r);

        // Middle of the open step is untouched, middle of the closed one
        // is silent (each step gives the 1 ms slew time to settle).
        assert!(l[50] > 0.99);
        assert!(l[150] < 0.01);
    }

    #[test]
    fn channels_gate_independently() {
        let mut gate = make(10.0, 2);
        gate.set_step(0, true, false);
        gate.set_step(1, true, false);

        let mut l = vec![1.0; 100];
        let mut r = vec![1.0; 100];
        gate.process(&mut l, &mut r);
        assert!(l[50] > 0.99);
        assert!(r[50] < 0.01);
    }

    #[test]
    fn transitions_are_ramped_not_stepped() {
        let mut gate = make(100.0, 2); // 10 samples per step
        gate.set_params(GateParams {
            steps_per_second: 100.0,
            num_steps: 2,
            attack: 0.005,
            release: 0.005, // 5 samples of ramp at 1 kHz
        });
        gate.set_step(0, true, true);
        gate.set_step(1, false, false);

        let mut l = vec![1.0; 20];
        let mut r = vec![1.0; 20];
        gate.process(&mut l, &mut r);

        // The closed step starts at sample 10; gain must fall gradually.
        assert!(l[10] > 0.5);
        assert!(l[11] < l[10]);
        assert!(l[14] < l[11]);
    }

    #[test]
    fn reset_returns_to_the_first_step_open() {
        let mut gate = make(10.0, 4);
        let mut l = vec![1.0; 250];
        let mut r = vec![1.0; 250];
        gate.process(&mut l, &mut r);
        gate.reset();
        let mut l2 = vec![1.0; 10];
        let mut r2 = vec![1.0; 10];
        gate.process(&mut l2, &mut r2);
        assert!(l2[5] > 0.99);
    }
}
