use crate::MIN_TIME;

/*
ADSR envelope generator, block-rate variant.

  level       Current output value (0.0 to 1.0). Multiplies the audio
              signal for the amplitude stage, or feeds a modulation source
              for filter/aux envelopes.

  stage       Idle, Attack, Decay, Sustain, or Release. A state machine
              governs transitions; note_off moves to Release from ANY
              stage, starting from the CURRENT level so releasing during
              attack never clicks.

Linear ramps throughout. The per-sample increment is recomputed from the
stage time each sample, so A/D/S/R setters can be driven at block rate by
modulated parameters without cache invalidation.

Two consumption styles:
  - `process(n)` advances n samples and leaves the latest level readable
    through `output()`, for filter and aux modulation envelopes that
    only need one value per block.
  - `apply_multiplying(l, r)` advances per sample while scaling a stereo
    buffer in place, for the amplitude stage.
*/

/// The current stage of the envelope state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

pub struct Adsr {
    attack_time: f32,
    decay_time: f32,
    sustain_level: f32,
    release_time: f32,

    sample_rate: f32,
    stage: EnvelopeState,
    level: f32,

    decay_start_level: f32,
    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl Adsr {
    pub fn new() -> Self {
        Self {
            attack_time: 0.01,
            decay_time: 0.1,
            sustain_level: 0.8,
            release_time: 0.1,
            sample_rate: 44_100.0,
            stage: EnvelopeState::Idle,
            level: 0.0,
            decay_start_level: 0.0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn set_attack(&mut self, seconds: f32) {
        self.attack_time = seconds.max(MIN_TIME);
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.decay_time = seconds.max(MIN_TIME);
    }

    pub fn set_sustain_level(&mut self, level: f32) {
        self.sustain_level = level.clamp(0.0, 1.0);
    }

    pub fn set_release(&mut self, seconds: f32) {
        self.release_time = seconds.max(MIN_TIME);
    }

    /// Gate high: restart the attack phase from zero for a clean retrigger.
    pub fn note_on(&mut self) {
        self.level = 0.0;
        self.stage = EnvelopeState::Attack;
        self.release_elapsed_samples = 0;
    }

    /// Gate low: start the release phase from the current level.
    pub fn note_off(&mut self) {
        if self.stage == EnvelopeState::Idle {
            return;
        }

        self.release_start_level = self.level;
        self.release_total_samples = if self.release_time <= MIN_TIME {
            1
        } else {
            (self.release_time * self.sample_rate).round().max(1.0) as u32
        };
        self.release_elapsed_samples = 0;
        self.stage = EnvelopeState::Release;
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                let increment = 1.0 / (self.attack_time * self.sample_rate);
                self.level += increment;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.decay_start_level = 1.0;
                    self.stage = EnvelopeState::Decay;
                }
            }

            EnvelopeState::Decay => {
                let target = self.sustain_level;
                let total_drop = self.decay_start_level - target;
                let decrement = total_drop / (self.decay_time * self.sample_rate);
                self.level -= decrement.max(0.0);
                if self.level <= target {
                    self.level = target;
                    self.stage = EnvelopeState::Sustain;
                }
            }

            EnvelopeState::Sustain => {
                self.level = self.sustain_level;
            }

            EnvelopeState::Release => {
                // Interpolate from the snapshotted level so we hit exactly 0.
                let progress =
                    self.release_elapsed_samples as f32 / self.release_total_samples as f32;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);
                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);
                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeState::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    /// Advance the envelope by `num_samples` without producing audio.
    pub fn process(&mut self, num_samples: usize) {
        for _ in 0..num_samples {
            self.next_sample();
        }
    }

    /// Advance per sample while applying the envelope as a gain stage.
    pub fn apply_multiplying(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let level = self.next_sample();
            *l *= level;
            *r *= level;
        }
    }

    pub fn output(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }

    pub fn is_idle(&self) -> bool {
        self.stage == EnvelopeState::Idle
    }

    /// Reset to idle. Idempotent; clears all history.
    pub fn reset(&mut self) {
        self.stage = EnvelopeState::Idle;
        self.level = 0.0;
        self.decay_start_level = 0.0;
        self.release_start_level = 0.0;
        self.release_total_samples = 1;
        self.release_elapsed_samples = 0;
    }
}

impl Default for Adsr {
    fn default() -> Self {
        Self::new()
    }
}
