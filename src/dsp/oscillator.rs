use std::f32::consts::TAU;

use crate::dsp::rand::NoiseGen;
use crate::dsp::units::midi_note_to_hz;
use crate::MAX_UNISON;

/*
Virtual-analog oscillator bank.

One `VaOscillator` renders a whole unison stack for a single oscillator
slot: up to MAX_UNISON phase-offset copies of the selected waveform, each
detuned and panned away from center. Rendering is additive into a stereo
scratch buffer so several oscillator slots can layer into the same voice.

Waveforms are the classic non-bandlimited shapes; anti-aliasing is a
concern of the waveform table, not of this orchestration layer.

Unison spread for n copies places copy v at offset (v/(n-1) - 0.5) in
[-0.5, 0.5]; detune and stereo spread both scale from that offset, and the
stack gain is normalized by 1/sqrt(n) to keep perceived level steady while
sweeping the voice count.
*/

/// Closed set of waveforms, resolved once per block from the wave
/// parameter, never branched on per sample beyond this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wave {
    Off,
    Sine,
    Triangle,
    SawUp,
    SawDown,
    Pulse,
    Square,
    Noise,
}

impl Wave {
    /// Map the wave parameter's integer value. Out-of-range input clamps
    /// to the nearest valid shape; never panics on a bad host value.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Wave::Off,
            1 => Wave::Sine,
            2 => Wave::Triangle,
            3 => Wave::SawUp,
            4 => Wave::SawDown,
            5 => Wave::Pulse,
            6 => Wave::Square,
            _ => Wave::Noise,
        }
    }
}

/// Per-block render parameters for one oscillator slot, derived by the
/// voice from the modulation matrix.
#[derive(Debug, Clone, Copy)]
pub struct OscParams {
    pub wave: Wave,
    /// Unison copies, 1..=MAX_UNISON.
    pub voices: usize,
    /// Pulse width in 0..1 (Pulse wave only).
    pub pw: f32,
    /// Stereo position of the stack center, -1..1.
    pub pan: f32,
    /// Stereo spread of the unison copies, -1..1.
    pub spread: f32,
    /// Detune width in semitones across the stack.
    pub detune: f32,
    /// Linear gain (already converted from dB).
    pub gain: f32,
}

impl Default for OscParams {
    fn default() -> Self {
        Self {
            wave: Wave::Sine,
            voices: 1,
            pw: 0.5,
            pan: 0.0,
            spread: 0.0,
            detune: 0.0,
            gain: 1.0,
        }
    }
}

pub struct VaOscillator {
    sample_rate: f32,
    phases: [f32; MAX_UNISON],
    noise: NoiseGen,
}

impl VaOscillator {
    pub fn new() -> Self {
        Self {
            sample_rate: 44_100.0,
            phases: [0.0; MAX_UNISON],
            noise: NoiseGen::new(1),
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Reinitialize transient state for a fresh note. Unison phases start
    /// evenly staggered so the stack does not begin phase-aligned, and the
    /// noise source reseeds so renders stay deterministic.
    pub fn note_on(&mut self) {
        for (v, phase) in self.phases.iter_mut().enumerate() {
            *phase = v as f32 / MAX_UNISON as f32;
        }
        self.noise.reseed(0x5eed_0001);
    }

    #[inline]
    fn waveform(wave: Wave, phase: f32, pw: f32, noise: &mut NoiseGen) -> f32 {
        match wave {
            Wave::Off => 0.0,
            Wave::Sine => (TAU * phase).sin(),
            Wave::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
            Wave::SawUp => 2.0 * phase - 1.0,
            Wave::SawDown => 1.0 - 2.0 * phase,
            Wave::Pulse => {
                if phase < pw {
                    1.0
                } else {
                    -1.0
                }
            }
            Wave::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Wave::Noise => noise.next_bipolar(),
        }
    }

    /// Render the unison stack at `note` (fractional MIDI pitch) and add
    /// into the stereo scratch buffer.
    pub fn process_adding(
        &mut self,
        note: f32,
        params: &OscParams,
        left: &mut [f32],
        right: &mut [f32],
    ) {
        debug_assert_eq!(left.len(), right.len());
        if params.wave == Wave::Off || params.gain == 0.0 {
            return;
        }

        let unison = params.voices.clamp(1, MAX_UNISON);
        let norm = params.gain / (unison as f32).sqrt();

        for v in 0..unison {
            let offset = if unison > 1 {
                v as f32 / (unison - 1) as f32 - 0.5
            } else {
                0.0
            };

            let freq = midi_note_to_hz(note + offset * 2.0 * params.detune);
            let step = freq / self.sample_rate;

            let pan = (params.pan + offset * 2.0 * params.spread).clamp(-1.0, 1.0);
            // Equal-power pan law.
            let theta = (pan + 1.0) * std::f32::consts::FRAC_PI_4;
            let gain_l = norm * theta.cos();
            let gain_r = norm * theta.sin();

            let mut phase = self.phases[v];
            for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                let s = Self::waveform(params.wave, phase, params.pw, &mut self.noise);
                *l += s * gain_l;
                *r += s * gain_r;
                phase += step;
                if phase >= 1.0 {
                    phase -= 1.0;
                }
            }
            self.phases[v] = phase;
        }
    }
}

impl Default for VaOscillator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn render(params: &OscParams, note: f32, len: usize) -> (Vec<f32>, Vec<f32>) {
        let mut osc = VaOscillator::new();
        osc.set_sample_rate(SAMPLE_RATE);
        osc.note_on();
        let mut l = vec![0.0; len];
        let mut r = vec![0.0; len];
        osc.process_adding(note, params, &mut l, &mut r);
        (l, r)
    }

    #[test]
    fn sine_matches_closed_form() {
        let params = OscParams::default();
        let (l, r) = render(&params, 69.0, 128);

        let theta = std::f32::consts::FRAC_PI_4;
        for (n, sample) in l.iter().enumerate() {
            let expected = (TAU * 440.0 * n as f32 / SAMPLE_RATE).sin() * theta.cos();
            assert!(
                (sample - expected).abs() < 1e-4,
                "sample {n}: expected {expected}, got {sample}"
            );
        }
        // Center pan puts the same energy on both sides.
        assert!((l[64] - r[64]).abs() < 1e-6);
    }

    #[test]
    fn off_wave_renders_nothing() {
        let params = OscParams {
            wave: Wave::Off,
            ..OscParams::default()
        };
        let (l, _) = render(&params, 69.0, 64);
        assert!(l.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn hard_pan_moves_energy_to_one_side() {
        let params = OscParams {
            pan: 1.0,
            ..OscParams::default()
        };
        let (l, r) = render(&params, 69.0, 256);
        let peak_l = l.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let peak_r = r.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        assert!(peak_l < 1e-4, "left should be silent, got {peak_l}");
        assert!(peak_r > 0.5);
    }

    #[test]
    fn unison_stack_stays_bounded() {
        let params = OscParams {
            wave: Wave::SawUp,
            voices: 8,
            detune: 0.3,
            spread: 0.8,
            ..OscParams::default()
        };
        let (l, r) = render(&params, 60.0, 1024);
        for (sl, sr) in l.iter().zip(&r) {
            assert!(sl.abs() <= 8.0_f32.sqrt());
            assert!(sr.abs() <= 8.0_f32.sqrt());
        }
        // The stack must actually produce signal.
        assert!(l.iter().any(|&s| s.abs() > 0.1));
    }

    #[test]
    fn noise_is_deterministic_across_note_ons() {
        let params = OscParams {
            wave: Wave::Noise,
            ..OscParams::default()
        };
        let (a, _) = render(&params, 60.0, 256);
        let (b, _) = render(&params, 60.0, 256);
        assert_eq!(a, b);
    }

    #[test]
    fn rendering_adds_instead_of_overwriting() {
        let mut osc = VaOscillator::new();
        osc.set_sample_rate(SAMPLE_RATE);
        osc.note_on();
        let params = OscParams::default();
        let mut l = vec![1.0; 32];
        let mut r = vec![1.0; 32];
        osc.process_adding(69.0, &params, &mut l, &mut r);
        // First sine sample is 0, so the preexisting content survives.
        assert!((l[0] - 1.0).abs() < 1e-6);
    }
}
