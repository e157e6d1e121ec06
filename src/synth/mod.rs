//! The synthesizer proper: parameter bank, voice, and block engine.

pub mod engine;
pub mod params;
pub mod voice;

pub use engine::VaSynth;
pub use params::SynthParams;

use crate::modulation::{ModMatrix, ModSrcId};
use crate::{NUM_ENVS, NUM_FILTERS, NUM_LFOS};

/// MIDI controllers exposed as modulation sources.
pub const NUM_CCS: usize = 120;

/*
Every modulation source the engine feeds, registered up front so wiring
can be saved and restored by stable id. Poly sources carry one value per
voice slot; mono sources are global. The split mirrors where the value is
produced: per-note expression, per-voice LFOs and envelopes are poly,
pitch bend, controllers and the global LFOs are mono.
*/
pub struct ModSources {
    pub pressure: ModSrcId,
    pub timbre: ModSrcId,
    pub pitch_bend: ModSrcId,
    pub note: ModSrcId,
    pub velocity: ModSrcId,
    pub cc: Vec<ModSrcId>,
    pub mono_lfo: [ModSrcId; NUM_LFOS],
    pub lfo: [ModSrcId; NUM_LFOS],
    pub mono_step: ModSrcId,
    pub filter_env: [ModSrcId; NUM_FILTERS],
    pub env: [ModSrcId; NUM_ENVS],
}

impl ModSources {
    pub(crate) fn register(matrix: &mut ModMatrix) -> Self {
        Self {
            pressure: matrix.add_poly_source("mpep", "MPE Pressure", false),
            timbre: matrix.add_poly_source("mpet", "MPE Timbre", false),
            pitch_bend: matrix.add_mono_source("pb", "Pitch Bend", true),
            note: matrix.add_poly_source("note", "MIDI Note", false),
            velocity: matrix.add_poly_source("vel", "MIDI Velocity", false),
            cc: (0..NUM_CCS)
                .map(|c| matrix.add_mono_source(format!("cc{c}"), format!("CC {c}"), false))
                .collect(),
            mono_lfo: std::array::from_fn(|i| {
                matrix.add_mono_source(format!("mlfo{}", i + 1), format!("LFO {} (Mono)", i + 1), true)
            }),
            lfo: std::array::from_fn(|i| {
                matrix.add_poly_source(format!("lfo{}", i + 1), format!("LFO {}", i + 1), true)
            }),
            mono_step: matrix.add_mono_source("mstep", "Step LFO (Mono)", true),
            filter_env: std::array::from_fn(|i| {
                matrix.add_poly_source(format!("fenv{}", i + 1), format!("Filter Env {}", i + 1), false)
            }),
            env: std::array::from_fn(|i| {
                matrix.add_poly_source(format!("env{}", i + 1), format!("Env {}", i + 1), false)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_resolve_by_stable_id() {
        let mut matrix = ModMatrix::new();
        let sources = ModSources::register(&mut matrix);
        matrix.build().unwrap();

        assert_eq!(matrix.find_source("pb"), Some(sources.pitch_bend));
        assert_eq!(matrix.find_source("lfo2"), Some(sources.lfo[1]));
        assert_eq!(matrix.find_source("cc74"), Some(sources.cc[74]));
        assert!(matrix.source_is_bipolar(sources.pitch_bend));
        assert!(!matrix.source_is_bipolar(sources.velocity));
    }
}
