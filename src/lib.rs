pub mod dsp;
pub mod error;
pub mod fx;
pub mod io;
pub mod modulation;
pub mod params;
pub mod sequencing;
pub mod synth; // Voice pool, param bank, block processor

/// Sizing bound for effect scratch buffers and the metering ring. Host
/// callbacks may be larger; `process` chops every block into sub-blocks
/// regardless.
pub const MAX_BLOCK_SIZE: usize = 2048;

/// Upper bound on one modulation sub-block. Larger host buffers are chopped
/// into pieces of at most this many samples so block-rate modulation stays
/// responsive. A tunable trade-off, not a contract.
pub const SUB_BLOCK_SIZE: usize = 32;

/// Size of the pre-constructed voice pool. Slots are reused, never reallocated.
pub const MAX_VOICES: usize = 50;

pub const NUM_OSCS: usize = 2;
pub const NUM_FILTERS: usize = 2;
pub const NUM_ENVS: usize = 2;
pub const NUM_LFOS: usize = 2;
pub const MAX_UNISON: usize = 8;

pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
