//! Master effects chain stages.
//!
//! Every stage follows the same contract: `set_sample_rate`, `reset`,
//! a stage-specific `set_params`, and an in-place stereo `process`. The
//! engine resolves parameters through the modulation matrix, pushes them
//! in at sub-block rate, and calls the stages in a fixed order, each one
//! gated by its enable parameter.

pub mod chorus;
pub mod delay;
pub mod distortion;
pub mod dynamics;
pub mod eq;
pub mod gate;
pub mod reverb;

pub use chorus::{Chorus, ChorusParams};
pub use delay::{StereoDelay, StereoDelayParams};
pub use distortion::{Distortion, DistortionParams};
pub use dynamics::{Compressor, CompressorParams, Limiter};
pub use eq::{BandParams, EqParams, ParametricEq};
pub use gate::{Gate, GateParams};
pub use reverb::{ReverbParams, StereoReverb};

/// Blend processed signal into the dry signal in place.
#[inline]
pub(crate) fn mix_into(dry: &mut [f32], wet: &[f32], mix: f32) {
    let mix = mix.clamp(0.0, 1.0);
    for (d, w) in dry.iter_mut().zip(wet) {
        *d = *d * (1.0 - mix) + w * mix;
    }
}
