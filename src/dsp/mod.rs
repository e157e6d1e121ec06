//! Low-level DSP primitives embedded inside voices and effects.
//!
//! These components are allocation-free and realtime-safe after
//! construction, making them safe to embed directly inside voice structs.
//! They intentionally stay focused on the signal-processing math so the
//! voice and block-processor layers can handle orchestration and
//! modulation.

/// Time-domain delay line with optional interpolation.
pub mod delay;
/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// State-variable filter with multiple responses and slopes.
pub mod filter;
/// Low frequency oscillator with the full virtual-analog shape set.
pub mod lfo;
/// Audio-band oscillator bank with unison.
pub mod oscillator;
/// Deterministic pseudo-random source for noise waveforms.
pub mod rand;
/// Pattern-driven step modulator.
pub mod step_lfo;
/// Pitch and gain unit conversions.
pub mod units;

pub use envelope::EnvelopeState;
