//! Host-facing control values.
//!
//! A [`Parameter`] is a named, ranged value with two faces: the raw "user"
//! value the host or UI writes, and the derived "processing" value the audio
//! thread reads (raw run through an optional conversion such as dB → gain).
//!
//! Writes come from a control thread while the audio thread reads, so both
//! the raw target and the smoothed current value live in atomic f32 bit
//! storage. Single writer, single reader, no tearing; no atomicity across
//! multiple parameters is promised or needed.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

/// Raw → processing unit conversion (e.g. decibels to gain, pitch to Hz).
pub type ConversionFn = fn(f32) -> f32;

/// Sentinel for "not registered with the modulation matrix".
pub(crate) const UNREGISTERED: usize = usize::MAX;

#[inline]
fn load_f32(cell: &AtomicU32) -> f32 {
    f32::from_bits(cell.load(Ordering::Relaxed))
}

#[inline]
fn store_f32(cell: &AtomicU32, value: f32) {
    cell.store(value.to_bits(), Ordering::Relaxed);
}

/// Value range of a parameter. `skew` is display metadata for an external
/// editor (1.0 = linear); the engine itself only uses `min`/`max`.
#[derive(Debug, Clone, Copy)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub skew: f32,
    /// Skew mirrored around the center of the range (for ± parameters).
    pub symmetric: bool,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32, step: f32, skew: f32) -> Self {
        Self {
            min,
            max,
            step,
            skew,
            symmetric: false,
        }
    }

    pub const fn symmetric(min: f32, max: f32, step: f32, skew: f32) -> Self {
        Self {
            min,
            max,
            step,
            skew,
            symmetric: true,
        }
    }

    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    #[inline]
    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

/// A single host-automatable control value.
///
/// Created once at engine construction and shared as `Arc<Parameter>`
/// between the param bank, the modulation matrix, and external owners.
pub struct Parameter {
    id: String,
    name: String,
    label: String,
    units: String,
    range: ParamRange,
    default: f32,

    /// Raw target value written by the control thread.
    user_value: AtomicU32,
    /// Smoothed raw value read by the audio thread.
    current_value: AtomicU32,
    /// Seconds for a full-range sweep of the smoothing ramp. Zero = no
    /// smoothing (stepped parameters snap).
    smoothing_time: f32,

    conversion: Option<ConversionFn>,

    /// Destination slot in the modulation matrix, assigned at registration.
    mod_index: AtomicUsize,
}

impl Parameter {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        label: impl Into<String>,
        units: impl Into<String>,
        range: ParamRange,
        default: f32,
        smoothing_time: f32,
    ) -> Arc<Self> {
        let default = range.clamp(default);
        Arc::new(Self {
            id: id.into(),
            name: name.into(),
            label: label.into(),
            units: units.into(),
            range,
            default,
            user_value: AtomicU32::new(default.to_bits()),
            current_value: AtomicU32::new(default.to_bits()),
            smoothing_time,
            conversion: None,
            mod_index: AtomicUsize::new(UNREGISTERED),
        })
    }

    pub fn with_conversion(
        id: impl Into<String>,
        name: impl Into<String>,
        label: impl Into<String>,
        units: impl Into<String>,
        range: ParamRange,
        default: f32,
        smoothing_time: f32,
        conversion: ConversionFn,
    ) -> Arc<Self> {
        let default = range.clamp(default);
        Arc::new(Self {
            id: id.into(),
            name: name.into(),
            label: label.into(),
            units: units.into(),
            range,
            default,
            user_value: AtomicU32::new(default.to_bits()),
            current_value: AtomicU32::new(default.to_bits()),
            smoothing_time,
            conversion: Some(conversion),
            mod_index: AtomicUsize::new(UNREGISTERED),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn range(&self) -> ParamRange {
        self.range
    }

    pub fn default_value(&self) -> f32 {
        self.default
    }

    /// Write a new raw value. Out-of-range input clamps; the stored raw
    /// value is always inside [min, max].
    pub fn set_user_value(&self, value: f32) {
        store_f32(&self.user_value, self.range.clamp(value));
    }

    /// Raw target value as last written.
    pub fn user_value(&self) -> f32 {
        load_f32(&self.user_value)
    }

    /// Smoothed raw value the audio thread renders with.
    pub fn current_value(&self) -> f32 {
        load_f32(&self.current_value)
    }

    /// Processing value: conversion applied to the smoothed raw value, or
    /// the raw value itself when no conversion is set.
    pub fn proc_value(&self) -> f32 {
        self.convert(self.current_value())
    }

    /// Nonzero test on the raw target, used for enable switches.
    pub fn is_on(&self) -> bool {
        self.user_value() != 0.0
    }

    #[inline]
    pub(crate) fn convert(&self, raw: f32) -> f32 {
        match self.conversion {
            Some(f) => f(raw),
            None => raw,
        }
    }

    /// Advance the smoothing ramp by `num_samples`. Called once per
    /// sub-block by the modulation matrix.
    pub(crate) fn smooth(&self, num_samples: usize, sample_rate: f32) {
        let target = self.user_value();
        let current = self.current_value();
        if current == target {
            return;
        }
        if self.smoothing_time <= 0.0 {
            store_f32(&self.current_value, target);
            return;
        }
        let max_step =
            self.range.span() / (self.smoothing_time * sample_rate) * num_samples as f32;
        let delta = target - current;
        let next = if delta.abs() <= max_step {
            target
        } else {
            current + max_step.copysign(delta)
        };
        store_f32(&self.current_value, next);
    }

    /// Jump the smoothing ramp straight to the target.
    pub(crate) fn snap(&self) {
        store_f32(&self.current_value, self.user_value());
    }

    pub(crate) fn set_mod_index(&self, index: usize) {
        self.mod_index.store(index, Ordering::Relaxed);
    }

    pub(crate) fn mod_index(&self) -> usize {
        self.mod_index.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("id", &self.id)
            .field("user_value", &self.user_value())
            .field("range", &(self.range.min, self.range.max))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct_to_unit(v: f32) -> f32 {
        v / 100.0
    }

    #[test]
    fn raw_value_stays_in_range() {
        let p = Parameter::new("res", "Res", "Res", "%", ParamRange::new(0.0, 100.0, 0.0, 1.0), 0.0, 0.0);
        p.set_user_value(250.0);
        assert_eq!(p.user_value(), 100.0);
        p.set_user_value(-5.0);
        assert_eq!(p.user_value(), 0.0);
    }

    #[test]
    fn proc_value_equals_conversion_of_raw() {
        let p = Parameter::with_conversion(
            "sustain",
            "Sustain",
            "S",
            "%",
            ParamRange::new(0.0, 100.0, 0.0, 1.0),
            80.0,
            0.0,
            pct_to_unit,
        );
        for raw in [0.0, 12.5, 50.0, 100.0] {
            p.set_user_value(raw);
            p.snap();
            assert_eq!(p.proc_value(), pct_to_unit(raw));
        }
    }

    #[test]
    fn proc_value_is_raw_without_conversion() {
        let p = Parameter::new("pan", "Pan", "Pan", "", ParamRange::new(-1.0, 1.0, 0.0, 1.0), 0.0, 0.0);
        p.set_user_value(0.3);
        p.snap();
        assert_eq!(p.proc_value(), 0.3);
    }

    #[test]
    fn smoothing_ramps_toward_target() {
        let p = Parameter::new("cut", "Cut", "Cut", "Hz", ParamRange::new(0.0, 1.0, 0.0, 1.0), 0.0, 0.1);
        p.set_user_value(1.0);

        // 0.1 s full-range ramp at 1 kHz: 10 samples should cover 10%.
        p.smooth(10, 1_000.0);
        assert!((p.current_value() - 0.1).abs() < 1e-6);

        // Enough samples to finish the ramp, value must land exactly.
        p.smooth(10_000, 1_000.0);
        assert_eq!(p.current_value(), 1.0);
    }

    #[test]
    fn snap_skips_the_ramp() {
        let p = Parameter::new("cut", "Cut", "Cut", "Hz", ParamRange::new(0.0, 1.0, 0.0, 1.0), 0.0, 0.5);
        p.set_user_value(0.7);
        assert_eq!(p.current_value(), 0.0);
        p.snap();
        assert_eq!(p.current_value(), 0.7);
    }
}
