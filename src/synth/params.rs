//! The engine's parameter bank.
//!
//! Every control the engine reads lives here as a shared
//! `Arc<Parameter>`, grouped the way the panels group them. Ids are
//! stable strings ("osc1wave", "fltfreq", ...) used by automation and by
//! persisted modulation wiring. `register` hands the whole bank to the
//! modulation matrix with an explicit poly/mono flag per group: per-voice
//! sections resolve per voice, global and effect sections resolve in the
//! mono context.

use std::sync::Arc;

use crate::dsp::units::{db_to_gain, hz_to_midi_note, midi_note_to_hz};
use crate::modulation::ModMatrix;
use crate::params::{ParamRange, Parameter};
use crate::sequencing::NOTE_DURATIONS;
use crate::{NUM_ENVS, NUM_FILTERS, NUM_LFOS, NUM_OSCS};

pub const NUM_STEP_LFO_STEPS: usize = 32;
pub const NUM_GATE_STEPS: usize = 32;

fn pct_to_unit(v: f32) -> f32 {
    v / 100.0
}

fn ms_to_s(v: f32) -> f32 {
    v / 1_000.0
}

/// Stepped parameter (enables, menus): step 1, no smoothing.
fn int_param(
    id: String,
    name: String,
    label: &str,
    min: f32,
    max: f32,
    default: f32,
) -> Arc<Parameter> {
    Parameter::new(id, name, label, "", ParamRange::new(min, max, 1.0, 1.0), default, 0.0)
}

/// Continuous parameter with the standard 20 ms smoothing ramp.
fn ext_param(
    id: String,
    name: String,
    label: &str,
    units: &str,
    range: ParamRange,
    default: f32,
) -> Arc<Parameter> {
    Parameter::new(id, name, label, units, range, default, 0.02)
}

fn ext_param_conv(
    id: String,
    name: String,
    label: &str,
    units: &str,
    range: ParamRange,
    default: f32,
    conversion: fn(f32) -> f32,
) -> Arc<Parameter> {
    Parameter::with_conversion(id, name, label, units, range, default, 0.02, conversion)
}

pub struct OscBankParams {
    pub enable: Arc<Parameter>,
    pub wave: Arc<Parameter>,
    pub voices: Arc<Parameter>,
    pub tune: Arc<Parameter>,
    pub finetune: Arc<Parameter>,
    pub level: Arc<Parameter>,
    pub pulsewidth: Arc<Parameter>,
    pub detune: Arc<Parameter>,
    pub spread: Arc<Parameter>,
    pub pan: Arc<Parameter>,
}

impl OscBankParams {
    fn new(idx: usize) -> Self {
        let id = format!("osc{}", idx + 1);
        let nm = format!("OSC{} ", idx + 1);
        Self {
            enable: int_param(
                format!("{id}enable"),
                format!("{nm}Enable"),
                "Enable",
                0.0,
                1.0,
                if idx == 0 { 1.0 } else { 0.0 },
            ),
            wave: int_param(format!("{id}wave"), format!("{nm}Wave"), "Wave", 1.0, 7.0, 1.0),
            voices: int_param(format!("{id}unison"), format!("{nm}Unison"), "Unison", 1.0, 8.0, 1.0),
            tune: ext_param(
                format!("{id}tune"),
                format!("{nm}Tune"),
                "Tune",
                "st",
                ParamRange::new(-36.0, 36.0, 1.0, 1.0),
                0.0,
            ),
            finetune: ext_param(
                format!("{id}finetune"),
                format!("{nm}Fine Tune"),
                "Fine",
                "ct",
                ParamRange::new(-100.0, 100.0, 0.0, 1.0),
                0.0,
            ),
            level: ext_param_conv(
                format!("{id}level"),
                format!("{nm}Level"),
                "Level",
                "db",
                ParamRange::new(-100.0, 0.0, 1.0, 4.0),
                0.0,
                db_to_gain,
            ),
            pulsewidth: ext_param_conv(
                format!("{id}pulsewidth"),
                format!("{nm}Pulse Width"),
                "PW",
                "%",
                ParamRange::new(1.0, 99.0, 0.0, 1.0),
                50.0,
                pct_to_unit,
            ),
            detune: ext_param(
                format!("{id}detune"),
                format!("{nm}Detune"),
                "Detune",
                "",
                ParamRange::new(0.0, 0.5, 0.0, 1.0),
                0.0,
            ),
            spread: ext_param_conv(
                format!("{id}spread"),
                format!("{nm}Spread"),
                "Spread",
                "%",
                ParamRange::new(-100.0, 100.0, 0.0, 1.0),
                0.0,
                pct_to_unit,
            ),
            pan: ext_param(
                format!("{id}pan"),
                format!("{nm}Pan"),
                "Pan",
                "",
                ParamRange::new(-1.0, 1.0, 0.0, 1.0),
                0.0,
            ),
        }
    }
}

pub struct VoiceFilterParams {
    pub enable: Arc<Parameter>,
    pub filter_type: Arc<Parameter>,
    pub key_tracking: Arc<Parameter>,
    pub velocity_tracking: Arc<Parameter>,
    pub frequency: Arc<Parameter>,
    pub resonance: Arc<Parameter>,
    pub amount: Arc<Parameter>,
    pub attack: Arc<Parameter>,
    pub decay: Arc<Parameter>,
    pub sustain: Arc<Parameter>,
    pub release: Arc<Parameter>,
}

impl VoiceFilterParams {
    fn new(idx: usize) -> Self {
        let id = format!("flt{}", idx + 1);
        let nm = format!("FLT{} ", idx + 1);
        let max_freq = hz_to_midi_note(20_000.0);
        Self {
            enable: int_param(
                format!("{id}enable"),
                format!("{nm}Enable"),
                "",
                0.0,
                1.0,
                if idx == 0 { 1.0 } else { 0.0 },
            ),
            filter_type: int_param(format!("{id}type"), format!("{nm}Type"), "Type", 0.0, 7.0, 0.0),
            key_tracking: ext_param_conv(
                format!("{id}key"),
                format!("{nm}Key"),
                "Key",
                "%",
                ParamRange::new(0.0, 100.0, 0.0, 1.0),
                0.0,
                pct_to_unit,
            ),
            velocity_tracking: ext_param_conv(
                format!("{id}vel"),
                format!("{nm}Vel"),
                "Vel",
                "%",
                ParamRange::new(0.0, 100.0, 0.0, 1.0),
                0.0,
                pct_to_unit,
            ),
            frequency: ext_param(
                format!("{id}freq"),
                format!("{nm}Freq"),
                "Freq",
                "Hz",
                ParamRange::new(0.0, max_freq, 0.0, 1.0),
                64.0,
            ),
            resonance: ext_param(
                format!("{id}res"),
                format!("{nm}Res"),
                "Res",
                "",
                ParamRange::new(0.0, 100.0, 0.0, 1.0),
                0.0,
            ),
            amount: ext_param(
                format!("{id}amount"),
                format!("{nm}Amount"),
                "Amnt",
                "",
                ParamRange::new(-1.0, 1.0, 0.0, 1.0),
                0.0,
            ),
            attack: ext_param(
                format!("{id}attack"),
                format!("{nm}Attack"),
                "A",
                "s",
                ParamRange::new(0.0, 60.0, 0.0, 0.2),
                0.1,
            ),
            decay: ext_param(
                format!("{id}decay"),
                format!("{nm}Decay"),
                "D",
                "s",
                ParamRange::new(0.0, 60.0, 0.0, 0.2),
                0.1,
            ),
            sustain: ext_param_conv(
                format!("{id}sustain"),
                format!("{nm}Sustain"),
                "S",
                "%",
                ParamRange::new(0.0, 100.0, 0.0, 1.0),
                80.0,
                pct_to_unit,
            ),
            release: ext_param(
                format!("{id}release"),
                format!("{nm}Release"),
                "R",
                "s",
                ParamRange::new(0.0, 60.0, 0.0, 0.2),
                0.1,
            ),
        }
    }
}

pub struct ModEnvParams {
    pub enable: Arc<Parameter>,
    pub attack: Arc<Parameter>,
    pub decay: Arc<Parameter>,
    pub sustain: Arc<Parameter>,
    pub release: Arc<Parameter>,
}

impl ModEnvParams {
    fn new(idx: usize) -> Self {
        let id = format!("env{}", idx + 1);
        let nm = format!("ENV{} ", idx + 1);
        Self {
            enable: int_param(format!("{id}enable"), format!("{nm}Enable"), "Enable", 0.0, 1.0, 0.0),
            attack: ext_param(
                format!("{id}attack"),
                format!("{nm}Attack"),
                "A",
                "s",
                ParamRange::new(0.0, 60.0, 0.0, 0.2),
                0.1,
            ),
            decay: ext_param(
                format!("{id}decay"),
                format!("{nm}Decay"),
                "D",
                "s",
                ParamRange::new(0.0, 60.0, 0.0, 0.2),
                0.1,
            ),
            sustain: ext_param_conv(
                format!("{id}sustain"),
                format!("{nm}Sustain"),
                "S",
                "%",
                ParamRange::new(0.0, 100.0, 0.0, 1.0),
                80.0,
                pct_to_unit,
            ),
            release: ext_param(
                format!("{id}release"),
                format!("{nm}Release"),
                "R",
                "s",
                ParamRange::new(0.0, 60.0, 0.0, 0.2),
                0.1,
            ),
        }
    }
}

pub struct LfoBankParams {
    pub enable: Arc<Parameter>,
    pub sync: Arc<Parameter>,
    pub wave: Arc<Parameter>,
    pub rate: Arc<Parameter>,
    pub beat: Arc<Parameter>,
    pub depth: Arc<Parameter>,
    pub phase: Arc<Parameter>,
    pub offset: Arc<Parameter>,
    pub fade: Arc<Parameter>,
    pub delay: Arc<Parameter>,
}

impl LfoBankParams {
    fn new(idx: usize) -> Self {
        let id = format!("lfo{}", idx + 1);
        let nm = format!("LFO{} ", idx + 1);
        let max_beat = (NOTE_DURATIONS.len() - 1) as f32;
        Self {
            enable: int_param(format!("{id}enable"), format!("{nm}Enable"), "Enable", 0.0, 1.0, 0.0),
            sync: int_param(format!("{id}sync"), format!("{nm}Sync"), "Sync", 0.0, 1.0, 0.0),
            wave: int_param(format!("{id}wave"), format!("{nm}Wave"), "Wave", 1.0, 17.0, 1.0),
            rate: ext_param(
                format!("{id}rate"),
                format!("{nm}Rate"),
                "Rate",
                "Hz",
                ParamRange::new(0.0, 50.0, 0.0, 0.3),
                10.0,
            ),
            beat: int_param(format!("{id}beat"), format!("{nm}Beat"), "Beat", 0.0, max_beat, 13.0),
            depth: ext_param(
                format!("{id}depth"),
                format!("{nm}Depth"),
                "Depth",
                "",
                ParamRange::new(-1.0, 1.0, 0.0, 1.0),
                1.0,
            ),
            phase: ext_param(
                format!("{id}phase"),
                format!("{nm}Phase"),
                "Phase",
                "",
                ParamRange::new(-1.0, 1.0, 0.0, 1.0),
                0.0,
            ),
            offset: ext_param(
                format!("{id}offset"),
                format!("{nm}Offset"),
                "Offset",
                "",
                ParamRange::new(-1.0, 1.0, 0.0, 1.0),
                0.0,
            ),
            fade: ext_param(
                format!("{id}fade"),
                format!("{nm}Fade"),
                "Fade",
                "s",
                ParamRange::symmetric(-60.0, 60.0, 0.0, 0.2),
                0.1,
            ),
            delay: ext_param(
                format!("{id}delay"),
                format!("{nm}Delay"),
                "Delay",
                "s",
                ParamRange::new(0.0, 60.0, 0.0, 0.2),
                0.1,
            ),
        }
    }
}

/// Main amplitude envelope.
pub struct AmpEnvParams {
    pub velocity_tracking: Arc<Parameter>,
    pub attack: Arc<Parameter>,
    pub decay: Arc<Parameter>,
    pub sustain: Arc<Parameter>,
    pub release: Arc<Parameter>,
}

impl AmpEnvParams {
    fn new() -> Self {
        Self {
            velocity_tracking: ext_param_conv(
                "vel".into(),
                "Vel".into(),
                "Vel",
                "",
                ParamRange::new(0.0, 100.0, 0.0, 1.0),
                100.0,
                pct_to_unit,
            ),
            attack: ext_param(
                "attack".into(),
                "Attack".into(),
                "A",
                "s",
                ParamRange::new(0.0, 60.0, 0.0, 0.2),
                0.1,
            ),
            decay: ext_param(
                "decay".into(),
                "Decay".into(),
                "D",
                "s",
                ParamRange::new(0.0, 60.0, 0.0, 0.2),
                0.1,
            ),
            sustain: ext_param_conv(
                "sustain".into(),
                "Sustain".into(),
                "S",
                "%",
                ParamRange::new(0.0, 100.0, 0.0, 1.0),
                80.0,
                pct_to_unit,
            ),
            release: ext_param(
                "release".into(),
                "Release".into(),
                "R",
                "s",
                ParamRange::new(0.0, 60.0, 0.0, 0.2),
                0.1,
            ),
        }
    }
}

pub struct StepLfoParams {
    pub enable: Arc<Parameter>,
    pub beat: Arc<Parameter>,
    pub length: Arc<Parameter>,
    pub level: Vec<Arc<Parameter>>,
}

impl StepLfoParams {
    fn new() -> Self {
        let max_beat = (NOTE_DURATIONS.len() - 1) as f32;
        Self {
            enable: int_param("slfoenable".into(), "Step LFO Enable".into(), "Enable", 0.0, 1.0, 0.0),
            beat: int_param("slfobeat".into(), "Step LFO Beat".into(), "Beat", 0.0, max_beat, 13.0),
            length: int_param("slfolength".into(), "Step LFO Length".into(), "Length", 2.0, 32.0, 8.0),
            level: (0..NUM_STEP_LFO_STEPS)
                .map(|i| {
                    Parameter::new(
                        format!("slfostep{}", i + 1),
                        format!("Step LFO Step {}", i + 1),
                        "",
                        "",
                        ParamRange::new(-1.0, 1.0, 0.0, 1.0),
                        0.0,
                        0.0,
                    )
                })
                .collect(),
        }
    }
}

pub struct GateFxParams {
    pub enable: Arc<Parameter>,
    pub beat: Arc<Parameter>,
    pub length: Arc<Parameter>,
    pub attack: Arc<Parameter>,
    pub release: Arc<Parameter>,
    pub left: Vec<Arc<Parameter>>,
    pub right: Vec<Arc<Parameter>>,
}

impl GateFxParams {
    fn new() -> Self {
        let max_beat = (NOTE_DURATIONS.len() - 1) as f32;
        // Default pattern: a sparse rhythmic figure rather than all-open.
        let step_default = |i: usize| if i % 2 == 0 || i % 5 == 0 { 1.0 } else { 0.0 };
        Self {
            enable: int_param("gateenable".into(), "Gate Enable".into(), "Enable", 0.0, 1.0, 0.0),
            beat: int_param("gatebeat".into(), "Gate Beat".into(), "Beat", 0.0, max_beat, 7.0),
            length: int_param("gatelength".into(), "Gate Length".into(), "Length", 2.0, 32.0, 8.0),
            attack: ext_param(
                "gateattack".into(),
                "Gate Attack".into(),
                "A",
                "s",
                ParamRange::new(0.0, 1.0, 0.0, 0.2),
                0.1,
            ),
            release: ext_param(
                "gaterelease".into(),
                "Gate Release".into(),
                "R",
                "s",
                ParamRange::new(0.0, 1.0, 0.0, 0.2),
                0.1,
            ),
            left: (0..NUM_GATE_STEPS)
                .map(|i| {
                    int_param(
                        format!("gatel{}", i + 1),
                        format!("Gate L {}", i + 1),
                        "",
                        0.0,
                        1.0,
                        step_default(i),
                    )
                })
                .collect(),
            right: (0..NUM_GATE_STEPS)
                .map(|i| {
                    int_param(
                        format!("gater{}", i + 1),
                        format!("Gate R {}", i + 1),
                        "",
                        0.0,
                        1.0,
                        step_default(i),
                    )
                })
                .collect(),
        }
    }
}

pub struct GlobalParams {
    pub mono: Arc<Parameter>,
    pub glide_mode: Arc<Parameter>,
    pub glide_rate: Arc<Parameter>,
    pub legato: Arc<Parameter>,
    pub level: Arc<Parameter>,
    pub voices: Arc<Parameter>,
}

impl GlobalParams {
    fn new() -> Self {
        Self {
            mono: int_param("mono".into(), "Mono".into(), "", 0.0, 1.0, 0.0),
            glide_mode: int_param("gMode".into(), "Glide Mode".into(), "Glide", 0.0, 2.0, 0.0),
            glide_rate: ext_param(
                "gRate".into(),
                "Glide Rate".into(),
                "Rate",
                "s",
                ParamRange::new(0.001, 20.0, 0.0, 0.2),
                0.3,
            ),
            legato: int_param("legato".into(), "Legato".into(), "", 0.0, 1.0, 0.0),
            level: ext_param_conv(
                "level".into(),
                "Level".into(),
                "",
                "db",
                ParamRange::new(-100.0, 0.0, 1.0, 4.0),
                0.0,
                db_to_gain,
            ),
            voices: int_param("voices".into(), "Voices".into(), "", 2.0, 40.0, 40.0),
        }
    }
}

pub struct ChorusFxParams {
    pub enable: Arc<Parameter>,
    pub delay: Arc<Parameter>,
    pub depth: Arc<Parameter>,
    pub rate: Arc<Parameter>,
    pub width: Arc<Parameter>,
    pub mix: Arc<Parameter>,
}

impl ChorusFxParams {
    fn new() -> Self {
        Self {
            enable: int_param("chEnable".into(), "Chorus Enable".into(), "", 0.0, 1.0, 0.0),
            delay: ext_param(
                "chDelay".into(),
                "Chorus Delay".into(),
                "",
                "ms",
                ParamRange::new(0.1, 30.0, 0.0, 1.0),
                1.0,
            ),
            depth: ext_param(
                "chDepth".into(),
                "Chorus Depth".into(),
                "",
                "ms",
                ParamRange::new(0.1, 20.0, 0.0, 1.0),
                1.0,
            ),
            rate: ext_param(
                "chSpeed".into(),
                "Chorus Speed".into(),
                "",
                "Hz",
                ParamRange::new(0.1, 10.0, 0.0, 1.0),
                3.0,
            ),
            width: ext_param(
                "chWidth".into(),
                "Chorus Width".into(),
                "",
                "",
                ParamRange::new(0.0, 1.0, 0.0, 1.0),
                0.5,
            ),
            mix: ext_param(
                "chMix".into(),
                "Chorus Mix".into(),
                "",
                "",
                ParamRange::new(0.0, 1.0, 0.0, 1.0),
                0.5,
            ),
        }
    }
}

pub struct DistortionFxParams {
    pub enable: Arc<Parameter>,
    pub amount: Arc<Parameter>,
    pub highpass: Arc<Parameter>,
    pub output: Arc<Parameter>,
    pub mix: Arc<Parameter>,
}

impl DistortionFxParams {
    fn new() -> Self {
        let unit = ParamRange::new(0.0, 1.0, 0.0, 1.0);
        Self {
            enable: int_param("dsEnable".into(), "Distortion Enable".into(), "", 0.0, 1.0, 0.0),
            amount: ext_param("dsAmount".into(), "Distortion Amount".into(), "", "", unit, 0.2),
            highpass: ext_param("dsHighpass".into(), "Distortion Highpass".into(), "", "", unit, 0.0),
            output: ext_param("dsOutput".into(), "Distortion Output".into(), "", "", unit, 1.0),
            mix: ext_param("dsMix".into(), "Distortion Mix".into(), "", "", unit, 1.0),
        }
    }
}

pub struct EqBandFxParams {
    pub freq: Arc<Parameter>,
    pub q: Arc<Parameter>,
    pub gain: Arc<Parameter>,
}

impl EqBandFxParams {
    fn new(id: &str, name: &str, default_hz: f32) -> Self {
        let max_freq = hz_to_midi_note(20_000.0);
        Self {
            freq: ext_param_conv(
                format!("eq{id}Freq"),
                format!("{name} Freq"),
                "Freq",
                "Hz",
                ParamRange::new(0.0, max_freq, 0.0, 1.0),
                hz_to_midi_note(default_hz),
                midi_note_to_hz,
            ),
            q: ext_param(
                format!("eq{id}Q"),
                format!("{name} Q"),
                "Q",
                "",
                ParamRange::new(0.025, 40.0, 0.0, 0.2),
                1.0,
            ),
            // Stays in dB; the EQ computes its own linear coefficients.
            gain: ext_param(
                format!("eq{id}Gain"),
                format!("{name} Gain"),
                "Gain",
                "dB",
                ParamRange::new(-20.0, 20.0, 0.0, 1.0),
                0.0,
            ),
        }
    }
}

pub struct EqFxParams {
    pub enable: Arc<Parameter>,
    pub low: EqBandFxParams,
    pub mid1: EqBandFxParams,
    pub mid2: EqBandFxParams,
    pub high: EqBandFxParams,
}

impl EqFxParams {
    fn new() -> Self {
        Self {
            enable: int_param("eqEnable".into(), "EQ Enable".into(), "", 0.0, 1.0, 0.0),
            low: EqBandFxParams::new("Lo", "EQ Lo", 80.0),
            mid1: EqBandFxParams::new("M1", "EQ Mid 1", 3_000.0),
            mid2: EqBandFxParams::new("M2", "EQ Mid 2", 5_000.0),
            high: EqBandFxParams::new("Hi", "EQ Hi", 17_000.0),
        }
    }
}

pub struct CompressorFxParams {
    pub enable: Arc<Parameter>,
    pub attack: Arc<Parameter>,
    pub release: Arc<Parameter>,
    pub ratio: Arc<Parameter>,
    pub threshold: Arc<Parameter>,
    pub gain: Arc<Parameter>,
}

impl CompressorFxParams {
    fn new() -> Self {
        Self {
            enable: int_param("cpEnable".into(), "Compressor Enable".into(), "", 0.0, 1.0, 0.0),
            attack: ext_param_conv(
                "cpAttack".into(),
                "Compressor Attack".into(),
                "",
                "ms",
                ParamRange::new(1.0, 200.0, 0.0, 0.4),
                1.0,
                ms_to_s,
            ),
            release: ext_param_conv(
                "cpRelease".into(),
                "Compressor Release".into(),
                "",
                "ms",
                ParamRange::new(1.0, 2_000.0, 0.0, 0.4),
                5.0,
                ms_to_s,
            ),
            ratio: ext_param(
                "cpRatio".into(),
                "Compressor Ratio".into(),
                "",
                "",
                ParamRange::new(1.0, 30.0, 0.0, 0.4),
                5.0,
            ),
            threshold: ext_param(
                "cpThreshold".into(),
                "Compressor Thresh".into(),
                "",
                "dB",
                ParamRange::new(-60.0, 0.0, 0.0, 1.0),
                -30.0,
            ),
            gain: ext_param_conv(
                "cpGain".into(),
                "Compressor Gain".into(),
                "",
                "dB",
                ParamRange::new(-30.0, 30.0, 0.0, 1.0),
                0.0,
                db_to_gain,
            ),
        }
    }
}

pub struct DelayFxParams {
    pub enable: Arc<Parameter>,
    pub sync: Arc<Parameter>,
    pub time: Arc<Parameter>,
    pub beat: Arc<Parameter>,
    pub feedback: Arc<Parameter>,
    pub crossfeed: Arc<Parameter>,
    pub mix: Arc<Parameter>,
}

impl DelayFxParams {
    fn new() -> Self {
        let max_beat = (NOTE_DURATIONS.len() - 1) as f32;
        Self {
            enable: int_param("dlEnable".into(), "Delay Enable".into(), "", 0.0, 1.0, 0.0),
            sync: int_param("dlSync".into(), "Delay Sync".into(), "", 0.0, 1.0, 0.0),
            time: ext_param(
                "dlTime".into(),
                "Delay Time".into(),
                "",
                "s",
                ParamRange::new(0.0, 120.0, 0.0, 0.3),
                1.0,
            ),
            beat: int_param("dlBeat".into(), "Delay Beat".into(), "", 0.0, max_beat, 13.0),
            feedback: ext_param_conv(
                "dlFb".into(),
                "Delay FB".into(),
                "",
                "dB",
                ParamRange::new(-100.0, 0.0, 0.0, 5.0),
                -10.0,
                db_to_gain,
            ),
            crossfeed: ext_param_conv(
                "dlCf".into(),
                "Delay CF".into(),
                "",
                "dB",
                ParamRange::new(-100.0, 0.0, 0.0, 5.0),
                -100.0,
                db_to_gain,
            ),
            mix: ext_param_conv(
                "dlMix".into(),
                "Delay Mix".into(),
                "",
                "%",
                ParamRange::new(0.0, 100.0, 0.0, 1.0),
                0.5,
                pct_to_unit,
            ),
        }
    }
}

pub struct ReverbFxParams {
    pub enable: Arc<Parameter>,
    pub damping: Arc<Parameter>,
    pub freeze: Arc<Parameter>,
    pub size: Arc<Parameter>,
    pub width: Arc<Parameter>,
    pub mix: Arc<Parameter>,
}

impl ReverbFxParams {
    fn new() -> Self {
        let unit = ParamRange::new(0.0, 1.0, 0.0, 1.0);
        Self {
            enable: int_param("rvEnable".into(), "Reverb Enable".into(), "", 0.0, 1.0, 0.0),
            damping: ext_param("rvbDamping".into(), "Reverb Damping".into(), "", "", unit, 0.0),
            freeze: ext_param("rvbFreeze".into(), "Reverb Freeze".into(), "", "", unit, 0.0),
            size: ext_param("rvbSize".into(), "Reverb Size".into(), "", "", unit, 0.0),
            width: ext_param("rvbWidth".into(), "Reverb Width".into(), "", "", unit, 0.0),
            mix: ext_param("rvbMix".into(), "Reverb Mix".into(), "", "", unit, 0.0),
        }
    }
}

pub struct LimiterFxParams {
    pub enable: Arc<Parameter>,
    pub attack: Arc<Parameter>,
    pub release: Arc<Parameter>,
    pub threshold: Arc<Parameter>,
    pub gain: Arc<Parameter>,
}

impl LimiterFxParams {
    fn new() -> Self {
        Self {
            enable: int_param("lmEnable".into(), "Limiter Enable".into(), "", 0.0, 1.0, 0.0),
            attack: ext_param_conv(
                "lmAttack".into(),
                "Limiter Attack".into(),
                "",
                "ms",
                ParamRange::new(1.0, 5.0, 0.0, 0.4),
                1.0,
                ms_to_s,
            ),
            release: ext_param_conv(
                "lmRelease".into(),
                "Limiter Release".into(),
                "",
                "ms",
                ParamRange::new(1.0, 100.0, 0.0, 0.4),
                5.0,
                ms_to_s,
            ),
            threshold: ext_param(
                "lmThreshold".into(),
                "Limiter Ceil".into(),
                "",
                "dB",
                ParamRange::new(-60.0, 0.0, 0.0, 1.0),
                -30.0,
            ),
            gain: ext_param_conv(
                "lmGain".into(),
                "Limiter Gain".into(),
                "",
                "dB",
                ParamRange::new(-30.0, 30.0, 0.0, 1.0),
                0.0,
                db_to_gain,
            ),
        }
    }
}

pub struct SynthParams {
    pub osc: [OscBankParams; NUM_OSCS],
    pub filter: [VoiceFilterParams; NUM_FILTERS],
    pub env: [ModEnvParams; NUM_ENVS],
    pub lfo: [LfoBankParams; NUM_LFOS],
    pub amp_env: AmpEnvParams,
    pub step_lfo: StepLfoParams,
    pub global: GlobalParams,
    pub gate: GateFxParams,
    pub chorus: ChorusFxParams,
    pub distortion: DistortionFxParams,
    pub eq: EqFxParams,
    pub compressor: CompressorFxParams,
    pub delay: DelayFxParams,
    pub reverb: ReverbFxParams,
    pub limiter: LimiterFxParams,
}

impl SynthParams {
    pub fn new() -> Self {
        Self {
            osc: std::array::from_fn(OscBankParams::new),
            filter: std::array::from_fn(VoiceFilterParams::new),
            env: std::array::from_fn(ModEnvParams::new),
            lfo: std::array::from_fn(LfoBankParams::new),
            amp_env: AmpEnvParams::new(),
            step_lfo: StepLfoParams::new(),
            global: GlobalParams::new(),
            gate: GateFxParams::new(),
            chorus: ChorusFxParams::new(),
            distortion: DistortionFxParams::new(),
            eq: EqFxParams::new(),
            compressor: CompressorFxParams::new(),
            delay: DelayFxParams::new(),
            reverb: ReverbFxParams::new(),
            limiter: LimiterFxParams::new(),
        }
    }

    /// Parameters that resolve per voice: the per-voice sections.
    fn poly_params(&self) -> Vec<&Arc<Parameter>> {
        let mut out = Vec::new();
        for osc in &self.osc {
            out.extend([
                &osc.enable,
                &osc.wave,
                &osc.voices,
                &osc.tune,
                &osc.finetune,
                &osc.level,
                &osc.pulsewidth,
                &osc.detune,
                &osc.spread,
                &osc.pan,
            ]);
        }
        for flt in &self.filter {
            out.extend([
                &flt.enable,
                &flt.filter_type,
                &flt.key_tracking,
                &flt.velocity_tracking,
                &flt.frequency,
                &flt.resonance,
                &flt.amount,
                &flt.attack,
                &flt.decay,
                &flt.sustain,
                &flt.release,
            ]);
        }
        for env in &self.env {
            out.extend([&env.enable, &env.attack, &env.decay, &env.sustain, &env.release]);
        }
        for lfo in &self.lfo {
            out.extend([
                &lfo.enable,
                &lfo.sync,
                &lfo.wave,
                &lfo.rate,
                &lfo.beat,
                &lfo.depth,
                &lfo.phase,
                &lfo.offset,
                &lfo.fade,
                &lfo.delay,
            ]);
        }
        out.extend([
            &self.amp_env.velocity_tracking,
            &self.amp_env.attack,
            &self.amp_env.decay,
            &self.amp_env.sustain,
            &self.amp_env.release,
        ]);
        out
    }

    /// Parameters that resolve in the mono context: global and effects.
    fn mono_params(&self) -> Vec<&Arc<Parameter>> {
        let mut out: Vec<&Arc<Parameter>> = Vec::new();

        out.extend([&self.step_lfo.enable, &self.step_lfo.beat, &self.step_lfo.length]);
        out.extend(self.step_lfo.level.iter());

        out.extend([
            &self.global.mono,
            &self.global.glide_mode,
            &self.global.glide_rate,
            &self.global.legato,
            &self.global.level,
            &self.global.voices,
        ]);

        out.extend([
            &self.gate.enable,
            &self.gate.beat,
            &self.gate.length,
            &self.gate.attack,
            &self.gate.release,
        ]);
        out.extend(self.gate.left.iter());
        out.extend(self.gate.right.iter());

        out.extend([
            &self.chorus.enable,
            &self.chorus.delay,
            &self.chorus.depth,
            &self.chorus.rate,
            &self.chorus.width,
            &self.chorus.mix,
        ]);
        out.extend([
            &self.distortion.enable,
            &self.distortion.amount,
            &self.distortion.highpass,
            &self.distortion.output,
            &self.distortion.mix,
        ]);

        out.push(&self.eq.enable);
        for band in [&self.eq.low, &self.eq.mid1, &self.eq.mid2, &self.eq.high] {
            out.extend([&band.freq, &band.q, &band.gain]);
        }

        out.extend([
            &self.compressor.enable,
            &self.compressor.attack,
            &self.compressor.release,
            &self.compressor.ratio,
            &self.compressor.threshold,
            &self.compressor.gain,
        ]);
        out.extend([
            &self.delay.enable,
            &self.delay.sync,
            &self.delay.time,
            &self.delay.beat,
            &self.delay.feedback,
            &self.delay.crossfeed,
            &self.delay.mix,
        ]);
        out.extend([
            &self.reverb.enable,
            &self.reverb.damping,
            &self.reverb.freeze,
            &self.reverb.size,
            &self.reverb.width,
            &self.reverb.mix,
        ]);
        out.extend([
            &self.limiter.enable,
            &self.limiter.attack,
            &self.limiter.release,
            &self.limiter.threshold,
            &self.limiter.gain,
        ]);
        out
    }

    /// Register the whole bank as modulation destinations.
    pub(crate) fn register(&self, matrix: &mut ModMatrix) {
        for p in self.poly_params() {
            matrix.add_parameter(p, true);
        }
        for p in self.mono_params() {
            matrix.add_parameter(p, false);
        }
    }

    /// Every parameter in the bank, for host enumeration.
    pub fn all(&self) -> Vec<Arc<Parameter>> {
        self.poly_params()
            .into_iter()
            .chain(self.mono_params())
            .cloned()
            .collect()
    }

    /// Look up a parameter by its stable id.
    pub fn find(&self, id: &str) -> Option<Arc<Parameter>> {
        self.poly_params()
            .into_iter()
            .chain(self.mono_params())
            .find(|p| p.id() == id)
            .cloned()
    }
}

impl Default for SynthParams {
    fn default() -> Self {
        Self::new()
    }
}
