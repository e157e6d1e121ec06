use crate::dsp::lfo::{Lfo, LfoParams, LfoShape};
use crate::dsp::step_lfo::StepLfo;
use crate::error::SynthError;
use crate::fx::{
    BandParams, Chorus, ChorusParams, Compressor, CompressorParams, Distortion, DistortionParams,
    EqParams, Gate, GateParams, Limiter, ParametricEq, ReverbParams, StereoDelay,
    StereoDelayParams, StereoReverb,
};
use crate::io::MidiEvent;
use crate::modulation::ModMatrix;
use crate::sequencing::{note_duration, Playhead};
use crate::synth::params::SynthParams;
use crate::synth::voice::{GlideMode, Voice, VoiceContext, VoiceState};
use crate::synth::ModSources;
use crate::{MAX_BLOCK_SIZE, MAX_VOICES, NUM_LFOS, SUB_BLOCK_SIZE};

/*
The engine: a fixed pool of voices, the shared modulation matrix, the
global modulators and the master effects chain, driven in sub-blocks of
at most SUB_BLOCK_SIZE samples.

Each sub-block runs the same sequence: open the matrix block, feed the
mono sources (global LFOs, step LFO), render every sounding voice
additively into the output, run the effects chain, apply the master
level, then close the block (which advances parameter smoothing).

Events arrive between blocks through `handle_event`; the audio thread is
the only caller of `process`, so nothing here locks.
*/

/// One frame of the processed stereo output, as seen by the metering ring.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

/// The distortion highpass control (0..1) maps linearly onto this many Hz.
const DISTORTION_HIGHPASS_MAX_HZ: f32 = 300.0;

pub struct VaSynth {
    sample_rate: f32,
    params: SynthParams,
    matrix: ModMatrix,
    sources: ModSources,
    voices: Vec<Voice>,

    mono_lfos: [Lfo; NUM_LFOS],
    step_lfo: StepLfo,

    gate: Gate,
    chorus: Chorus,
    distortion: Distortion,
    eq: ParametricEq,
    compressor: Compressor,
    delay: StereoDelay,
    reverb: StereoReverb,
    limiter: Limiter,

    playhead: Playhead,
    pitch_bend: f32,
    /// Held notes in press order, for mono mode.
    note_stack: Vec<(u8, f32)>,
    /// Pitch of the most recently started note, for glide.
    last_note: Option<f32>,
    next_order: u64,

    #[cfg(feature = "rtrb")]
    meter_tx: rtrb::Producer<StereoFrame>,
    #[cfg(feature = "rtrb")]
    meter_rx: Option<rtrb::Consumer<StereoFrame>>,
}

impl VaSynth {
    pub fn new() -> Result<Self, SynthError> {
        let mut matrix = ModMatrix::new();
        let sources = ModSources::register(&mut matrix);
        let params = SynthParams::new();
        params.register(&mut matrix);
        matrix.build()?;

        #[cfg(feature = "rtrb")]
        let (meter_tx, meter_rx) = rtrb::RingBuffer::new(MAX_BLOCK_SIZE * 4);

        let synth = Self {
            sample_rate: 44_100.0,
            params,
            matrix,
            sources,
            voices: (0..MAX_VOICES).map(Voice::new).collect(),
            mono_lfos: std::array::from_fn(|_| Lfo::new()),
            step_lfo: StepLfo::new(),
            gate: Gate::new(),
            chorus: Chorus::new(MAX_BLOCK_SIZE),
            distortion: Distortion::new(MAX_BLOCK_SIZE),
            eq: ParametricEq::new(),
            compressor: Compressor::new(),
            delay: StereoDelay::new(MAX_BLOCK_SIZE),
            reverb: StereoReverb::new(MAX_BLOCK_SIZE),
            limiter: Limiter::new(),
            playhead: Playhead::default(),
            pitch_bend: 0.0,
            note_stack: Vec::with_capacity(128),
            last_note: None,
            next_order: 0,
            #[cfg(feature = "rtrb")]
            meter_tx,
            #[cfg(feature = "rtrb")]
            meter_rx: Some(meter_rx),
        };
        log::info!("engine ready, {MAX_VOICES} voice slots");
        Ok(synth)
    }

    pub fn params(&self) -> &SynthParams {
        &self.params
    }

    /// Matrix access for wiring edits. Single writer; not for the audio
    /// thread while `process` is running.
    pub fn matrix(&self) -> &ModMatrix {
        &self.matrix
    }

    pub fn matrix_mut(&mut self) -> &mut ModMatrix {
        &mut self.matrix
    }

    /// Take the metering receive side, once, for the UI thread. The ring
    /// carries the processed output frame by frame; when the consumer
    /// falls behind, frames are dropped rather than blocking the audio
    /// thread.
    #[cfg(feature = "rtrb")]
    pub fn take_meter_consumer(&mut self) -> Option<rtrb::Consumer<StereoFrame>> {
        self.meter_rx.take()
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.matrix.set_sample_rate(sample_rate);
        for voice in &mut self.voices {
            voice.set_sample_rate(sample_rate);
        }
        for lfo in &mut self.mono_lfos {
            lfo.set_sample_rate(sample_rate);
        }
        self.step_lfo.set_sample_rate(sample_rate);
        self.gate.set_sample_rate(sample_rate);
        self.chorus.set_sample_rate(sample_rate);
        self.distortion.set_sample_rate(sample_rate);
        self.eq.set_sample_rate(sample_rate);
        self.compressor.set_sample_rate(sample_rate);
        self.delay.set_sample_rate(sample_rate);
        self.reverb.set_sample_rate(sample_rate);
        self.limiter.set_sample_rate(sample_rate);
        self.matrix.snap_params();
    }

    pub fn set_playhead(&mut self, playhead: Playhead) {
        self.playhead = playhead;
    }

    pub fn num_active_voices(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_free()).count()
    }

    /// Back to silence and initial state. Idempotent.
    pub fn reset(&mut self) {
        for voice in &mut self.voices {
            voice.hard_stop();
        }
        self.note_stack.clear();
        self.last_note = None;
        self.pitch_bend = 0.0;
        self.matrix.set_mono_value(self.sources.pitch_bend, 0.0);
        for lfo in &mut self.mono_lfos {
            lfo.reset();
        }
        self.step_lfo.reset();
        self.gate.reset();
        self.chorus.reset();
        self.distortion.reset();
        self.eq.reset();
        self.compressor.reset();
        self.delay.reset();
        self.reverb.reset();
        self.limiter.reset();
        self.matrix.snap_params();
    }

    pub fn handle_event(&mut self, event: MidiEvent) {
        match event {
            MidiEvent::NoteOn { note, velocity } => self.note_on(note, velocity),
            MidiEvent::NoteOff { note, tail_off } => self.note_off(note, tail_off),
            MidiEvent::Pressure { note, value } => {
                for (i, voice) in self.voices.iter().enumerate() {
                    if !voice.is_free() && voice.note() == note {
                        self.matrix.set_poly_value(i, self.sources.pressure, value);
                    }
                }
            }
            MidiEvent::Timbre { note, value } => {
                for (i, voice) in self.voices.iter().enumerate() {
                    if !voice.is_free() && voice.note() == note {
                        self.matrix.set_poly_value(i, self.sources.timbre, value);
                    }
                }
            }
            MidiEvent::PitchBend { semitones } => {
                self.pitch_bend = semitones;
                // The modulation source sees the bend normalized over a
                // 12 semitone span; pitch itself uses the raw value.
                self.matrix
                    .set_mono_value(self.sources.pitch_bend, (semitones / 12.0).clamp(-1.0, 1.0));
            }
            MidiEvent::ControlChange { controller, value } => {
                if let Some(src) = self.sources.cc.get(controller as usize) {
                    self.matrix.set_mono_value(*src, value);
                }
            }
            MidiEvent::AllNotesOff => {
                for voice in &mut self.voices {
                    voice.hard_stop();
                }
                self.note_stack.clear();
            }
        }
    }

    fn glide_settings(&self) -> (GlideMode, f32) {
        (
            GlideMode::from_index(self.params.global.glide_mode.user_value() as usize),
            self.params.global.glide_rate.user_value(),
        )
    }

    fn note_on(&mut self, note: u8, velocity: f32) {
        // Smoothing snaps when the engine wakes from silence so the first
        // voice does not ride a stale ramp.
        if self.voices.iter().all(|v| v.is_free()) {
            self.matrix.snap_params();
        }

        let (glide_mode, glide_time) = self.glide_settings();

        if self.params.global.mono.is_on() {
            self.note_stack.push((note, velocity));
            if let Some(pos) = self.voices.iter().position(|v| !v.is_free()) {
                let from = self.voices[pos].current_base_note();
                // Legato only carries the envelopes across while the old
                // note is still held; a voice caught in its release tail
                // must retrigger or the new note dies with the old one.
                let retrigger = !self.params.global.legato.is_on()
                    || self.voices[pos].state() == VoiceState::Releasing;
                let voice = &mut self.voices[pos];
                voice.change_note(note, velocity, retrigger, &mut self.matrix, &self.sources);
                voice.set_glide(glide_mode, from, glide_time);
            } else {
                self.start_on_free_slot(note, velocity, glide_mode, glide_time);
            }
        } else {
            let limit = (self.params.global.voices.user_value() as usize).clamp(2, MAX_VOICES);
            if self.num_active_voices() >= limit {
                let slot = self.steal_slot();
                self.voices[slot].hard_stop();
            }
            self.start_on_free_slot(note, velocity, glide_mode, glide_time);
        }

        self.last_note = Some(note as f32);
    }

    fn start_on_free_slot(&mut self, note: u8, velocity: f32, mode: GlideMode, time: f32) {
        let slot = match self.voices.iter().position(|v| v.is_free()) {
            Some(slot) => slot,
            None => {
                let slot = self.steal_slot();
                self.voices[slot].hard_stop();
                slot
            }
        };
        self.next_order += 1;
        let order = self.next_order;
        let voice = &mut self.voices[slot];
        voice.start(note, velocity, order, &mut self.matrix, &self.sources);
        if mode != GlideMode::Off {
            if let Some(from) = self.last_note {
                voice.set_glide(mode, from, time);
            }
        }
    }

    /// Pick a slot to reuse: the oldest releasing voice, else the oldest
    /// sounding voice.
    fn steal_slot(&self) -> usize {
        let mut best: Option<(usize, u64)> = None;
        for state in [VoiceState::Releasing, VoiceState::Active] {
            for (i, voice) in self.voices.iter().enumerate() {
                if voice.state() != state {
                    continue;
                }
                match best {
                    Some((_, order)) if voice.start_order() >= order => {}
                    _ => best = Some((i, voice.start_order())),
                }
            }
            if best.is_some() {
                break;
            }
        }
        best.map(|(i, _)| i).unwrap_or(0)
    }

    fn note_off(&mut self, note: u8, tail_off: bool) {
        if self.params.global.mono.is_on() {
            if let Some(pos) = self.note_stack.iter().rposition(|&(n, _)| n == note) {
                self.note_stack.remove(pos);
            }
            let Some(voice_pos) = self.voices.iter().position(|v| !v.is_free()) else {
                return;
            };
            if self.voices[voice_pos].note() != note {
                return;
            }
            if let Some(&(prev_note, prev_vel)) = self.note_stack.last() {
                // Fall back to the most recent still-held note.
                let (glide_mode, glide_time) = self.glide_settings();
                let from = self.voices[voice_pos].current_base_note();
                let retrigger = !self.params.global.legato.is_on()
                    || self.voices[voice_pos].state() == VoiceState::Releasing;
                let voice = &mut self.voices[voice_pos];
                voice.change_note(prev_note, prev_vel, retrigger, &mut self.matrix, &self.sources);
                voice.set_glide(glide_mode, from, glide_time);
            } else if tail_off {
                self.voices[voice_pos].release();
            } else {
                self.voices[voice_pos].hard_stop();
            }
        } else {
            for voice in &mut self.voices {
                if voice.state() == VoiceState::Active && voice.note() == note {
                    if tail_off {
                        voice.release();
                    } else {
                        voice.hard_stop();
                    }
                }
            }
        }
    }

    /// Render one host block. Buffers are overwritten, not mixed into.
    /// Mismatched channel slices render the shorter length; blocks of any
    /// size go through the same sub-block chop, so oversized host buffers
    /// cost nothing extra.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let total = left.len().min(right.len());
        let left = &mut left[..total];
        let right = &mut right[..total];

        left.fill(0.0);
        right.fill(0.0);
        let mut offset = 0;
        while offset < total {
            let n = (total - offset).min(SUB_BLOCK_SIZE);
            let l = &mut left[offset..offset + n];
            let r = &mut right[offset..offset + n];

            self.matrix.begin_block();
            self.update_mono_modulators(n);

            let mut ctx = VoiceContext {
                matrix: &mut self.matrix,
                sources: &self.sources,
                params: &self.params,
                playhead: &self.playhead,
                pitch_bend: self.pitch_bend,
            };
            for voice in &mut self.voices {
                voice.render(&mut ctx, l, r);
            }

            self.apply_effects(l, r);

            let master = self.matrix.value(&self.params.global.level);
            for (sl, sr) in l.iter_mut().zip(r.iter_mut()) {
                *sl *= master;
                *sr *= master;
            }

            self.matrix.finish_block(n);
            offset += n;
        }

        #[cfg(feature = "rtrb")]
        for (&sl, &sr) in left.iter().zip(right.iter()) {
            let _ = self.meter_tx.push(StereoFrame {
                left: sl,
                right: sr,
            });
        }
    }

    /// Steps-per-second rate for a tempo-sync beat parameter.
    fn beat_rate(&self, beat_index: usize) -> f32 {
        let seconds = note_duration(beat_index)
            .duration
            .to_seconds(&self.playhead);
        1.0 / seconds.max(1.0e-6)
    }

    fn update_mono_modulators(&mut self, num_samples: usize) {
        for i in 0..NUM_LFOS {
            let lp = &self.params.lfo[i];
            if !lp.enable.is_on() {
                self.matrix.set_mono_value(self.sources.mono_lfo[i], 0.0);
                continue;
            }
            let frequency = if lp.sync.is_on() {
                self.beat_rate(lp.beat.user_value() as usize)
            } else {
                self.matrix.value(&lp.rate)
            };
            let lfo_params = LfoParams {
                shape: LfoShape::from_index(lp.wave.user_value() as usize),
                frequency,
                phase: self.matrix.value(&lp.phase),
                offset: self.matrix.value(&lp.offset),
                depth: self.matrix.value(&lp.depth),
                delay: self.matrix.value(&lp.delay),
                fade: self.matrix.value(&lp.fade),
            };
            self.mono_lfos[i].set_parameters(lfo_params);
            self.mono_lfos[i].process(num_samples);
            let out = self.mono_lfos[i].output();
            self.matrix.set_mono_value(self.sources.mono_lfo[i], out);
        }

        let sp = &self.params.step_lfo;
        if sp.enable.is_on() {
            let rate = self.beat_rate(sp.beat.user_value() as usize);
            self.step_lfo.set_freq(rate);
            self.step_lfo.set_num_points(sp.length.user_value() as usize);
            for (i, level) in sp.level.iter().enumerate() {
                self.step_lfo.set_point(i, level.user_value());
            }
            self.step_lfo.process(num_samples);
            let out = self.step_lfo.output();
            self.matrix.set_mono_value(self.sources.mono_step, out);
        } else {
            self.matrix.set_mono_value(self.sources.mono_step, 0.0);
        }
    }

    /// Fixed chain: gate, chorus, distortion, EQ, compressor, delay,
    /// reverb, limiter. Disabled stages are skipped entirely.
    fn apply_effects(&mut self, left: &mut [f32], right: &mut [f32]) {
        let matrix = &self.matrix;
        let params = &self.params;

        if params.gate.enable.is_on() {
            let gp = &params.gate;
            self.gate.set_params(GateParams {
                steps_per_second: {
                    let seconds = note_duration(gp.beat.user_value() as usize)
                        .duration
                        .to_seconds(&self.playhead);
                    1.0 / seconds.max(1.0e-6)
                },
                num_steps: gp.length.user_value() as usize,
                attack: matrix.value(&gp.attack),
                release: matrix.value(&gp.release),
            });
            for i in 0..gp.left.len() {
                self.gate
                    .set_step(i, gp.left[i].user_value() > 0.5, gp.right[i].user_value() > 0.5);
            }
            self.gate.process(left, right);
        }

        if params.chorus.enable.is_on() {
            let cp = &params.chorus;
            self.chorus.set_params(ChorusParams {
                rate: matrix.value(&cp.rate),
                depth_ms: matrix.value(&cp.depth),
                delay_ms: matrix.value(&cp.delay),
                width: matrix.value(&cp.width),
                mix: matrix.value(&cp.mix),
            });
            self.chorus.process(left, right);
        }

        if params.distortion.enable.is_on() {
            let dp = &params.distortion;
            self.distortion.set_params(DistortionParams {
                amount: matrix.value(&dp.amount),
                highpass_hz: matrix.value(&dp.highpass) * DISTORTION_HIGHPASS_MAX_HZ,
                output_gain: matrix.value(&dp.output),
                mix: matrix.value(&dp.mix),
            });
            self.distortion.process(left, right);
        }

        if params.eq.enable.is_on() {
            let band = |b: &crate::synth::params::EqBandFxParams| BandParams {
                freq_hz: matrix.value(&b.freq),
                gain_db: matrix.value(&b.gain),
                q: matrix.value(&b.q),
            };
            self.eq.set_params(EqParams {
                low: band(&params.eq.low),
                mid1: band(&params.eq.mid1),
                mid2: band(&params.eq.mid2),
                high: band(&params.eq.high),
            });
            self.eq.process(left, right);
        }

        if params.compressor.enable.is_on() {
            let cp = &params.compressor;
            self.compressor.set_params(CompressorParams {
                attack: matrix.value(&cp.attack),
                release: matrix.value(&cp.release),
                threshold_db: matrix.value(&cp.threshold),
                ratio: matrix.value(&cp.ratio),
                knee_db: 6.0,
                input_gain: 1.0,
                output_gain: matrix.value(&cp.gain),
            });
            self.compressor.process(left, right);
        }

        if params.delay.enable.is_on() {
            let dp = &params.delay;
            let time_seconds = if dp.sync.is_on() {
                note_duration(dp.beat.user_value() as usize)
                    .duration
                    .to_seconds(&self.playhead)
            } else {
                matrix.value(&dp.time)
            };
            self.delay.set_params(StereoDelayParams {
                time_seconds,
                feedback: matrix.value(&dp.feedback),
                crossfeed: matrix.value(&dp.crossfeed),
                mix: matrix.value(&dp.mix),
            });
            self.delay.process(left, right);
        }

        if params.reverb.enable.is_on() {
            let rp = &params.reverb;
            self.reverb.set_params(ReverbParams {
                size: matrix.value(&rp.size),
                damping: matrix.value(&rp.damping),
                width: matrix.value(&rp.width),
                freeze: matrix.value(&rp.freeze) > 0.5,
                mix: matrix.value(&rp.mix),
            });
            self.reverb.process(left, right);
        }

        if params.limiter.enable.is_on() {
            let lp = &params.limiter;
            self.limiter.set_params(
                matrix.value(&lp.attack),
                matrix.value(&lp.release),
                matrix.value(&lp.threshold),
            );
            // Makeup gain drives into the ceiling rather than after it.
            let gain = matrix.value(&lp.gain);
            for (sl, sr) in left.iter_mut().zip(right.iter_mut()) {
                *sl *= gain;
                *sr *= gain;
            }
            self.limiter.process(left, right);
        }
    }
}
