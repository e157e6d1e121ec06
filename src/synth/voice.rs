use crate::dsp::envelope::Adsr;
use crate::dsp::filter::{filter_type_from_index, resonance_to_q, StereoFilter, MAX_CUTOFF_HZ};
use crate::dsp::lfo::{Lfo, LfoParams, LfoShape};
use crate::dsp::oscillator::{OscParams, VaOscillator, Wave};
use crate::dsp::units::{hz_to_midi_note, midi_note_to_hz, velocity_to_gain};
use crate::modulation::ModMatrix;
use crate::params::Parameter;
use crate::sequencing::{note_duration, Playhead};
use crate::synth::params::SynthParams;
use crate::synth::ModSources;
use crate::{NUM_ENVS, NUM_FILTERS, NUM_LFOS, NUM_OSCS, SUB_BLOCK_SIZE};

/*
One slot of the voice pool.

A voice owns everything that sounds for a single note: the oscillator
banks, the per-voice filters with their envelopes, the aux modulation
envelopes, the per-voice LFOs and the amplitude ADSR. It renders in
sub-blocks: `update_params` resolves every parameter through the matrix
once, publishes this voice's poly sources, then the audio path runs with
those values held for the rest of the sub-block.

Slots are constructed once and reused. `start` arms a Free slot,
`release` rides the amplitude release, and the voice frees itself when
that envelope goes idle. `hard_stop` is the immediate path used for
stealing and all-notes-off.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,
    Active,
    Releasing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlideMode {
    Off,
    Glissando,
    Portamento,
}

impl GlideMode {
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => GlideMode::Off,
            1 => GlideMode::Glissando,
            _ => GlideMode::Portamento,
        }
    }
}

pub(crate) struct VoiceContext<'a> {
    pub matrix: &'a mut ModMatrix,
    pub sources: &'a ModSources,
    pub params: &'a SynthParams,
    pub playhead: &'a Playhead,
    /// Channel pitch bend in semitones, applied to pitch directly.
    pub pitch_bend: f32,
}

pub(crate) struct Voice {
    index: usize,
    sample_rate: f32,
    state: VoiceState,
    note: u8,
    velocity: f32,
    start_order: u64,

    oscillators: [VaOscillator; NUM_OSCS],
    osc_notes: [f32; NUM_OSCS],
    filters: [StereoFilter; NUM_FILTERS],
    filter_envs: [Adsr; NUM_FILTERS],
    mod_envs: [Adsr; NUM_ENVS],
    lfos: [Lfo; NUM_LFOS],
    amp_env: Adsr,

    glide_mode: GlideMode,
    glide_from: f32,
    /// Progress through the glide, 0..1. 1 means settled on `note`.
    glide_pos: f32,
    glide_time: f32,
}

impl Voice {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            sample_rate: 44_100.0,
            state: VoiceState::Free,
            note: 60,
            velocity: 0.0,
            start_order: 0,
            oscillators: std::array::from_fn(|_| VaOscillator::new()),
            osc_notes: [60.0; NUM_OSCS],
            filters: std::array::from_fn(|_| StereoFilter::new()),
            filter_envs: std::array::from_fn(|_| Adsr::new()),
            mod_envs: std::array::from_fn(|_| Adsr::new()),
            lfos: std::array::from_fn(|_| Lfo::new()),
            amp_env: Adsr::new(),
            glide_mode: GlideMode::Off,
            glide_from: 60.0,
            glide_pos: 1.0,
            glide_time: 0.1,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for osc in &mut self.oscillators {
            osc.set_sample_rate(sample_rate);
        }
        for filter in &mut self.filters {
            filter.set_sample_rate(sample_rate);
        }
        for env in self.filter_envs.iter_mut().chain(self.mod_envs.iter_mut()) {
            env.set_sample_rate(sample_rate);
        }
        for lfo in &mut self.lfos {
            lfo.set_sample_rate(sample_rate);
        }
        self.amp_env.set_sample_rate(sample_rate);
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Free
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn start_order(&self) -> u64 {
        self.start_order
    }

    /// Pitch the voice currently sounds at, mid-glide or settled.
    pub fn current_base_note(&self) -> f32 {
        if self.glide_pos >= 1.0 {
            return self.note as f32;
        }
        let interpolated = self.glide_from + (self.note as f32 - self.glide_from) * self.glide_pos;
        match self.glide_mode {
            GlideMode::Glissando => interpolated.round(),
            _ => interpolated,
        }
    }

    /// Arm a free slot for a new note.
    pub fn start(
        &mut self,
        note: u8,
        velocity: f32,
        order: u64,
        matrix: &mut ModMatrix,
        sources: &ModSources,
    ) {
        self.note = note;
        self.velocity = velocity.clamp(0.0, 1.0);
        self.start_order = order;
        self.state = VoiceState::Active;
        self.glide_mode = GlideMode::Off;
        self.glide_pos = 1.0;
        self.osc_notes = [note as f32; NUM_OSCS];

        matrix.set_poly_value(self.index, sources.note, note as f32 / 127.0);
        matrix.set_poly_value(self.index, sources.velocity, self.velocity);
        matrix.set_poly_value(self.index, sources.pressure, 0.0);
        matrix.set_poly_value(self.index, sources.timbre, 0.0);

        for osc in &mut self.oscillators {
            osc.note_on();
        }
        for filter in &mut self.filters {
            filter.reset();
        }
        for env in self.filter_envs.iter_mut().chain(self.mod_envs.iter_mut()) {
            env.reset();
            env.note_on();
        }
        for lfo in &mut self.lfos {
            lfo.note_on();
        }
        self.amp_env.reset();
        self.amp_env.note_on();
    }

    /// Begin sliding toward the current note from `from_note`.
    pub fn set_glide(&mut self, mode: GlideMode, from_note: f32, time: f32) {
        if mode == GlideMode::Off || (from_note - self.note as f32).abs() < f32::EPSILON {
            self.glide_pos = 1.0;
            return;
        }
        self.glide_mode = mode;
        self.glide_from = from_note;
        self.glide_pos = 0.0;
        self.glide_time = time.max(1.0e-3);
    }

    /// Mono note change on an already sounding voice. With `retrigger`
    /// the envelopes and LFOs restart; without it (legato) they carry on.
    pub fn change_note(
        &mut self,
        note: u8,
        velocity: f32,
        retrigger: bool,
        matrix: &mut ModMatrix,
        sources: &ModSources,
    ) {
        self.note = note;
        self.state = VoiceState::Active;
        matrix.set_poly_value(self.index, sources.note, note as f32 / 127.0);
        if retrigger {
            self.velocity = velocity.clamp(0.0, 1.0);
            matrix.set_poly_value(self.index, sources.velocity, self.velocity);
            for env in self.filter_envs.iter_mut().chain(self.mod_envs.iter_mut()) {
                env.note_on();
            }
            for lfo in &mut self.lfos {
                lfo.note_on();
            }
            self.amp_env.note_on();
        }
    }

    /// Gate off with a release tail.
    pub fn release(&mut self) {
        if self.state != VoiceState::Active {
            return;
        }
        self.state = VoiceState::Releasing;
        self.amp_env.note_off();
        for env in self.filter_envs.iter_mut().chain(self.mod_envs.iter_mut()) {
            env.note_off();
        }
    }

    /// Immediate silence; the slot is reusable right away.
    pub fn hard_stop(&mut self) {
        self.state = VoiceState::Free;
        self.amp_env.reset();
        for env in self.filter_envs.iter_mut().chain(self.mod_envs.iter_mut()) {
            env.reset();
        }
        for filter in &mut self.filters {
            filter.reset();
        }
        for lfo in &mut self.lfos {
            lfo.reset();
        }
        self.glide_pos = 1.0;
        self.glide_mode = GlideMode::Off;
    }

    #[inline]
    fn value(&self, matrix: &ModMatrix, param: &Parameter) -> f32 {
        matrix.value_for_voice(self.index, param)
    }

    /// Resolve everything through the matrix for one sub-block, publish
    /// this voice's poly sources, and advance the block-rate modulators.
    fn update_params(&mut self, ctx: &mut VoiceContext, num_samples: usize) {
        let params = ctx.params;
        let idx = self.index;

        // Glide progress for this sub-block.
        if self.glide_pos < 1.0 {
            let dt = num_samples as f32 / self.sample_rate;
            self.glide_pos = (self.glide_pos + dt / self.glide_time).min(1.0);
        }
        let base_note = self.current_base_note();

        for i in 0..NUM_OSCS {
            let tune = ctx.matrix.value_for_voice(idx, &params.osc[i].tune);
            let fine = ctx.matrix.value_for_voice(idx, &params.osc[i].finetune) / 100.0;
            self.osc_notes[i] = base_note + ctx.pitch_bend + tune + fine;
        }

        let max_note = hz_to_midi_note(MAX_CUTOFF_HZ);
        for i in 0..NUM_FILTERS {
            let fp = &params.filter[i];
            if !fp.enable.is_on() {
                ctx.matrix.set_poly_value(idx, ctx.sources.filter_env[i], 0.0);
                continue;
            }

            let env = &mut self.filter_envs[i];
            env.set_attack(ctx.matrix.value_for_voice(idx, &fp.attack));
            env.set_decay(ctx.matrix.value_for_voice(idx, &fp.decay));
            env.set_sustain_level(ctx.matrix.value_for_voice(idx, &fp.sustain));
            env.set_release(ctx.matrix.value_for_voice(idx, &fp.release));

            let key = ctx.matrix.value_for_voice(idx, &fp.key_tracking);
            let vel_track = ctx.matrix.value_for_voice(idx, &fp.velocity_tracking);
            let env_scale = self.velocity * vel_track + (1.0 - vel_track);

            let mut cutoff_note = ctx.matrix.value_for_voice(idx, &fp.frequency);
            cutoff_note += (self.note as f32 - 60.0) * key;
            cutoff_note += env.output()
                * env_scale
                * ctx.matrix.value_for_voice(idx, &fp.amount)
                * max_note;

            let (mode, slope) = filter_type_from_index(fp.filter_type.user_value() as usize);
            let q = resonance_to_q(ctx.matrix.value_for_voice(idx, &fp.resonance));
            let filter = &mut self.filters[i];
            filter.set_mode(mode);
            filter.set_slope(slope);
            filter.set_params(midi_note_to_hz(cutoff_note), q);

            ctx.matrix
                .set_poly_value(idx, ctx.sources.filter_env[i], env.output());
            env.process(num_samples);
        }

        for i in 0..NUM_ENVS {
            let ep = &params.env[i];
            if !ep.enable.is_on() {
                ctx.matrix.set_poly_value(idx, ctx.sources.env[i], 0.0);
                continue;
            }
            let env = &mut self.mod_envs[i];
            env.set_attack(ctx.matrix.value_for_voice(idx, &ep.attack));
            env.set_decay(ctx.matrix.value_for_voice(idx, &ep.decay));
            env.set_sustain_level(ctx.matrix.value_for_voice(idx, &ep.sustain));
            env.set_release(ctx.matrix.value_for_voice(idx, &ep.release));
            ctx.matrix.set_poly_value(idx, ctx.sources.env[i], env.output());
            env.process(num_samples);
        }

        for i in 0..NUM_LFOS {
            let lp = &params.lfo[i];
            if !lp.enable.is_on() {
                ctx.matrix.set_poly_value(idx, ctx.sources.lfo[i], 0.0);
                continue;
            }
            let frequency = if lp.sync.is_on() {
                let seconds = note_duration(lp.beat.user_value() as usize)
                    .duration
                    .to_seconds(ctx.playhead);
                1.0 / seconds.max(1.0e-6)
            } else {
                ctx.matrix.value_for_voice(idx, &lp.rate)
            };
            let lfo_params = LfoParams {
                shape: LfoShape::from_index(lp.wave.user_value() as usize),
                frequency,
                phase: ctx.matrix.value_for_voice(idx, &lp.phase),
                offset: ctx.matrix.value_for_voice(idx, &lp.offset),
                depth: ctx.matrix.value_for_voice(idx, &lp.depth),
                delay: ctx.matrix.value_for_voice(idx, &lp.delay),
                fade: ctx.matrix.value_for_voice(idx, &lp.fade),
            };
            let lfo = &mut self.lfos[i];
            lfo.set_parameters(lfo_params);
            lfo.process(num_samples);
            ctx.matrix.set_poly_value(idx, ctx.sources.lfo[i], lfo.output());
        }

        let ap = &params.amp_env;
        let attack = ctx.matrix.value_for_voice(idx, &ap.attack);
        let decay = ctx.matrix.value_for_voice(idx, &ap.decay);
        let sustain = ctx.matrix.value_for_voice(idx, &ap.sustain);
        let release = ctx.matrix.value_for_voice(idx, &ap.release);
        self.amp_env.set_attack(attack);
        self.amp_env.set_decay(decay);
        self.amp_env.set_sustain_level(sustain);
        self.amp_env.set_release(release);
    }

    /// Render one sub-block additively into the output slices. Returns
    /// silently when the slot is free.
    pub fn render(&mut self, ctx: &mut VoiceContext, out_l: &mut [f32], out_r: &mut [f32]) {
        debug_assert_eq!(out_l.len(), out_r.len());
        debug_assert!(out_l.len() <= SUB_BLOCK_SIZE);
        if self.state == VoiceState::Free {
            return;
        }

        let n = out_l.len();
        self.update_params(ctx, n);

        let mut buf_l = [0.0f32; SUB_BLOCK_SIZE];
        let mut buf_r = [0.0f32; SUB_BLOCK_SIZE];
        let (l, r) = (&mut buf_l[..n], &mut buf_r[..n]);

        for i in 0..NUM_OSCS {
            let op = &ctx.params.osc[i];
            if !op.enable.is_on() {
                continue;
            }
            let osc_params = OscParams {
                wave: Wave::from_index(op.wave.user_value() as usize),
                voices: op.voices.user_value() as usize,
                pw: self.value(ctx.matrix, &op.pulsewidth),
                pan: self.value(ctx.matrix, &op.pan),
                spread: self.value(ctx.matrix, &op.spread),
                detune: self.value(ctx.matrix, &op.detune),
                gain: self.value(ctx.matrix, &op.level),
            };
            self.oscillators[i].process_adding(self.osc_notes[i], &osc_params, l, r);
        }

        let vel_track = self.value(ctx.matrix, &ctx.params.amp_env.velocity_tracking);
        let velocity = self.velocity * vel_track + (1.0 - vel_track);
        let gain = velocity_to_gain(velocity);
        for (sl, sr) in l.iter_mut().zip(r.iter_mut()) {
            *sl *= gain;
            *sr *= gain;
        }

        for i in 0..NUM_FILTERS {
            if ctx.params.filter[i].enable.is_on() {
                self.filters[i].process(l, r);
            }
        }

        self.amp_env.apply_multiplying(l, r);

        for ((ol, or), (sl, sr)) in out_l
            .iter_mut()
            .zip(out_r.iter_mut())
            .zip(l.iter().zip(r.iter()))
        {
            *ol += sl;
            *or += sr;
        }

        if self.amp_env.is_idle() {
            self.hard_stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulation::ModMatrix;

    const SAMPLE_RATE: f32 = 48_000.0;

    struct Rig {
        matrix: ModMatrix,
        sources: ModSources,
        params: SynthParams,
        playhead: Playhead,
        voice: Voice,
    }

    fn make_rig() -> Rig {
        let mut matrix = ModMatrix::new();
        matrix.set_sample_rate(SAMPLE_RATE);
        let sources = ModSources::register(&mut matrix);
        let params = SynthParams::new();
        params.register(&mut matrix);
        matrix.build().unwrap();

        let mut voice = Voice::new(0);
        voice.set_sample_rate(SAMPLE_RATE);

        Rig {
            matrix,
            sources,
            params,
            playhead: Playhead::default(),
            voice,
        }
    }

    fn render_block(rig: &mut Rig, out_l: &mut [f32], out_r: &mut [f32]) {
        for (cl, cr) in out_l
            .chunks_mut(SUB_BLOCK_SIZE)
            .zip(out_r.chunks_mut(SUB_BLOCK_SIZE))
        {
            rig.matrix.begin_block();
            let mut ctx = VoiceContext {
                matrix: &mut rig.matrix,
                sources: &rig.sources,
                params: &rig.params,
                playhead: &rig.playhead,
                pitch_bend: 0.0,
            };
            rig.voice.render(&mut ctx, cl, cr);
            let n = cl.len();
            rig.matrix.finish_block(n);
        }
    }

    #[test]
    fn started_voice_produces_audio() {
        let mut rig = make_rig();
        rig.params.amp_env.attack.set_user_value(0.0);
        rig.matrix.snap_params();
        rig.voice
            .start(69, 1.0, 1, &mut rig.matrix, &rig.sources);

        let mut l = vec![0.0; 512];
        let mut r = vec![0.0; 512];
        render_block(&mut rig, &mut l, &mut r);

        assert_eq!(rig.voice.state(), VoiceState::Active);
        let peak = l.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        assert!(peak > 0.1, "voice rendered silence, peak {peak}");
    }

    #[test]
    fn voice_frees_itself_after_the_release_tail() {
        let mut rig = make_rig();
        rig.params.amp_env.attack.set_user_value(0.0);
        rig.params.amp_env.release.set_user_value(0.01);
        rig.matrix.snap_params();

        rig.voice
            .start(60, 0.8, 1, &mut rig.matrix, &rig.sources);
        let mut l = vec![0.0; 256];
        let mut r = vec![0.0; 256];
        render_block(&mut rig, &mut l, &mut r);

        rig.voice.release();
        assert_eq!(rig.voice.state(), VoiceState::Releasing);

        // 10 ms release at 48 kHz is 480 samples; give it a full kilosample.
        let mut l2 = vec![0.0; 1024];
        let mut r2 = vec![0.0; 1024];
        render_block(&mut rig, &mut l2, &mut r2);
        assert!(rig.voice.is_free());
        assert!(l2[1000].abs() < 1e-6);
    }

    #[test]
    fn hard_stop_is_immediate() {
        let mut rig = make_rig();
        rig.matrix.snap_params();
        rig.voice
            .start(60, 1.0, 1, &mut rig.matrix, &rig.sources);
        rig.voice.hard_stop();
        assert!(rig.voice.is_free());

        let mut l = vec![0.0; 64];
        let mut r = vec![0.0; 64];
        render_block(&mut rig, &mut l, &mut r);
        assert!(l.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn portamento_slides_between_notes() {
        let mut rig = make_rig();
        rig.matrix.snap_params();
        rig.voice
            .start(60, 1.0, 1, &mut rig.matrix, &rig.sources);
        rig.voice.set_glide(GlideMode::Portamento, 48.0, 0.1);

        let mut l = vec![0.0; 64];
        let mut r = vec![0.0; 64];
        render_block(&mut rig, &mut l, &mut r);
        let early = rig.voice.current_base_note();
        assert!(early > 48.0 && early < 60.0, "mid-glide note {early}");

        let mut l2 = vec![0.0; 8192];
        let mut r2 = vec![0.0; 8192];
        render_block(&mut rig, &mut l2, &mut r2);
        assert_eq!(rig.voice.current_base_note(), 60.0);
    }

    #[test]
    fn glissando_quantizes_to_semitones() {
        let mut rig = make_rig();
        rig.matrix.snap_params();
        rig.voice
            .start(60, 1.0, 1, &mut rig.matrix, &rig.sources);
        rig.voice.set_glide(GlideMode::Glissando, 55.0, 0.5);

        let mut l = vec![0.0; 2048];
        let mut r = vec![0.0; 2048];
        render_block(&mut rig, &mut l, &mut r);
        let note = rig.voice.current_base_note();
        assert_eq!(note, note.round(), "glissando note {note} not quantized");
    }

    #[test]
    fn filter_envelope_stages_use_their_own_times() {
        let mut rig = make_rig();
        // Long attack, instant decay: if decay wrongly read the attack
        // time the envelope would linger near the peak.
        rig.params.filter[0].attack.set_user_value(0.005);
        rig.params.filter[0].decay.set_user_value(0.001);
        rig.params.filter[0].sustain.set_user_value(20.0);
        rig.params.amp_env.attack.set_user_value(0.0);
        rig.matrix.snap_params();

        rig.voice
            .start(60, 1.0, 1, &mut rig.matrix, &rig.sources);

        // 0.5 s is far past attack + decay; the envelope must sit at
        // the 20 % sustain level, not at the peak.
        let mut l = vec![0.0; SAMPLE_RATE as usize / 2];
        let mut r = l.clone();
        render_block(&mut rig, &mut l, &mut r);
        let env_out = rig.voice.filter_envs[0].output();
        assert!(
            (env_out - 0.2).abs() < 0.01,
            "expected sustain at 0.2, got {env_out}"
        );
    }

    #[test]
    fn disabled_sections_publish_zero() {
        let mut rig = make_rig();
        rig.params.lfo[0].enable.set_user_value(0.0);
        rig.params.env[0].enable.set_user_value(0.0);
        rig.matrix.snap_params();
        rig.voice
            .start(60, 1.0, 1, &mut rig.matrix, &rig.sources);

        let mut l = vec![0.0; 64];
        let mut r = vec![0.0; 64];
        render_block(&mut rig, &mut l, &mut r);
        assert_eq!(rig.matrix.poly_value(0, rig.sources.lfo[0]), 0.0);
        assert_eq!(rig.matrix.poly_value(0, rig.sources.env[0]), 0.0);
    }
}
