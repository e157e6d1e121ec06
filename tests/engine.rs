use va_engine::dsp::units::velocity_to_gain;
use va_engine::io::MidiEvent;
use va_engine::sequencing::Playhead;
use va_engine::synth::VaSynth;

const SAMPLE_RATE: f32 = 48_000.0;

fn make_engine() -> VaSynth {
    let mut synth = VaSynth::new().unwrap();
    synth.set_sample_rate(SAMPLE_RATE);
    synth
}

/// Render `total` samples in host blocks of `chunk`.
fn render(synth: &mut VaSynth, total: usize, chunk: usize) -> (Vec<f32>, Vec<f32>) {
    let mut left = vec![0.0; total];
    let mut right = vec![0.0; total];
    let mut offset = 0;
    while offset < total {
        let n = chunk.min(total - offset);
        synth.process(&mut left[offset..offset + n], &mut right[offset..offset + n]);
        offset += n;
    }
    (left, right)
}

fn peak(buffer: &[f32]) -> f32 {
    buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
}

fn rms(buffer: &[f32]) -> f32 {
    (buffer.iter().map(|s| s * s).sum::<f32>() / buffer.len() as f32).sqrt()
}

fn zero_crossings(buffer: &[f32]) -> usize {
    buffer
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count()
}

#[test]
fn raw_sine_peak_matches_the_velocity_gain() {
    let mut synth = make_engine();
    // Bare oscillator: no filter, instant attack, full sustain.
    synth.params().filter[0].enable.set_user_value(0.0);
    synth.params().amp_env.attack.set_user_value(0.0);
    synth.params().amp_env.sustain.set_user_value(100.0);

    synth.handle_event(MidiEvent::NoteOn {
        note: 69,
        velocity: 1.0,
    });
    let (left, right) = render(&mut synth, 4_800, 480);

    // Center pan splits the stack with the equal-power law.
    let expected = velocity_to_gain(1.0) * std::f32::consts::FRAC_PI_4.cos();
    assert!((peak(&left) - expected).abs() < 0.01, "peak {}", peak(&left));
    assert!((peak(&right) - expected).abs() < 0.01);
}

#[test]
fn pitch_bend_doubles_the_frequency_at_twelve_semitones() {
    let mut synth = make_engine();
    synth.params().filter[0].enable.set_user_value(0.0);
    synth.params().amp_env.attack.set_user_value(0.0);

    synth.handle_event(MidiEvent::NoteOn {
        note: 69,
        velocity: 1.0,
    });
    let (plain, _) = render(&mut synth, 4_800, 480);
    synth.reset();

    synth.handle_event(MidiEvent::PitchBend { semitones: 12.0 });
    synth.handle_event(MidiEvent::NoteOn {
        note: 69,
        velocity: 1.0,
    });
    let (bent, _) = render(&mut synth, 4_800, 480);

    // 440 Hz vs 880 Hz over 0.1 s: crossing counts near 88 and 176.
    let low = zero_crossings(&plain);
    let high = zero_crossings(&bent);
    assert!((low as f32 - 88.0).abs() < 4.0, "unbent crossings {low}");
    assert!((high as f32 - 176.0).abs() < 6.0, "bent crossings {high}");
}

#[test]
fn hard_note_off_is_silent_by_the_next_block() {
    let mut synth = make_engine();
    synth.handle_event(MidiEvent::NoteOn {
        note: 60,
        velocity: 1.0,
    });
    render(&mut synth, 2_048, 512);

    synth.handle_event(MidiEvent::NoteOff {
        note: 60,
        tail_off: false,
    });
    let (left, _) = render(&mut synth, 512, 512);
    assert_eq!(synth.num_active_voices(), 0);
    assert!(left.iter().all(|&s| s == 0.0));
}

#[test]
fn tail_off_rides_the_release_and_frees_the_slot() {
    let mut synth = make_engine();
    synth.params().amp_env.attack.set_user_value(0.0);
    synth.params().amp_env.release.set_user_value(0.05);

    synth.handle_event(MidiEvent::NoteOn {
        note: 60,
        velocity: 1.0,
    });
    render(&mut synth, 4_800, 480);

    synth.handle_event(MidiEvent::NoteOff {
        note: 60,
        tail_off: true,
    });
    // Right after the gate drops the tail still sounds.
    let (early, _) = render(&mut synth, 480, 480);
    assert!(peak(&early) > 0.01, "release tail missing");
    assert_eq!(synth.num_active_voices(), 1);

    // 50 ms release is long gone after a quarter second.
    let (late, _) = render(&mut synth, 12_000, 480);
    assert_eq!(synth.num_active_voices(), 0);
    assert!(peak(&late[6_000..]) == 0.0);

    // The slot is reusable.
    synth.handle_event(MidiEvent::NoteOn {
        note: 72,
        velocity: 1.0,
    });
    let (again, _) = render(&mut synth, 2_400, 480);
    assert!(peak(&again) > 0.01);
}

#[test]
fn tempo_synced_lfo_period_is_independent_of_chunking() {
    let run = |chunk: usize| -> f32 {
        let mut synth = make_engine();
        synth.set_playhead(Playhead {
            bpm: 120.0,
            playing: true,
        });
        let lfo = &synth.params().lfo[0];
        lfo.enable.set_user_value(1.0);
        lfo.sync.set_user_value(1.0);
        lfo.delay.set_user_value(0.0);
        lfo.fade.set_user_value(0.0);

        // A quarter note at 120 BPM is a 0.5 s cycle; 0.125 s in, the
        // sine sits at its positive peak.
        render(&mut synth, 6_000, chunk);
        let src = synth.matrix().find_source("mlfo1").unwrap();
        synth.matrix().mono_value(src)
    };

    let a = run(250);
    let b = run(512);
    assert!((a - 1.0).abs() < 0.01, "quarter-cycle value {a}");
    assert!((a - b).abs() < 1.0e-3, "chunking changed the LFO: {a} vs {b}");
}

#[test]
fn controller_wiring_closes_the_filter() {
    let measure = |cc_value: f32| -> f32 {
        let mut synth = make_engine();
        synth.params().amp_env.attack.set_user_value(0.0);
        let cutoff = synth.params().filter[0].frequency.clone();
        let src = synth.matrix().find_source("cc74").unwrap();
        synth
            .matrix_mut()
            .add_connection(src, &cutoff, -60.0)
            .unwrap();

        synth.handle_event(MidiEvent::ControlChange {
            controller: 74,
            value: cc_value,
        });
        synth.handle_event(MidiEvent::NoteOn {
            note: 69,
            velocity: 1.0,
        });
        let (left, _) = render(&mut synth, 9_600, 480);
        rms(&left[4_800..])
    };

    let open = measure(0.0);
    let closed = measure(1.0);
    assert!(
        closed < open * 0.5,
        "expected the swept cutoff to darken the note: {open} vs {closed}"
    );
}

#[test]
fn identical_event_streams_render_bit_identically() {
    let run = || -> Vec<f32> {
        let mut synth = make_engine();
        synth.params().chorus.enable.set_user_value(1.0);
        synth.params().reverb.enable.set_user_value(1.0);
        synth.params().reverb.mix.set_user_value(0.4);

        synth.handle_event(MidiEvent::NoteOn {
            note: 60,
            velocity: 0.9,
        });
        let (mut a, _) = render(&mut synth, 2_048, 512);
        synth.handle_event(MidiEvent::NoteOn {
            note: 67,
            velocity: 0.7,
        });
        synth.handle_event(MidiEvent::NoteOff {
            note: 60,
            tail_off: true,
        });
        let (b, _) = render(&mut synth, 2_048, 512);
        a.extend(b);
        a
    };

    assert_eq!(run(), run());
}

#[test]
fn reused_slot_carries_no_state_from_the_previous_note() {
    // Play and kill one note, then start another: the second note must
    // render exactly like the same note on a fresh engine.
    let mut first = make_engine();
    first.handle_event(MidiEvent::NoteOn {
        note: 60,
        velocity: 1.0,
    });
    render(&mut first, 1_024, 512);
    first.handle_event(MidiEvent::NoteOff {
        note: 60,
        tail_off: false,
    });
    render(&mut first, 512, 512);
    first.handle_event(MidiEvent::NoteOn {
        note: 72,
        velocity: 0.8,
    });
    let (reused, _) = render(&mut first, 2_048, 512);

    let mut fresh = make_engine();
    fresh.handle_event(MidiEvent::NoteOn {
        note: 72,
        velocity: 0.8,
    });
    let (clean, _) = render(&mut fresh, 2_048, 512);

    assert_eq!(reused, clean);
}

#[test]
fn reset_then_replay_matches_a_fresh_engine() {
    let mut synth = make_engine();
    synth.handle_event(MidiEvent::NoteOn {
        note: 64,
        velocity: 1.0,
    });
    render(&mut synth, 4_096, 512);
    synth.reset();
    synth.handle_event(MidiEvent::NoteOn {
        note: 64,
        velocity: 1.0,
    });
    let (replayed, _) = render(&mut synth, 2_048, 512);

    let mut fresh = make_engine();
    fresh.handle_event(MidiEvent::NoteOn {
        note: 64,
        velocity: 1.0,
    });
    let (clean, _) = render(&mut fresh, 2_048, 512);

    assert_eq!(replayed, clean);
}

#[test]
fn effects_chain_keeps_sounding_after_the_note_ends() {
    let mut synth = make_engine();
    synth.params().delay.enable.set_user_value(1.0);
    synth.params().delay.time.set_user_value(0.1);
    synth.params().delay.mix.set_user_value(100.0);
    synth.params().amp_env.attack.set_user_value(0.0);

    synth.handle_event(MidiEvent::NoteOn {
        note: 69,
        velocity: 1.0,
    });
    render(&mut synth, 2_400, 480);
    synth.handle_event(MidiEvent::NoteOff {
        note: 69,
        tail_off: false,
    });

    // The 100 ms echo of the note's last samples is still in flight.
    let (tail, _) = render(&mut synth, 4_800, 480);
    assert!(peak(&tail) > 0.01, "expected a delay tail");
}
