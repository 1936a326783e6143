// Copyright (c) 2023 Mike Tsao. All rights reserved.

use more_asserts::assert_gt;
use std::path::PathBuf;
use wrenchbox::prelude::*;

fn session() -> Session {
    let mut session = Session::new_with(Settings::default(), Box::<SampleBank>::default())
        .expect("default settings are usable");
    session.reseed(42);
    session
}

fn peak(buffer: &[StereoSample]) -> f64 {
    buffer.iter().map(|f| f.peak()).fold(0.0, f64::max)
}

// A single kick starts the loop, and taking it away rewinds and stops it.
#[test]
fn kick_starts_and_stops_the_loop() {
    let mut session = session();
    let events = session.subscribe();

    session.assign(SlotId(0), "kick").unwrap();
    assert!(session.transport().is_running());
    assert_eq!(session.mode(SlotId(0)), Some(SourceMode::Synthesized));

    let mut buffer = vec![StereoSample::SILENCE; 22050];
    session.render(&mut buffer);
    assert_gt!(peak(&buffer), 0.0);
    assert_gt!(session.transport().position(), MusicalTime::START);

    session.remove(SlotId(0)).unwrap();
    assert!(!session.transport().is_running());
    assert_eq!(session.transport().position(), MusicalTime::START);

    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        vec![
            SessionEvent::SlotAssigned {
                slot: SlotId(0),
                sound: "kick".to_string(),
                mode: SourceMode::Synthesized
            },
            SessionEvent::SlotRemoved { slot: SlotId(0) },
        ]
    );
}

#[test]
fn assign_then_remove_leaves_the_slot_as_it_was() {
    let mut session = session();
    for index in 0..session.slot_count() {
        let id = SlotId(index);
        let before = (
            session.slot(id).unwrap().sound().map(str::to_string),
            session.slot(id).unwrap().is_muted(),
            session.mode(id),
        );

        session.assign(id, "lead").unwrap();
        session.toggle_mute(id).unwrap();
        session.toggle_solo(id).unwrap();
        session.remove(id).unwrap();

        let slot = session.slot(id).unwrap();
        assert_eq!(
            (slot.sound().map(str::to_string), slot.is_muted(), slot.mode()),
            before,
            "slot {index}"
        );
        assert!(slot.strip().is_none(), "slot {index}");
        assert_eq!(session.soloed(), None);
        assert!(!session.transport().is_running());
    }
}

// The loop keeps going around for as long as something is assigned.
#[test]
fn loop_wraps_around() {
    let mut settings = Settings::default();
    settings.meta.loop_bars = 1;
    let mut session = Session::new_with(settings, Box::<SampleBank>::default()).unwrap();
    session.assign(SlotId(0), "kick").unwrap();
    session.assign(SlotId(1), "hihat").unwrap();

    let bar = 44100 * 2;
    let mut first = vec![StereoSample::SILENCE; bar];
    let mut second = vec![StereoSample::SILENCE; bar];
    session.render(&mut first);
    session.render(&mut second);
    assert_eq!(session.transport().loop_count(), 2);
    assert_eq!(session.transport().position(), MusicalTime::START);
    assert_gt!(peak(&first), 0.0);
    assert_gt!(peak(&second), 0.0);
}

#[test]
fn solo_silences_everything_else() {
    let mut session = session();
    session.assign(SlotId(0), "kick").unwrap();
    session.assign(SlotId(1), "snare").unwrap();
    session.toggle_solo(SlotId(1)).unwrap();
    assert!(session.is_audible(SlotId(1)));
    assert!(!session.is_audible(SlotId(0)));

    session.toggle_mute(SlotId(1)).unwrap();
    let mut buffer = vec![StereoSample::SILENCE; 44100];
    session.render(&mut buffer);
    assert_eq!(peak(&buffer), 0.0, "the only audible slot is muted");

    session.toggle_solo(SlotId(1)).unwrap();
    assert!(session.is_audible(SlotId(0)));
}

fn write_loop(path: &PathBuf, seconds: f64) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..(44100.0 * seconds) as usize {
        writer.write_sample(8000i16).unwrap();
    }
    writer.finalize().unwrap();
}

// A sound with a recording plays it; without the recording, or with samples
// turned off, the same sound is synthesized.
#[test]
fn recordings_are_preferred_when_they_load() {
    let dir = std::env::temp_dir().join(format!("wrenchbox-looping-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    write_loop(&dir.join("drone.wav"), 2.0);

    let json = r#"{
        "meta": {"loop-bars": 1},
        "sounds": {
            "drone": {"category": "melodies", "pattern": ["A3"], "samples": {"primary": "drone.wav"}},
            "ghost": {"category": "melodies", "pattern": ["A3"], "samples": {"primary": "missing.wav"}}
        }
    }"#;
    let settings = Settings::from_json_str(json).unwrap();
    let bank = SampleBank::load(settings.catalog().iter(), &dir);
    assert!(bank.failed().contains(&"ghost".to_string()));
    assert!(!bank.failed().contains(&"drone".to_string()));

    let mut session = Session::new_with(settings.clone(), Box::new(bank)).unwrap();
    session.assign(SlotId(0), "drone").unwrap();
    session.assign(SlotId(1), "ghost").unwrap();
    assert_eq!(session.mode(SlotId(0)), Some(SourceMode::Sample));
    assert_eq!(session.mode(SlotId(1)), Some(SourceMode::Synthesized));

    session.toggle_mute(SlotId(1)).unwrap();
    let mut buffer = vec![StereoSample::SILENCE; 4410];
    session.render(&mut buffer);
    assert_gt!(peak(&buffer[1000..]), 0.1, "the recording is playing");

    let mut settings = settings;
    settings.audio.allow_samples = false;
    let bank = SampleBank::load(settings.catalog().iter(), &dir);
    let mut session = Session::new_with(settings, Box::new(bank)).unwrap();
    session.assign(SlotId(0), "drone").unwrap();
    assert_eq!(session.mode(SlotId(0)), Some(SourceMode::Synthesized));

    let _ = std::fs::remove_dir_all(&dir);
}

// The built-in sounds find their recordings in the sample directory without
// any settings document.
#[test]
fn built_in_sounds_use_recordings_from_the_sample_dir() {
    let dir = std::env::temp_dir().join(format!("wrenchbox-builtin-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    write_loop(&dir.join("kick.wav"), 2.0);
    write_loop(&dir.join("kick_b.wav"), 2.0);

    let mut settings = Settings::default();
    settings.audio.sample_dir = dir.clone();
    let bank = SampleBank::load(settings.catalog().iter(), &settings.audio.sample_dir);
    assert!(bank.has_sample("kick"));
    assert!(bank.failed().contains(&"snare".to_string()));
    assert!(!bank.failed().contains(&"kick".to_string()));

    let mut session = Session::new_with(settings, Box::new(bank)).unwrap();
    session.assign(SlotId(0), "kick").unwrap();
    session.assign(SlotId(1), "snare").unwrap();
    assert_eq!(session.mode(SlotId(0)), Some(SourceMode::Sample));
    assert_eq!(session.mode(SlotId(1)), Some(SourceMode::Synthesized));
    assert_eq!(session.toggle_variation(SlotId(0)), Ok(Some(Variation::B)));
    assert_eq!(session.toggle_variation(SlotId(1)), Ok(None));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn replaced_sounds_fade_out() {
    let mut session = session();
    session.assign(SlotId(0), "bass").unwrap();
    let mut buffer = vec![StereoSample::SILENCE; 2000];
    session.render(&mut buffer);

    session.assign(SlotId(0), "lead").unwrap();
    assert_eq!(session.slot(SlotId(0)).unwrap().sound(), Some("lead"));
    assert_eq!(session.releasing_count(), 1);

    let mut buffer = vec![StereoSample::SILENCE; 44100];
    session.render(&mut buffer);
    assert_eq!(session.releasing_count(), 0);
}
