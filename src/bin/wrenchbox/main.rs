// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! `wrenchbox` fills slots with sounds, runs the loop for a while, and writes
//! what it heard to a WAV file. With the `audio` feature it can also play
//! through the default output device.

use anyhow::anyhow;
use clap::Parser;
use crossbeam_channel::Receiver;
use std::{path::PathBuf, time::Duration};
use wrenchbox::prelude::*;

#[derive(Parser, Debug)]
#[clap(author, about, long_about = None)]
struct Args {
    /// Settings file (JSON). Built-in defaults are used without one.
    #[clap(short = 's', long, value_parser)]
    settings: Option<PathBuf>,

    /// Put a sound in a slot, as SLOT=SOUND. May be repeated.
    #[clap(short = 'a', long = "assign", value_parser = parse_assignment)]
    assignments: Vec<(SlotId, String)>,

    /// How long to run the loop
    #[clap(long, default_value_t = 8.0, value_parser = parse_seconds)]
    seconds: f64,

    /// Seed for the corruption spread
    #[clap(long)]
    seed: Option<u128>,

    /// Cure the corruption this many seconds in
    #[clap(long, value_parser = parse_seconds)]
    cure_at: Option<f64>,

    /// How much each cure removes
    #[clap(long, default_value_t = Session::UI_CURE_AMOUNT)]
    cure_amount: u8,

    /// Write the render to this WAV file
    #[clap(short = 'o', long, value_parser)]
    output: Option<PathBuf>,

    /// List the available sounds and exit
    #[clap(short = 'l', long)]
    list: bool,

    /// Play through the default audio device instead of rendering offline
    #[cfg(feature = "audio")]
    #[clap(short = 'p', long)]
    play: bool,
}

// Anything that can't become a Duration is turned away here.
fn parse_seconds(s: &str) -> Result<f64, String> {
    let seconds = s
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad number of seconds '{s}': {e}"))?;
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| format!("'{s}' isn't a usable number of seconds: {e}"))?;
    Ok(seconds)
}

fn parse_assignment(s: &str) -> Result<(SlotId, String), String> {
    let (slot, sound) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SLOT=SOUND, got '{s}'"))?;
    let slot = slot
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("bad slot '{slot}': {e}"))?;
    let sound = sound.trim();
    if sound.is_empty() {
        return Err(format!("no sound named for slot {slot}"));
    }
    Ok((SlotId(slot), sound.to_string()))
}

/// Renders blocks and keeps the session's timers in step with them.
struct Performance {
    session: Session,
    events: Receiver<SessionEvent>,
    cure_at: Option<Duration>,
    cure_amount: u8,
    elapsed: Duration,
}
impl Performance {
    const BLOCK_SIZE: usize = 512;

    fn new_with(session: Session, cure_at: Option<f64>, cure_amount: u8) -> Self {
        let events = session.subscribe();
        Self {
            session,
            events,
            cure_at: cure_at.map(Duration::from_secs_f64),
            cure_amount,
            elapsed: Duration::ZERO,
        }
    }

    fn render(&mut self, buffer: &mut [StereoSample]) {
        self.session.render(buffer);
        let block = Duration::from_secs_f64(
            buffer.len() as f64 / self.session.sample_rate().value() as f64,
        );
        self.elapsed += block;
        self.session.advance(block);
        if self.cure_at.is_some_and(|at| self.elapsed >= at) {
            self.cure_at = None;
            log::info!("curing {} at {:?}", self.cure_amount, self.elapsed);
            self.session.cure(self.cure_amount);
        }
        self.report();
    }

    fn report(&self) {
        for event in self.events.try_iter() {
            match event {
                SessionEvent::HorrorModeStarted { cursed_slot } => {
                    log::warn!("horror mode started from slot {cursed_slot}")
                }
                SessionEvent::HorrorModeEnded => log::warn!("horror mode ended"),
                event => log::info!("{event:?}"),
            }
        }
    }

    fn render_to_file(&mut self, path: &PathBuf, seconds: f64) -> anyhow::Result<()> {
        let sample_rate = self.session.sample_rate();
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: sample_rate.value() as u32,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        let mut remaining = Seconds(seconds).to_frames(sample_rate);
        let mut buffer = [StereoSample::SILENCE; Self::BLOCK_SIZE];
        while remaining > 0 {
            let frames = remaining.min(Self::BLOCK_SIZE);
            let block = &mut buffer[..frames];
            self.render(block);
            for sample in block.iter() {
                let (left, right) = sample.into_i16();
                writer.write_sample(left)?;
                writer.write_sample(right)?;
            }
            remaining -= frames;
        }
        writer.finalize()?;
        log::info!("wrote {}", path.display());
        Ok(())
    }

    #[cfg(feature = "audio")]
    fn play(&mut self, seconds: f64) -> anyhow::Result<()> {
        use std::sync::Arc;
        use wrenchbox::services::prelude::*;

        let service = AudioService::new_with(AudioService::SUGGESTED_PERIOD_SIZE)?;
        if service.sample_rate() != self.session.sample_rate() {
            log::warn!(
                "device runs at {} Hz but the session renders at {} Hz",
                service.sample_rate().value(),
                self.session.sample_rate().value()
            );
        }
        let deadline = Duration::from_secs_f64(seconds);
        while self.elapsed < deadline {
            match service.receiver().recv_timeout(Duration::from_secs(1)) {
                Ok(AudioServiceEvent::FramesNeeded(count)) => {
                    let mut frames = vec![StereoSample::SILENCE; count];
                    self.render(&mut frames);
                    service.send_input(AudioServiceInput::Frames(Arc::new(frames)));
                }
                Ok(AudioServiceEvent::Reset(sample_rate, channel_count)) => {
                    log::info!(
                        "audio device ready: {} Hz, {channel_count} channels",
                        sample_rate.value()
                    );
                }
                Ok(AudioServiceEvent::Underrun) => log::debug!("underrun"),
                Err(e) => return Err(anyhow!("audio device stopped asking for frames: {e}")),
            }
        }
        service.send_input(AudioServiceInput::Quit);
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let settings = match args.settings.as_ref() {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let catalog = settings.catalog();

    if args.list {
        for sound in catalog.iter() {
            println!(
                "{:<12} {:<10} {}",
                sound.name(),
                sound.category(),
                if sound.is_cursed() { "cursed" } else { "" }
            );
        }
        return Ok(());
    }

    let library = if settings.audio.allow_samples {
        SampleBank::load(catalog.iter(), &settings.audio.sample_dir)
    } else {
        SampleBank::default()
    };
    let mut session = Session::new_with(settings, Box::new(library))?;
    if let Some(seed) = args.seed {
        session.reseed(seed);
    }
    for (slot, sound) in args.assignments.iter() {
        session
            .assign(*slot, sound)
            .map_err(|e| anyhow!("can't put '{sound}' in slot {slot}: {e}"))?;
    }
    if session.slots().iter().all(|slot| !slot.is_active()) {
        log::warn!("no slots assigned; the render will be silent");
    }

    let mut performance = Performance::new_with(session, args.cure_at, args.cure_amount);

    #[cfg(feature = "audio")]
    if args.play {
        return performance.play(args.seconds);
    }

    let output = args
        .output
        .ok_or_else(|| anyhow!("nothing to do; pass --output (or --list)"))?;
    performance.render_to_file(&output, args.seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_parse() {
        assert_eq!(
            parse_assignment("3=kick"),
            Ok((SlotId(3), "kick".to_string()))
        );
        assert_eq!(
            parse_assignment(" 0 = hihat "),
            Ok((SlotId(0), "hihat".to_string()))
        );
        assert!(parse_assignment("kick").is_err());
        assert!(parse_assignment("x=kick").is_err());
        assert!(parse_assignment("2=").is_err());
    }

    #[test]
    fn seconds_must_be_finite_and_not_negative() {
        assert_eq!(parse_seconds("0"), Ok(0.0));
        assert_eq!(parse_seconds(" 2.5 "), Ok(2.5));
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("NaN").is_err());
        assert!(parse_seconds("inf").is_err());
        assert!(parse_seconds("1e300").is_err());
        assert!(parse_seconds("soon").is_err());
    }

    #[test]
    fn bad_times_are_rejected_before_anything_runs() {
        assert!(Args::try_parse_from(["wrenchbox", "--cure-at=-1", "-o", "out.wav"]).is_err());
        assert!(Args::try_parse_from(["wrenchbox", "--seconds", "NaN"]).is_err());

        let args = Args::try_parse_from(["wrenchbox", "--cure-at", "4", "-a", "0=kick"]).unwrap();
        assert_eq!(args.cure_at, Some(4.0));
        assert_eq!(args.seconds, 8.0);
        assert_eq!(args.assignments, vec![(SlotId(0), "kick".to_string())]);
    }
}
