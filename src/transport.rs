// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! The shared loop clock that every pattern is timed against.

use crate::{
    error::SessionError,
    time::{MusicalTime, SampleRate, Seconds, Tempo, TimeRange, TimeSignature},
    traits::Configurable,
};

// Frame and unit arithmetic is done in floating point, but grid positions are
// integral. Pulls values that are within rounding error of an integer onto it.
fn snap(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < 1e-6 {
        rounded
    } else {
        value
    }
}

/// A stretch of musical time covered by part of a rendered block. Knows which
/// frame of the block each moment in its range lands on.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportSpan {
    range: TimeRange,
    first_frame: usize,
    // The musical time at which the window of `first_frame` begins. May be a
    // little before `range.start()` when the span follows a loop wrap.
    phase: f64,
    units_per_frame: f64,
}
impl TransportSpan {
    /// The musical times covered, half-open.
    pub fn range(&self) -> &TimeRange {
        &self.range
    }

    /// The frame within the block during which `time` arrives.
    pub fn frame_for(&self, time: MusicalTime) -> usize {
        let delta = (time.total_units() as f64 - self.phase).max(0.0);
        self.first_frame + snap(delta / self.units_per_frame).floor() as usize
    }
}

/// The session's single clock. All playback is expressed as positions on
/// this clock, so tempo changes retime everything that hasn't happened yet.
#[derive(Debug)]
pub struct Transport {
    tempo: Tempo,
    time_signature: TimeSignature,
    sample_rate: SampleRate,
    loop_bars: usize,
    is_running: bool,

    // Fractional units, so that per-frame rounding doesn't drift.
    position: f64,
    loop_count: usize,
}
impl Default for Transport {
    fn default() -> Self {
        Self::new_with(Tempo::default(), Self::DEFAULT_LOOP_BARS)
    }
}
impl Configurable for Transport {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.sample_rate = sample_rate;
    }

    fn update_tempo(&mut self, tempo: Tempo) {
        if let Err(e) = self.set_bpm(tempo.0) {
            log::warn!("{e}");
        }
    }
}
impl Transport {
    /// The length of the loop unless told otherwise.
    pub const DEFAULT_LOOP_BARS: usize = 4;

    #[allow(missing_docs)]
    pub fn new_with(tempo: Tempo, loop_bars: usize) -> Self {
        let mut r = Self {
            tempo: Tempo::default(),
            time_signature: TimeSignature::default(),
            sample_rate: SampleRate::default(),
            loop_bars: Self::DEFAULT_LOOP_BARS,
            is_running: false,
            position: 0.0,
            loop_count: 0,
        };
        if let Err(e) = r.set_bpm(tempo.0) {
            log::warn!("{e}; using {}", r.tempo);
        }
        r.set_loop_region(loop_bars);
        r
    }

    /// Starts the clock from wherever it is. Does nothing if it's already
    /// running.
    pub fn start(&mut self) {
        if self.is_running {
            return;
        }
        self.is_running = true;
        log::debug!("transport started at {}", self.position());
    }

    /// Stops the clock and rewinds it to the loop start. Does nothing if it's
    /// already stopped.
    pub fn stop(&mut self) {
        if !self.is_running {
            return;
        }
        self.is_running = false;
        self.position = self.loop_start().total_units() as f64;
        self.loop_count = 0;
        log::debug!("transport stopped");
    }

    #[allow(missing_docs)]
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    #[allow(missing_docs)]
    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// Changes the tempo. Only the rate of future time changes; the current
    /// position is untouched.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), SessionError> {
        let tempo = Tempo(bpm);
        if !tempo.is_valid() {
            return Err(SessionError::InvalidTempo(bpm));
        }
        self.tempo = Tempo(bpm.min(Tempo::MAX_VALUE));
        Ok(())
    }

    #[allow(missing_docs)]
    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    #[allow(missing_docs)]
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Makes the loop `bars` bars long, starting at the top. Zero is treated
    /// as one.
    pub fn set_loop_region(&mut self, bars: usize) {
        self.loop_bars = bars.max(1);
        let start = self.loop_start().total_units() as f64;
        let length = self.loop_length().total_units() as f64;
        if self.position >= start + length {
            self.position = start + (self.position - start) % length;
        }
    }

    #[allow(missing_docs)]
    pub fn loop_bars(&self) -> usize {
        self.loop_bars
    }

    #[allow(missing_docs)]
    pub fn loop_start(&self) -> MusicalTime {
        MusicalTime::START
    }

    #[allow(missing_docs)]
    pub fn loop_end(&self) -> MusicalTime {
        self.loop_start() + self.loop_length()
    }

    #[allow(missing_docs)]
    pub fn loop_length(&self) -> MusicalTime {
        MusicalTime::new_with_bars(&self.time_signature, self.loop_bars)
    }

    /// How long one trip around the loop takes at the current tempo.
    pub fn loop_duration(&self) -> Seconds {
        self.loop_length().as_seconds(self.tempo)
    }

    /// The length of one bar at the current tempo.
    pub fn bar_duration(&self) -> Seconds {
        MusicalTime::new_with_bars(&self.time_signature, 1).as_seconds(self.tempo)
    }

    /// The current position, rounded down to the nearest unit.
    pub fn position(&self) -> MusicalTime {
        MusicalTime::new_with_units(self.position.max(0.0).floor() as usize)
    }

    /// The current position in seconds since the loop start.
    pub fn position_seconds(&self) -> Seconds {
        (self.position() - self.loop_start()).as_seconds(self.tempo)
    }

    /// How many times playback has wrapped since it started.
    pub fn loop_count(&self) -> usize {
        self.loop_count
    }

    /// Musical units that pass per rendered frame.
    pub fn units_per_frame(&self) -> f64 {
        MusicalTime::units_per_second(self.tempo) / self.sample_rate.value().max(1) as f64
    }

    /// Moves the clock forward by `frames` and describes the musical time
    /// those frames covered. A wrap at the loop end splits the result into
    /// two spans. A stopped transport covers nothing.
    pub fn advance(&mut self, frames: usize) -> Vec<TransportSpan> {
        let mut spans = Vec::default();
        if !self.is_running || frames == 0 {
            return spans;
        }
        let units_per_frame = self.units_per_frame();
        let loop_start = self.loop_start().total_units() as f64;
        let loop_end = self.loop_end().total_units() as f64;

        let mut first_frame = 0;
        let mut remaining = frames;
        while remaining > 0 {
            let phase = self.position;
            let end = snap(phase + remaining as f64 * units_per_frame);
            if end <= loop_end {
                spans.push(Self::span(phase, end, first_frame, phase, units_per_frame, loop_start));
                self.position = end;
                if self.position >= loop_end {
                    self.wrap(loop_start, loop_end);
                }
                break;
            }

            // The frame whose window contains the loop end. It's split between
            // this trip around the loop and the next one.
            let wrap_frame = snap((loop_end - phase) / units_per_frame).floor() as usize;
            spans.push(Self::span(
                phase,
                loop_end,
                first_frame,
                phase,
                units_per_frame,
                loop_start,
            ));
            self.position = snap(phase + wrap_frame as f64 * units_per_frame);
            self.wrap(loop_start, loop_end);
            first_frame += wrap_frame;
            remaining -= wrap_frame;
        }
        spans
    }

    fn wrap(&mut self, loop_start: f64, loop_end: f64) {
        self.position = loop_start + (self.position - loop_end);
        self.loop_count += 1;
    }

    fn span(
        start: f64,
        end: f64,
        first_frame: usize,
        phase: f64,
        units_per_frame: f64,
        loop_start: f64,
    ) -> TransportSpan {
        let to_time = |units: f64| MusicalTime::new_with_units(units.max(loop_start).ceil() as usize);
        TransportSpan {
            range: TimeRange::new(to_time(start), to_time(end)),
            first_frame,
            phase,
            units_per_frame,
        }
    }
}
