// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::{
    time::{SampleRate, Seconds},
    traits::prelude::*,
    types::{Sample, StereoSample},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// Decoded audio, ready to play. Buffers are shared between every player that
/// uses them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleBuffer {
    frames: Vec<StereoSample>,
    sample_rate: SampleRate,
}
impl SampleBuffer {
    #[allow(missing_docs)]
    pub fn new_with(frames: Vec<StereoSample>, sample_rate: SampleRate) -> Self {
        Self {
            frames,
            sample_rate,
        }
    }

    #[allow(missing_docs)]
    pub fn frames(&self) -> &[StereoSample] {
        &self.frames
    }

    #[allow(missing_docs)]
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[allow(missing_docs)]
    pub fn duration(&self) -> Seconds {
        Seconds(self.frames.len() as f64 / self.sample_rate.value().max(1) as f64)
    }

    /// The sound at `seconds` into the buffer, linearly interpolated between
    /// the neighboring frames. Silence outside the buffer.
    pub fn frame_at(&self, seconds: f64) -> StereoSample {
        if seconds < 0.0 || self.frames.is_empty() {
            return StereoSample::SILENCE;
        }
        let position = seconds * self.sample_rate.value() as f64;
        let index = position.floor() as usize;
        let Some(a) = self.frames.get(index) else {
            return StereoSample::SILENCE;
        };
        let b = self.frames.get(index + 1).copied().unwrap_or(*a);
        let t = position.fract();
        StereoSample(
            Sample(a.0 .0 + (b.0 .0 - a.0 .0) * t),
            Sample(a.1 .0 + (b.1 .0 - a.1 .0) * t),
        )
    }
}

/// Which take of a loop is playing.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    EnumIter,
    Eq,
    IntoStaticStr,
    PartialEq,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Variation {
    /// The primary loop.
    #[default]
    A,
    /// The alternate loop.
    B,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum PlayerState {
    #[default]
    Stopped,
    Playing,
    Stopping,
}

/// Plays a recorded loop over and over, with short fades at the edges so that
/// starting and stopping never click.
#[derive(Debug)]
pub struct LoopPlayer {
    primary: Arc<SampleBuffer>,
    alternate: Option<Arc<SampleBuffer>>,
    variation: Variation,
    loop_start: Seconds,
    loop_end: Seconds,
    sample_rate: SampleRate,

    state: PlayerState,
    // Seconds into the current buffer.
    cursor: f64,
    fade_gain: f64,
    signal: StereoSample,
}
impl Configurable for LoopPlayer {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.sample_rate = sample_rate;
    }
}
impl Ticks for LoopPlayer {
    fn tick(&mut self, tick_count: usize) {
        for _ in 0..tick_count {
            if self.state == PlayerState::Stopped {
                self.signal = StereoSample::SILENCE;
                continue;
            }
            self.signal = self.buffer().frame_at(self.cursor) * self.fade_gain;
            self.step_fade();

            self.cursor += 1.0 / self.sample_rate.value().max(1) as f64;
            if self.cursor >= self.loop_end.0 {
                self.cursor = self.loop_start.0 + (self.cursor - self.loop_end.0);
            }
        }
    }
}
impl Generates<StereoSample> for LoopPlayer {
    fn value(&self) -> StereoSample {
        self.signal
    }
}
impl LoopPlayer {
    /// How long the fade at each edge lasts.
    pub const FADE: Seconds = Seconds(0.005);

    /// `loop_end` of `None` means the buffer's length rounded to the nearest
    /// whole bar (at least one).
    pub fn new_with(
        primary: Arc<SampleBuffer>,
        alternate: Option<Arc<SampleBuffer>>,
        loop_start: Seconds,
        loop_end: Option<Seconds>,
        bar_duration: Seconds,
        sample_rate: SampleRate,
    ) -> Self {
        let loop_start = Seconds(loop_start.0.max(0.0));
        let mut loop_end = loop_end.unwrap_or_else(|| Self::whole_bars(&primary, bar_duration));
        if loop_end.0 <= loop_start.0 {
            log::warn!(
                "loop end {} isn't after loop start {}; looping one bar instead",
                loop_end.0,
                loop_start.0
            );
            loop_end = Seconds(loop_start.0 + bar_duration.0.max(f64::EPSILON));
        }
        Self {
            primary,
            alternate,
            variation: Variation::default(),
            loop_start,
            loop_end,
            sample_rate,
            state: PlayerState::default(),
            cursor: loop_start.0,
            fade_gain: 0.0,
            signal: StereoSample::SILENCE,
        }
    }

    fn whole_bars(buffer: &SampleBuffer, bar_duration: Seconds) -> Seconds {
        if bar_duration.0 <= 0.0 {
            return buffer.duration();
        }
        let bars = (buffer.duration().0 / bar_duration.0).round().max(1.0);
        Seconds(bars * bar_duration.0)
    }

    /// Starts playing (with a fade-in) at `offset` into the loop. Passing the
    /// transport's position keeps the loop in phase with everything else.
    pub fn start_at(&mut self, offset: Seconds) {
        let length = self.loop_length().0;
        self.cursor = self.loop_start.0 + offset.0.max(0.0).rem_euclid(length);
        if self.state == PlayerState::Stopped {
            self.fade_gain = 0.0;
        }
        self.state = PlayerState::Playing;
        if self.fade_frames() == 0 {
            self.fade_gain = 1.0;
        }
    }

    /// Fades out and then goes silent. Does nothing if already stopped.
    pub fn stop(&mut self) {
        match self.state {
            PlayerState::Stopped | PlayerState::Stopping => {}
            PlayerState::Playing => {
                if self.fade_frames() == 0 {
                    self.fade_gain = 0.0;
                    self.state = PlayerState::Stopped;
                } else {
                    self.state = PlayerState::Stopping;
                }
            }
        }
    }

    /// Swaps to the other take, keeping the loop's phase. Returns the
    /// variation now playing, or `None` if there is no alternate take.
    pub fn toggle_variation(&mut self) -> Option<Variation> {
        self.alternate.as_ref()?;
        self.variation = match self.variation {
            Variation::A => Variation::B,
            Variation::B => Variation::A,
        };
        Some(self.variation)
    }

    #[allow(missing_docs)]
    pub fn variation(&self) -> Variation {
        self.variation
    }

    #[allow(missing_docs)]
    pub fn has_alternate(&self) -> bool {
        self.alternate.is_some()
    }

    #[allow(missing_docs)]
    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }

    /// True once a stop has fully faded out (or nothing was ever started).
    pub fn is_stopped(&self) -> bool {
        self.state == PlayerState::Stopped
    }

    #[allow(missing_docs)]
    pub fn loop_start(&self) -> Seconds {
        self.loop_start
    }

    #[allow(missing_docs)]
    pub fn loop_end(&self) -> Seconds {
        self.loop_end
    }

    #[allow(missing_docs)]
    pub fn loop_length(&self) -> Seconds {
        Seconds(self.loop_end.0 - self.loop_start.0)
    }

    fn buffer(&self) -> &SampleBuffer {
        match (self.variation, self.alternate.as_ref()) {
            (Variation::B, Some(alternate)) => alternate,
            _ => &self.primary,
        }
    }

    fn fade_frames(&self) -> usize {
        Self::FADE.to_frames(self.sample_rate)
    }

    fn step_fade(&mut self) {
        let step = 1.0 / self.fade_frames().max(1) as f64;
        match self.state {
            PlayerState::Playing => self.fade_gain = (self.fade_gain + step).min(1.0),
            PlayerState::Stopping => {
                self.fade_gain -= step;
                if self.fade_gain <= 0.0 {
                    self.fade_gain = 0.0;
                    self.state = PlayerState::Stopped;
                }
            }
            PlayerState::Stopped => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use more_asserts::assert_lt;

    // A ramp whose value tells you where in the buffer you are.
    fn ramp(seconds: f64, sample_rate: SampleRate) -> Arc<SampleBuffer> {
        let len = Seconds(seconds).to_frames(sample_rate);
        Arc::new(SampleBuffer::new_with(
            (0..len)
                .map(|i| StereoSample::from(i as f64 / len as f64))
                .collect(),
            sample_rate,
        ))
    }

    fn constant(seconds: f64, value: f64, sample_rate: SampleRate) -> Arc<SampleBuffer> {
        let len = Seconds(seconds).to_frames(sample_rate);
        Arc::new(SampleBuffer::new_with(
            vec![StereoSample::from(value); len],
            sample_rate,
        ))
    }

    #[test]
    fn buffer_interpolates() {
        let buffer = SampleBuffer::new_with(
            vec![StereoSample::from(0.0), StereoSample::from(1.0)],
            SampleRate::new(2),
        );
        assert!(approx_eq!(f64, buffer.duration().0, 1.0));
        assert_eq!(buffer.frame_at(0.0), StereoSample::from(0.0));
        assert!(approx_eq!(f64, buffer.frame_at(0.25).0 .0, 0.5));
        assert_eq!(buffer.frame_at(-1.0), StereoSample::SILENCE);
        assert_eq!(buffer.frame_at(5.0), StereoSample::SILENCE);
    }

    #[test]
    fn loop_end_rounds_to_whole_bars() {
        let sr = SampleRate::new(1000);
        let bar = Seconds(2.0);
        let p = LoopPlayer::new_with(ramp(4.3, sr), None, Seconds(0.0), None, bar, sr);
        assert!(approx_eq!(f64, p.loop_end().0, 4.0));

        let p = LoopPlayer::new_with(ramp(0.4, sr), None, Seconds(0.0), None, bar, sr);
        assert!(approx_eq!(f64, p.loop_end().0, 2.0), "never shorter than a bar");

        let p = LoopPlayer::new_with(ramp(4.3, sr), None, Seconds(0.5), Some(Seconds(3.0)), bar, sr);
        assert!(approx_eq!(f64, p.loop_length().0, 2.5));

        let p = LoopPlayer::new_with(ramp(4.3, sr), None, Seconds(3.0), Some(Seconds(1.0)), bar, sr);
        assert!(approx_eq!(f64, p.loop_length().0, 2.0), "backwards loops get a bar");
    }

    #[test]
    fn fades_in_and_out() {
        let sr = SampleRate::new(1000);
        let mut p = LoopPlayer::new_with(
            constant(2.0, 0.5, sr),
            None,
            Seconds(0.0),
            None,
            Seconds(2.0),
            sr,
        );
        assert!(p.is_stopped());
        p.tick(10);
        assert_eq!(p.value(), StereoSample::SILENCE);

        p.start_at(Seconds(0.0));
        p.tick(1);
        assert_eq!(p.value(), StereoSample::SILENCE, "fade starts from silence");
        p.tick(1);
        assert_lt!(p.value().0 .0, 0.5);
        p.tick(10);
        assert_eq!(p.value(), StereoSample::from(0.5));

        p.stop();
        assert!(!p.is_stopped(), "still fading");
        p.tick(10);
        assert!(p.is_stopped());
        assert_eq!(p.value(), StereoSample::SILENCE);

        p.stop();
        assert!(p.is_stopped());
    }

    #[test]
    fn loops_around_and_stays_in_phase() {
        let sr = SampleRate::new(1000);
        let mut p = LoopPlayer::new_with(ramp(2.0, sr), None, Seconds(0.0), None, Seconds(2.0), sr);
        p.start_at(Seconds(3.5));
        p.tick(10);
        // Started 1.5 s into the two-second loop, so after 10 ms we're at 1.509.
        assert!(approx_eq!(f64, p.value().0 .0, 1509.0 / 2000.0, epsilon = 0.0001));

        p.tick(500);
        // Wrapped to 0.009.
        assert!(approx_eq!(f64, p.value().0 .0, 9.0 / 2000.0, epsilon = 0.0001));
    }

    #[test]
    fn variation_swaps_buffers() {
        let sr = SampleRate::new(1000);
        let mut p = LoopPlayer::new_with(
            constant(2.0, 0.25, sr),
            Some(constant(2.0, 0.75, sr)),
            Seconds(0.0),
            None,
            Seconds(2.0),
            sr,
        );
        p.start_at(Seconds(0.0));
        p.tick(20);
        assert_eq!(p.value(), StereoSample::from(0.25));
        assert_eq!(p.toggle_variation(), Some(Variation::B));
        p.tick(1);
        assert_eq!(p.value(), StereoSample::from(0.75));
        assert!(p.is_playing(), "swapping takes doesn't interrupt playback");
        assert_eq!(p.toggle_variation(), Some(Variation::A));

        let mut solo = LoopPlayer::new_with(
            constant(2.0, 0.25, sr),
            None,
            Seconds(0.0),
            None,
            Seconds(2.0),
            sr,
        );
        assert_eq!(solo.toggle_variation(), None);
        assert_eq!(solo.variation(), Variation::A);
    }
}
