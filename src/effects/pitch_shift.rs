// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::{
    time::{SampleRate, Seconds},
    traits::prelude::*,
    types::{Normal, ParameterType, Ratio, Sample},
};
use std::f64::consts::PI;

/// Detunes by sweeping two read heads across a short delay line and
/// crossfading between them. Grainy at large intervals, but the detune amounts
/// we use are a fraction of a semitone.
#[derive(Debug)]
pub struct PitchShifter {
    cents: ParameterType,
    mix: Normal,

    sample_rate: SampleRate,
    window_frames: usize,
    ratio: Ratio,

    channels: [ShifterChannel; 2],
}
impl Default for PitchShifter {
    fn default() -> Self {
        Self::new_with(0.0, Normal::zero())
    }
}
impl Configurable for PitchShifter {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.sample_rate = sample_rate;
        self.window_frames = Self::WINDOW.to_frames(sample_rate).max(2);
        self.channels
            .iter_mut()
            .for_each(|c| c.resize(self.window_frames));
    }
}
impl TransformsAudio for PitchShifter {
    fn transform_channel(&mut self, channel: usize, input_sample: Sample) -> Sample {
        if self.mix.0 == 0.0 {
            return input_sample;
        }
        let shifted =
            self.channels[channel.min(1)].process(input_sample, self.ratio, self.window_frames);
        input_sample * (1.0 - self.mix.0) + shifted * self.mix.0
    }
}
#[allow(missing_docs)]
impl PitchShifter {
    /// The length of the sweep. Longer windows smear transients; shorter ones
    /// add a buzz.
    pub const WINDOW: Seconds = Seconds(0.05);

    pub fn new_with(cents: ParameterType, mix: Normal) -> Self {
        let mut r = Self {
            cents,
            mix,
            sample_rate: Default::default(),
            window_frames: Default::default(),
            ratio: Ratio::from_cents(cents),
            channels: Default::default(),
        };
        r.update_sample_rate(SampleRate::DEFAULT);
        r
    }

    pub fn cents(&self) -> ParameterType {
        self.cents
    }

    pub fn set_cents(&mut self, cents: ParameterType) {
        self.cents = cents;
        self.ratio = Ratio::from_cents(cents);
    }

    pub fn mix(&self) -> Normal {
        self.mix
    }

    pub fn set_mix(&mut self, mix: Normal) {
        self.mix = mix;
    }
}

#[derive(Debug, Default)]
struct ShifterChannel {
    buffer: Vec<f64>,
    write_pointer: usize,
    phase: f64,
}
impl ShifterChannel {
    fn resize(&mut self, window_frames: usize) {
        // Room for the longest tap plus one for interpolation.
        self.buffer = vec![0.0; window_frames + 2];
        self.write_pointer = 0;
        self.phase = 0.0;
    }

    fn read_delayed(&self, delay: f64) -> f64 {
        let len = self.buffer.len() as f64;
        let mut position = self.write_pointer as f64 - delay;
        while position < 0.0 {
            position += len;
        }
        let index = position.floor() as usize % self.buffer.len();
        let next = (index + 1) % self.buffer.len();
        let fraction = position.fract();
        self.buffer[index] * (1.0 - fraction) + self.buffer[next] * fraction
    }

    fn process(&mut self, input: Sample, ratio: Ratio, window_frames: usize) -> Sample {
        if self.buffer.is_empty() {
            return input;
        }
        self.buffer[self.write_pointer] = input.0;

        let window = window_frames as f64;
        let phase_b = (self.phase + 0.5).fract();
        let tap_a = self.read_delayed(self.phase * window);
        let tap_b = self.read_delayed(phase_b * window);
        // Each tap fades out as it wraps around so the jump is inaudible.
        let gain_a = (PI * self.phase).sin();
        let gain_b = (PI * phase_b).sin();
        let output = tap_a * gain_a + tap_b * gain_b;

        // A shrinking delay plays faster (higher); a growing one slower.
        self.phase = (self.phase + (1.0 - ratio.0) / window).rem_euclid(1.0);
        self.write_pointer = (self.write_pointer + 1) % self.buffer.len();
        Sample(output)
    }
}
