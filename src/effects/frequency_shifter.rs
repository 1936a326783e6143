// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::{
    generators::{Oscillator, Waveform},
    time::SampleRate,
    traits::prelude::*,
    types::{FrequencyHz, Normal, Sample, StereoSample},
};

/// Multiplies the signal by a low-frequency carrier. At a few tens of hertz
/// this is the metallic, warbling "wrongness" of a ring modulator.
#[derive(Debug)]
pub struct FrequencyShifter {
    carrier: Oscillator,
    mix: Normal,

    // Both channels must see the same carrier value, so it advances once per
    // stereo frame.
    current: f64,
}
impl Default for FrequencyShifter {
    fn default() -> Self {
        Self::new_with(FrequencyHz::zero(), Normal::zero())
    }
}
impl Configurable for FrequencyShifter {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.carrier.update_sample_rate(sample_rate);
    }
}
impl TransformsAudio for FrequencyShifter {
    fn transform_audio(&mut self, input_sample: StereoSample) -> StereoSample {
        self.carrier.tick(1);
        self.current = self.carrier.value().0;
        StereoSample(
            self.transform_channel(0, input_sample.0),
            self.transform_channel(1, input_sample.1),
        )
    }

    fn transform_channel(&mut self, _channel: usize, input_sample: Sample) -> Sample {
        if self.mix.0 == 0.0 || self.carrier.frequency().0 == 0.0 {
            return input_sample;
        }
        let modulated = input_sample * self.current;
        input_sample * (1.0 - self.mix.0) + modulated * self.mix.0
    }
}
#[allow(missing_docs)]
impl FrequencyShifter {
    pub fn new_with(frequency: FrequencyHz, mix: Normal) -> Self {
        let mut carrier = Oscillator::new_with_waveform_and_frequency(Waveform::Sine, frequency);
        carrier.update_sample_rate(SampleRate::DEFAULT);
        Self {
            carrier,
            mix,
            current: 0.0,
        }
    }

    pub fn frequency(&self) -> FrequencyHz {
        self.carrier.frequency()
    }

    pub fn set_frequency(&mut self, frequency: FrequencyHz) {
        self.carrier.set_frequency(frequency);
    }

    pub fn mix(&self) -> Normal {
        self.mix
    }

    pub fn set_mix(&mut self, mix: Normal) {
        self.mix = mix;
    }
}
