// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::{
    generators::{Oscillator, Waveform},
    time::SampleRate,
    traits::prelude::*,
    types::{FrequencyHz, Normal, Sample, StereoSample},
};

/// Amplitude wobble. At full depth the signal dips all the way to silence
/// once per LFO cycle.
#[derive(Debug)]
pub struct Tremolo {
    lfo: Oscillator,
    depth: Normal,
    gain: f64,
}
impl Default for Tremolo {
    fn default() -> Self {
        Self::new_with(FrequencyHz(4.0), Normal::zero())
    }
}
impl Configurable for Tremolo {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.lfo.update_sample_rate(sample_rate);
    }
}
impl TransformsAudio for Tremolo {
    fn transform_audio(&mut self, input_sample: StereoSample) -> StereoSample {
        self.lfo.tick(1);
        let lfo = Normal::from(self.lfo.value());
        self.gain = 1.0 - self.depth.0 * lfo.0;
        StereoSample(
            self.transform_channel(0, input_sample.0),
            self.transform_channel(1, input_sample.1),
        )
    }

    fn transform_channel(&mut self, _channel: usize, input_sample: Sample) -> Sample {
        input_sample * self.gain
    }
}
#[allow(missing_docs)]
impl Tremolo {
    pub fn new_with(rate: FrequencyHz, depth: Normal) -> Self {
        let mut lfo = Oscillator::new_with_waveform_and_frequency(Waveform::Sine, rate);
        lfo.update_sample_rate(SampleRate::DEFAULT);
        Self {
            lfo,
            depth,
            gain: 1.0,
        }
    }

    pub fn rate(&self) -> FrequencyHz {
        self.lfo.frequency()
    }

    pub fn set_rate(&mut self, rate: FrequencyHz) {
        self.lfo.set_frequency(rate);
    }

    pub fn depth(&self) -> Normal {
        self.depth
    }

    pub fn set_depth(&mut self, depth: Normal) {
        self.depth = depth;
        if depth.0 == 0.0 {
            self.gain = 1.0;
        }
    }
}
