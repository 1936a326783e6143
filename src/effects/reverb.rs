// Copyright (c) 2023 Mike Tsao. All rights reserved.

use super::delay::{AllPassDelayLine, Delays, RecirculatingDelayLine};
use crate::{
    time::{SampleRate, Seconds},
    traits::prelude::*,
    types::{Normal, Sample},
};

/// Schroeder reverb. Uses four parallel recirculating delay lines feeding into
/// a series of two all-pass delay lines. `wet` blends the tail with the dry
/// input, so a wet of zero passes the input through untouched.
#[derive(Debug)]
pub struct Reverb {
    /// How much the effect should attenuate the input before it enters the
    /// delay network.
    attenuation: Normal,

    seconds: Seconds,

    wet: Normal,

    sample_rate: SampleRate,

    channels: [ReverbChannel; 2],
}
impl Default for Reverb {
    fn default() -> Self {
        Self::new_with(Normal::new_const(0.5), Seconds(1.5), Normal::zero())
    }
}
impl Configurable for Reverb {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.sample_rate = sample_rate;
        self.channels[0].update_sample_rate(sample_rate);
        self.channels[1].update_sample_rate(sample_rate);
    }
}
impl TransformsAudio for Reverb {
    fn transform_channel(&mut self, channel: usize, input_sample: Sample) -> Sample {
        // The network keeps running even when dry so that raising the wet
        // level brings in a tail that's already been building.
        let tail = self.channels[channel.min(1)].transform_channel(channel, input_sample);
        input_sample * (1.0 - self.wet.0) + tail * self.wet.0
    }
}
#[allow(missing_docs)]
impl Reverb {
    pub fn new_with(attenuation: Normal, seconds: Seconds, wet: Normal) -> Self {
        Self {
            attenuation,
            seconds,
            wet,
            sample_rate: Default::default(),
            channels: [
                ReverbChannel::new_with(attenuation, seconds),
                ReverbChannel::new_with(attenuation, seconds),
            ],
        }
    }

    pub fn attenuation(&self) -> Normal {
        self.attenuation
    }

    pub fn set_attenuation(&mut self, attenuation: Normal) {
        self.attenuation = attenuation;
        self.channels
            .iter_mut()
            .for_each(|c| c.set_attenuation(attenuation));
    }

    pub fn seconds(&self) -> Seconds {
        self.seconds
    }

    pub fn set_seconds(&mut self, seconds: Seconds) {
        self.seconds = seconds;
        let sample_rate = self.sample_rate;
        self.channels.iter_mut().for_each(|c| {
            c.set_seconds(seconds);
            c.update_sample_rate(sample_rate);
        });
    }

    pub fn wet(&self) -> Normal {
        self.wet
    }

    pub fn set_wet(&mut self, wet: Normal) {
        self.wet = wet;
    }
}

#[derive(Debug, Default)]
struct ReverbChannel {
    attenuation: Normal,

    recirc_delay_lines: Vec<RecirculatingDelayLine>,
    allpass_delay_lines: Vec<AllPassDelayLine>,
}
impl TransformsAudio for ReverbChannel {
    fn transform_channel(&mut self, _channel: usize, input_sample: Sample) -> Sample {
        let input_attenuated = input_sample * self.attenuation.0;
        let recirc_output = self
            .recirc_delay_lines
            .iter_mut()
            .fold(Sample::SILENCE, |acc, line| {
                acc + line.pop_output(input_attenuated)
            });
        self.allpass_delay_lines
            .iter_mut()
            .fold(recirc_output, |signal, line| line.pop_output(signal))
    }
}
impl Configurable for ReverbChannel {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.recirc_delay_lines
            .iter_mut()
            .for_each(|r| r.update_sample_rate(sample_rate));
        self.allpass_delay_lines
            .iter_mut()
            .for_each(|r| r.update_sample_rate(sample_rate));
    }
}
impl ReverbChannel {
    // Thanks to https://basicsynth.com/ (page 133 of paperback) for
    // constants.
    const RECIRC_DELAYS: [f64; 4] = [0.0297, 0.0371, 0.0411, 0.0437];
    const ALLPASS_DELAYS: [(f64, f64); 2] = [(0.09683, 0.0050), (0.03292, 0.0017)];

    fn new_with(attenuation: Normal, seconds: Seconds) -> Self {
        Self {
            attenuation,
            recirc_delay_lines: Self::instantiate_recirc_delay_lines(seconds),
            allpass_delay_lines: Self::instantiate_allpass_delay_lines(),
        }
    }

    fn set_attenuation(&mut self, attenuation: Normal) {
        self.attenuation = attenuation;
    }

    fn set_seconds(&mut self, seconds: Seconds) {
        self.recirc_delay_lines = Self::instantiate_recirc_delay_lines(seconds);
    }

    fn instantiate_recirc_delay_lines(seconds: Seconds) -> Vec<RecirculatingDelayLine> {
        Self::RECIRC_DELAYS
            .iter()
            .map(|delay| {
                RecirculatingDelayLine::new_with(
                    Seconds(*delay),
                    seconds,
                    Normal::from(0.001),
                    Normal::from(1.0),
                )
            })
            .collect()
    }

    fn instantiate_allpass_delay_lines() -> Vec<AllPassDelayLine> {
        Self::ALLPASS_DELAYS
            .iter()
            .map(|(delay, decay)| {
                AllPassDelayLine::new_with(
                    Seconds(*delay),
                    Seconds(*decay),
                    Normal::from(0.001),
                    Normal::from(1.0),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverb_does_anything_at_all() {
        // There isn't a programmatic way to prove that reverb sounds right, so
        // this just checks that an impulse eventually comes back.
        let mut fx = Reverb::new_with(Normal::from(0.9), Seconds(0.5), Normal::maximum());
        fx.update_sample_rate(SampleRate::DEFAULT);
        assert_eq!(fx.transform_channel(0, Sample::from(0.8)), Sample::SILENCE);
        let mut s = Sample::default();
        for _ in 0..SampleRate::DEFAULT_SAMPLE_RATE {
            s += fx.transform_channel(0, Sample::SILENCE);
        }
        assert!(s != Sample::SILENCE);
    }

    #[test]
    fn dry_reverb_is_transparent() {
        let mut fx = Reverb::new_with(Normal::from(0.9), Seconds(4.0), Normal::zero());
        fx.update_sample_rate(SampleRate::DEFAULT);
        for i in 0..1000 {
            let input = Sample((i as f64 * 0.01).sin());
            assert_eq!(fx.transform_channel(1, input), input);
        }
    }
}
