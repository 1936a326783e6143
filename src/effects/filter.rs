// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::{
    catalog::{FilterKind, FilterParams},
    time::SampleRate,
    traits::prelude::*,
    types::{FrequencyHz, Sample},
};
use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, Default)]
struct BiQuadState {
    z1: f64,
    z2: f64,
}

/// A two-pole, two-zero filter with RBJ cookbook coefficients, processed in
/// transposed direct form II. Each stereo channel keeps its own state.
#[derive(Debug)]
pub struct BiQuadFilter {
    params: FilterParams,
    sample_rate: SampleRate,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    state: [BiQuadState; 2],
}
impl Default for BiQuadFilter {
    fn default() -> Self {
        Self::new_with(FilterParams::default())
    }
}
impl Configurable for BiQuadFilter {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }
}
impl TransformsAudio for BiQuadFilter {
    fn transform_channel(&mut self, channel: usize, input_sample: Sample) -> Sample {
        let state = &mut self.state[channel.min(1)];
        let x = input_sample.0;
        let y = self.b0 * x + state.z1;
        state.z1 = self.b1 * x - self.a1 * y + state.z2;
        state.z2 = self.b2 * x - self.a2 * y;
        Sample(y)
    }
}
#[allow(missing_docs)]
impl BiQuadFilter {
    pub fn new_with(params: FilterParams) -> Self {
        let mut r = Self {
            params,
            sample_rate: Default::default(),
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            state: Default::default(),
        };
        r.update_coefficients();
        r
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn cutoff(&self) -> FrequencyHz {
        self.params.cutoff
    }

    /// Changes the cutoff without clearing the filter's memory, so sweeping it
    /// doesn't click.
    pub fn set_cutoff(&mut self, cutoff: FrequencyHz) {
        if self.params.cutoff != cutoff {
            self.params.cutoff = cutoff;
            self.update_coefficients();
        }
    }

    /// Forgets any signal history.
    pub fn reset(&mut self) {
        self.state = Default::default();
    }

    fn update_coefficients(&mut self) {
        let fs = self.sample_rate.value().max(1) as f64;
        // Stay safely below Nyquist, where the math falls apart.
        let f0 = self.params.cutoff.0.clamp(1.0, fs * 0.49);
        let q = self.params.q.max(0.01);

        let w0 = 2.0 * PI * f0 / fs;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let (b0, b1, b2) = match self.params.kind {
            FilterKind::LowPass => ((1.0 - cos_w0) / 2.0, 1.0 - cos_w0, (1.0 - cos_w0) / 2.0),
            FilterKind::HighPass => ((1.0 + cos_w0) / 2.0, -(1.0 + cos_w0), (1.0 + cos_w0) / 2.0),
            FilterKind::BandPass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::{Oscillator, Waveform};
    use more_asserts::{assert_gt, assert_lt};

    fn rms_through(filter: &mut BiQuadFilter, frequency: f64) -> f64 {
        let mut osc =
            Oscillator::new_with_waveform_and_frequency(Waveform::Sine, FrequencyHz(frequency));
        osc.update_sample_rate(SampleRate::DEFAULT);
        filter.update_sample_rate(SampleRate::DEFAULT);
        let mut sum = 0.0;
        let n = 4410;
        for i in 0..n * 2 {
            osc.tick(1);
            let out = filter.transform_channel(0, Sample::from(osc.value()));
            // Skip the settling period.
            if i >= n {
                sum += out.0 * out.0;
            }
        }
        (sum / n as f64).sqrt()
    }

    #[test]
    fn low_pass_keeps_lows() {
        let mut filter = BiQuadFilter::new_with(FilterParams::new_with(FilterKind::LowPass, 500.0));
        let low = rms_through(&mut filter, 100.0);
        filter.reset();
        let high = rms_through(&mut filter, 8000.0);
        assert_gt!(low, 0.6);
        assert_lt!(high, 0.05);
    }

    #[test]
    fn high_pass_keeps_highs() {
        let mut filter =
            BiQuadFilter::new_with(FilterParams::new_with(FilterKind::HighPass, 5000.0));
        let low = rms_through(&mut filter, 100.0);
        filter.reset();
        let high = rms_through(&mut filter, 12000.0);
        assert_lt!(low, 0.01);
        assert_gt!(high, 0.6);
    }

    #[test]
    fn cutoff_above_nyquist_is_stable() {
        let mut filter = BiQuadFilter::new_with(FilterParams::new_with(FilterKind::LowPass, 1.0));
        filter.update_sample_rate(SampleRate::DEFAULT);
        filter.set_cutoff(FrequencyHz(100000.0));
        for _ in 0..1000 {
            let out = filter.transform_channel(1, Sample(1.0));
            assert!(out.0.is_finite());
        }
    }
}
