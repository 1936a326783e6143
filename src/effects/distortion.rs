// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::{
    traits::prelude::*,
    types::{Normal, Sample},
};

/// Soft-clips the signal through tanh after a gain stage driven by `amount`.
#[derive(Debug)]
pub struct Distortion {
    amount: Normal,
    mix: Normal,
}
impl Default for Distortion {
    fn default() -> Self {
        Self::new_with(Normal::zero(), Normal::zero())
    }
}
impl Configurable for Distortion {}
impl TransformsAudio for Distortion {
    fn transform_channel(&mut self, _channel: usize, input_sample: Sample) -> Sample {
        if self.mix.0 == 0.0 {
            return input_sample;
        }
        let pre_gain = 1.0 + self.amount.0 * 10.0;
        let clipped = Sample((input_sample.0 * pre_gain).tanh());
        input_sample * (1.0 - self.mix.0) + clipped * self.mix.0
    }
}
#[allow(missing_docs)]
impl Distortion {
    pub fn new_with(amount: Normal, mix: Normal) -> Self {
        Self { amount, mix }
    }

    pub fn amount(&self) -> Normal {
        self.amount
    }

    pub fn set_amount(&mut self, amount: Normal) {
        self.amount = amount;
    }

    pub fn mix(&self) -> Normal {
        self.mix
    }

    pub fn set_mix(&mut self, mix: Normal) {
        self.mix = mix;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::{assert_gt, assert_le};

    #[test]
    fn heavier_drive_squares_off_the_wave() {
        let mut light = Distortion::new_with(Normal::from(0.1), Normal::maximum());
        let mut heavy = Distortion::new_with(Normal::from(0.8), Normal::maximum());
        let input = Sample(0.2);
        assert_gt!(
            heavy.transform_channel(0, input).0,
            light.transform_channel(0, input).0
        );
        assert_le!(heavy.transform_channel(0, Sample(1.0)).0, 1.0);
        assert_eq!(
            heavy.transform_channel(0, Sample(-0.2)).0,
            -heavy.transform_channel(0, Sample(0.2)).0
        );
    }

    #[test]
    fn zero_mix_is_transparent() {
        let mut fx = Distortion::new_with(Normal::maximum(), Normal::zero());
        assert_eq!(fx.transform_channel(0, Sample(0.3)), Sample(0.3));
    }
}
