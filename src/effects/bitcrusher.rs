// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::{
    traits::prelude::*,
    types::{Normal, Sample, SampleType},
};

/// Reduces the bit depth of the signal. It doesn't simulate sample-rate
/// reduction.
#[derive(Debug)]
pub struct Bitcrusher {
    /// The number of bits to preserve
    bits: u8,

    /// How much of the crushed signal replaces the input.
    mix: Normal,

    /// A cached quantization step size derived from `bits`.
    c: SampleType,
}
impl Default for Bitcrusher {
    fn default() -> Self {
        Self::new_with(Self::TRANSPARENT_BITS, Normal::zero())
    }
}
impl TransformsAudio for Bitcrusher {
    fn transform_channel(&mut self, _channel: usize, input_sample: Sample) -> Sample {
        if self.mix.0 == 0.0 {
            return input_sample;
        }
        const I16_SCALE: SampleType = i16::MAX as SampleType;
        let sign = input_sample.0.signum();
        let input = (input_sample * I16_SCALE).0.abs();
        let crushed = ((input / self.c).floor() * self.c / I16_SCALE) * sign;
        Sample(input_sample.0 * (1.0 - self.mix.0) + crushed * self.mix.0)
    }
}
impl Configurable for Bitcrusher {}
#[allow(missing_docs)]
impl Bitcrusher {
    /// At this depth the crusher is as clean as the 16-bit output.
    pub const TRANSPARENT_BITS: u8 = 16;

    pub fn new_with(bits: u8, mix: Normal) -> Self {
        let mut r = Self {
            bits,
            mix,
            c: Default::default(),
        };
        r.update_c();
        r
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn set_bits(&mut self, n: u8) {
        self.bits = n.clamp(*Self::bits_range().start(), *Self::bits_range().end());
        self.update_c();
    }

    pub fn mix(&self) -> Normal {
        self.mix
    }

    pub fn set_mix(&mut self, mix: Normal) {
        self.mix = mix;
    }

    fn update_c(&mut self) {
        self.c = 2.0f64.powi(Self::TRANSPARENT_BITS.saturating_sub(self.bits) as i32);
    }

    pub fn bits_range() -> std::ops::RangeInclusive<u8> {
        1..=16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const CRUSHED_PI: SampleType = 0.14062929166539506;

    #[test]
    fn bitcrusher_basic() {
        let mut fx = Bitcrusher::new_with(8, Normal::maximum());
        assert_eq!(
            fx.transform_channel(0, Sample(PI - 3.0)),
            Sample(CRUSHED_PI)
        );
    }

    #[test]
    fn bitcrusher_no_bias() {
        let mut fx = Bitcrusher::new_with(8, Normal::maximum());
        assert_eq!(
            fx.transform_channel(0, Sample(-(PI - 3.0))),
            Sample(-CRUSHED_PI)
        );
    }

    #[test]
    fn zero_mix_is_transparent() {
        let mut fx = Bitcrusher::new_with(4, Normal::zero());
        assert_eq!(fx.transform_channel(0, Sample(PI - 3.0)), Sample(PI - 3.0));
    }

    #[test]
    fn fewer_bits_means_coarser_steps() {
        let mut coarse = Bitcrusher::new_with(4, Normal::maximum());
        let mut fine = Bitcrusher::new_with(12, Normal::maximum());
        let input = Sample(0.3);
        let coarse_error = (coarse.transform_channel(0, input).0 - 0.3).abs();
        let fine_error = (fine.transform_channel(0, input).0 - 0.3).abs();
        assert!(coarse_error > fine_error);

        coarse.set_bits(0);
        assert_eq!(coarse.bits(), 1, "bit depth should clamp to its range");
    }
}
