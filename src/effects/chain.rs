// Copyright (c) 2023 Mike Tsao. All rights reserved.

use super::{
    bitcrusher::Bitcrusher, distortion::Distortion, frequency_shifter::FrequencyShifter,
    pitch_shift::PitchShifter, tremolo::Tremolo,
};
use crate::{
    corruption::Tier,
    rng::Rng,
    time::SampleRate,
    traits::prelude::*,
    types::{FrequencyHz, Normal, ParameterType, StereoSample},
};

/// A complete set of [EffectChain] settings. These are always replaced
/// wholesale; nothing carries over from the previous tier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectParams {
    #[allow(missing_docs)]
    pub detune_cents: ParameterType,
    #[allow(missing_docs)]
    pub pitch_mix: Normal,
    #[allow(missing_docs)]
    pub bits: u8,
    #[allow(missing_docs)]
    pub crush_mix: Normal,
    #[allow(missing_docs)]
    pub shift_frequency: FrequencyHz,
    #[allow(missing_docs)]
    pub shift_mix: Normal,
    #[allow(missing_docs)]
    pub distortion: Normal,
    #[allow(missing_docs)]
    pub distortion_mix: Normal,
    #[allow(missing_docs)]
    pub tremolo_rate: FrequencyHz,
    #[allow(missing_docs)]
    pub tremolo_depth: Normal,
}
impl Default for EffectParams {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}
impl EffectParams {
    /// Every stage off.
    pub const TRANSPARENT: EffectParams = EffectParams {
        detune_cents: 0.0,
        pitch_mix: Normal::zero(),
        bits: Bitcrusher::TRANSPARENT_BITS,
        crush_mix: Normal::zero(),
        shift_frequency: FrequencyHz(0.0),
        shift_mix: Normal::zero(),
        distortion: Normal::zero(),
        distortion_mix: Normal::zero(),
        tremolo_rate: FrequencyHz(0.0),
        tremolo_depth: Normal::zero(),
    };

    /// How far a level has progressed through its tier, 0.0..1.0.
    pub fn intensity(level: u8) -> f64 {
        (level % 25) as f64 / 25.0
    }

    /// The settings for a slot at the given tier and level. Some parameters
    /// are randomized, which is why this needs an [Rng].
    pub fn for_tier(tier: Tier, level: u8, rng: &mut Rng) -> Self {
        let i = Self::intensity(level);
        match tier {
            Tier::None => Self::TRANSPARENT,
            Tier::Low => Self {
                detune_cents: rng.rand_bipolar() * 10.0 * i,
                pitch_mix: Normal::from(0.3 + i * 0.3),
                tremolo_rate: FrequencyHz(2.0 + i * 2.0),
                tremolo_depth: Normal::from(0.1 + i * 0.1),
                ..Self::TRANSPARENT
            },
            Tier::Medium => Self {
                detune_cents: rng.rand_bipolar() * 20.0,
                pitch_mix: Normal::from(0.6),
                bits: 12 - (i * 4.0).floor() as u8,
                crush_mix: Normal::from(0.3 + i * 0.3),
                tremolo_rate: FrequencyHz(4.0 + i * 4.0),
                tremolo_depth: Normal::from(0.2 + i * 0.2),
                ..Self::TRANSPARENT
            },
            Tier::High => Self {
                detune_cents: rng.rand_bipolar() * 30.0,
                pitch_mix: Normal::from(0.8),
                bits: 8 - (i * 2.0).floor() as u8,
                crush_mix: Normal::from(0.6),
                shift_frequency: FrequencyHz(20.0 + i * 20.0),
                shift_mix: Normal::maximum(),
                distortion: Normal::from(0.3 + i * 0.3),
                distortion_mix: Normal::from(0.5),
                tremolo_rate: FrequencyHz(8.0 + i * 8.0),
                tremolo_depth: Normal::from(0.4 + i * 0.2),
            },
            Tier::Full => Self {
                detune_cents: rng.rand_bipolar() * 50.0,
                pitch_mix: Normal::maximum(),
                bits: 4,
                crush_mix: Normal::from(0.8),
                shift_frequency: FrequencyHz(30.0 + rng.rand_float() * 20.0),
                shift_mix: Normal::maximum(),
                distortion: Normal::from(0.8),
                distortion_mix: Normal::from(0.7),
                tremolo_rate: FrequencyHz(12.0 + rng.rand_float() * 8.0),
                tremolo_depth: Normal::from(0.6),
            },
        }
    }
}

/// A slot's private chain of corruption effects. Stages run in a fixed order:
/// detune, bit crush, frequency shift, distortion, tremolo.
#[derive(Debug, Default)]
pub struct EffectChain {
    params: EffectParams,

    pitch: PitchShifter,
    crusher: Bitcrusher,
    shifter: FrequencyShifter,
    distortion: Distortion,
    tremolo: Tremolo,
}
impl Configurable for EffectChain {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.pitch.update_sample_rate(sample_rate);
        self.crusher.update_sample_rate(sample_rate);
        self.shifter.update_sample_rate(sample_rate);
        self.distortion.update_sample_rate(sample_rate);
        self.tremolo.update_sample_rate(sample_rate);
    }
}
impl TransformsAudio for EffectChain {
    fn transform_audio(&mut self, input_sample: StereoSample) -> StereoSample {
        if self.is_transparent() {
            return input_sample;
        }
        let s = self.pitch.transform_audio(input_sample);
        let s = self.crusher.transform_audio(s);
        let s = self.shifter.transform_audio(s);
        let s = self.distortion.transform_audio(s);
        self.tremolo.transform_audio(s)
    }
}
impl EffectChain {
    #[allow(missing_docs)]
    pub fn new_with(sample_rate: SampleRate) -> Self {
        let mut r = Self::default();
        r.update_sample_rate(sample_rate);
        r
    }

    /// The settings currently in force.
    pub fn params(&self) -> &EffectParams {
        &self.params
    }

    /// Replaces every stage's settings.
    pub fn apply(&mut self, params: EffectParams) {
        self.params = params;
        self.pitch.set_cents(params.detune_cents);
        self.pitch.set_mix(params.pitch_mix);
        self.crusher.set_bits(params.bits);
        self.crusher.set_mix(params.crush_mix);
        self.shifter.set_frequency(params.shift_frequency);
        self.shifter.set_mix(params.shift_mix);
        self.distortion.set_amount(params.distortion);
        self.distortion.set_mix(params.distortion_mix);
        self.tremolo.set_rate(params.tremolo_rate);
        self.tremolo.set_depth(params.tremolo_depth);
    }

    /// Derives and applies the settings for a corruption tier and level.
    pub fn apply_tier(&mut self, tier: Tier, level: u8, rng: &mut Rng) {
        self.apply(EffectParams::for_tier(tier, level, rng));
    }

    /// Zeroes every stage.
    pub fn reset(&mut self) {
        self.apply(EffectParams::TRANSPARENT);
    }

    /// True when every stage is switched off.
    pub fn is_transparent(&self) -> bool {
        let p = &self.params;
        p.pitch_mix.0 == 0.0
            && p.crush_mix.0 == 0.0
            && p.shift_mix.0 == 0.0
            && p.distortion_mix.0 == 0.0
            && p.tremolo_depth.0 == 0.0
    }
}
