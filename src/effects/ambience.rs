// Copyright (c) 2023 Mike Tsao. All rights reserved.

use super::{filter::BiQuadFilter, reverb::Reverb};
use crate::{
    catalog::{FilterKind, FilterParams},
    time::{SampleRate, Seconds},
    traits::prelude::*,
    types::{FrequencyHz, Normal, StereoSample},
};

/// The master-bus stage shared by every slot. Driven by the highest
/// corruption level anywhere, so the whole mix darkens as corruption spreads.
#[derive(Debug)]
pub struct GlobalAmbience {
    reverb: Reverb,
    lowpass: BiQuadFilter,
    level: u8,
}
impl Default for GlobalAmbience {
    fn default() -> Self {
        Self {
            reverb: Reverb::new_with(Normal::new_const(0.5), Self::DECAY, Normal::zero()),
            lowpass: BiQuadFilter::new_with(FilterParams {
                kind: FilterKind::LowPass,
                cutoff: FrequencyHz::AUDIBLE_MAX,
                ..Default::default()
            }),
            level: 0,
        }
    }
}
impl Configurable for GlobalAmbience {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.reverb.update_sample_rate(sample_rate);
        self.lowpass.update_sample_rate(sample_rate);
    }
}
impl TransformsAudio for GlobalAmbience {
    fn transform_audio(&mut self, input_sample: StereoSample) -> StereoSample {
        let wet = self.reverb.transform_audio(input_sample);
        if self.is_open() {
            wet
        } else {
            self.lowpass.transform_audio(wet)
        }
    }
}
impl GlobalAmbience {
    /// The reverb tail length.
    pub const DECAY: Seconds = Seconds(4.0);
    /// Reverb wet level at maximum corruption.
    pub const MAX_REVERB_WET: f64 = 0.3;
    /// How far the low-pass cutoff falls at maximum corruption.
    pub const MAX_CUTOFF_DROP: f64 = 15000.0;

    #[allow(missing_docs)]
    pub fn new_with(sample_rate: SampleRate) -> Self {
        let mut r = Self::default();
        r.update_sample_rate(sample_rate);
        r
    }

    /// Retunes for the highest corruption level across all slots.
    pub fn set_from_max_level(&mut self, max_level: u8) {
        self.level = max_level.min(100);
        let intensity = self.level as f64 / 100.0;
        self.reverb
            .set_wet(Normal::from(intensity * Self::MAX_REVERB_WET));
        let cutoff = FrequencyHz::AUDIBLE_MAX.0 - intensity * Self::MAX_CUTOFF_DROP;
        self.lowpass.set_cutoff(FrequencyHz(cutoff));
        if self.is_open() {
            self.lowpass.reset();
        }
    }

    /// Back to a dry, fully open master.
    pub fn reset(&mut self) {
        self.set_from_max_level(0);
    }

    #[allow(missing_docs)]
    pub fn level(&self) -> u8 {
        self.level
    }

    #[allow(missing_docs)]
    pub fn reverb_wet(&self) -> Normal {
        self.reverb.wet()
    }

    #[allow(missing_docs)]
    pub fn cutoff(&self) -> FrequencyHz {
        self.lowpass.cutoff()
    }

    fn is_open(&self) -> bool {
        self.level == 0
    }
}
