// Copyright (c) 2023 Mike Tsao. All rights reserved.

use super::Category;
use crate::{
    generators::{EnvelopeParams, Waveform},
    time::Seconds,
    types::{Decibels, FrequencyHz},
};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Which band a [FilterParams] keeps.
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub enum FilterKind {
    #[default]
    LowPass,
    HighPass,
    BandPass,
}

/// A static filter applied to a synthesized voice.
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct FilterParams {
    #[allow(missing_docs)]
    pub kind: FilterKind,
    #[allow(missing_docs)]
    #[derivative(Default(value = "FrequencyHz(1000.0)"))]
    pub cutoff: FrequencyHz,
    /// Resonance. 0.707 is flat.
    #[derivative(Default(value = "std::f64::consts::FRAC_1_SQRT_2"))]
    pub q: f64,
}
impl FilterParams {
    #[allow(missing_docs)]
    pub fn new_with(kind: FilterKind, cutoff: f64) -> Self {
        Self {
            kind,
            cutoff: FrequencyHz(cutoff),
            ..Default::default()
        }
    }
}

/// A downward pitch glide at the start of each note, which is what turns a
/// sine blip into a kick drum.
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct PitchSweep {
    /// How far above the note the sweep starts.
    #[derivative(Default(value = "6.0"))]
    pub octaves: f64,
    /// How long the glide takes to settle (roughly).
    #[derivative(Default(value = "Seconds(0.05)"))]
    pub seconds: Seconds,
}

/// How to synthesize a sound procedurally when no sample is available.
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct SynthRecipe {
    #[allow(missing_docs)]
    pub waveform: Waveform,
    #[allow(missing_docs)]
    pub envelope: EnvelopeParams,
    #[allow(missing_docs)]
    pub filter: Option<FilterParams>,
    #[allow(missing_docs)]
    pub pitch_sweep: Option<PitchSweep>,
    /// Plays this frequency regardless of the pattern's pitches. Useful for
    /// unpitched percussion.
    pub fixed_frequency: Option<FrequencyHz>,
    #[allow(missing_docs)]
    #[derivative(Default(value = "Decibels(0.0)"))]
    pub volume: Decibels,
}
impl SynthRecipe {
    /// A pitched drum: sine with a fast six-octave drop.
    pub fn membrane() -> Self {
        Self {
            waveform: Waveform::Sine,
            envelope: EnvelopeParams::new_with(0.001, 0.3, 0.0, 0.1),
            pitch_sweep: Some(PitchSweep::default()),
            ..Default::default()
        }
    }

    /// A burst of band-passed noise.
    pub fn snare() -> Self {
        Self {
            waveform: Waveform::Noise,
            envelope: EnvelopeParams::new_with(0.001, 0.15, 0.0, 0.05),
            filter: Some(FilterParams::new_with(FilterKind::BandPass, 3000.0)),
            ..Default::default()
        }
    }

    /// A short, bright, high-passed noise tick.
    pub fn hat() -> Self {
        Self {
            waveform: Waveform::Noise,
            envelope: EnvelopeParams::new_with(0.001, 0.15, 0.0, 0.05),
            filter: Some(FilterParams::new_with(FilterKind::HighPass, 7000.0)),
            volume: Decibels(-6.0),
            ..Default::default()
        }
    }

    /// A round, low-passed triangle.
    pub fn bass() -> Self {
        Self {
            waveform: Waveform::Triangle,
            envelope: EnvelopeParams::new_with(0.01, 0.3, 0.4, 0.2),
            filter: Some(FilterParams::new_with(FilterKind::LowPass, 800.0)),
            ..Default::default()
        }
    }

    /// A reedy square lead.
    pub fn lead() -> Self {
        Self {
            waveform: Waveform::Square,
            envelope: EnvelopeParams::new_with(0.01, 0.2, 0.3, 0.3),
            filter: Some(FilterParams::new_with(FilterKind::LowPass, 3200.0)),
            volume: Decibels(-8.0),
            ..Default::default()
        }
    }

    /// A dark, slow sawtooth drone.
    pub fn drone() -> Self {
        Self {
            waveform: Waveform::Sawtooth,
            envelope: EnvelopeParams::new_with(0.2, 0.5, 0.6, 0.8),
            filter: Some(FilterParams::new_with(FilterKind::LowPass, 600.0)),
            volume: Decibels(-4.0),
            ..Default::default()
        }
    }

    /// The recipe used for a sound that doesn't declare its own. Some
    /// categories have no sensible generic voice.
    pub fn default_for_category(category: Category) -> Option<Self> {
        match category {
            Category::Beats => Some(Self::membrane()),
            Category::Effects => Some(Self::hat()),
            Category::Bass => Some(Self::bass()),
            Category::Melodies => Some(Self::lead()),
            Category::Voices | Category::Cursed => None,
        }
    }
}
