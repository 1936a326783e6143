// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Startup configuration. Every field is optional; whatever a document leaves
//! out comes from the built-in defaults.

use crate::{
    catalog::{Category, SampleRefs, SoundCatalog, SoundDefinitionBuilder, Step, SynthRecipe},
    corruption::{CorruptionSettings, TierThresholds},
    time::{MusicalTime, SampleRate, Seconds, Subdivision, Tempo, TimeSignature},
    transport::Transport,
};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Why a settings document couldn't be used.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[allow(missing_docs)]
    #[error("can't read settings: {0}")]
    Io(#[from] std::io::Error),
    #[allow(missing_docs)]
    #[error("can't parse settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Session-wide basics.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct MetaSettings {
    #[allow(missing_docs)]
    #[derivative(Default(value = "\"wrenchbox\".to_string()"))]
    pub name: String,
    #[allow(missing_docs)]
    #[derivative(Default(value = "120.0"))]
    pub bpm: f64,
    /// The length of the transport loop.
    #[derivative(Default(value = "Transport::DEFAULT_LOOP_BARS"))]
    pub loop_bars: usize,
}
impl MetaSettings {
    /// How long the loop lasts at the configured tempo.
    pub fn loop_duration(&self) -> Seconds {
        MusicalTime::new_with_bars(&TimeSignature::default(), self.loop_bars.max(1))
            .as_seconds(Tempo(self.bpm))
    }
}

#[allow(missing_docs)]
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct UiSettings {
    #[derivative(Default(value = "7"))]
    pub slot_count: usize,
}

#[allow(missing_docs)]
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct AudioSettings {
    #[derivative(Default(value = "SampleRate::DEFAULT_SAMPLE_RATE"))]
    pub sample_rate: usize,
    /// False forces every sound to be synthesized.
    #[derivative(Default(value = "true"))]
    pub allow_samples: bool,
    /// Relative sample paths are resolved against this.
    #[derivative(Default(value = "PathBuf::from(\".\")"))]
    pub sample_dir: PathBuf,
}
impl AudioSettings {
    #[allow(missing_docs)]
    pub fn sample_rate(&self) -> SampleRate {
        SampleRate::new(self.sample_rate)
    }
}

/// A sound described in settings. The name is the key it's stored under.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
#[allow(missing_docs)]
pub struct SoundSettings {
    pub category: Category,
    pub pattern: Vec<Step>,
    pub subdivision: Subdivision,
    pub recipe: Option<SynthRecipe>,
    pub samples: Option<SampleRefs>,
    pub cursed: bool,
}

/// Everything configurable at startup.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
#[allow(missing_docs)]
pub struct Settings {
    pub meta: MetaSettings,
    pub ui: UiSettings,
    /// Added to the built-in catalog, replacing same-named sounds.
    pub sounds: BTreeMap<String, SoundSettings>,
    pub corruption: CorruptionSettings,
    pub audio: AudioSettings,
}
impl Settings {
    #[allow(missing_docs)]
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str::<Self>(json)?.sanitized())
    }

    #[allow(missing_docs)]
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        let r = Self::from_json_str(&json)?;
        log::info!("loaded settings '{}' from {}", r.meta.name, path.display());
        Ok(r)
    }

    /// Replaces values that can't work with their defaults, with a warning
    /// for each. Slot count and sample rate are left alone; the session
    /// refuses to start with those wrong.
    pub fn sanitized(mut self) -> Self {
        if !Tempo(self.meta.bpm).is_valid() {
            log::warn!("BPM {} is unusable; using the default", self.meta.bpm);
            self.meta.bpm = MetaSettings::default().bpm;
        }
        if self.meta.loop_bars == 0 {
            log::warn!("a loop needs at least one bar");
            self.meta.loop_bars = 1;
        }
        if !self.corruption.tiers.is_valid() {
            log::warn!(
                "tier thresholds {:?} aren't increasing; using the defaults",
                self.corruption.tiers
            );
            self.corruption.tiers = TierThresholds::default();
        }
        if !(0.0..=1.0).contains(&self.corruption.spread_rate) {
            log::warn!("spread rate {} clamped", self.corruption.spread_rate);
            self.corruption.spread_rate = self.corruption.spread_rate.clamp(0.0, 1.0);
        }
        self
    }

    /// The built-in sounds plus any from these settings. A recording without
    /// an explicit loop end loops over the whole transport loop.
    pub fn catalog(&self) -> SoundCatalog {
        let mut catalog = SoundCatalog::default();
        for (name, sound) in self.sounds.iter() {
            let mut builder = SoundDefinitionBuilder::default();
            builder
                .name(name.as_str())
                .category(sound.category)
                .steps(&sound.pattern)
                .subdivision(sound.subdivision)
                .cursed(sound.cursed);
            if let Some(recipe) = sound.recipe {
                builder.recipe(recipe);
            }
            if let Some(samples) = sound.samples.as_ref() {
                let mut samples = samples.clone();
                if samples.loop_end.is_none() {
                    samples.loop_end = Some(self.meta.loop_duration());
                }
                builder.samples(samples);
            }
            match builder.build() {
                Ok(definition) => {
                    if catalog.insert(definition).is_some() {
                        log::debug!("settings replaced built-in sound '{name}'");
                    }
                }
                Err(e) => log::warn!("skipping sound '{name}': {e}"),
            }
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Note, PitchClass};
    use float_cmp::approx_eq;

    #[test]
    fn empty_document_is_all_defaults() {
        let settings = Settings::from_json_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.meta.bpm, 120.0);
        assert_eq!(settings.meta.loop_bars, 4);
        assert_eq!(settings.ui.slot_count, 7);
        assert_eq!(settings.audio.sample_rate, 44100);
        assert!(settings.audio.allow_samples);
        assert!(settings.corruption.enabled);
        assert_eq!(settings.corruption.spread_rate, 0.4);
        assert_eq!(settings.corruption.spread_amount, 15);
        assert_eq!(settings.corruption.tick_interval_ms, 2000);
        assert_eq!(settings.corruption.tiers, TierThresholds::default());
        assert_eq!(settings.catalog(), SoundCatalog::default());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let settings = Settings::from_json_str(
            r#"{
                "meta": {"bpm": 90},
                "corruption": {"spread-rate": 1.0, "tiers": {"high": 70}},
                "ui": {"slot-count": 5}
            }"#,
        )
        .unwrap();
        assert_eq!(settings.meta.bpm, 90.0);
        assert_eq!(settings.meta.loop_bars, 4);
        assert_eq!(settings.ui.slot_count, 5);
        assert_eq!(settings.corruption.spread_rate, 1.0);
        assert_eq!(settings.corruption.spread_amount, 15);
        assert_eq!(settings.corruption.tiers.high, 70);
        assert_eq!(settings.corruption.tiers.low, 25);
    }

    #[test]
    fn unusable_values_fall_back() {
        let settings = Settings::from_json_str(
            r#"{
                "meta": {"bpm": -3, "loop-bars": 0},
                "corruption": {"spread-rate": 7.5, "tiers": {"low": 60, "medium": 50}}
            }"#,
        )
        .unwrap();
        assert_eq!(settings.meta.bpm, 120.0);
        assert_eq!(settings.meta.loop_bars, 1);
        assert_eq!(settings.corruption.spread_rate, 1.0);
        assert_eq!(settings.corruption.tiers, TierThresholds::default());

        assert!(Settings::from_json_str("not json").is_err());
        assert!(Settings::load(Path::new("/no/such/settings.json")).is_err());
    }

    #[test]
    fn sounds_extend_and_override_the_catalog() {
        let settings = Settings::from_json_str(
            r#"{
                "meta": {"bpm": 60, "loop-bars": 2},
                "sounds": {
                    "kick": {"category": "bass", "pattern": ["C2", null], "subdivision": "16n"},
                    "choir": {
                        "category": "voices",
                        "pattern": ["A3"],
                        "samples": {"primary": "choir.wav"}
                    },
                    "hex": {"category": "cursed", "cursed": true, "recipe": {"waveform": "square"}}
                }
            }"#,
        )
        .unwrap();
        let catalog = settings.catalog();
        assert_eq!(catalog.len(), SoundCatalog::default().len() + 2);

        let kick = catalog.get("kick").unwrap();
        assert_eq!(kick.category(), Category::Bass);
        assert_eq!(kick.subdivision(), Subdivision::Sixteenth);
        assert_eq!(
            kick.pattern(),
            &[Step::Hit(Note::new(PitchClass::C, 2)), Step::Rest]
        );

        let choir = catalog.get("choir").unwrap();
        let samples = choir.samples().unwrap();
        assert_eq!(samples.primary, PathBuf::from("choir.wav"));
        // Two bars at 60 BPM.
        assert!(approx_eq!(f64, samples.loop_end.unwrap().0, 8.0, ulps = 4));

        let hex = catalog.get("hex").unwrap();
        assert!(hex.is_cursed());
        assert!(hex.effective_recipe().is_some());
        assert_eq!(hex.pattern(), &[Step::Rest], "empty patterns get one rest");
    }
}
