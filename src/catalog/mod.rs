// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! The registry of sounds that can be dropped into slots.

pub use note::{Note, NoteParseError, PitchClass};
pub use recipe::{FilterKind, FilterParams, PitchSweep, SynthRecipe};

use crate::time::{Seconds, Subdivision};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::PathBuf};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

mod note;
mod recipe;

/// The broad family a sound belongs to. Categories decide which synthesized
/// voice a sound falls back to when it doesn't bring its own recipe.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    IntoStaticStr,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
#[allow(missing_docs)]
pub enum Category {
    Beats,
    #[default]
    Effects,
    Bass,
    Melodies,
    Voices,
    Cursed,
}

/// One step of a pattern.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<Note>", into = "Option<Note>")]
pub enum Step {
    /// Nothing happens on this step.
    #[default]
    Rest,
    /// Trigger the sound at this pitch.
    Hit(Note),
}
impl Step {
    #[allow(missing_docs)]
    pub fn hit(pitch_class: PitchClass, octave: i8) -> Self {
        Step::Hit(Note::new(pitch_class, octave))
    }

    #[allow(missing_docs)]
    pub fn is_rest(&self) -> bool {
        matches!(self, Step::Rest)
    }
}
impl From<Option<Note>> for Step {
    fn from(value: Option<Note>) -> Self {
        value.map_or(Step::Rest, Step::Hit)
    }
}
impl From<Step> for Option<Note> {
    fn from(value: Step) -> Self {
        match value {
            Step::Rest => None,
            Step::Hit(note) => Some(note),
        }
    }
}

/// Where to find recorded loops for a sound.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SampleRefs {
    /// The main ("A") loop.
    pub primary: PathBuf,
    /// An optional alternate ("B") take of the same loop.
    pub alternate: Option<PathBuf>,
    /// Where the loop begins within the buffer.
    pub loop_start: Seconds,
    /// Where the loop ends. If absent, the player rounds the buffer's length to
    /// the nearest whole bar.
    pub loop_end: Option<Seconds>,
}

/// An immutable description of a sound.
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[builder(build_fn(private, name = "build_from_builder"))]
#[serde(rename_all = "kebab-case")]
pub struct SoundDefinition {
    /// The key the catalog knows this sound by.
    #[builder(setter(into))]
    name: String,

    #[builder(default)]
    category: Category,

    /// The steps, advanced one per `subdivision`.
    #[builder(default, setter(each(name = "step")))]
    pattern: Vec<Step>,

    #[builder(default)]
    subdivision: Subdivision,

    #[builder(default, setter(strip_option))]
    recipe: Option<SynthRecipe>,

    #[builder(default, setter(strip_option))]
    samples: Option<SampleRefs>,

    /// Assigning a cursed sound starts a corruption episode.
    #[builder(default)]
    cursed: bool,
}
impl SoundDefinitionBuilder {
    /// Builds the [SoundDefinition]. An empty pattern gets a single rest, so
    /// that every pattern has at least one step to walk.
    pub fn build(&self) -> Result<SoundDefinition, SoundDefinitionBuilderError> {
        let mut r = self.build_from_builder()?;
        if r.name.is_empty() {
            return Err(SoundDefinitionBuilderError::ValidationError(
                "sound name can't be empty".to_string(),
            ));
        }
        if r.pattern.is_empty() {
            r.pattern.push(Step::Rest);
        }
        Ok(r)
    }

    /// Appends a run of steps.
    pub fn steps(&mut self, steps: &[Step]) -> &mut Self {
        for step in steps {
            self.step(*step);
        }
        self
    }
}
#[allow(missing_docs)]
impl SoundDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn pattern(&self) -> &[Step] {
        &self.pattern
    }

    pub fn subdivision(&self) -> Subdivision {
        self.subdivision
    }

    pub fn recipe(&self) -> Option<&SynthRecipe> {
        self.recipe.as_ref()
    }

    pub fn samples(&self) -> Option<&SampleRefs> {
        self.samples.as_ref()
    }

    pub fn is_cursed(&self) -> bool {
        self.cursed
    }

    /// The sound's own recipe, or its category's generic one.
    pub fn effective_recipe(&self) -> Option<SynthRecipe> {
        self.recipe
            .or_else(|| SynthRecipe::default_for_category(self.category))
    }
}

/// The registry of [SoundDefinition]s, keyed by name.
#[derive(Clone, Debug, PartialEq)]
pub struct SoundCatalog {
    sounds: BTreeMap<String, SoundDefinition>,
}
impl Default for SoundCatalog {
    fn default() -> Self {
        let mut r = Self::new_empty();
        for sound in Self::default_sounds() {
            r.insert(sound);
        }
        r
    }
}
impl SoundCatalog {
    /// A catalog with nothing in it.
    pub fn new_empty() -> Self {
        Self {
            sounds: Default::default(),
        }
    }

    /// Adds a sound, replacing any existing one with the same name. Returns the
    /// one it replaced.
    pub fn insert(&mut self, sound: SoundDefinition) -> Option<SoundDefinition> {
        self.sounds.insert(sound.name.clone(), sound)
    }

    #[allow(missing_docs)]
    pub fn get(&self, name: &str) -> Option<&SoundDefinition> {
        self.sounds.get(name)
    }

    #[allow(missing_docs)]
    pub fn contains(&self, name: &str) -> bool {
        self.sounds.contains_key(name)
    }

    /// Sound names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sounds.keys().map(|k| k.as_str())
    }

    #[allow(missing_docs)]
    pub fn iter(&self) -> impl Iterator<Item = &SoundDefinition> {
        self.sounds.values()
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    fn default_sounds() -> Vec<SoundDefinition> {
        use PitchClass::*;
        let r = Step::Rest;
        let h = Step::hit;
        // Each built-in sound has an A and a B take in the sample directory.
        // Missing files leave the sound synthesized.
        let recorded = |name: &str| SampleRefs {
            primary: PathBuf::from(format!("{name}.wav")),
            alternate: Some(PathBuf::from(format!("{name}_b.wav"))),
            loop_start: Seconds(0.0),
            loop_end: None,
        };

        let definitions = [
            SoundDefinitionBuilder::default()
                .name("kick")
                .category(Category::Beats)
                .steps(&[h(C, 1), r, r, r, h(C, 1), r, r, r])
                .subdivision(Subdivision::Eighth)
                .samples(recorded("kick"))
                .build(),
            SoundDefinitionBuilder::default()
                .name("snare")
                .category(Category::Beats)
                .steps(&[r, r, h(C, 2), r, r, r, h(C, 2), r])
                .subdivision(Subdivision::Eighth)
                .recipe(SynthRecipe::snare())
                .samples(recorded("snare"))
                .build(),
            SoundDefinitionBuilder::default()
                .name("hihat")
                .category(Category::Effects)
                .steps(&[h(C, 4); 8])
                .subdivision(Subdivision::Eighth)
                .samples(recorded("hihat"))
                .build(),
            SoundDefinitionBuilder::default()
                .name("bass")
                .category(Category::Bass)
                .steps(&[
                    h(E, 2),
                    r,
                    r,
                    h(E, 2),
                    h(G, 2),
                    h(E, 2),
                    r,
                    h(E, 2),
                    r,
                    h(E, 2),
                    r,
                    h(E, 2),
                    h(G, 2),
                    h(E, 2),
                    h(A, 2),
                    r,
                ])
                .subdivision(Subdivision::Sixteenth)
                .samples(recorded("bass"))
                .build(),
            SoundDefinitionBuilder::default()
                .name("lead")
                .category(Category::Melodies)
                .steps(&[
                    h(E, 4),
                    h(G, 4),
                    r,
                    h(E, 4),
                    h(A, 4),
                    h(G, 4),
                    h(A, 4),
                    h(C, 5),
                    h(E, 4),
                    h(G, 4),
                    r,
                    h(E, 4),
                    h(A, 4),
                    h(G, 4),
                    h(A, 4),
                    h(C, 5),
                ])
                .subdivision(Subdivision::Sixteenth)
                .samples(recorded("lead"))
                .build(),
            SoundDefinitionBuilder::default()
                .name("cursed")
                .category(Category::Cursed)
                .steps(&[h(C, 3), r, r, r, h(FSharp, 3), r, r, r])
                .subdivision(Subdivision::Eighth)
                .recipe(SynthRecipe::drone())
                .cursed(true)
                .build(),
        ];

        definitions
            .into_iter()
            .filter_map(|d| match d {
                Ok(d) => Some(d),
                Err(e) => {
                    log::error!("built-in sound definition is invalid: {e}");
                    None
                }
            })
            .collect()
    }
}
