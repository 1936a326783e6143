// Copyright (c) 2023 Mike Tsao. All rights reserved.

#![warn(missing_docs)]

//! The `wrenchbox` crate is a looping beat toy. A handful of slots each hold
//! a sound that plays in time with a shared loop. One of the sounds is cursed:
//! dropping it in starts a corruption that creeps into the neighboring slots
//! and bends their audio until it's cured.

pub mod catalog;
pub mod corruption;
pub mod effects;
pub mod error;
pub mod generators;
pub mod instruments;
pub mod loader;
pub mod rng;
pub mod scheduler;
#[cfg(feature = "audio")]
pub mod services;
pub mod session;
pub mod settings;
pub mod sources;
pub mod time;
pub mod traits;
pub mod transport;
pub mod types;
pub mod uid;

/// A collection of imports that are useful to users of this crate. `use
/// wrenchbox::prelude::*;` for easier onboarding.
pub mod prelude {
    pub use super::{
        catalog::{Category, Note, SoundCatalog, SoundDefinition, Step, SynthRecipe},
        corruption::{CorruptionSettings, Tier},
        effects::prelude::*,
        error::SessionError,
        instruments::prelude::*,
        loader::{SampleBank, SampleLibrary},
        session::{Session, SessionEvent, Slot},
        settings::Settings,
        sources::SourceMode,
        time::{MusicalTime, SampleRate, Seconds, Subdivision, Tempo},
        traits::prelude::*,
        transport::Transport,
        types::{Decibels, FrequencyHz, Normal, StereoSample},
        uid::SlotId,
    };
}
