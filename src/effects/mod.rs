// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Audio transforms. The per-slot corruption stages live in [EffectChain];
//! [GlobalAmbience] sits on the master bus.

pub use ambience::GlobalAmbience;
pub use bitcrusher::Bitcrusher;
pub use chain::{EffectChain, EffectParams};
pub use distortion::Distortion;
pub use filter::BiQuadFilter;
pub use frequency_shifter::FrequencyShifter;
pub use pitch_shift::PitchShifter;
pub use reverb::Reverb;
pub use tremolo::Tremolo;

mod ambience;
mod bitcrusher;
mod chain;
mod delay;
mod distortion;
mod filter;
mod frequency_shifter;
mod pitch_shift;
mod reverb;
mod tremolo;

/// The most commonly used imports.
pub mod prelude {
    pub use super::{EffectChain, EffectParams, GlobalAmbience};
}
