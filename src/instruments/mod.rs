// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! The two ways a slot makes sound: a recorded loop or a synthesized voice.

pub use sampler::{LoopPlayer, SampleBuffer, Variation};
pub use synth::SynthVoice;

mod sampler;
mod synth;

/// The most commonly used imports.
pub mod prelude {
    pub use super::{LoopPlayer, SampleBuffer, SynthVoice, Variation};
}
