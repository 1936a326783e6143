// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Contains the traits that define many characteristics and relationships among
//! parts of the system.

use crate::{
    time::{SampleRate, Tempo},
    types::{Normal, Sample, StereoSample},
};

/// Quick import of all important traits.
pub mod prelude {
    pub use super::{Configurable, Generates, GeneratesEnvelope, Ticks, TransformsAudio};
}

/// Something that [Generates] creates the given type `<V>` as its work product
/// over time. Examples are envelopes, which produce a [Normal] signal, and
/// oscillators, which produce a [crate::types::BipolarNormal] signal.
pub trait Generates<V: Default>: Send + std::fmt::Debug + Ticks {
    /// The value for the current frame. Advance the frame by calling
    /// [Ticks::tick()].
    fn value(&self) -> V {
        V::default()
    }

    /// The batch version of value(). To deliver each value, this method will
    /// typically call tick() internally.
    fn generate_batch_values(&mut self, values: &mut [V]) {
        for v in values {
            self.tick(1);
            *v = self.value();
        }
    }
}

/// Something that is [Configurable] is interested in staying in sync with
/// global configuration.
pub trait Configurable {
    /// The sample rate changed.
    #[allow(unused_variables)]
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {}

    /// Tempo (beats per minute) changed.
    #[allow(unused_variables)]
    fn update_tempo(&mut self, tempo: Tempo) {}
}

/// A way for something to do work corresponding to one or more frames.
pub trait Ticks: Configurable + Send + std::fmt::Debug {
    /// Perform work for the current frame or frames. Successive tick()s
    /// represent successive frames.
    #[allow(unused_variables)]
    fn tick(&mut self, tick_count: usize) {}
}

/// Describes the public interface of an envelope generator, which provides a
/// normalized amplitude (0.0..=1.0) that changes over time according to its
/// internal parameters, external triggers, and the progression of time.
pub trait GeneratesEnvelope: Generates<Normal> + Send + std::fmt::Debug + Ticks {
    /// Triggers the envelope's active stage.
    fn trigger_attack(&mut self);

    /// Triggers the end of the envelope's active stage.
    fn trigger_release(&mut self);

    /// Whether the envelope generator is in the idle state, which usually means
    /// quiescent and zero amplitude.
    fn is_idle(&self) -> bool;
}

/// A [TransformsAudio] takes input audio, which is typically produced by a
/// source, does something to it, and then outputs it. It's what effects do.
pub trait TransformsAudio: std::fmt::Debug {
    /// Transforms a stereo sample. The default implementation treats the two
    /// channels independently.
    fn transform_audio(&mut self, input_sample: StereoSample) -> StereoSample {
        StereoSample(
            self.transform_channel(0, input_sample.0),
            self.transform_channel(1, input_sample.1),
        )
    }

    /// channel: 0 is left, 1 is right. Use the value as an index into arrays.
    #[allow(unused_variables)]
    fn transform_channel(&mut self, channel: usize, input_sample: Sample) -> Sample {
        input_sample
    }

    /// Transforms a buffer of stereo samples in place.
    fn transform_batch(&mut self, samples: &mut [StereoSample]) {
        for sample in samples {
            *sample = self.transform_audio(*sample);
        }
    }
}
