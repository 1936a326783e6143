// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::{
    catalog::SynthRecipe,
    effects::BiQuadFilter,
    generators::{Envelope, Oscillator},
    time::{SampleRate, Seconds},
    traits::prelude::*,
    types::{FrequencyHz, Ratio, Sample, StereoSample},
};

/// A single monophonic voice built from a [SynthRecipe]. Each trigger
/// restarts the envelope and schedules its own release, so the caller never
/// has to remember to let go of a note.
#[derive(Debug)]
pub struct SynthVoice {
    recipe: SynthRecipe,
    oscillator: Oscillator,
    envelope: Envelope,
    filter: Option<BiQuadFilter>,
    gain: f64,
    sample_rate: SampleRate,

    frames_since_trigger: usize,
    frames_until_release: Option<usize>,
    signal: StereoSample,
}
impl Configurable for SynthVoice {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.sample_rate = sample_rate;
        self.oscillator.update_sample_rate(sample_rate);
        self.envelope.update_sample_rate(sample_rate);
        if let Some(filter) = self.filter.as_mut() {
            filter.update_sample_rate(sample_rate);
        }
    }
}
impl Ticks for SynthVoice {
    fn tick(&mut self, tick_count: usize) {
        for _ in 0..tick_count {
            if let Some(frames) = self.frames_until_release {
                if frames == 0 {
                    self.envelope.trigger_release();
                    self.frames_until_release = None;
                } else {
                    self.frames_until_release = Some(frames - 1);
                }
            }
            if self.envelope.is_idle() {
                self.signal = StereoSample::SILENCE;
                continue;
            }

            self.oscillator.set_frequency_tune(self.sweep_ratio());
            self.oscillator.tick(1);
            self.envelope.tick(1);
            self.frames_since_trigger += 1;

            let raw = Sample::from(self.oscillator.value()) * self.envelope.value() * self.gain;
            let out = match self.filter.as_mut() {
                Some(filter) => filter.transform_channel(0, raw),
                None => raw,
            };
            self.signal = StereoSample::from(out);
        }
    }
}
impl Generates<StereoSample> for SynthVoice {
    fn value(&self) -> StereoSample {
        self.signal
    }
}
impl SynthVoice {
    #[allow(missing_docs)]
    pub fn new_with(recipe: SynthRecipe, sample_rate: SampleRate) -> Self {
        let mut r = Self {
            recipe,
            oscillator: Oscillator::new_with_waveform_and_frequency(
                recipe.waveform,
                FrequencyHz::default(),
            ),
            envelope: Envelope::new_with(recipe.envelope),
            filter: recipe.filter.map(BiQuadFilter::new_with),
            gain: recipe.volume.to_gain(),
            sample_rate,
            frames_since_trigger: 0,
            frames_until_release: None,
            signal: StereoSample::SILENCE,
        };
        r.update_sample_rate(sample_rate);
        r
    }

    /// Starts a note at `frequency` that releases after `duration`. A recipe
    /// with a fixed frequency ignores the requested pitch.
    pub fn trigger(&mut self, frequency: FrequencyHz, duration: Seconds) {
        let frequency = self.recipe.fixed_frequency.unwrap_or(frequency);
        self.oscillator.set_frequency(frequency);
        if self.recipe.pitch_sweep.is_some() {
            self.oscillator.reset();
        }
        self.frames_since_trigger = 0;
        self.envelope.trigger_attack();
        self.frames_until_release = Some(duration.to_frames(self.sample_rate));
    }

    /// Lets go of whatever is sounding.
    pub fn release(&mut self) {
        self.frames_until_release = None;
        self.envelope.trigger_release();
    }

    /// True once the last note has fully died away.
    pub fn is_idle(&self) -> bool {
        self.envelope.is_idle()
    }

    #[allow(missing_docs)]
    pub fn recipe(&self) -> &SynthRecipe {
        &self.recipe
    }

    #[allow(missing_docs)]
    pub fn frequency(&self) -> FrequencyHz {
        self.oscillator.frequency()
    }

    // Glides from `octaves` above the note down to the note itself.
    fn sweep_ratio(&self) -> Ratio {
        let Some(sweep) = self.recipe.pitch_sweep else {
            return Ratio::default();
        };
        let elapsed = self.frames_since_trigger as f64 / self.sample_rate.value().max(1) as f64;
        if sweep.seconds.0 <= 0.0 || elapsed >= sweep.seconds.0 {
            Ratio::default()
        } else {
            Ratio(2.0f64.powf(sweep.octaves * (1.0 - elapsed / sweep.seconds.0)))
        }
    }

    #[cfg(test)]
    fn envelope_value(&self) -> crate::types::Normal {
        self.envelope.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{Note, PitchClass},
        types::Normal,
    };
    use more_asserts::{assert_gt, assert_le};

    fn peak_over(voice: &mut SynthVoice, frames: usize) -> f64 {
        (0..frames)
            .map(|_| {
                voice.tick(1);
                voice.value().peak()
            })
            .fold(0.0, f64::max)
    }

    #[test]
    fn untriggered_voice_is_silent() {
        let mut voice = SynthVoice::new_with(SynthRecipe::lead(), SampleRate::DEFAULT);
        assert!(voice.is_idle());
        assert_eq!(peak_over(&mut voice, 1000), 0.0);
    }

    #[test]
    fn trigger_sounds_then_releases_on_its_own() {
        let mut voice = SynthVoice::new_with(SynthRecipe::bass(), SampleRate::DEFAULT);
        voice.trigger(Note::new(PitchClass::C, 2).frequency(), Seconds(0.1));
        assert!(!voice.is_idle());
        assert_gt!(peak_over(&mut voice, 4410), 0.0);

        // 0.1 s of note plus 0.2 s of release, with room to spare.
        peak_over(&mut voice, 44100);
        assert!(voice.is_idle(), "voice should have released by itself");
        assert_eq!(voice.envelope_value(), Normal::zero());
        assert_eq!(peak_over(&mut voice, 100), 0.0);
    }

    #[test]
    fn output_stays_in_range() {
        let mut voice = SynthVoice::new_with(SynthRecipe::drone(), SampleRate::DEFAULT);
        voice.trigger(FrequencyHz(110.0), Seconds(0.5));
        assert_le!(peak_over(&mut voice, 44100), 1.0);
    }

    #[test]
    fn fixed_frequency_overrides_pitch() {
        let recipe = SynthRecipe {
            fixed_frequency: Some(FrequencyHz(55.0)),
            ..SynthRecipe::membrane()
        };
        let mut voice = SynthVoice::new_with(recipe, SampleRate::DEFAULT);
        voice.trigger(FrequencyHz(880.0), Seconds(0.1));
        assert_eq!(voice.frequency(), FrequencyHz(55.0));

        let mut voice = SynthVoice::new_with(SynthRecipe::lead(), SampleRate::DEFAULT);
        voice.trigger(FrequencyHz(880.0), Seconds(0.1));
        assert_eq!(voice.frequency(), FrequencyHz(880.0));
    }

    #[test]
    fn pitch_sweep_settles_on_the_note() {
        let mut voice = SynthVoice::new_with(SynthRecipe::membrane(), SampleRate::DEFAULT);
        voice.trigger(FrequencyHz(32.7), Seconds(0.2));
        let start = voice.sweep_ratio();
        assert_eq!(start, Ratio(64.0), "six octaves up at the moment of the hit");

        voice.tick(SampleRate::DEFAULT.value() / 40);
        let middle = voice.sweep_ratio();
        assert_gt!(middle.0, 1.0);
        assert_gt!(start.0, middle.0);

        voice.tick(SampleRate::DEFAULT.value() / 10);
        assert_eq!(voice.sweep_ratio(), Ratio::default());
    }

    #[test]
    fn retrigger_restarts_the_note() {
        let mut voice = SynthVoice::new_with(SynthRecipe::hat(), SampleRate::DEFAULT);
        voice.trigger(FrequencyHz(440.0), Seconds(0.01));
        peak_over(&mut voice, 44100);
        assert!(voice.is_idle());
        voice.trigger(FrequencyHz(440.0), Seconds(0.01));
        assert!(!voice.is_idle());

        voice.release();
        peak_over(&mut voice, 44100);
        assert!(voice.is_idle());
    }
}
