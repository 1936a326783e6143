// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Deciding, per slot, whether a sound comes from a recording or a synthesizer,
//! and the channel strip each slot plays through.

use crate::{
    catalog::SoundDefinition,
    effects::EffectChain,
    error::SessionError,
    instruments::{LoopPlayer, SynthVoice, Variation},
    loader::SampleLibrary,
    time::{SampleRate, Seconds},
    traits::prelude::*,
    transport::Transport,
    types::{Decibels, FrequencyHz, StereoSample},
};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// How a slot is producing its sound.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    EnumIter,
    Eq,
    Hash,
    IntoStaticStr,
    PartialEq,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SourceMode {
    /// A looping recording, kept in phase with the transport.
    Sample,
    /// A voice triggered step by step from the sound's pattern.
    Synthesized,
}

/// The thing that makes a slot's sound.
#[derive(Debug)]
pub enum AudioSource {
    #[allow(missing_docs)]
    Sample(LoopPlayer),
    #[allow(missing_docs)]
    Synthesized(SynthVoice),
}
impl Configurable for AudioSource {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        match self {
            AudioSource::Sample(player) => player.update_sample_rate(sample_rate),
            AudioSource::Synthesized(voice) => voice.update_sample_rate(sample_rate),
        }
    }
}
impl Ticks for AudioSource {
    fn tick(&mut self, tick_count: usize) {
        match self {
            AudioSource::Sample(player) => player.tick(tick_count),
            AudioSource::Synthesized(voice) => voice.tick(tick_count),
        }
    }
}
impl Generates<StereoSample> for AudioSource {
    fn value(&self) -> StereoSample {
        match self {
            AudioSource::Sample(player) => player.value(),
            AudioSource::Synthesized(voice) => voice.value(),
        }
    }
}
impl AudioSource {
    #[allow(missing_docs)]
    pub fn mode(&self) -> SourceMode {
        match self {
            AudioSource::Sample(_) => SourceMode::Sample,
            AudioSource::Synthesized(_) => SourceMode::Synthesized,
        }
    }

    /// Plays one note. Loops ignore this; they're already playing.
    pub fn trigger(&mut self, frequency: FrequencyHz, duration: Seconds) {
        match self {
            AudioSource::Sample(_) => {}
            AudioSource::Synthesized(voice) => voice.trigger(frequency, duration),
        }
    }

    /// Makes sure a loop is running, `offset` into its cycle. Voices ignore
    /// this; they wait for triggers.
    pub fn start_at(&mut self, offset: Seconds) {
        match self {
            AudioSource::Sample(player) => player.start_at(offset),
            AudioSource::Synthesized(_) => {}
        }
    }

    /// Fades a loop out, or releases a voice.
    pub fn stop(&mut self) {
        match self {
            AudioSource::Sample(player) => player.stop(),
            AudioSource::Synthesized(voice) => voice.release(),
        }
    }

    /// True when nothing more will come out until the next start or trigger.
    pub fn is_silent(&self) -> bool {
        match self {
            AudioSource::Sample(player) => player.is_stopped(),
            AudioSource::Synthesized(voice) => voice.is_idle(),
        }
    }

    /// Swaps a loop's A/B take. `None` for voices and for loops without an
    /// alternate take.
    pub fn toggle_variation(&mut self) -> Option<Variation> {
        match self {
            AudioSource::Sample(player) => player.toggle_variation(),
            AudioSource::Synthesized(_) => None,
        }
    }
}

/// A slot's fader and mute switch.
#[derive(Debug)]
pub struct Channel {
    volume: Decibels,
    gain: f64,
    is_muted: bool,
}
impl Default for Channel {
    fn default() -> Self {
        Self::new_with(Decibels(0.0))
    }
}
impl Channel {
    #[allow(missing_docs)]
    pub fn new_with(volume: Decibels) -> Self {
        Self {
            volume,
            gain: volume.to_gain(),
            is_muted: false,
        }
    }

    #[allow(missing_docs)]
    pub fn volume(&self) -> Decibels {
        self.volume
    }

    #[allow(missing_docs)]
    pub fn set_volume(&mut self, volume: Decibels) {
        self.volume = volume;
        self.gain = volume.to_gain();
    }

    #[allow(missing_docs)]
    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    #[allow(missing_docs)]
    pub fn set_muted(&mut self, is_muted: bool) {
        self.is_muted = is_muted;
    }

    /// Applies the fader. `audible` is false when the slot is muted or another
    /// slot is soloed.
    pub fn process(&self, input: StereoSample, audible: bool) -> StereoSample {
        if audible {
            input * self.gain
        } else {
            StereoSample::SILENCE
        }
    }
}

/// Everything that sounds on behalf of one occupied slot: source, effects,
/// then channel.
#[derive(Debug)]
pub struct SlotStrip {
    source: AudioSource,
    effects: EffectChain,
    channel: Channel,
}
impl Configurable for SlotStrip {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.source.update_sample_rate(sample_rate);
        self.effects.update_sample_rate(sample_rate);
    }
}
#[allow(missing_docs)]
impl SlotStrip {
    pub fn source(&self) -> &AudioSource {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut AudioSource {
        &mut self.source
    }

    pub fn effects(&self) -> &EffectChain {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectChain {
        &mut self.effects
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut Channel {
        &mut self.channel
    }

    pub fn mode(&self) -> SourceMode {
        self.source.mode()
    }

    /// Produces the next frame of this slot's output.
    pub fn render_frame(&mut self, audible: bool) -> StereoSample {
        self.source.tick(1);
        let wet = self.effects.transform_audio(self.source.value());
        self.channel.process(wet, audible)
    }
}

/// Builds and tears down [SlotStrip]s. Strips that are still fading out when
/// they're disposed are kept here until they fall silent.
#[derive(Debug)]
pub struct AudioSourceResolver {
    allow_samples: bool,
    sample_rate: SampleRate,
    releasing: Vec<SlotStrip>,
}
impl Default for AudioSourceResolver {
    fn default() -> Self {
        Self::new_with(true, SampleRate::DEFAULT)
    }
}
impl Configurable for AudioSourceResolver {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.sample_rate = sample_rate;
        self.releasing
            .iter_mut()
            .for_each(|s| s.update_sample_rate(sample_rate));
    }
}
impl AudioSourceResolver {
    /// `allow_samples` false forces synthesis for everything.
    pub fn new_with(allow_samples: bool, sample_rate: SampleRate) -> Self {
        Self {
            allow_samples,
            sample_rate,
            releasing: Default::default(),
        }
    }

    #[allow(missing_docs)]
    pub fn allow_samples(&self) -> bool {
        self.allow_samples
    }

    /// Makes a strip for `sound`. A loaded recording wins; otherwise the
    /// sound's recipe, or its category's, is synthesized. Loops start in
    /// phase with the transport.
    pub fn create_source(
        &self,
        sound: &SoundDefinition,
        library: &dyn SampleLibrary,
        transport: &Transport,
    ) -> Result<SlotStrip, SessionError> {
        let channel = Channel::default();
        let effects = EffectChain::new_with(self.sample_rate);

        if let Some(mut player) = self.loop_player(sound, library, transport) {
            player.start_at(transport.position_seconds());
            log::debug!("'{}' plays from its recording", sound.name());
            return Ok(SlotStrip {
                source: AudioSource::Sample(player),
                effects,
                channel,
            });
        }

        match sound.effective_recipe() {
            Some(recipe) => {
                log::debug!("'{}' is synthesized", sound.name());
                Ok(SlotStrip {
                    source: AudioSource::Synthesized(SynthVoice::new_with(recipe, self.sample_rate)),
                    effects,
                    channel,
                })
            }
            None => {
                log::warn!("'{}' has no recording and no recipe", sound.name());
                Err(SessionError::NoPlayableSource(sound.name().to_string()))
            }
        }
    }

    fn loop_player(
        &self,
        sound: &SoundDefinition,
        library: &dyn SampleLibrary,
        transport: &Transport,
    ) -> Option<LoopPlayer> {
        if !self.allow_samples || !library.is_loaded() || !library.has_sample(sound.name()) {
            return None;
        }
        let Some(primary) = library.buffer(sound.name(), Variation::A) else {
            log::warn!("'{}' reported a sample but has no buffer", sound.name());
            return None;
        };
        let (loop_start, loop_end) = library.loop_points(sound.name()).unwrap_or_default();
        Some(LoopPlayer::new_with(
            primary,
            library.buffer(sound.name(), Variation::B),
            loop_start,
            loop_end,
            transport.bar_duration(),
            self.sample_rate,
        ))
    }

    /// Retires a strip. It stops right away, but whatever fade it has left
    /// keeps playing through [AudioSourceResolver::render_releasing()]. `None`
    /// is fine and does nothing.
    pub fn dispose_source(&mut self, strip: Option<SlotStrip>) {
        let Some(mut strip) = strip else {
            return;
        };
        strip.source.stop();
        strip.effects.reset();
        if !strip.source.is_silent() {
            self.releasing.push(strip);
        }
    }

    /// The next frame of everything still fading out. Strips that finish are
    /// dropped.
    pub fn render_releasing(&mut self) -> StereoSample {
        if self.releasing.is_empty() {
            return StereoSample::SILENCE;
        }
        let mut sum = StereoSample::SILENCE;
        for strip in self.releasing.iter_mut() {
            let audible = !strip.channel.is_muted();
            sum += strip.render_frame(audible);
        }
        self.releasing.retain(|s| !s.source.is_silent());
        sum
    }

    /// How many strips are still fading out.
    pub fn releasing_count(&self) -> usize {
        self.releasing.len()
    }

    /// Cuts off everything that's fading.
    pub fn clear_releasing(&mut self) {
        self.releasing.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{Category, SoundCatalog, SoundDefinitionBuilder},
        instruments::SampleBuffer,
        loader::SampleBank,
    };
    use more_asserts::assert_gt;

    fn bank_with(name: &str) -> SampleBank {
        let mut bank = SampleBank::default();
        bank.insert(
            name,
            SampleBuffer::new_with(vec![StereoSample::from(0.5); 44100], SampleRate::DEFAULT),
            None,
            Seconds(0.0),
            None,
        );
        bank
    }

    #[test]
    fn falls_back_to_synthesis() {
        let catalog = SoundCatalog::default();
        let resolver = AudioSourceResolver::default();
        let transport = Transport::default();
        let strip = resolver
            .create_source(catalog.get("kick").unwrap(), &SampleBank::default(), &transport)
            .unwrap();
        assert_eq!(strip.mode(), SourceMode::Synthesized);
        assert!(strip.effects().is_transparent());
        assert!(!strip.channel().is_muted());
    }

    #[test]
    fn prefers_loaded_samples() {
        let catalog = SoundCatalog::default();
        let transport = Transport::default();
        let bank = bank_with("kick");

        let resolver = AudioSourceResolver::default();
        let mut strip = resolver
            .create_source(catalog.get("kick").unwrap(), &bank, &transport)
            .unwrap();
        assert_eq!(strip.mode(), SourceMode::Sample);
        let peak = (0..1000)
            .map(|_| strip.render_frame(true).peak())
            .fold(0.0, f64::max);
        assert_gt!(peak, 0.0, "loop should already be playing");

        let resolver = AudioSourceResolver::new_with(false, SampleRate::DEFAULT);
        let strip = resolver
            .create_source(catalog.get("kick").unwrap(), &bank, &transport)
            .unwrap();
        assert_eq!(
            strip.mode(),
            SourceMode::Synthesized,
            "samples disallowed in this environment"
        );
    }

    #[test]
    fn unplayable_sound_is_rejected() {
        let voice = SoundDefinitionBuilder::default()
            .name("whisper")
            .category(Category::Voices)
            .build()
            .unwrap();
        let resolver = AudioSourceResolver::default();
        assert_eq!(
            resolver
                .create_source(&voice, &SampleBank::default(), &Transport::default())
                .unwrap_err(),
            SessionError::NoPlayableSource("whisper".to_string())
        );

        // The same sound with a recording is fine.
        let strip = resolver
            .create_source(&voice, &bank_with("whisper"), &Transport::default())
            .unwrap();
        assert_eq!(strip.mode(), SourceMode::Sample);
    }

    #[test]
    fn disposal_lets_fades_finish() {
        let catalog = SoundCatalog::default();
        let transport = Transport::default();
        let mut resolver = AudioSourceResolver::default();
        let mut strip = resolver
            .create_source(catalog.get("bass").unwrap(), &bank_with("bass"), &transport)
            .unwrap();
        strip.render_frame(true);

        resolver.dispose_source(Some(strip));
        assert_eq!(resolver.releasing_count(), 1);
        for _ in 0..1000 {
            resolver.render_releasing();
        }
        assert_eq!(resolver.releasing_count(), 0);

        resolver.dispose_source(None);
        assert_eq!(resolver.releasing_count(), 0);

        // A voice that was never triggered has nothing to fade.
        let strip = resolver
            .create_source(catalog.get("lead").unwrap(), &SampleBank::default(), &transport)
            .unwrap();
        resolver.dispose_source(Some(strip));
        assert_eq!(resolver.releasing_count(), 0);
    }

    #[test]
    fn channel_gain_and_mute() {
        let mut channel = Channel::new_with(Decibels(0.0));
        let input = StereoSample::from(0.5);
        assert_eq!(channel.process(input, true), input);
        assert_eq!(channel.process(input, false), StereoSample::SILENCE);
        channel.set_volume(Decibels(-120.0));
        assert_gt!(0.001, channel.process(input, true).peak());
    }
}
