// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! The one object a front end talks to. It owns the transport, the slots, and
//! the corruption engine, and turns user actions into sound and events.

use crate::{
    catalog::SoundCatalog,
    corruption::{CorruptionEngine, CorruptionEvent, Tier},
    effects::GlobalAmbience,
    error::SessionError,
    instruments::Variation,
    loader::SampleLibrary,
    rng::Rng,
    scheduler::PatternScheduler,
    settings::Settings,
    sources::{AudioSourceResolver, SlotStrip, SourceMode},
    time::{SampleRate, Tempo},
    traits::prelude::*,
    transport::Transport,
    types::{ChannelPair, Decibels, StereoSample},
    uid::SlotId,
};
use crossbeam_channel::Receiver;
use std::time::Duration;

/// What happened, in the order it happened. Effects have already been updated
/// by the time a corruption event is sent.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    #[allow(missing_docs)]
    SlotAssigned {
        slot: SlotId,
        sound: String,
        mode: SourceMode,
    },
    #[allow(missing_docs)]
    SlotRemoved { slot: SlotId },
    #[allow(missing_docs)]
    SlotMuteChanged { slot: SlotId, muted: bool },
    /// The soloed slot, if any, changed.
    SoloChanged { soloed: Option<SlotId> },
    #[allow(missing_docs)]
    VariationChanged { slot: SlotId, variation: Variation },
    #[allow(missing_docs)]
    CorruptionChanged { slot: SlotId, level: u8, tier: Tier },
    #[allow(missing_docs)]
    HorrorModeStarted { cursed_slot: SlotId },
    #[allow(missing_docs)]
    HorrorModeEnded,
}
impl From<CorruptionEvent> for SessionEvent {
    fn from(value: CorruptionEvent) -> Self {
        match value {
            CorruptionEvent::Changed { slot, level, tier } => {
                SessionEvent::CorruptionChanged { slot, level, tier }
            }
            CorruptionEvent::HorrorModeStarted { cursed_slot } => {
                SessionEvent::HorrorModeStarted { cursed_slot }
            }
            CorruptionEvent::HorrorModeEnded => SessionEvent::HorrorModeEnded,
        }
    }
}

/// One of the session's fixed playback positions.
#[derive(Debug)]
pub struct Slot {
    id: SlotId,
    sound: Option<String>,
    strip: Option<SlotStrip>,
}
impl Slot {
    fn new_with(id: SlotId) -> Self {
        Self {
            id,
            sound: None,
            strip: None,
        }
    }

    #[allow(missing_docs)]
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// The name of the assigned sound.
    pub fn sound(&self) -> Option<&str> {
        self.sound.as_deref()
    }

    /// Whether a sound is assigned.
    pub fn is_active(&self) -> bool {
        self.sound.is_some()
    }

    /// The slot's own mute switch. See [Session::is_audible()] for the effect
    /// of solo.
    pub fn is_muted(&self) -> bool {
        self.strip.as_ref().is_some_and(|s| s.channel().is_muted())
    }

    #[allow(missing_docs)]
    pub fn mode(&self) -> Option<SourceMode> {
        self.strip.as_ref().map(|s| s.mode())
    }

    /// The sound-producing chain, present only while a sound is assigned.
    pub fn strip(&self) -> Option<&SlotStrip> {
        self.strip.as_ref()
    }
}

/// A running wrenchbox.
#[derive(Debug)]
pub struct Session {
    catalog: SoundCatalog,
    library: Box<dyn SampleLibrary>,
    sample_rate: SampleRate,

    transport: Transport,
    resolver: AudioSourceResolver,
    scheduler: PatternScheduler,
    corruption: CorruptionEngine,
    ambience: GlobalAmbience,

    slots: Vec<Slot>,
    soloed: Option<SlotId>,
    rng: Rng,
    events: ChannelPair<SessionEvent>,
}
impl Session {
    /// How much the front end's cure button removes.
    pub const UI_CURE_AMOUNT: u8 = 30;

    /// Builds a session from `settings`. Fails if the settings describe
    /// something that can't produce sound at all.
    pub fn new_with(
        settings: Settings,
        library: Box<dyn SampleLibrary>,
    ) -> Result<Self, SessionError> {
        let settings = settings.sanitized();
        let slot_count = settings.ui.slot_count;
        if slot_count == 0 {
            return Err(SessionError::Initialization(
                "a session needs at least one slot".to_string(),
            ));
        }
        let sample_rate = settings.audio.sample_rate();
        if sample_rate.value() == 0 {
            return Err(SessionError::Initialization(
                "sample rate can't be zero".to_string(),
            ));
        }

        let mut transport = Transport::new_with(Tempo(settings.meta.bpm), settings.meta.loop_bars);
        transport.update_sample_rate(sample_rate);
        let catalog = settings.catalog();
        log::info!(
            "session '{}': {} slots, {} sounds, {}",
            settings.meta.name,
            slot_count,
            catalog.len(),
            transport.tempo()
        );

        Ok(Self {
            catalog,
            library,
            sample_rate,
            transport,
            resolver: AudioSourceResolver::new_with(settings.audio.allow_samples, sample_rate),
            scheduler: PatternScheduler::default(),
            corruption: CorruptionEngine::new_with(settings.corruption, slot_count),
            ambience: GlobalAmbience::new_with(sample_rate),
            slots: (0..slot_count).map(|i| Slot::new_with(SlotId(i))).collect(),
            soloed: None,
            rng: Rng::default(),
            events: ChannelPair::default(),
        })
    }

    /// Makes random choices repeatable.
    pub fn reseed(&mut self, seed: u128) {
        self.rng = Rng::new_with_seed(seed);
    }

    /// A receiver for [SessionEvent]s. All receivers share one queue, so each
    /// event goes to only one of them.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.events.receiver.clone()
    }

    /// Puts `sound_name` in `slot`, replacing whatever was there. The transport
    /// starts if it wasn't running. A cursed sound starts horror mode unless
    /// it's already on.
    pub fn assign(&mut self, slot: SlotId, sound_name: &str) -> Result<(), SessionError> {
        self.check_slot(slot)?;
        let Some(sound) = self.catalog.get(sound_name).cloned() else {
            log::warn!("can't assign unknown sound '{sound_name}'");
            return Err(SessionError::UnknownSound(sound_name.to_string()));
        };
        let mut strip =
            self.resolver
                .create_source(&sound, self.library.as_ref(), &self.transport)?;

        self.scheduler.stop_pattern(slot);
        if let Some(previous) = self.slots[slot.index()].strip.take() {
            self.resolver.dispose_source(Some(previous));
        }

        // Corruption can spread into empty slots, so a new sound picks up
        // whatever level its slot already has.
        let level = self.corruption.level(slot);
        if level > 0 {
            let tier = self.corruption.tier(slot);
            strip.effects_mut().apply_tier(tier, level, &mut self.rng);
        }
        let mode = strip.mode();
        self.scheduler.start_pattern(slot, &sound, mode);
        let s = &mut self.slots[slot.index()];
        s.sound = Some(sound.name().to_string());
        s.strip = Some(strip);
        self.transport.start();
        log::info!("slot {slot}: '{}' ({mode})", sound.name());
        self.notify(SessionEvent::SlotAssigned {
            slot,
            sound: sound.name().to_string(),
            mode,
        });

        if sound.is_cursed() {
            let events = self.corruption.start(slot);
            self.handle_corruption_events(events);
        }
        Ok(())
    }

    /// Empties `slot`. An already-empty slot is left alone. Removing the last
    /// sound stops the transport.
    pub fn remove(&mut self, slot: SlotId) -> Result<(), SessionError> {
        self.check_slot(slot)?;
        if !self.slots[slot.index()].is_active() {
            log::debug!("slot {slot} is already empty");
            return Ok(());
        }
        self.clear_slot(slot);
        if !self.slots.iter().any(|s| s.is_active()) {
            self.transport.stop();
        }
        Ok(())
    }

    fn clear_slot(&mut self, slot: SlotId) {
        self.scheduler.stop_pattern(slot);
        let s = &mut self.slots[slot.index()];
        s.sound = None;
        let strip = s.strip.take();
        self.resolver.dispose_source(strip);
        if self.soloed == Some(slot) {
            self.soloed = None;
            self.notify(SessionEvent::SoloChanged { soloed: None });
        }
        log::info!("slot {slot}: removed");
        self.notify(SessionEvent::SlotRemoved { slot });
    }

    /// Flips the slot's mute switch. Empty slots have nothing to mute.
    pub fn toggle_mute(&mut self, slot: SlotId) -> Result<(), SessionError> {
        self.check_slot(slot)?;
        let Some(strip) = self.slots[slot.index()].strip.as_mut() else {
            log::debug!("slot {slot} is empty; nothing to mute");
            return Ok(());
        };
        let muted = !strip.channel().is_muted();
        strip.channel_mut().set_muted(muted);
        self.notify(SessionEvent::SlotMuteChanged { slot, muted });
        Ok(())
    }

    /// Solos the slot, or unsolos it if it was the soloed one. Only one slot
    /// is soloed at a time. Empty slots can't be soloed.
    pub fn toggle_solo(&mut self, slot: SlotId) -> Result<(), SessionError> {
        self.check_slot(slot)?;
        if !self.slots[slot.index()].is_active() {
            log::debug!("slot {slot} is empty; nothing to solo");
            return Ok(());
        }
        self.soloed = if self.soloed == Some(slot) {
            None
        } else {
            Some(slot)
        };
        self.notify(SessionEvent::SoloChanged {
            soloed: self.soloed,
        });
        Ok(())
    }

    /// Lowers every slot's corruption by `amount`. Curing everything ends
    /// horror mode.
    pub fn cure(&mut self, amount: u8) {
        let events = self.corruption.cure(amount);
        self.handle_corruption_events(events);
    }

    /// Back to an empty session: every slot cleared, transport stopped,
    /// corruption and effects zeroed.
    pub fn reset_all(&mut self) {
        for index in 0..self.slots.len() {
            if self.slots[index].is_active() {
                self.clear_slot(SlotId(index));
            }
        }
        if self.soloed.take().is_some() {
            self.notify(SessionEvent::SoloChanged { soloed: None });
        }
        self.scheduler.reset();
        self.transport.stop();
        let events = self.corruption.reset();
        self.handle_corruption_events(events);
        self.ambience.reset();
        log::info!("session reset");
    }

    /// Moves wall-clock time forward, which is what drives the spread of
    /// corruption.
    pub fn advance(&mut self, elapsed: Duration) {
        let events = self.corruption.advance(elapsed, &mut self.rng);
        self.handle_corruption_events(events);
    }

    /// Fills `buffer` with the next stretch of the mix, firing every note due
    /// within it on the exact frame it lands on.
    pub fn render(&mut self, buffer: &mut [StereoSample]) {
        let spans = self.transport.advance(buffer.len());
        let triggers = self.scheduler.collect_triggers(&spans);
        let tempo = self.transport.tempo();
        let mut pending = triggers.iter().peekable();
        let soloed = self.soloed;

        for (frame, out) in buffer.iter_mut().enumerate() {
            while let Some(trigger) = pending.next_if(|t| t.frame <= frame) {
                if let Some(strip) = self.slots[trigger.slot.index()].strip.as_mut() {
                    strip
                        .source_mut()
                        .trigger(trigger.frequency, trigger.duration.as_seconds(tempo));
                }
            }

            let mut mix = StereoSample::SILENCE;
            for slot in self.slots.iter_mut() {
                let id = slot.id;
                if let Some(strip) = slot.strip.as_mut() {
                    let audible =
                        !strip.channel().is_muted() && soloed.map_or(true, |s| s == id);
                    mix += strip.render_frame(audible);
                }
            }
            mix += self.resolver.render_releasing();
            *out = self.ambience.transform_audio(mix);
        }
    }

    /// Changes the tempo. Notes already sounding keep their lengths; the steps
    /// still to come are retimed.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), SessionError> {
        self.transport.set_bpm(bpm).map_err(|e| {
            log::warn!("{e}");
            e
        })
    }

    #[allow(missing_docs)]
    pub fn set_slot_volume(&mut self, slot: SlotId, volume: Decibels) -> Result<(), SessionError> {
        self.check_slot(slot)?;
        if let Some(strip) = self.slots[slot.index()].strip.as_mut() {
            strip.channel_mut().set_volume(volume);
        }
        Ok(())
    }

    /// Swaps a sample slot between its A and B takes. Returns the take now
    /// playing, or `None` if there's nothing to swap.
    pub fn toggle_variation(&mut self, slot: SlotId) -> Result<Option<Variation>, SessionError> {
        self.check_slot(slot)?;
        let variation = self.slots[slot.index()]
            .strip
            .as_mut()
            .and_then(|s| s.source_mut().toggle_variation());
        if let Some(variation) = variation {
            self.notify(SessionEvent::VariationChanged { slot, variation });
        }
        Ok(variation)
    }

    #[allow(missing_docs)]
    pub fn slot(&self, slot: SlotId) -> Option<&Slot> {
        self.slots.get(slot.index())
    }

    #[allow(missing_docs)]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    #[allow(missing_docs)]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[allow(missing_docs)]
    pub fn mode(&self, slot: SlotId) -> Option<SourceMode> {
        self.slot(slot).and_then(|s| s.mode())
    }

    #[allow(missing_docs)]
    pub fn soloed(&self) -> Option<SlotId> {
        self.soloed
    }

    /// Whether the slot is heard, given its mute switch and any solo.
    pub fn is_audible(&self, slot: SlotId) -> bool {
        self.slot(slot).is_some_and(|s| {
            s.is_active() && !s.is_muted() && self.soloed.map_or(true, |solo| solo == slot)
        })
    }

    #[allow(missing_docs)]
    pub fn is_horror_mode(&self) -> bool {
        self.corruption.is_horror_mode()
    }

    /// The highest corruption level across all slots.
    pub fn max_corruption(&self) -> u8 {
        self.corruption.max_level()
    }

    #[allow(missing_docs)]
    pub fn corruption(&self) -> &CorruptionEngine {
        &self.corruption
    }

    #[allow(missing_docs)]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    #[allow(missing_docs)]
    pub fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }

    #[allow(missing_docs)]
    pub fn ambience(&self) -> &GlobalAmbience {
        &self.ambience
    }

    #[allow(missing_docs)]
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Strips removed from their slots that are still fading out.
    pub fn releasing_count(&self) -> usize {
        self.resolver.releasing_count()
    }

    fn check_slot(&self, slot: SlotId) -> Result<(), SessionError> {
        if slot.index() < self.slots.len() {
            Ok(())
        } else {
            Err(SessionError::InvalidSlot(slot))
        }
    }

    // Effects first, then the world hears about it.
    fn handle_corruption_events(&mut self, events: Vec<CorruptionEvent>) {
        if events.is_empty() {
            return;
        }
        for event in events {
            if let CorruptionEvent::Changed { slot, level, tier } = event {
                if let Some(strip) = self
                    .slots
                    .get_mut(slot.index())
                    .and_then(|s| s.strip.as_mut())
                {
                    strip.effects_mut().apply_tier(tier, level, &mut self.rng);
                }
                self.ambience.set_from_max_level(self.corruption.max_level());
            }
            self.notify(event.into());
        }
    }

    fn notify(&self, event: SessionEvent) {
        if let Err(e) = self.events.sender.send(event) {
            log::debug!("nobody is listening for session events: {e}");
        }
    }
}
