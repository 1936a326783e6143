// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Walks each slot's pattern against the transport and says which notes fall
//! where in a rendered block.

use crate::{
    catalog::{SoundDefinition, Step},
    sources::SourceMode,
    time::{MusicalTime, Subdivision},
    transport::TransportSpan,
    types::FrequencyHz,
    uid::SlotId,
};
use std::collections::BTreeMap;

/// A note that a slot's synthesized voice should play.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trigger {
    #[allow(missing_docs)]
    pub slot: SlotId,
    /// The frame within the block on which the note begins.
    pub frame: usize,
    /// Where on the transport the note falls.
    pub time: MusicalTime,
    #[allow(missing_docs)]
    pub frequency: FrequencyHz,
    /// How long the note may last. Never more than one step.
    pub duration: MusicalTime,
}

#[derive(Debug)]
struct ActivePattern {
    pattern: Vec<Step>,
    subdivision: Subdivision,
    mode: SourceMode,
}

/// One pattern per occupied slot, all stepping on the shared bar grid so that
/// patterns of different lengths stay lined up.
#[derive(Debug, Default)]
pub struct PatternScheduler {
    active: BTreeMap<SlotId, ActivePattern>,
}
impl PatternScheduler {
    /// Starts `sound`'s pattern for `slot`, replacing whatever was there.
    /// Sample-mode slots are tracked but never produce triggers, since their
    /// loop carries the rhythm.
    pub fn start_pattern(&mut self, slot: SlotId, sound: &SoundDefinition, mode: SourceMode) {
        if self.stop_pattern(slot) {
            log::debug!("slot {slot}: replacing the previous pattern");
        }
        self.active.insert(
            slot,
            ActivePattern {
                pattern: sound.pattern().to_vec(),
                subdivision: sound.subdivision(),
                mode,
            },
        );
    }

    /// Stops the slot's pattern. Returns false if there wasn't one.
    pub fn stop_pattern(&mut self, slot: SlotId) -> bool {
        self.active.remove(&slot).is_some()
    }

    #[allow(missing_docs)]
    pub fn is_active(&self, slot: SlotId) -> bool {
        self.active.contains_key(&slot)
    }

    /// How many slots have a pattern running.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Stops everything.
    pub fn reset(&mut self) {
        self.active.clear();
    }

    /// Every note that lands in `spans`, in the order they should fire.
    pub fn collect_triggers(&self, spans: &[TransportSpan]) -> Vec<Trigger> {
        let mut triggers = Vec::default();
        for span in spans {
            let range = span.range();
            for (slot, active) in self.active.iter() {
                if active.mode != SourceMode::Synthesized || active.pattern.is_empty() {
                    continue;
                }
                let step_length = active.subdivision.duration();
                let step_units = step_length.total_units().max(1);
                let start = range.start().total_units();
                let end = range.end().total_units();

                let mut step = start.div_ceil(step_units);
                while step * step_units < end {
                    if let Step::Hit(note) = active.pattern[step % active.pattern.len()] {
                        let time = MusicalTime::new_with_units(step * step_units);
                        triggers.push(Trigger {
                            slot: *slot,
                            frame: span.frame_for(time),
                            time,
                            frequency: note.frequency(),
                            duration: step_length,
                        });
                    }
                    step += 1;
                }
            }
        }
        triggers.sort_by_key(|t| (t.frame, t.slot));
        triggers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{Note, PitchClass, SoundCatalog},
        time::Tempo,
        transport::Transport,
    };

    fn frames_for(triggers: &[Trigger], slot: SlotId) -> Vec<usize> {
        triggers
            .iter()
            .filter(|t| t.slot == slot)
            .map(|t| t.frame)
            .collect()
    }

    #[test]
    fn kick_hits_on_the_beat() {
        let catalog = SoundCatalog::default();
        let mut scheduler = PatternScheduler::default();
        scheduler.start_pattern(SlotId(0), catalog.get("kick").unwrap(), SourceMode::Synthesized);
        assert!(scheduler.is_active(SlotId(0)));

        let mut transport = Transport::default();
        transport.start();
        // One bar at 120 BPM.
        let spans = transport.advance(44100 * 2);
        let triggers = scheduler.collect_triggers(&spans);
        // Eighth-note steps; hits on steps 0 and 4.
        assert_eq!(frames_for(&triggers, SlotId(0)), vec![0, 44100]);
        assert_eq!(triggers[0].frequency, Note::new(PitchClass::C, 1).frequency());
        assert_eq!(triggers[0].duration, MusicalTime::DURATION_EIGHTH);
    }

    #[test]
    fn different_lengths_stay_aligned() {
        let catalog = SoundCatalog::default();
        let mut scheduler = PatternScheduler::default();
        scheduler.start_pattern(SlotId(0), catalog.get("hihat").unwrap(), SourceMode::Synthesized);
        scheduler.start_pattern(SlotId(1), catalog.get("bass").unwrap(), SourceMode::Synthesized);

        let mut transport = Transport::default();
        transport.start();
        let mut first_block = Vec::default();
        let mut second_bar = Vec::default();
        // Render two bars in awkwardly sized blocks.
        let mut rendered = 0;
        while rendered < 44100 * 4 {
            let frames = 1000.min(44100 * 4 - rendered);
            let spans = transport.advance(frames);
            for t in scheduler.collect_triggers(&spans) {
                let absolute = rendered + t.frame;
                if absolute < 44100 * 2 {
                    first_block.push((t.slot, absolute));
                } else {
                    second_bar.push((t.slot, absolute - 44100 * 2));
                }
            }
            rendered += frames;
        }
        assert_eq!(
            first_block, second_bar,
            "the 8-step and 16-step patterns both repeat every bar"
        );
        assert_eq!(first_block.iter().filter(|(s, _)| *s == SlotId(0)).count(), 8);
        // The bass pattern has ten hits out of sixteen steps.
        assert_eq!(first_block.iter().filter(|(s, _)| *s == SlotId(1)).count(), 10);
    }

    #[test]
    fn nothing_fires_after_stop() {
        let catalog = SoundCatalog::default();
        let mut scheduler = PatternScheduler::default();
        scheduler.start_pattern(SlotId(2), catalog.get("hihat").unwrap(), SourceMode::Synthesized);
        assert!(scheduler.stop_pattern(SlotId(2)));
        assert!(!scheduler.stop_pattern(SlotId(2)), "second stop is a no-op");

        let mut transport = Transport::default();
        transport.start();
        assert!(scheduler.collect_triggers(&transport.advance(44100)).is_empty());
    }

    #[test]
    fn sample_slots_do_not_trigger() {
        let catalog = SoundCatalog::default();
        let mut scheduler = PatternScheduler::default();
        scheduler.start_pattern(SlotId(0), catalog.get("kick").unwrap(), SourceMode::Sample);
        assert!(scheduler.is_active(SlotId(0)));

        let mut transport = Transport::default();
        transport.start();
        assert!(scheduler.collect_triggers(&transport.advance(44100)).is_empty());
    }

    #[test]
    fn tempo_change_retimes_future_steps() {
        let catalog = SoundCatalog::default();
        let mut scheduler = PatternScheduler::default();
        scheduler.start_pattern(SlotId(0), catalog.get("hihat").unwrap(), SourceMode::Synthesized);

        let mut transport = Transport::new_with(Tempo(120.0), 4);
        transport.start();
        let triggers = scheduler.collect_triggers(&transport.advance(22050));
        assert_eq!(frames_for(&triggers, SlotId(0)), vec![0, 11025]);

        // Half speed: eighth notes are now 0.5 s apart.
        assert!(transport.set_bpm(60.0).is_ok());
        let triggers = scheduler.collect_triggers(&transport.advance(44100));
        assert_eq!(frames_for(&triggers, SlotId(0)), vec![0, 22050]);
    }

    #[test]
    fn restarting_replaces_the_pattern() {
        let catalog = SoundCatalog::default();
        let mut scheduler = PatternScheduler::default();
        scheduler.start_pattern(SlotId(0), catalog.get("hihat").unwrap(), SourceMode::Synthesized);
        scheduler.start_pattern(SlotId(0), catalog.get("kick").unwrap(), SourceMode::Synthesized);
        assert_eq!(scheduler.active_count(), 1);

        let mut transport = Transport::default();
        transport.start();
        let triggers = scheduler.collect_triggers(&transport.advance(44100 * 2));
        assert_eq!(triggers.len(), 2, "only the kick's two hits");

        scheduler.reset();
        assert_eq!(scheduler.active_count(), 0);
    }
}
