// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Horror mode: a per-slot corruption level that spreads between neighboring
//! slots like a one-dimensional cellular automaton.

use crate::{rng::Rng, uid::SlotId};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// The discrete severity buckets derived from a corruption level.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    EnumIter,
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
pub enum Tier {
    #[default]
    None,
    Low,
    Medium,
    High,
    Full,
}

/// The minimum level of each tier above [Tier::None].
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct TierThresholds {
    #[allow(missing_docs)]
    #[derivative(Default(value = "25"))]
    pub low: u8,
    #[allow(missing_docs)]
    #[derivative(Default(value = "50"))]
    pub medium: u8,
    #[allow(missing_docs)]
    #[derivative(Default(value = "75"))]
    pub high: u8,
    #[allow(missing_docs)]
    #[derivative(Default(value = "100"))]
    pub full: u8,
}
impl TierThresholds {
    /// The tier a level falls into.
    pub fn tier(&self, level: u8) -> Tier {
        if level >= self.full {
            Tier::Full
        } else if level >= self.high {
            Tier::High
        } else if level >= self.medium {
            Tier::Medium
        } else if level >= self.low {
            Tier::Low
        } else {
            Tier::None
        }
    }

    /// The cut points must be strictly increasing, start above zero, and fit
    /// within the level range.
    pub fn is_valid(&self) -> bool {
        0 < self.low
            && self.low < self.medium
            && self.medium < self.high
            && self.high < self.full
            && self.full <= CorruptionEngine::MAX_LEVEL
    }
}

/// Tuning for the [CorruptionEngine].
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct CorruptionSettings {
    /// When false, cursed sounds play like any other.
    #[derivative(Default(value = "true"))]
    pub enabled: bool,

    /// The chance, per tick, that a spreading slot infects each neighbor.
    #[derivative(Default(value = "0.4"))]
    pub spread_rate: f64,

    /// How much a successful spread raises the neighbor's level.
    #[derivative(Default(value = "15"))]
    pub spread_amount: u8,

    /// Milliseconds between spread ticks.
    #[derivative(Default(value = "2000"))]
    pub tick_interval_ms: u64,

    #[allow(missing_docs)]
    pub tiers: TierThresholds,
}
impl CorruptionSettings {
    #[allow(missing_docs)]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// A notification that something about corruption changed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CorruptionEvent {
    /// A slot's level changed.
    Changed {
        #[allow(missing_docs)]
        slot: SlotId,
        #[allow(missing_docs)]
        level: u8,
        #[allow(missing_docs)]
        tier: Tier,
    },
    /// An episode began at the given slot.
    HorrorModeStarted {
        #[allow(missing_docs)]
        cursed_slot: SlotId,
    },
    /// The episode is over and every level is back to zero.
    HorrorModeEnded,
}

/// A repeating timer driven by whoever owns the clock. Starting a running
/// timer and cancelling a stopped one both do nothing.
#[derive(Debug, Default)]
pub struct SpreadTimer {
    interval: Duration,
    elapsed: Duration,
    is_running: bool,
}
impl SpreadTimer {
    #[allow(missing_docs)]
    pub fn new_with(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            ..Default::default()
        }
    }

    /// Returns false if the timer was already running.
    pub fn start(&mut self) -> bool {
        if self.is_running {
            return false;
        }
        self.is_running = true;
        self.elapsed = Duration::ZERO;
        true
    }

    /// Returns false if the timer wasn't running.
    pub fn cancel(&mut self) -> bool {
        if !self.is_running {
            return false;
        }
        self.is_running = false;
        self.elapsed = Duration::ZERO;
        true
    }

    #[allow(missing_docs)]
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    #[allow(missing_docs)]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Moves the timer's clock forward and returns how many times it fired.
    pub fn advance(&mut self, elapsed: Duration) -> usize {
        if !self.is_running {
            return 0;
        }
        self.elapsed += elapsed;
        let mut fired = 0;
        while self.elapsed >= self.interval {
            self.elapsed -= self.interval;
            fired += 1;
        }
        fired
    }
}

/// Tracks every slot's corruption level and runs the spread.
#[derive(Debug)]
pub struct CorruptionEngine {
    settings: CorruptionSettings,
    levels: Vec<u8>,
    horror_mode: bool,
    cursed_slot: Option<SlotId>,
    timer: SpreadTimer,
}
impl CorruptionEngine {
    /// The highest possible level.
    pub const MAX_LEVEL: u8 = 100;

    /// How much [CorruptionEngine::cure()] removes when the caller has no
    /// opinion.
    pub const DEFAULT_CURE_AMOUNT: u8 = 25;

    /// Creates an idle engine tracking `slot_count` slots.
    pub fn new_with(settings: CorruptionSettings, slot_count: usize) -> Self {
        let timer = SpreadTimer::new_with(settings.tick_interval());
        Self {
            settings,
            levels: vec![0; slot_count],
            horror_mode: false,
            cursed_slot: None,
            timer,
        }
    }

    #[allow(missing_docs)]
    pub fn settings(&self) -> &CorruptionSettings {
        &self.settings
    }

    #[allow(missing_docs)]
    pub fn slot_count(&self) -> usize {
        self.levels.len()
    }

    /// The level of a slot. Unknown slots read as zero.
    pub fn level(&self, slot: SlotId) -> u8 {
        self.levels.get(slot.index()).copied().unwrap_or_default()
    }

    #[allow(missing_docs)]
    pub fn tier(&self, slot: SlotId) -> Tier {
        self.tier_for_level(self.level(slot))
    }

    #[allow(missing_docs)]
    pub fn tier_for_level(&self, level: u8) -> Tier {
        self.settings.tiers.tier(level)
    }

    /// Every slot's level, indexed by slot.
    pub fn levels(&self) -> &[u8] {
        &self.levels
    }

    /// The highest level across all slots.
    pub fn max_level(&self) -> u8 {
        self.levels.iter().copied().max().unwrap_or_default()
    }

    #[allow(missing_docs)]
    pub fn is_horror_mode(&self) -> bool {
        self.horror_mode
    }

    /// Whether any slot has a nonzero level.
    pub fn is_corrupted(&self) -> bool {
        self.levels.iter().any(|l| *l > 0)
    }

    /// The slot whose cursed sound started the current episode.
    pub fn cursed_slot(&self) -> Option<SlotId> {
        self.cursed_slot
    }

    #[allow(missing_docs)]
    pub fn is_spreading(&self) -> bool {
        self.timer.is_running()
    }

    /// Begins an episode at `slot`, which becomes fully corrupted. Does nothing
    /// if an episode is already underway or corruption is disabled.
    pub fn start(&mut self, slot: SlotId) -> Vec<CorruptionEvent> {
        let mut events = Vec::default();
        if !self.settings.enabled {
            log::debug!("corruption is disabled; ignoring cursed sound in slot {slot}");
            return events;
        }
        if self.horror_mode {
            log::debug!("horror mode already active; ignoring cursed sound in slot {slot}");
            return events;
        }
        if slot.index() >= self.levels.len() {
            log::warn!("can't start corruption at nonexistent slot {slot}");
            return events;
        }
        self.horror_mode = true;
        self.cursed_slot = Some(slot);
        self.set_level(slot, Self::MAX_LEVEL, &mut events);
        self.timer.start();
        events.push(CorruptionEvent::HorrorModeStarted { cursed_slot: slot });
        log::info!("horror mode started from slot {slot}");
        events
    }

    /// One round of the automaton. Every decision is made against the levels
    /// as they stood when the round began, and only then applied.
    pub fn spread_tick(&mut self, rng: &mut Rng) -> Vec<CorruptionEvent> {
        let snapshot = self.levels.clone();
        let slot_count = snapshot.len();
        let mut changes = Vec::default();
        for (index, level) in snapshot.iter().enumerate() {
            if *level < self.settings.tiers.high {
                continue;
            }
            for neighbor in SlotId(index).neighbors(slot_count) {
                let neighbor_level = snapshot[neighbor.index()];
                if neighbor_level >= Self::MAX_LEVEL {
                    continue;
                }
                if rng.chance(self.settings.spread_rate) {
                    let new_level = neighbor_level
                        .saturating_add(self.settings.spread_amount)
                        .min(Self::MAX_LEVEL);
                    changes.push((neighbor, new_level));
                }
            }
        }

        let mut events = Vec::default();
        for (slot, level) in changes {
            self.set_level(slot, level, &mut events);
        }
        events
    }

    /// Lowers every corrupted slot by `amount`. Curing everything ends the
    /// episode.
    pub fn cure(&mut self, amount: u8) -> Vec<CorruptionEvent> {
        let mut events = Vec::default();
        for index in 0..self.levels.len() {
            let level = self.levels[index];
            if level > 0 {
                self.set_level(SlotId(index), level.saturating_sub(amount), &mut events);
            }
        }
        if !self.is_corrupted() {
            self.end_horror_mode(&mut events);
        }
        events
    }

    /// Ends any episode and zeroes everything.
    pub fn reset(&mut self) -> Vec<CorruptionEvent> {
        let mut events = Vec::default();
        self.end_horror_mode(&mut events);
        events
    }

    /// Drives the spread timer. Returns everything that changed as a result.
    pub fn advance(&mut self, elapsed: Duration, rng: &mut Rng) -> Vec<CorruptionEvent> {
        let mut events = Vec::default();
        for _ in 0..self.timer.advance(elapsed) {
            events.extend(self.spread_tick(rng));
        }
        events
    }

    fn end_horror_mode(&mut self, events: &mut Vec<CorruptionEvent>) {
        self.timer.cancel();
        self.cursed_slot = None;
        for index in 0..self.levels.len() {
            self.set_level(SlotId(index), 0, events);
        }
        if self.horror_mode {
            self.horror_mode = false;
            events.push(CorruptionEvent::HorrorModeEnded);
            log::info!("horror mode ended");
        }
    }

    // Clamps and records a level, noting the change only if there was one.
    fn set_level(&mut self, slot: SlotId, level: u8, events: &mut Vec<CorruptionEvent>) {
        let Some(current) = self.levels.get_mut(slot.index()) else {
            return;
        };
        let level = level.min(Self::MAX_LEVEL);
        if *current == level {
            return;
        }
        *current = level;
        events.push(CorruptionEvent::Changed {
            slot,
            level,
            tier: self.settings.tiers.tier(level),
        });
    }
}
