// Copyright (c) 2023 Mike Tsao. All rights reserved.

use more_asserts::{assert_ge, assert_le};
use std::time::Duration;
use wrenchbox::{
    corruption::{CorruptionEngine, CorruptionEvent, TierThresholds},
    prelude::*,
    rng::Rng,
};

const TICK: Duration = Duration::from_secs(2);

fn session_with_spread_rate(spread_rate: f64) -> Session {
    let mut settings = Settings::default();
    settings.corruption = CorruptionSettings {
        spread_rate,
        ..Default::default()
    };
    let mut session = Session::new_with(settings, Box::<SampleBank>::default()).unwrap();
    session.reseed(7);
    session
}

#[test]
fn tiers_change_at_their_thresholds() {
    let tiers = TierThresholds::default();
    for (level, tier) in [
        (0, Tier::None),
        (24, Tier::None),
        (25, Tier::Low),
        (49, Tier::Low),
        (50, Tier::Medium),
        (74, Tier::Medium),
        (75, Tier::High),
        (99, Tier::High),
        (100, Tier::Full),
    ] {
        assert_eq!(tiers.tier(level), tier, "level {level}");
    }
}

// A cursed sound in the middle slot infects both neighbors; with a certain
// spread, they reach the high tier on the fifth tick.
#[test]
fn cursed_middle_slot_spreads_to_neighbors() {
    let mut session = session_with_spread_rate(1.0);
    let events = session.subscribe();
    session.assign(SlotId(3), "cursed").unwrap();
    assert!(session.is_horror_mode());
    assert_eq!(session.corruption().cursed_slot(), Some(SlotId(3)));

    for _ in 0..4 {
        session.advance(TICK);
    }
    assert_eq!(session.corruption().level(SlotId(2)), 60);
    assert_eq!(session.corruption().level(SlotId(4)), 60);

    session.advance(TICK);
    for neighbor in [SlotId(2), SlotId(4)] {
        assert_ge!(session.corruption().level(neighbor), 75);
        assert_eq!(session.corruption().tier(neighbor), Tier::High);
    }
    assert_eq!(
        session.corruption().level(SlotId(1)),
        0,
        "slot 1 only starts catching it once slot 2 is high"
    );

    let changes = events
        .try_iter()
        .filter(|e| matches!(e, SessionEvent::CorruptionChanged { .. }))
        .count();
    assert_eq!(changes, 1 + 5 * 2);
}

#[test]
fn zero_spread_rate_keeps_it_contained() {
    let mut session = session_with_spread_rate(0.0);
    session.assign(SlotId(3), "cursed").unwrap();
    session.advance(Duration::from_secs(60));
    assert_eq!(
        session.corruption().levels(),
        &[0, 0, 0, CorruptionEngine::MAX_LEVEL, 0, 0, 0]
    );
}

#[test]
fn a_second_cursed_sound_changes_nothing() {
    let mut session = session_with_spread_rate(0.0);
    session.assign(SlotId(3), "cursed").unwrap();
    let events = session.subscribe();
    assert_eq!(events.try_iter().count(), 3);

    session.assign(SlotId(0), "cursed").unwrap();
    assert_eq!(session.corruption().cursed_slot(), Some(SlotId(3)));
    assert_eq!(session.corruption().level(SlotId(0)), 0);
    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        vec![SessionEvent::SlotAssigned {
            slot: SlotId(0),
            sound: "cursed".to_string(),
            mode: SourceMode::Synthesized
        }]
    );
}

#[test]
fn cure_lowers_everything_and_finally_ends_it() {
    let mut session = session_with_spread_rate(1.0);
    for slot in 0..7 {
        let sound = if slot == 3 { "cursed" } else { "hihat" };
        session.assign(SlotId(slot), sound).unwrap();
    }
    session.advance(Duration::from_secs(60));
    assert!(session
        .corruption()
        .levels()
        .iter()
        .all(|l| *l == CorruptionEngine::MAX_LEVEL));
    assert_eq!(session.ambience().level(), 100);

    session.cure(Session::UI_CURE_AMOUNT);
    assert!(session.corruption().levels().iter().all(|l| *l == 70));
    assert_eq!(session.corruption().tier(SlotId(0)), Tier::Medium);
    assert!(session.is_horror_mode(), "still corrupted, so still on");
    assert_eq!(session.ambience().level(), 70);

    let events = session.subscribe();
    session.cure(100);
    assert!(!session.is_horror_mode());
    assert_eq!(session.max_corruption(), 0);
    assert_eq!(session.ambience().level(), 0);
    for slot in session.slots() {
        assert!(slot.strip().unwrap().effects().is_transparent());
    }
    let events: Vec<_> = events.try_iter().collect();
    assert_eq!(events.last(), Some(&SessionEvent::HorrorModeEnded));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::HorrorModeEnded))
            .count(),
        1
    );

    // Nothing left to cure.
    let events = session.subscribe();
    session.cure(100);
    assert_eq!(events.try_iter().count(), 0);
}

#[test]
fn levels_stay_in_range() {
    for seed in 0..20 {
        let mut engine = CorruptionEngine::new_with(
            CorruptionSettings {
                spread_rate: 0.5,
                spread_amount: 40,
                ..Default::default()
            },
            7,
        );
        let mut rng = Rng::new_with_seed(seed);
        engine.start(SlotId((seed % 7) as usize));
        for _ in 0..30 {
            for event in engine.spread_tick(&mut rng) {
                if let CorruptionEvent::Changed { level, tier, .. } = event {
                    assert_le!(level, CorruptionEngine::MAX_LEVEL);
                    assert_eq!(tier, engine.tier_for_level(level));
                }
            }
            assert!(engine
                .levels()
                .iter()
                .all(|l| *l <= CorruptionEngine::MAX_LEVEL));
        }
    }
}

#[test]
fn reset_all_clears_the_episode() {
    let mut session = session_with_spread_rate(1.0);
    session.assign(SlotId(3), "cursed").unwrap();
    session.assign(SlotId(2), "bass").unwrap();
    session.advance(Duration::from_secs(20));

    session.reset_all();
    assert!(!session.is_horror_mode());
    assert_eq!(session.max_corruption(), 0);
    assert!(session.slots().iter().all(|s| !s.is_active()));
    assert!(!session.transport().is_running());

    // The spread timer is gone too.
    session.advance(Duration::from_secs(20));
    assert_eq!(session.max_corruption(), 0);
}
