mod common;

use bikerace::core::race::{Race, RaceError};
use bikerace::core::sequence::{LightState, RacePhase, SequenceTiming};
use bikerace::core::track::Track;
use bikerace::interfaces::race_state::RaceNotice;
use common::competitor;
use proptest::prelude::*;

#[test]
fn test_torque_heavy_bike_wins_snapshot() {
    // 1280px viewport -> 1080px track
    let track = Track::from_viewport(1280.0).unwrap();
    let racers = vec![
        competitor(1, "Bike A", 120.0, 120.0, 233.0),
        competitor(2, "Bike B", 120.0, 79.0, 188.0),
    ];
    let mut race = Race::new(racers, track, SequenceTiming::standard()).unwrap();
    let result = race.run_to_completion().unwrap();

    assert_eq!(race.phase(), RacePhase::Finished);
    let winner = result.winner().unwrap();
    assert_eq!(winner.name, "Bike A");
    assert_eq!(winner.ordinal, "1st");
    assert_eq!(winner.ticks, 146);
    assert_eq!(winner.finish_ms, 4000 + 146 * 40);

    let second = &result.placings[1];
    assert_eq!(second.name, "Bike B");
    assert_eq!(second.ordinal, "2nd");
    assert_eq!(second.ticks, 152);
    assert_eq!(second.finish_ms, 4000 + 152 * 40);
}

#[test]
fn test_fast_forward_only_drops_the_countdown() {
    let racers = vec![
        competitor(1, "Bike A", 120.0, 120.0, 233.0),
        competitor(2, "Bike B", 120.0, 79.0, 188.0),
    ];
    let mut race = Race::new(racers, Track::default(), SequenceTiming::fast_forward()).unwrap();
    let result = race.run_to_completion().unwrap();

    assert_eq!(result.placings[0].ticks, 146);
    assert_eq!(result.placings[0].finish_ms, 146 * 40);
}

#[test]
fn test_single_competitor_takes_first() {
    let mut race = Race::new(
        vec![competitor(9, "Solo Bike", 50.0, 40.0, 150.0)],
        Track::default(),
        SequenceTiming::fast_forward(),
    )
    .unwrap();
    let rx = race.subscribe();
    let result = race.run_to_completion().unwrap();

    assert_eq!(result.placings.len(), 1);
    assert_eq!(result.placings[0].ordinal, "1st");
    assert_eq!(result.placings[0].competitor_id, 9);
    assert!(race.is_complete());

    let completes = rx
        .drain()
        .filter(|n| matches!(n, RaceNotice::Complete(_)))
        .count();
    assert_eq!(completes, 1);
}

#[test]
fn test_finish_line_reached_exactly_is_not_finished() {
    // acc 0.5 * 4.0 + 1 + 0.5 * 7 = 6.5px per first tick
    let track = Track {
        viewport_width: 206.5,
        length: 6.5,
    };
    let mut race = Race::new(
        vec![competitor(1, "Even Bike", 100.0, 100.0, 200.0)],
        track,
        SequenceTiming::fast_forward(),
    )
    .unwrap();
    race.start_sequence().unwrap();

    race.advance_to(40);
    assert_eq!(race.competitors()[0].displacement(), 6.5);
    assert!(!race.is_complete());

    race.advance_to(80);
    assert!(race.is_complete());
    assert_eq!(race.result().placings[0].ticks, 2);
}

#[test]
fn test_early_arrival_cannot_place_a_competitor_twice() {
    let racers = vec![
        competitor(1, "Bike A", 120.0, 120.0, 233.0),
        competitor(2, "Bike B", 120.0, 79.0, 188.0),
    ];
    let mut race = Race::new(racers, Track::default(), SequenceTiming::standard()).unwrap();

    assert_eq!(
        race.on_competitor_finish(0),
        Err(RaceError::NotRunning(RacePhase::Idle))
    );
    race.start_sequence().unwrap();
    race.advance_to(1500);
    assert_eq!(
        race.on_competitor_finish(1),
        Err(RaceError::NotRunning(RacePhase::Countdown(LightState::Red)))
    );

    let result = race.run_to_completion().unwrap();
    let names: Vec<&str> = result.placings.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Bike A", "Bike B"]);
    assert_eq!(race.on_competitor_finish(1), Ok(None));
}

proptest! {
    /// Property: every competitor finishes exactly once and the finish order is a permutation
    #[test]
    fn prop_finish_order_is_permutation(
        specs in prop::collection::vec((1.0f64..250.0, 1.0f64..200.0, 80.0f64..350.0), 1..8)
    ) {
        let racers = specs
            .iter()
            .enumerate()
            .map(|(i, &(power, torque, weight))| {
                competitor(i as u64, &format!("Bike {}", i), power, torque, weight)
            })
            .collect();
        let mut race = Race::new(racers, Track::default(), SequenceTiming::fast_forward()).unwrap();
        let result = race.run_to_completion().unwrap();

        let mut indices: Vec<usize> = result.placings.iter().map(|p| p.index).collect();
        indices.sort_unstable();
        prop_assert_eq!(indices, (0..specs.len()).collect::<Vec<usize>>());

        let positions: Vec<usize> = result.placings.iter().map(|p| p.position).collect();
        prop_assert_eq!(positions, (1..=specs.len()).collect::<Vec<usize>>());

        prop_assert!(race.is_complete());
        prop_assert_eq!(race.active_timers(), 0);
        prop_assert_eq!(race.next_due(), None);
    }

    /// Property: finish times never decrease along the finish order
    #[test]
    fn prop_finish_times_are_ordered(
        specs in prop::collection::vec((1.0f64..250.0, 1.0f64..200.0, 80.0f64..350.0), 2..6)
    ) {
        let racers = specs
            .iter()
            .enumerate()
            .map(|(i, &(power, torque, weight))| {
                competitor(i as u64, &format!("Bike {}", i), power, torque, weight)
            })
            .collect();
        let mut race = Race::new(racers, Track::default(), SequenceTiming::fast_forward()).unwrap();
        let result = race.run_to_completion().unwrap();

        for pair in result.placings.windows(2) {
            prop_assert!(pair[0].finish_ms <= pair[1].finish_ms);
        }
    }
}
