mod common;

use bikerace::core::controller::{ControllerError, ControllerOpts, RaceController, SubmitOutcome};
use bikerace::core::social::SocialError;
use bikerace::interfaces::api::{CompetitorDescriptor, RaceApi};
use bikerace::interfaces::local_api::LocalApi;
use bikerace::interfaces::race_state::Mood;
use common::{catalog, desc, fast_opts};
use std::sync::Arc;
use std::time::Duration;

fn controller() -> (Arc<LocalApi>, RaceController<LocalApi>) {
    let api = Arc::new(LocalApi::new(catalog()));
    let controller = RaceController::new(Arc::clone(&api), fast_opts());
    (api, controller)
}

fn run_active(controller: &mut RaceController<LocalApi>) -> Vec<String> {
    let race = controller.race_mut().unwrap();
    let result = race.run_to_completion().unwrap();
    result.placings.iter().map(|p| p.name.to_owned()).collect()
}

#[test]
fn test_unknown_racer_is_skipped_and_reported() {
    let (api, mut controller) = controller();
    let notices = controller.subscribe();

    let outcome = controller
        .submit(&[desc("Bike", "A"), desc("Unknown", "Unknown")])
        .unwrap();

    match outcome {
        SubmitOutcome::Started { race, skipped } => {
            assert_eq!(race.unwrap().race_identifier, 1);
            assert_eq!(skipped.len(), 1);
            assert_eq!(skipped[0].to_string(), "Failed to find Unknown Unknown");
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let notices: Vec<_> = notices.drain().collect();
    assert!(notices
        .iter()
        .any(|n| n.mood == Mood::Bad && n.message == "Failed to find Unknown Unknown"));

    assert_eq!(controller.race().unwrap().competitors().len(), 1);
    assert_eq!(run_active(&mut controller), vec!["Bike A".to_owned()]);
    assert_eq!(api.persist_calls(), 1);
}

#[test]
fn test_no_resolved_racers_saves_nothing() {
    let (api, mut controller) = controller();

    let err = controller
        .submit(&[desc("Unknown", "Unknown"), desc("Other", "Ghost")])
        .unwrap_err();

    assert!(matches!(err, ControllerError::NoCompetitorsResolved(ref e) if e.len() == 2));
    assert_eq!(api.persist_calls(), 0);
    assert!(controller.race().is_none());
}

#[test]
fn test_invalid_specs_are_skipped() {
    let (_, mut controller) = controller();

    let outcome = controller
        .submit(&[desc("Broken", "Bike"), desc("Bike", "B")])
        .unwrap();

    assert!(matches!(outcome, SubmitOutcome::Started { ref skipped, .. } if skipped.len() == 1));
    assert_eq!(run_active(&mut controller), vec!["Bike B".to_owned()]);
}

#[test]
fn test_blank_selection_is_rejected() {
    let (api, mut controller) = controller();

    let err = controller
        .submit(&[desc("  ", "MT-07"), desc("", "")])
        .unwrap_err();

    assert!(matches!(err, ControllerError::EmptySelection));
    assert_eq!(api.lookup_calls(), 0);
}

#[test]
fn test_same_selection_replays_without_saving() {
    let (api, mut controller) = controller();
    let selection = [desc("Bike", "A"), desc("Bike", "B")];

    controller.submit(&selection).unwrap();
    assert!(matches!(
        controller.submit(&selection),
        Err(ControllerError::RaceInProgress)
    ));

    let first = run_active(&mut controller);
    assert_eq!(first, vec!["Bike A".to_owned(), "Bike B".to_owned()]);
    let lookups = api.lookup_calls();

    // whitespace differences do not change the selection
    let outcome = controller
        .submit(&[desc(" Bike ", "A"), desc("Bike", " B")])
        .unwrap();
    assert_eq!(outcome, SubmitOutcome::Replayed);
    assert_eq!(controller.identity().unwrap().race_identifier, 1);

    let second = run_active(&mut controller);
    assert_eq!(first, second);
    assert_eq!(api.persist_calls(), 1);
    assert_eq!(api.lookup_calls(), lookups);
}

#[test]
fn test_changed_selection_saves_a_new_race() {
    let (api, mut controller) = controller();

    controller.submit(&[desc("Bike", "A")]).unwrap();
    run_active(&mut controller);
    controller.submit(&[desc("Bike", "B")]).unwrap();

    assert_eq!(api.persist_calls(), 2);
    assert_eq!(controller.identity().unwrap().race_identifier, 2);
}

#[test]
fn test_later_submission_supersedes_earlier() {
    let (_, mut controller) = controller();

    let first = controller.begin(&[desc("Bike", "A")]).unwrap();
    let second = controller.begin(&[desc("Bike", "B")]).unwrap();

    let err = controller.finish(first).unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Superseded {
            generation: 1,
            latest: 2
        }
    ));

    controller.finish(second).unwrap();
    assert_eq!(run_active(&mut controller), vec!["Bike B".to_owned()]);
}

#[test]
fn test_slow_lookup_times_out() {
    let api = Arc::new(LocalApi::new(catalog()).with_lookup_delay(Duration::from_millis(300)));
    let opts = ControllerOpts {
        lookup_timeout: Duration::from_millis(20),
        ..fast_opts()
    };
    let mut controller = RaceController::new(Arc::clone(&api), opts);
    let notices = controller.subscribe();

    let err = controller.submit(&[desc("Bike", "A")]).unwrap_err();

    assert!(matches!(
        err,
        ControllerError::LookupTimedOut {
            timeout_ms: 20,
            received: 0,
            expected: 1
        }
    ));
    assert!(notices.drain().any(|n| n.mood == Mood::Bad));
    assert_eq!(api.persist_calls(), 0);
}

#[test]
fn test_failed_save_still_races() {
    let api = Arc::new(LocalApi::new(catalog()).with_failing_persistence());
    let mut controller = RaceController::new(Arc::clone(&api), fast_opts());
    let notices = controller.subscribe();

    let outcome = controller.submit(&[desc("Bike", "A"), desc("Bike", "B")]).unwrap();

    assert!(matches!(outcome, SubmitOutcome::Started { race: None, .. }));
    assert!(notices.drain().any(|n| n.mood == Mood::Bad));
    assert_eq!(run_active(&mut controller).len(), 2);
    assert!(matches!(controller.social(), Err(SocialError::RaceNotSaved)));
}

#[test]
fn test_shared_race_loads_without_saving() {
    let api = Arc::new(LocalApi::new(catalog()));
    let saved = api.persist_race(&[2, 1]).unwrap();
    let mut controller = RaceController::new(Arc::clone(&api), fast_opts());

    let outcome = controller.load_shared(saved.race_identifier).unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::Loaded {
            race: saved.clone()
        }
    );
    assert_eq!(api.persist_calls(), 1);

    let names = run_active(&mut controller);
    assert_eq!(names, vec!["Bike A".to_owned(), "Bike B".to_owned()]);

    // submitting the loaded racers again replays the shared race
    let selection: Vec<CompetitorDescriptor> = vec![desc("Bike", "B"), desc("Bike", "A")];
    assert_eq!(controller.submit(&selection).unwrap(), SubmitOutcome::Replayed);
    assert_eq!(controller.identity(), Some(&saved));
    assert_eq!(api.persist_calls(), 1);
}

#[test]
fn test_unknown_shared_race_fails() {
    let (_, mut controller) = controller();

    let err = controller.load_shared(42).unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Shared {
            race_identifier: 42,
            ..
        }
    ));
}

#[test]
fn test_replay_without_race_fails() {
    let (_, mut controller) = controller();
    assert!(matches!(
        controller.replay(),
        Err(ControllerError::NothingToReplay)
    ));
}

#[test]
fn test_shipped_catalog_races() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../input/catalog.json");
    let catalog = bikerace::pre::read_catalog::read_catalog(&path).unwrap();
    let api = Arc::new(LocalApi::new(catalog));
    let mut controller = RaceController::new(Arc::clone(&api), fast_opts());

    controller
        .submit(&[desc("yamaha", "mt-07"), desc("Kawasaki", "Z900")])
        .unwrap();

    // higher power and torque per kg wins on every tick
    assert_eq!(
        run_active(&mut controller),
        vec!["Kawasaki Z900".to_owned(), "Yamaha MT-07".to_owned()]
    );
}

#[test]
fn test_comment_on_saved_race_reports_success() {
    let (api, mut controller) = controller();
    controller.submit(&[desc("Bike", "A"), desc("Bike", "B")]).unwrap();
    run_active(&mut controller);
    let notices = controller.subscribe();

    let social = controller.social().unwrap();
    assert_eq!(
        social.add_comment("close one").unwrap_err().user_message(),
        "You must have an account to comment."
    );

    api.sign_in(7, "rider");
    social.add_comment("close one").unwrap();

    let good: Vec<String> = notices
        .drain()
        .filter(|n| n.mood == Mood::Good)
        .map(|n| n.message)
        .collect();
    assert_eq!(good, vec!["Successfully added comment!".to_owned()]);
}
