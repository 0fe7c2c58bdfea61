use bikerace::core::controller::{ControllerOpts, RaceController, SubmitOutcome};
use bikerace::core::listing::{ListingConfig, RaceListing};
use bikerace::core::race::Race;
use bikerace::core::sequence::SequenceTiming;
use bikerace::core::track::Track;
use bikerace::interfaces::local_api::LocalApi;
use bikerace::interfaces::race_state::{Mood, Notice, RaceNotice};
use bikerace::post::race_result::RaceResult;
use bikerace::pre::read_catalog::read_catalog;
use bikerace::pre::sim_opts::{ListingChoice, SimOpts};
use clap::Parser;
use flume::Receiver;
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_notices(notices: &Receiver<Notice>) {
    for notice in notices.drain() {
        match notice.mood {
            Mood::Good => info!("{}", notice.message),
            Mood::Bad => warn!("{}", notice.message),
        }
    }
}

fn print_race_notices(race_notices: &Receiver<RaceNotice>) {
    for notice in race_notices.drain() {
        match notice {
            RaceNotice::Lights(lights) => info!("Lights: {:?}", lights),
            RaceNotice::Started => info!("Go!"),
            RaceNotice::Finished(placing) => {
                info!("{} - {}", placing.ordinal, placing.name)
            }
            RaceNotice::Complete(_) => info!("Race complete"),
        }
    }
}

/// run_race drives the active race to its end. With a real-time factor > 0 the loop sleeps between
/// timers so that the race takes `race duration / realtime_factor` on the wall clock.
fn run_race(race: &mut Race, realtime_factor: f64) -> RaceResult {
    let race_notices = race.subscribe();

    if realtime_factor <= 0.0 {
        while !race.is_complete() && race.step() {}
        print_race_notices(&race_notices);
        return race.result();
    }

    while !race.is_complete() {
        let next_due = match race.next_due() {
            Some(t) => t,
            None => break,
        };

        // sleep until the next timer is due in real-time as well (calculation in ms)
        let t_sleep = (next_due.saturating_sub(race.now())) as f64 / realtime_factor;
        if t_sleep > 0.0 {
            sleep(Duration::from_micros((t_sleep * 1000.0) as u64));
        }

        race.step();
        print_race_notices(&race_notices);
        debug!(
            "t = {}ms, standings {:?}",
            race.now(),
            race.standings()
        );
    }

    race.result()
}

fn print_listing(api: &LocalApi, choice: ListingChoice) -> anyhow::Result<()> {
    let config = match choice {
        ListingChoice::Popular => ListingConfig::popular_pairs(),
        ListingChoice::Recent => ListingConfig::recent_races(None),
    };
    let mut listing = RaceListing::new(config);
    listing.populate(api)?;
    let rows = listing.rows();

    println!("{}:", listing.config.title);
    if rows.is_empty() {
        println!("  (no saved races yet)");
    }
    for row in rows.iter() {
        println!("  #{} {}", row.race_id, row.label);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();
    init_logging(sim_opts.debug);

    info!("Reading racer catalog from {:?}", sim_opts.catalog_path);
    let catalog = read_catalog(&sim_opts.catalog_path)?;
    let descriptors = sim_opts.descriptors()?;

    let opts = ControllerOpts {
        track: Track::from_viewport(sim_opts.viewport_width)?,
        timing: if sim_opts.fast_forward {
            SequenceTiming::fast_forward()
        } else {
            SequenceTiming::standard()
        },
        lookup_timeout: Duration::from_millis(sim_opts.lookup_timeout_ms),
    };
    info!(
        "Racing on a {:.0}px track ({} racers in the catalog)",
        opts.track.length,
        catalog.racers.len()
    );

    let api = Arc::new(LocalApi::new(catalog));
    if let Some(user) = &sim_opts.user {
        api.sign_in(1, user);
    }
    let mut controller = RaceController::new(Arc::clone(&api), opts);
    let notices = controller.subscribe();

    // EXECUTION -----------------------------------------------------------------------------------
    let outcome = match sim_opts.shared {
        Some(race_identifier) => controller.load_shared(race_identifier),
        None => controller.submit(&descriptors),
    };
    print_notices(&notices);
    let outcome = outcome?;

    match &outcome {
        SubmitOutcome::Started { race: Some(race), .. } | SubmitOutcome::Loaded { race } => {
            info!("Share link: /race/{}", race.race_identifier)
        }
        SubmitOutcome::Started { race: None, .. } => info!("Race is not saved"),
        SubmitOutcome::Replayed => {}
    }

    let t_start = Instant::now();
    let race = controller
        .race_mut()
        .ok_or_else(|| anyhow::anyhow!("No race was started!"))?;
    let race_result = run_race(race, sim_opts.realtime_factor);
    info!("Execution time: {}ms", t_start.elapsed().as_millis());

    // POST-PROCESSING -----------------------------------------------------------------------------
    race_result.print_placings()?;

    if let Some(output_path) = &sim_opts.output_path {
        race_result.write_placings_csv(output_path)?;
        info!("Placings written to {:?}", output_path);
    }

    if sim_opts.vote.is_some() || sim_opts.comment.is_some() {
        match controller.social() {
            Ok(social) => {
                let mut outcome = Ok(());
                if let Some(vote) = sim_opts.vote {
                    outcome = social.vote(vote);
                }
                if let Some(text) = sim_opts.comment.as_deref().filter(|_| outcome.is_ok()) {
                    outcome = social.add_comment(text);
                }
                match outcome.and_then(|_| social.votes()) {
                    Ok(tally) => info!("Votes: {} up, {} down", tally.upvotes, tally.downvotes),
                    Err(err) => warn!("{}", err.user_message()),
                }
            }
            Err(err) => warn!("{}", err.user_message()),
        }
        print_notices(&notices);
    }

    if let Some(choice) = sim_opts.list {
        print_listing(&api, choice)?;
    }

    if sim_opts.replay {
        info!("Replaying race...");
        controller.replay()?;
        print_notices(&notices);
        let race = controller
            .race_mut()
            .ok_or_else(|| anyhow::anyhow!("No race to replay!"))?;
        run_race(race, sim_opts.realtime_factor).print_placings()?;
    }

    Ok(())
}
