use crate::core::competitor::{Competitor, ResolveError};
use crate::core::race::{Race, RaceError};
use crate::core::sequence::SequenceTiming;
use crate::core::social::{Social, SocialError};
use crate::core::track::Track;
use crate::interfaces::api::{ApiError, CompetitorDescriptor, PersistedRace, RaceApi, SharedRace};
use crate::interfaces::race_state::Notice;
use flume::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// (ms) Default time a submission waits for its lookups.
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("enter a make and a model for at least one racer")]
    EmptySelection,

    #[error("none of the {} racers could be found", .0.len())]
    NoCompetitorsResolved(Vec<ResolveError>),

    #[error("the current race is still running")]
    RaceInProgress,

    #[error("there is no finished race to replay")]
    NothingToReplay,

    #[error("submission {generation} was superseded by submission {latest}")]
    Superseded { generation: u64, latest: u64 },

    #[error("lookups timed out after {timeout_ms}ms ({received} of {expected} answered)")]
    LookupTimedOut {
        timeout_ms: u64,
        received: usize,
        expected: usize,
    },

    #[error("failed to load shared race {race_identifier}: {source}")]
    Shared {
        race_identifier: u64,
        source: ApiError,
    },

    #[error("no listing row {0}")]
    UnknownListingRow(usize),

    #[error(transparent)]
    Race(#[from] RaceError),

    #[error("failed to serialize the selection: {0}")]
    Key(#[from] serde_json::Error),
}

/// Options of a race controller.
/// * `track` - Finish boundary of every race
/// * `timing` - Countdown timing, `SequenceTiming::fast_forward()` skips the lights
/// * `lookup_timeout` - Time a submission waits for all of its lookups
#[derive(Debug, Clone, Copy)]
pub struct ControllerOpts {
    pub track: Track,
    pub timing: SequenceTiming,
    pub lookup_timeout: Duration,
}

impl Default for ControllerOpts {
    fn default() -> Self {
        ControllerOpts {
            track: Track::default(),
            timing: SequenceTiming::standard(),
            lookup_timeout: Duration::from_millis(DEFAULT_LOOKUP_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A new race was built and started; `race` is None if it could not be saved.
    Started {
        race: Option<PersistedRace>,
        skipped: Vec<ResolveError>,
    },
    Replayed,
    /// A shared race was loaded and started without saving it again.
    Loaded { race: PersistedRace },
}

/// A dispatched submission whose lookups are in flight.
#[derive(Debug)]
pub struct Submission {
    generation: u64,
    key: String,
    expected: usize,
}

impl Submission {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
enum Reply {
    Lookup {
        generation: u64,
        slot: usize,
        result: Result<Competitor, ResolveError>,
    },
    Shared {
        generation: u64,
        result: Result<SharedRace, ApiError>,
    },
}

impl Reply {
    fn generation(&self) -> u64 {
        match self {
            Reply::Lookup { generation, .. } => *generation,
            Reply::Shared { generation, .. } => *generation,
        }
    }
}

/// RaceController turns user selections into races. It owns at most one race at a time and
/// remembers the last selection so that resubmitting it replays instead of saving a duplicate.
pub struct RaceController<A: RaceApi + 'static> {
    api: Arc<A>,
    opts: ControllerOpts,
    last_key: Option<String>,
    active: Option<Race>,
    generation: u64,
    tx: Sender<Reply>,
    rx: Receiver<Reply>,
    subscribers: Vec<Sender<Notice>>,
}

impl<A: RaceApi + 'static> RaceController<A> {
    pub fn new(api: Arc<A>, opts: ControllerOpts) -> RaceController<A> {
        let (tx, rx) = flume::unbounded();
        RaceController {
            api,
            opts,
            last_key: None,
            active: None,
            generation: 0,
            tx,
            rx,
            subscribers: Vec::new(),
        }
    }

    /// subscribe returns a receiver for all user-facing notices emitted from now on.
    pub fn subscribe(&mut self) -> Receiver<Notice> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn opts(&self) -> &ControllerOpts {
        &self.opts
    }

    pub fn race(&self) -> Option<&Race> {
        self.active.as_ref()
    }

    pub fn race_mut(&mut self) -> Option<&mut Race> {
        self.active.as_mut()
    }

    pub fn identity(&self) -> Option<&PersistedRace> {
        self.active.as_ref().and_then(|r| r.identity.as_ref())
    }

    /// social binds voting and commenting to the active race.
    pub fn social(&self) -> Result<Social<'_, A>, SocialError> {
        let identity = self.identity().ok_or(SocialError::RaceNotSaved)?;
        Ok(Social::new(self.api.as_ref(), identity).with_notices(self.subscribers.clone()))
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHODS --------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// submit runs the race for a selection. An unchanged selection replays the finished race
    /// without looking anything up or saving it again.
    pub fn submit(
        &mut self,
        selection: &[CompetitorDescriptor],
    ) -> Result<SubmitOutcome, ControllerError> {
        let (descriptors, key) = self.prepare(selection)?;

        if self.last_key.as_deref() == Some(key.as_str()) {
            if let Some(race) = &self.active {
                if !race.is_complete() {
                    return Err(ControllerError::RaceInProgress);
                }
                debug!("Selection unchanged, replaying");
                return self.replay();
            }
        }

        let submission = self.dispatch(descriptors, key);
        self.finish(submission)
    }

    /// begin dispatches the lookups of a selection and returns without waiting for them. Any
    /// submission begun earlier is superseded.
    pub fn begin(
        &mut self,
        selection: &[CompetitorDescriptor],
    ) -> Result<Submission, ControllerError> {
        let (descriptors, key) = self.prepare(selection)?;
        Ok(self.dispatch(descriptors, key))
    }

    /// finish waits for the lookups of a submission, then builds, saves and starts the race.
    pub fn finish(&mut self, submission: Submission) -> Result<SubmitOutcome, ControllerError> {
        self.check_current(submission.generation)?;

        let mut results: Vec<Option<Result<Competitor, ResolveError>>> =
            (0..submission.expected).map(|_| None).collect();
        let deadline = Instant::now() + self.opts.lookup_timeout;
        let mut received = 0;

        while received < submission.expected {
            match self.recv_current(submission.generation, deadline) {
                Ok(Reply::Lookup { slot, result, .. }) => {
                    if results[slot].is_none() {
                        received += 1;
                    }
                    results[slot] = Some(result);
                }
                Ok(reply) => debug!("Ignoring unexpected reply {:?}", reply),
                Err(RecvTimeoutError::Timeout) => {
                    let err = ControllerError::LookupTimedOut {
                        timeout_ms: self.opts.lookup_timeout.as_millis() as u64,
                        received,
                        expected: submission.expected,
                    };
                    warn!("{}", err);
                    self.notify(Notice::bad("The bike lookup took too long, please try again."));
                    return Err(err);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // the controller keeps a sender itself, so this cannot happen
                    unreachable!("lookup reply channel closed")
                }
            }
        }

        let mut competitors = Vec::with_capacity(submission.expected);
        let mut skipped = Vec::new();
        for result in results.into_iter().flatten() {
            match result {
                Ok(competitor) => competitors.push(competitor),
                Err(err) => {
                    warn!("Skipping racer: {}", err);
                    self.notify(Notice::bad(err.to_string()));
                    skipped.push(err);
                }
            }
        }

        if competitors.is_empty() {
            self.notify(Notice::bad("None of the bikes could be found."));
            return Err(ControllerError::NoCompetitorsResolved(skipped));
        }

        let identity = self.persist(&competitors);
        self.launch(competitors, identity.clone())?;
        self.last_key = Some(submission.key);

        Ok(SubmitOutcome::Started {
            race: identity,
            skipped,
        })
    }

    /// replay reruns the finished race with the same competitors and identity.
    pub fn replay(&mut self) -> Result<SubmitOutcome, ControllerError> {
        let previous = self.active.as_ref().ok_or(ControllerError::NothingToReplay)?;
        if !previous.is_complete() {
            return Err(ControllerError::RaceInProgress);
        }
        let competitors = previous.competitors().to_vec();
        let identity = previous.identity.clone();

        // a replay is a newer action than anything still in flight
        self.generation += 1;
        self.launch(competitors, identity)?;
        info!("Replaying race");
        Ok(SubmitOutcome::Replayed)
    }

    /// load_shared fetches a saved race and starts it without saving it again.
    pub fn load_shared(&mut self, race_identifier: u64) -> Result<SubmitOutcome, ControllerError> {
        self.generation += 1;
        let generation = self.generation;

        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = api.fetch_shared(race_identifier);
            // the receiver only goes away together with the controller
            let _ = tx.send(Reply::Shared { generation, result });
        });

        let deadline = Instant::now() + self.opts.lookup_timeout;
        let shared = loop {
            match self.recv_current(generation, deadline) {
                Ok(Reply::Shared { result, .. }) => break result,
                Ok(reply) => debug!("Ignoring unexpected reply {:?}", reply),
                Err(_) => {
                    break Err(ApiError::Transport(format!(
                        "no answer within {}ms",
                        self.opts.lookup_timeout.as_millis()
                    )))
                }
            }
        };

        let shared = match shared {
            Ok(shared) => shared,
            Err(source) => {
                warn!("Failed to load shared race {}: {}", race_identifier, source);
                self.notify(Notice::bad("That race could not be loaded."));
                return Err(ControllerError::Shared {
                    race_identifier,
                    source,
                });
            }
        };

        let mut competitors = Vec::with_capacity(shared.racers.len());
        let mut skipped = Vec::new();
        for record in shared.racers.iter() {
            match Competitor::from_record(record) {
                Ok(competitor) => competitors.push(competitor),
                Err(err) => {
                    warn!("Skipping racer of shared race: {}", err);
                    self.notify(Notice::bad(err.to_string()));
                    skipped.push(err);
                }
            }
        }
        if competitors.is_empty() {
            return Err(ControllerError::NoCompetitorsResolved(skipped));
        }

        let descriptors: Vec<CompetitorDescriptor> =
            shared.racers.iter().map(|r| r.descriptor()).collect();
        let key = serde_json::to_string(&descriptors)?;

        self.launch(competitors, Some(shared.race.clone()))?;
        self.last_key = Some(key);
        info!("Loaded shared race {}", shared.race.race_public_id);
        Ok(SubmitOutcome::Loaded { race: shared.race })
    }

    // ---------------------------------------------------------------------------------------------
    // METHODS (HELPERS) ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    fn prepare(
        &mut self,
        selection: &[CompetitorDescriptor],
    ) -> Result<(Vec<CompetitorDescriptor>, String), ControllerError> {
        let descriptors: Vec<CompetitorDescriptor> = selection
            .iter()
            .filter(|d| !d.is_blank())
            .map(|d| CompetitorDescriptor::new(&d.make, &d.model, d.year.as_deref()))
            .collect();
        if descriptors.is_empty() {
            self.notify(Notice::bad("Enter a make and a model to race."));
            return Err(ControllerError::EmptySelection);
        }
        let key = serde_json::to_string(&descriptors)?;
        Ok((descriptors, key))
    }

    fn dispatch(&mut self, descriptors: Vec<CompetitorDescriptor>, key: String) -> Submission {
        self.generation += 1;
        let generation = self.generation;
        let expected = descriptors.len();
        info!("Submission {}: looking up {} racers", generation, expected);

        for (slot, descriptor) in descriptors.into_iter().enumerate() {
            let api = Arc::clone(&self.api);
            let tx = self.tx.clone();
            thread::spawn(move || {
                let result = Competitor::resolve(&descriptor, api.as_ref());
                // the receiver only goes away together with the controller
                let _ = tx.send(Reply::Lookup {
                    generation,
                    slot,
                    result,
                });
            });
        }

        Submission {
            generation,
            key,
            expected,
        }
    }

    fn check_current(&self, generation: u64) -> Result<(), ControllerError> {
        if generation != self.generation {
            return Err(ControllerError::Superseded {
                generation,
                latest: self.generation,
            });
        }
        Ok(())
    }

    /// recv_current returns the next reply of `generation`, dropping replies of older ones.
    fn recv_current(&self, generation: u64, deadline: Instant) -> Result<Reply, RecvTimeoutError> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let reply = self.rx.recv_timeout(remaining)?;
            if reply.generation() == generation {
                return Ok(reply);
            }
            debug!(
                "Discarding stale reply of submission {} (current {})",
                reply.generation(),
                generation
            );
        }
    }

    /// persist saves the race once. A failure leaves the race unsaved but playable.
    fn persist(&mut self, competitors: &[Competitor]) -> Option<PersistedRace> {
        let model_ids: Vec<u64> = competitors.iter().map(|c| c.id).collect();
        match self.api.persist_race(&model_ids) {
            Ok(race) => {
                info!("Saved race {} ({})", race.race_identifier, race.race_public_id);
                Some(race)
            }
            Err(err) => {
                warn!("Failed to save race: {}", err);
                self.notify(Notice::bad(
                    "The race could not be saved, it will run without a share link.",
                ));
                None
            }
        }
    }

    fn launch(
        &mut self,
        competitors: Vec<Competitor>,
        identity: Option<PersistedRace>,
    ) -> Result<(), ControllerError> {
        let mut race = Race::new(competitors, self.opts.track, self.opts.timing)?;
        race.identity = identity;
        race.start_sequence()?;
        self.active = Some(race);
        Ok(())
    }

    fn notify(&mut self, notice: Notice) {
        self.subscribers.retain(|tx| tx.send(notice.clone()).is_ok());
    }
}
