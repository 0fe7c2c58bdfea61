use crate::core::competitor::{Competitor, TICK_PERIOD_MS};
use crate::core::scheduler::{Scheduler, TimerHandle};
use crate::core::sequence::{LightState, RacePhase, SequenceStage, SequenceTiming};
use crate::core::track::Track;
use crate::interfaces::api::PersistedRace;
use crate::interfaces::race_state::{CompetitorState, RaceNotice, RaceState};
use crate::post::race_result::{Placing, RaceResult};
use flume::{Receiver, Sender};
use helpers::general::{argsort, ordinal, SortOrder};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RaceError {
    #[error("a race needs at least one competitor")]
    NoCompetitors,

    #[error("race already started (phase {0:?})")]
    AlreadyStarted(RacePhase),

    #[error("no competitor at index {0}")]
    UnknownCompetitor(usize),

    #[error("race is not running (phase {0:?})")]
    NotRunning(RacePhase),
}

/// Timer events of a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RaceTimer {
    Sequence(SequenceStage),
    Motion(usize),
}

#[derive(Debug)]
pub struct Race {
    pub identity: Option<PersistedRace>,
    pub track: Track,
    timing: SequenceTiming,
    phase: RacePhase,
    competitors: Vec<Competitor>,
    finish_order: Vec<usize>,
    finish_ms: Vec<u64>,
    motion_timers: HashMap<usize, TimerHandle>,
    scheduler: Scheduler<RaceTimer>,
    complete_sent: bool,
    subscribers: Vec<Sender<RaceNotice>>,
}

impl Race {
    pub fn new(
        mut competitors: Vec<Competitor>,
        track: Track,
        timing: SequenceTiming,
    ) -> Result<Race, RaceError> {
        if competitors.is_empty() {
            return Err(RaceError::NoCompetitors);
        }
        let no_competitors = competitors.len();
        competitors.iter_mut().for_each(|c| c.reset());

        Ok(Race {
            identity: None,
            track,
            timing,
            phase: RacePhase::Idle,
            competitors,
            finish_order: Vec::with_capacity(no_competitors),
            finish_ms: vec![0; no_competitors],
            motion_timers: HashMap::with_capacity(no_competitors),
            scheduler: Scheduler::new(),
            complete_sent: false,
            subscribers: Vec::new(),
        })
    }

    /// subscribe returns a receiver for all notices emitted from now on.
    pub fn subscribe(&mut self) -> Receiver<RaceNotice> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.push(tx);
        rx
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHODS --------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// start_sequence schedules the countdown; the competitors start moving at its end.
    pub fn start_sequence(&mut self) -> Result<(), RaceError> {
        if self.phase != RacePhase::Idle {
            return Err(RaceError::AlreadyStarted(self.phase));
        }

        if self.timing.is_fast_forward() {
            debug!("Fast-forward: skipping countdown");
            self.handle_stage(SequenceStage::Go);
            return Ok(());
        }

        self.phase = RacePhase::Countdown(LightState::Off);
        self.emit(RaceNotice::Lights(LightState::Off));
        for (offset, stage) in self.timing.stages() {
            self.scheduler
                .schedule_once(offset, RaceTimer::Sequence(stage));
        }
        Ok(())
    }

    /// step fires the next due timer. Returns false if nothing is scheduled anymore.
    pub fn step(&mut self) -> bool {
        match self.scheduler.pop_next() {
            Some((_, timer)) => {
                self.handle_timer(timer);
                true
            }
            None => false,
        }
    }

    /// advance_to fires every timer due up to `t_ms` and moves the clock there.
    pub fn advance_to(&mut self, t_ms: u64) {
        while let Some((_, timer)) = self.scheduler.pop_due(t_ms) {
            self.handle_timer(timer);
        }
        self.scheduler.advance_clock(t_ms);
    }

    /// run_to_completion drives the race until every competitor finished.
    pub fn run_to_completion(&mut self) -> Result<RaceResult, RaceError> {
        if self.phase == RacePhase::Idle {
            self.start_sequence()?;
        }
        while !self.is_complete() && self.step() {}
        Ok(self.result())
    }

    /// on_competitor_finish records the arrival of a competitor. A competitor is only placed once,
    /// repeated calls return None. The last arrival completes the race. Arrivals are only accepted
    /// while the race is running; once it is finished every call returns None.
    pub fn on_competitor_finish(&mut self, idx: usize) -> Result<Option<Placing>, RaceError> {
        if idx >= self.competitors.len() {
            return Err(RaceError::UnknownCompetitor(idx));
        }
        match self.phase {
            RacePhase::Running => {}
            RacePhase::Finished => return Ok(None),
            phase => return Err(RaceError::NotRunning(phase)),
        }

        let competitor = &mut self.competitors[idx];

        if !competitor.mark_finished() {
            return Ok(None);
        }

        if let Some(handle) = self.motion_timers.remove(&idx) {
            self.scheduler.cancel(handle);
        }

        self.finish_order.push(idx);
        self.finish_ms[idx] = self.scheduler.now();
        let placing = self.placing(self.finish_order.len() - 1);
        info!("{} - {}", placing.ordinal, placing.name);
        self.emit(RaceNotice::Finished(placing.clone()));

        if self.is_complete() && !self.complete_sent {
            self.complete_sent = true;
            self.phase = RacePhase::Finished;
            info!("Race finished after {}ms", self.scheduler.now());
            let result = self.result();
            self.emit(RaceNotice::Complete(result));
        }

        Ok(Some(placing))
    }

    // ---------------------------------------------------------------------------------------------
    // RACE SIMULATOR PARTS ------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    fn handle_timer(&mut self, timer: RaceTimer) {
        match timer {
            RaceTimer::Sequence(stage) => self.handle_stage(stage),
            RaceTimer::Motion(idx) => self.handle_motion(idx),
        }
    }

    fn handle_stage(&mut self, stage: SequenceStage) {
        let next = match self.phase.apply(stage) {
            Some(next) => next,
            None => {
                debug!("Ignoring countdown stage {:?} in phase {:?}", stage, self.phase);
                return;
            }
        };
        self.phase = next;

        match stage {
            SequenceStage::Lights(lights) => self.emit(RaceNotice::Lights(lights)),
            SequenceStage::Go => {
                if self.timing.show_lights {
                    self.emit(RaceNotice::Lights(LightState::Off));
                }
                for idx in 0..self.competitors.len() {
                    if self.finish_order.contains(&idx) {
                        continue;
                    }
                    self.competitors[idx].start();
                    let handle = self
                        .scheduler
                        .schedule_every(TICK_PERIOD_MS, RaceTimer::Motion(idx));
                    self.motion_timers.insert(idx, handle);
                }
                debug!("{} competitors started at {}ms", self.competitors.len(), self.scheduler.now());
                self.emit(RaceNotice::Started);
            }
        }
    }

    fn handle_motion(&mut self, idx: usize) {
        let track_length = self.track.length;
        let competitor = &mut self.competitors[idx];
        if competitor.is_finished() {
            return;
        }

        competitor.tick();
        if competitor.has_finished(track_length) {
            match self.on_competitor_finish(idx) {
                Ok(Some(_)) => {}
                Ok(None) => debug!("Competitor {} already placed", idx),
                Err(err) => warn!("Dropping arrival of competitor {}: {}", idx, err),
            }
        }
    }

    fn emit(&mut self, notice: RaceNotice) {
        // drop subscribers whose receiver is gone
        self.subscribers.retain(|tx| tx.send(notice.clone()).is_ok());
    }

    fn placing(&self, order_idx: usize) -> Placing {
        let idx = self.finish_order[order_idx];
        let competitor = &self.competitors[idx];
        Placing {
            position: order_idx + 1,
            ordinal: ordinal(order_idx + 1),
            index: idx,
            competitor_id: competitor.id,
            name: competitor.name.to_owned(),
            ticks: competitor.ticks(),
            finish_ms: self.finish_ms[idx],
        }
    }

    // ---------------------------------------------------------------------------------------------
    // METHODS (HELPERS) ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    pub fn timing(&self) -> SequenceTiming {
        self.timing
    }

    /// (ms) Virtual time since the start of the sequence.
    pub fn now(&self) -> u64 {
        self.scheduler.now()
    }

    /// (ms) Due time of the next timer, None once nothing is scheduled.
    pub fn next_due(&self) -> Option<u64> {
        self.scheduler.next_due()
    }

    pub fn competitors(&self) -> &[Competitor] {
        &self.competitors
    }

    pub fn is_complete(&self) -> bool {
        self.competitors.iter().all(|c| c.is_finished())
    }

    /// Number of competitors whose motion timer is still running.
    pub fn active_timers(&self) -> usize {
        self.motion_timers
            .values()
            .filter(|&&handle| self.scheduler.is_active(handle))
            .count()
    }

    /// final_order returns the competitors in the order they crossed the finish boundary.
    /// Competitors crossing within the same tick keep their list order.
    pub fn final_order(&self) -> Vec<&Competitor> {
        self.finish_order
            .iter()
            .map(|&idx| &self.competitors[idx])
            .collect()
    }

    /// standings returns competitor indices ordered by current displacement, leader first.
    pub fn standings(&self) -> Vec<usize> {
        let displacements: Vec<f64> = self
            .competitors
            .iter()
            .map(|c| c.displacement())
            .collect();
        argsort(&displacements, SortOrder::Descending)
    }

    pub fn result(&self) -> RaceResult {
        RaceResult {
            race: self.identity.to_owned(),
            track_length: self.track.length,
            placings: (0..self.finish_order.len())
                .map(|order_idx| self.placing(order_idx))
                .collect(),
        }
    }

    pub fn snapshot(&self) -> RaceState {
        RaceState {
            t_ms: self.scheduler.now(),
            phase: self.phase,
            lights: self.phase.lights(),
            competitor_states: self
                .competitors
                .iter()
                .map(|c| CompetitorState {
                    name: c.name.to_owned(),
                    style: c.style.to_owned(),
                    displacement: c.displacement(),
                    race_prog: self.track.lap_frac(c.displacement()),
                    finished: c.is_finished(),
                })
                .collect(),
        }
    }
}
