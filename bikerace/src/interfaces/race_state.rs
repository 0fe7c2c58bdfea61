use crate::core::sequence::{LightState, RacePhase};
use crate::post::race_result::{Placing, RaceResult};

/// Events a race emits while it runs. Sent over a flume channel to whoever renders the race.
#[derive(Debug, Clone, PartialEq)]
pub enum RaceNotice {
    Lights(LightState),
    Started,
    Finished(Placing),
    // sent exactly once
    Complete(RaceResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Good,
    Bad,
}

/// A user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub mood: Mood,
}

impl Notice {
    pub fn good(message: impl Into<String>) -> Notice {
        Notice {
            message: message.into(),
            mood: Mood::Good,
        }
    }

    pub fn bad(message: impl Into<String>) -> Notice {
        Notice {
            message: message.into(),
            mood: Mood::Bad,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompetitorState {
    pub name: String,
    pub style: String,
    pub displacement: f64,
    pub race_prog: f64,
    pub finished: bool,
}

/// Snapshot of a race for rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceState {
    pub t_ms: u64,
    pub phase: RacePhase,
    pub lights: LightState,
    pub competitor_states: Vec<CompetitorState>,
}
