use serde::Serialize;

/// Start lights shown during the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LightState {
    Off,
    Red,
    RedAmber,
    Green,
}

impl Default for LightState {
    fn default() -> Self {
        LightState::Off
    }
}

/// Phase of a race: `Idle -> Countdown -> Running -> Finished`. Only fast-forward timing goes from
/// `Idle` straight to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RacePhase {
    Idle,
    Countdown(LightState),
    Running,
    Finished,
}

impl Default for RacePhase {
    fn default() -> Self {
        RacePhase::Idle
    }
}

/// A countdown step fired by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStage {
    Lights(LightState),
    Go,
}

/// Offsets of the countdown steps from the start of the sequence.
/// * `red_ms` - (ms) First light turns red
/// * `amber_ms` - (ms) Second light turns amber
/// * `green_ms` - (ms) All lights turn green
/// * `go_ms` - (ms) Lights are hidden and the competitors start moving
/// * `show_lights` - False disables the countdown altogether
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceTiming {
    pub red_ms: u64,
    pub amber_ms: u64,
    pub green_ms: u64,
    pub go_ms: u64,
    pub show_lights: bool,
}

impl SequenceTiming {
    pub fn standard() -> SequenceTiming {
        SequenceTiming {
            red_ms: 1000,
            amber_ms: 2000,
            green_ms: 3000,
            go_ms: 4000,
            show_lights: true,
        }
    }

    pub fn fast_forward() -> SequenceTiming {
        SequenceTiming {
            red_ms: 0,
            amber_ms: 0,
            green_ms: 0,
            go_ms: 0,
            show_lights: false,
        }
    }

    pub fn is_fast_forward(&self) -> bool {
        !self.show_lights
    }

    /// stages lists the countdown steps with their offsets, in firing order.
    pub fn stages(&self) -> Vec<(u64, SequenceStage)> {
        if self.is_fast_forward() {
            return vec![(0, SequenceStage::Go)];
        }
        vec![
            (self.red_ms, SequenceStage::Lights(LightState::Red)),
            (self.amber_ms, SequenceStage::Lights(LightState::RedAmber)),
            (self.green_ms, SequenceStage::Lights(LightState::Green)),
            (self.go_ms, SequenceStage::Go),
        ]
    }
}

impl Default for SequenceTiming {
    fn default() -> Self {
        SequenceTiming::standard()
    }
}

impl RacePhase {
    /// apply returns the phase after `stage` fired, or None if the stage is out of order.
    pub fn apply(self, stage: SequenceStage) -> Option<RacePhase> {
        match (self, stage) {
            (RacePhase::Countdown(LightState::Off), SequenceStage::Lights(LightState::Red)) => {
                Some(RacePhase::Countdown(LightState::Red))
            }
            (RacePhase::Countdown(LightState::Red), SequenceStage::Lights(LightState::RedAmber)) => {
                Some(RacePhase::Countdown(LightState::RedAmber))
            }
            (
                RacePhase::Countdown(LightState::RedAmber),
                SequenceStage::Lights(LightState::Green),
            ) => Some(RacePhase::Countdown(LightState::Green)),
            (RacePhase::Countdown(LightState::Green), SequenceStage::Go) => Some(RacePhase::Running),
            // fast-forward
            (RacePhase::Idle, SequenceStage::Go) => Some(RacePhase::Running),
            _ => None,
        }
    }

    pub fn lights(&self) -> LightState {
        match self {
            RacePhase::Countdown(lights) => *lights,
            _ => LightState::Off,
        }
    }
}
