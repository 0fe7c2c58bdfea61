use crate::interfaces::api::{ApiError, CompetitorDescriptor, CompetitorRecord, RaceApi, WeightType};
use thiserror::Error;

/// (kg) Added to a dry weight figure to approximate the wet (ready to ride) weight.
pub const DRY_WEIGHT_OFFSET: f64 = 20.0;
/// Progress seed on start is `torque / MOMENTUM_SEED_DIVISOR`.
pub const MOMENTUM_SEED_DIVISOR: f64 = 25.0;
/// Progress gained per tick.
pub const PROGRESS_STEP: f64 = 0.01;
/// Constant displacement added on every tick.
pub const MOMENTUM_BIAS: f64 = 1.0;
/// Multiplier applied to the power-to-weight ratio on every tick.
pub const PTW_WEIGHT: f64 = 7.0;
/// (ms) Period of the motion update.
pub const TICK_PERIOD_MS: u64 = 40;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Failed to find {make} {model}")]
    NotFound { make: String, model: String },

    #[error("{name} has unusable specs: {field} must be positive, got {value}")]
    InvalidSpecs {
        name: String,
        field: &'static str,
        value: f64,
    },

    #[error("Lookup of {make} {model} failed: {source}")]
    Lookup {
        make: String,
        model: String,
        source: ApiError,
    },
}

/// A single motorcycle taking part in a race. Physical figures are fixed on creation, the motion
/// state (`progress`, `displacement`, `ticks`, `finished`) is reset by `start`.
#[derive(Debug, Clone)]
pub struct Competitor {
    pub id: u64,
    pub name: String,
    pub style: String,
    power: f64,
    torque: f64,
    weight: f64,
    ptw: f64,
    acc: f64,
    progress: f64,
    displacement: f64,
    ticks: u32,
    finished: bool,
}

impl Competitor {
    /// resolve looks the descriptor up through the data provider and builds a competitor from the
    /// returned record.
    pub fn resolve<A: RaceApi + ?Sized>(
        descriptor: &CompetitorDescriptor,
        api: &A,
    ) -> Result<Competitor, ResolveError> {
        let record = api
            .lookup_competitor(descriptor)
            .map_err(|source| ResolveError::Lookup {
                make: descriptor.make.to_owned(),
                model: descriptor.model.to_owned(),
                source,
            })?;

        match record {
            Some(record) => Competitor::from_record(&record),
            None => Err(not_found(descriptor)),
        }
    }

    /// from_record validates the record's figures. Power, torque and weight must be finite and
    /// positive, otherwise the ratios below would turn into infinities.
    pub fn from_record(record: &CompetitorRecord) -> Result<Competitor, ResolveError> {
        for (field, value) in [
            ("power", record.power),
            ("torque", record.torque),
            ("weight", record.weight),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ResolveError::InvalidSpecs {
                    name: record.full_name.to_owned(),
                    field,
                    value,
                });
            }
        }

        let weight = wet_weight(record.weight, record.weight_type);

        Ok(Competitor {
            id: record.id,
            name: record.full_name.to_owned(),
            style: record.style.to_owned(),
            power: record.power,
            torque: record.torque,
            weight,
            ptw: record.power / weight,
            acc: record.torque / weight,
            progress: 0.0,
            displacement: 0.0,
            ticks: 0,
            finished: false,
        })
    }

    /// (kg) Wet weight used in all ratios.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn torque(&self) -> f64 {
        self.torque
    }

    pub fn power_to_weight(&self) -> f64 {
        self.ptw
    }

    pub fn acceleration(&self) -> f64 {
        self.acc
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn displacement(&self) -> f64 {
        self.displacement
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// reset puts the competitor back on the line, e.g. before a replay.
    pub fn reset(&mut self) {
        self.progress = 0.0;
        self.displacement = 0.0;
        self.ticks = 0;
        self.finished = false;
    }

    /// start seeds the progress from the torque figure.
    pub fn start(&mut self) {
        self.reset();
        self.progress = self.torque / MOMENTUM_SEED_DIVISOR;
    }

    /// tick advances the competitor by one motion update and returns the momentum applied. The
    /// displacement is kept as a float; a renderer that reads positions back as whole pixels
    /// truncates every step and may need more ticks, so tick counts here are for the
    /// untruncated track (e.g. 146 and 152 ticks for the 1080px reference pair).
    pub fn tick(&mut self) -> f64 {
        let momentum = self.momentum();
        self.displacement += momentum;
        self.progress += PROGRESS_STEP;
        self.ticks += 1;
        momentum
    }

    /// momentum is the displacement the next tick will add.
    pub fn momentum(&self) -> f64 {
        self.acc * self.progress + MOMENTUM_BIAS + self.ptw * PTW_WEIGHT
    }

    /// has_finished is true once the displacement is strictly beyond the track length.
    pub fn has_finished(&self, track_length: f64) -> bool {
        self.displacement > track_length
    }

    /// mark_finished sets the finished flag and returns true only for the first call.
    pub fn mark_finished(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.finished = true;
        true
    }
}

fn wet_weight(weight: f64, weight_type: WeightType) -> f64 {
    match weight_type {
        WeightType::Wet => weight,
        WeightType::Dry => weight + DRY_WEIGHT_OFFSET,
    }
}

fn not_found(descriptor: &CompetitorDescriptor) -> ResolveError {
    ResolveError::NotFound {
        make: descriptor.make.to_owned(),
        model: descriptor.model.to_owned(),
    }
}

#[cfg(test)]
pub(crate) fn test_record(
    id: u64,
    name: &str,
    power: f64,
    torque: f64,
    weight: f64,
    weight_type: WeightType,
) -> CompetitorRecord {
    let (make, model) = name.split_once(' ').unwrap_or((name, name));
    CompetitorRecord {
        id,
        full_name: name.to_owned(),
        make: make.to_owned(),
        model: model.to_owned(),
        power,
        torque,
        weight,
        weight_type,
        style: "naked".to_owned(),
        year: None,
    }
}
