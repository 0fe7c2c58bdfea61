use helpers::general::InputValueError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// What a user typed into one selection row.
/// * `make` - Manufacturer, e.g. Yamaha
/// * `model` - Model name, e.g. MT-07
/// * `year` - (optional) Model year, narrows the lookup
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CompetitorDescriptor {
    pub make: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl CompetitorDescriptor {
    pub fn new(make: &str, model: &str, year: Option<&str>) -> CompetitorDescriptor {
        CompetitorDescriptor {
            make: make.trim().to_owned(),
            model: model.trim().to_owned(),
            year: year.map(|y| y.trim().to_owned()).filter(|y| !y.is_empty()),
        }
    }

    /// Rows with an empty make or model are skipped before any lookup.
    pub fn is_blank(&self) -> bool {
        self.make.trim().is_empty() || self.model.trim().is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeightType {
    Wet,
    Dry,
}

impl Default for WeightType {
    fn default() -> Self {
        WeightType::Wet
    }
}

/// A motorcycle as returned by the data provider.
/// * `id` - Catalog model id (used when persisting a race)
/// * `full_name` - Display name, e.g. Yamaha MT-07
/// * `power` - (hp) Peak power
/// * `torque` - (Nm) Peak torque
/// * `weight` - (kg) Mass as measured by the manufacturer
/// * `weight_type` - Whether `weight` is a wet or a dry figure
/// * `style` - Visual style key for the presentation layer, e.g. naked
/// * `year` - Model year
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CompetitorRecord {
    pub id: u64,
    pub full_name: String,
    pub make: String,
    pub model: String,
    pub power: f64,
    pub torque: f64,
    pub weight: f64,
    #[serde(default)]
    pub weight_type: WeightType,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub year: Option<String>,
}

impl CompetitorRecord {
    pub fn descriptor(&self) -> CompetitorDescriptor {
        CompetitorDescriptor::new(&self.make, &self.model, self.year.as_deref())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PersistedRace {
    pub race_identifier: u64,
    pub race_public_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SharedRace {
    pub race: PersistedRace,
    pub racers: Vec<CompetitorRecord>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Up,
    Down,
}

impl FromStr for Vote {
    type Err = InputValueError;

    fn from_str(s: &str) -> Result<Vote, InputValueError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Vote::Up),
            "down" => Ok(Vote::Down),
            _ => Err(InputValueError::new(format!("vote must be up or down, got '{}'", s))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub upvotes: u32,
    pub downvotes: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Comment {
    pub id: u64,
    pub text: String,
    pub username: String,
    pub race_unique_id: String,
    pub created_at: String,
    #[serde(default)]
    pub garage_relation_sentence: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum ListingKind {
    PopularPairs,
    RecentRaces { user_id: Option<u64> },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RaceSummary {
    pub race_id: u64,
    pub racers: Vec<CompetitorRecord>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    #[error("not found")]
    NotFound,

    /// The backend answered with its 403-equivalent.
    #[error("authentication required")]
    AuthRequired,

    #[error("request rejected: {}", .0.join(", "))]
    Rejected(Vec<String>),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// RaceApi is the set of request/response calls the race core makes to its backend. Every call
/// except `persist_race` may be retried safely.
pub trait RaceApi: Send + Sync {
    fn lookup_competitor(
        &self,
        descriptor: &CompetitorDescriptor,
    ) -> Result<Option<CompetitorRecord>, ApiError>;

    fn persist_race(&self, model_ids: &[u64]) -> Result<PersistedRace, ApiError>;

    fn fetch_shared(&self, race_identifier: u64) -> Result<SharedRace, ApiError>;

    fn vote(&self, race_public_id: &str, vote: Vote) -> Result<(), ApiError>;

    fn votes(&self, race_public_id: &str) -> Result<VoteTally, ApiError>;

    fn list_comments(&self, race_public_id: &str) -> Result<Vec<Comment>, ApiError>;

    fn add_comment(&self, race_public_id: &str, text: &str) -> Result<(), ApiError>;

    fn delete_comment(&self, comment_id: u64) -> Result<(), ApiError>;

    fn listing(&self, kind: &ListingKind) -> Result<Vec<RaceSummary>, ApiError>;
}
