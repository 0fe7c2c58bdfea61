use crate::core::controller::{ControllerError, RaceController, SubmitOutcome};
use crate::interfaces::api::{ApiError, ListingKind, RaceApi, RaceSummary};

/// * `kind` - Which feed to show
/// * `title` - Heading of the listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListingConfig {
    pub kind: ListingKind,
    pub title: String,
}

impl ListingConfig {
    pub fn popular_pairs() -> ListingConfig {
        ListingConfig {
            kind: ListingKind::PopularPairs,
            title: "Popular pairs".to_owned(),
        }
    }

    pub fn recent_races(user_id: Option<u64>) -> ListingConfig {
        ListingConfig {
            kind: ListingKind::RecentRaces { user_id },
            title: "Recent races".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub race_id: u64,
    pub label: String,
}

impl From<&RaceSummary> for ListingRow {
    fn from(summary: &RaceSummary) -> Self {
        ListingRow {
            race_id: summary.race_id,
            label: summary
                .racers
                .iter()
                .map(|r| r.full_name.as_str())
                .collect::<Vec<&str>>()
                .join(" VS "),
        }
    }
}

/// RaceListing shows a feed of saved races; picking a row loads that race.
#[derive(Debug, Clone)]
pub struct RaceListing {
    pub config: ListingConfig,
    rows: Vec<ListingRow>,
}

impl RaceListing {
    pub fn new(config: ListingConfig) -> RaceListing {
        RaceListing {
            config,
            rows: Vec::new(),
        }
    }

    /// populate replaces the rows with the current feed.
    pub fn populate<A: RaceApi + ?Sized>(&mut self, api: &A) -> Result<&[ListingRow], ApiError> {
        let summaries = api.listing(&self.config.kind)?;
        self.rows = summaries.iter().map(ListingRow::from).collect();
        Ok(&self.rows)
    }

    pub fn rows(&self) -> &[ListingRow] {
        &self.rows
    }

    /// select loads the race behind row `idx` into the controller.
    pub fn select<A: RaceApi + 'static>(
        &self,
        idx: usize,
        controller: &mut RaceController<A>,
    ) -> Result<SubmitOutcome, ControllerError> {
        let row = self
            .rows
            .get(idx)
            .ok_or(ControllerError::UnknownListingRow(idx))?;
        controller.load_shared(row.race_id)
    }
}
