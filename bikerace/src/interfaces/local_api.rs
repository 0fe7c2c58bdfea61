use crate::interfaces::api::{
    ApiError, Comment, CompetitorDescriptor, CompetitorRecord, ListingKind, PersistedRace,
    RaceApi, RaceSummary, SharedRace, Vote, VoteTally,
};
use crate::pre::read_catalog::Catalog;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::thread::sleep;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MAX_LISTING_ROWS: usize = 10;

#[derive(Debug, Clone)]
struct StoredRace {
    race: PersistedRace,
    model_ids: Vec<u64>,
    user_id: Option<u64>,
}

#[derive(Debug, Default)]
struct LocalState {
    user: Option<(u64, String)>,
    races: Vec<StoredRace>,
    comments: Vec<Comment>,
    next_comment_id: u64,
    // (race public id, user id) -> vote
    votes: HashMap<(String, u64), Vote>,
    lookup_calls: usize,
    persist_calls: usize,
}

/// LocalApi serves the race API in-process from a catalog. Races, votes and comments live in
/// memory for the lifetime of the value.
#[derive(Debug)]
pub struct LocalApi {
    catalog: Catalog,
    lookup_delay: Option<Duration>,
    fail_persist: bool,
    state: Mutex<LocalState>,
}

impl LocalApi {
    pub fn new(catalog: Catalog) -> LocalApi {
        LocalApi {
            catalog,
            lookup_delay: None,
            fail_persist: false,
            state: Mutex::new(LocalState::default()),
        }
    }

    /// with_lookup_delay makes every lookup take at least `delay`, like a slow backend would.
    pub fn with_lookup_delay(mut self, delay: Duration) -> LocalApi {
        self.lookup_delay = Some(delay);
        self
    }

    /// with_failing_persistence makes every persist call fail with a transport error.
    pub fn with_failing_persistence(mut self) -> LocalApi {
        self.fail_persist = true;
        self
    }

    pub fn sign_in(&self, user_id: u64, username: &str) {
        self.state().user = Some((user_id, username.to_owned()));
    }

    pub fn lookup_calls(&self) -> usize {
        self.state().lookup_calls
    }

    pub fn persist_calls(&self) -> usize {
        self.state().persist_calls
    }

    fn state(&self) -> MutexGuard<'_, LocalState> {
        // a poisoned lock only means another caller panicked mid-request
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, id: u64) -> Option<&CompetitorRecord> {
        self.catalog.racers.iter().find(|r| r.id == id)
    }

    fn records(&self, model_ids: &[u64]) -> Vec<CompetitorRecord> {
        model_ids
            .iter()
            .filter_map(|&id| self.record(id).cloned())
            .collect()
    }

    fn summary(&self, stored: &StoredRace) -> RaceSummary {
        RaceSummary {
            race_id: stored.race.race_identifier,
            racers: self.records(&stored.model_ids),
        }
    }

    fn signed_in_user(state: &LocalState) -> Result<(u64, String), ApiError> {
        state.user.clone().ok_or(ApiError::AuthRequired)
    }
}

impl RaceApi for LocalApi {
    fn lookup_competitor(
        &self,
        descriptor: &CompetitorDescriptor,
    ) -> Result<Option<CompetitorRecord>, ApiError> {
        self.state().lookup_calls += 1;
        if let Some(delay) = self.lookup_delay {
            sleep(delay);
        }

        Ok(self
            .catalog
            .racers
            .iter()
            .find(|r| {
                r.make.eq_ignore_ascii_case(descriptor.make.trim())
                    && r.model.eq_ignore_ascii_case(descriptor.model.trim())
                    && match &descriptor.year {
                        Some(year) => r.year.as_deref() == Some(year.trim()),
                        None => true,
                    }
            })
            .cloned())
    }

    fn persist_race(&self, model_ids: &[u64]) -> Result<PersistedRace, ApiError> {
        let mut state = self.state();
        state.persist_calls += 1;

        if self.fail_persist {
            return Err(ApiError::Transport("connection reset".to_owned()));
        }
        if model_ids.is_empty() {
            return Err(ApiError::Rejected(vec!["A race needs at least one racer.".to_owned()]));
        }
        if let Some(id) = model_ids.iter().find(|&&id| self.record(id).is_none()) {
            return Err(ApiError::Rejected(vec![format!("Unknown racer id {}.", id)]));
        }

        let race_identifier = state.races.len() as u64 + 1;
        let race = PersistedRace {
            race_identifier,
            race_public_id: format!("race-{:06}", race_identifier),
        };
        let user_id = state.user.as_ref().map(|(id, _)| *id);
        state.races.push(StoredRace {
            race: race.clone(),
            model_ids: model_ids.to_vec(),
            user_id,
        });
        Ok(race)
    }

    fn fetch_shared(&self, race_identifier: u64) -> Result<SharedRace, ApiError> {
        let state = self.state();
        let stored = state
            .races
            .iter()
            .find(|r| r.race.race_identifier == race_identifier)
            .ok_or(ApiError::NotFound)?;
        Ok(SharedRace {
            race: stored.race.clone(),
            racers: self.records(&stored.model_ids),
        })
    }

    fn vote(&self, race_public_id: &str, vote: Vote) -> Result<(), ApiError> {
        let mut state = self.state();
        let (user_id, _) = LocalApi::signed_in_user(&state)?;
        if !state.races.iter().any(|r| r.race.race_public_id == race_public_id) {
            return Err(ApiError::NotFound);
        }
        state.votes.insert((race_public_id.to_owned(), user_id), vote);
        Ok(())
    }

    fn votes(&self, race_public_id: &str) -> Result<VoteTally, ApiError> {
        let state = self.state();
        if !state.races.iter().any(|r| r.race.race_public_id == race_public_id) {
            return Err(ApiError::NotFound);
        }
        let mut tally = VoteTally::default();
        for ((race, _), vote) in state.votes.iter() {
            if race == race_public_id {
                match vote {
                    Vote::Up => tally.upvotes += 1,
                    Vote::Down => tally.downvotes += 1,
                }
            }
        }
        Ok(tally)
    }

    fn list_comments(&self, race_public_id: &str) -> Result<Vec<Comment>, ApiError> {
        Ok(self
            .state()
            .comments
            .iter()
            .filter(|c| c.race_unique_id == race_public_id)
            .cloned()
            .collect())
    }

    fn add_comment(&self, race_public_id: &str, text: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        let (_, username) = LocalApi::signed_in_user(&state)?;
        if text.trim().is_empty() {
            return Err(ApiError::Rejected(vec!["Comment must not be empty.".to_owned()]));
        }

        state.next_comment_id += 1;
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let comment = Comment {
            id: state.next_comment_id,
            text: text.trim().to_owned(),
            username,
            race_unique_id: race_public_id.to_owned(),
            created_at: created_at.to_string(),
            garage_relation_sentence: String::new(),
        };
        state.comments.push(comment);
        Ok(())
    }

    fn delete_comment(&self, comment_id: u64) -> Result<(), ApiError> {
        let mut state = self.state();
        let (_, username) = LocalApi::signed_in_user(&state)?;
        let pos = state
            .comments
            .iter()
            .position(|c| c.id == comment_id)
            .ok_or(ApiError::NotFound)?;
        if state.comments[pos].username != username {
            return Err(ApiError::Rejected(vec![
                "You can only delete your own comments.".to_owned(),
            ]));
        }
        state.comments.remove(pos);
        Ok(())
    }

    fn listing(&self, kind: &ListingKind) -> Result<Vec<RaceSummary>, ApiError> {
        let state = self.state();
        match kind {
            ListingKind::RecentRaces { user_id } => Ok(state
                .races
                .iter()
                .rev()
                .filter(|r| user_id.is_none() || r.user_id == *user_id)
                .take(MAX_LISTING_ROWS)
                .map(|r| self.summary(r))
                .collect()),
            ListingKind::PopularPairs => {
                // pairs are unordered: key on the sorted model ids
                let mut counts: Vec<(Vec<u64>, usize, &StoredRace)> = Vec::new();
                for stored in state.races.iter() {
                    let mut key = stored.model_ids.clone();
                    key.sort_unstable();
                    match counts.iter_mut().find(|(k, _, _)| *k == key) {
                        Some(entry) => entry.1 += 1,
                        None => counts.push((key, 1, stored)),
                    }
                }
                // stable sort keeps first-raced pairs ahead among equal counts
                counts.sort_by(|a, b| b.1.cmp(&a.1));
                Ok(counts
                    .iter()
                    .take(MAX_LISTING_ROWS)
                    .map(|(_, _, stored)| self.summary(stored))
                    .collect())
            }
        }
    }
}
