mod config;
pub mod builder;
pub mod credential;
pub mod manual;

use log::{debug, info};

use std::{cmp::Reverse, collections::HashSet};

pub use crate::config::*;

/// The roster, the tallies and the open/closed flag of the ballot box.
///
/// All the mutations go through `&mut self`, so holding the store by value in a single owner
/// is enough to serialize them.
///
/// ```
/// use ballot_store::{BallotError, BallotStore};
///
/// let mut store = BallotStore::default();
/// store.set_candidates(&["Anna".to_string(), "Bob".to_string()])?;
/// store.open_voting();
/// store.cast_vote("Anna")?;
///
/// let results = store.compute_results();
/// assert_eq!(results[0].name, "Anna");
/// # Ok::<(), BallotError>(())
/// ```
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct BallotStore {
    state: BallotState,
}

impl BallotStore {
    // Callers are responsible for the invariants of the state.
    pub(crate) fn from_state(state: BallotState) -> BallotStore {
        BallotStore { state }
    }

    pub fn state(&self) -> &BallotState {
        &self.state
    }

    pub fn candidates(&self) -> &[String] {
        &self.state.candidates
    }

    /// The tally of a candidate, or None if the name is not on the roster.
    pub fn votes_for(&self, candidate: &str) -> Option<u64> {
        self.state.vote_counts.get(candidate).cloned()
    }

    pub fn total_votes(&self) -> u64 {
        self.state.total_votes
    }

    pub fn is_open(&self) -> bool {
        self.state.voting_open
    }

    /// Records one vote and returns the new tally of the candidate.
    pub fn cast_vote(&mut self, candidate: &str) -> Result<u64, BallotError> {
        if !self.state.voting_open {
            return Err(BallotError::VotingClosed);
        }
        let tally = self
            .state
            .vote_counts
            .get_mut(candidate)
            .ok_or_else(|| BallotError::InvalidCandidate(candidate.to_string()))?;
        let total = self
            .state
            .total_votes
            .checked_add(1)
            .ok_or(BallotError::TallyOverflow)?;
        // The tally never exceeds the total.
        *tally += 1;
        self.state.total_votes = total;
        debug!(
            "cast_vote: {:?} now at {} (total {})",
            candidate, tally, self.state.total_votes
        );
        Ok(*tally)
    }

    pub fn open_voting(&mut self) -> Transition {
        if self.state.voting_open {
            return Transition::Unchanged;
        }
        self.state.voting_open = true;
        Transition::Opened
    }

    pub fn close_voting(&mut self) -> Transition {
        if !self.state.voting_open {
            return Transition::Unchanged;
        }
        self.state.voting_open = false;
        Transition::Closed
    }

    /// Flips the flag unconditionally. Never returns [`Transition::Unchanged`].
    pub fn toggle_voting(&mut self) -> Transition {
        self.state.voting_open = !self.state.voting_open;
        if self.state.voting_open {
            Transition::Opened
        } else {
            Transition::Closed
        }
    }

    /// Replaces the roster.
    ///
    /// This always forfeits every vote cast so far, including the votes of the names that are kept.
    pub fn set_candidates(&mut self, names: &[String]) -> Result<(), BallotError> {
        let roster = validate_roster(names)?;
        info!(
            "set_candidates: replacing {} candidates with {}, dropping {} votes",
            self.state.candidates.len(),
            roster.len(),
            self.state.total_votes
        );
        let voting_open = self.state.voting_open;
        self.state = BallotState {
            voting_open,
            ..BallotState::with_candidates(roster)
        };
        Ok(())
    }

    /// Sets every tally and the total back to zero. The roster is kept.
    pub fn reset_votes(&mut self) {
        info!("reset_votes: dropping {} votes", self.state.total_votes);
        for tally in self.state.vote_counts.values_mut() {
            *tally = 0;
        }
        self.state.total_votes = 0;
    }

    /// The candidates sorted by decreasing number of votes.
    ///
    /// Ties keep the order of the roster.
    pub fn compute_results(&self) -> Vec<ResultRow> {
        let total = self.state.total_votes;
        let mut tallies: Vec<(&String, u64)> = self
            .state
            .candidates
            .iter()
            .map(|name| (name, self.votes_for(name).unwrap_or(0)))
            .collect();
        // sort_by_key is stable.
        tallies.sort_by_key(|(_, votes)| Reverse(*votes));
        tallies
            .into_iter()
            .enumerate()
            .map(|(idx, (name, votes))| ResultRow {
                rank: (idx + 1) as u32,
                name: name.clone(),
                votes,
                percentage: percentage(votes, total),
            })
            .collect()
    }
}

/// Checks a candidate roster and returns it with every name trimmed.
///
/// The checks are applied in order: size limit, empty names, duplicates.
pub fn validate_roster(names: &[String]) -> Result<Vec<String>, BallotError> {
    if names.len() > MAX_CANDIDATES {
        return Err(BallotError::LimitExceeded { count: names.len() });
    }
    let mut roster: Vec<String> = Vec::with_capacity(names.len());
    for (idx, name) in names.iter().enumerate() {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(BallotError::Validation(format!(
                "Candidate names cannot be empty (entry {}).",
                idx + 1
            )));
        }
        roster.push(trimmed.to_string());
    }
    if let Some(name) = first_duplicate(&roster) {
        return Err(BallotError::DuplicateName(name.to_string()));
    }
    Ok(roster)
}

fn first_duplicate(names: &[String]) -> Option<&str> {
    let mut seen: HashSet<&str> = HashSet::new();
    names
        .iter()
        .map(|name| name.as_str())
        .find(|name| !seen.insert(*name))
}

// Rounded the way the results are printed: the exact value to one decimal, ties to even.
fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let exact = votes as f64 / total as f64 * 100.0;
    format!("{:.1}", exact).parse().unwrap_or(exact)
}
