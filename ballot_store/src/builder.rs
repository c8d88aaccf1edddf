use log::{debug, warn};
use std::collections::HashMap;

pub use crate::config::*;
use crate::{validate_roster, BallotStore};

/// A builder to restore a ballot from stored parts.
///
/// The parts do not need to be consistent with each other. The builder repairs them:
/// - candidates without a tally start at zero
/// - tallies for names that are not on the roster are dropped
/// - the total is recomputed from the tallies when it disagrees with them
///
/// Tallies whose sum does not fit in a `u64` cannot be repaired: [`Builder::build`] fails with
/// [`BallotError::TallyOverflow`].
///
/// ```
/// use ballot_store::builder::Builder;
/// # use ballot_store::BallotError;
///
/// let mut builder = Builder::new()
///     .candidates(&["Anna".to_string(), "Bob".to_string()])?
///     .voting_open(true);
/// builder.add_tally("Anna", 3);
///
/// let store = builder.build()?;
/// assert_eq!(store.votes_for("Bob"), Some(0));
/// assert_eq!(store.total_votes(), 3);
/// # Ok::<(), BallotError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    pub(crate) _candidates: Option<Vec<String>>,
    pub(crate) _tallies: HashMap<String, u64>,
    pub(crate) _total_votes: Option<u64>,
    pub(crate) _voting_open: bool,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Sets the roster. If never called, the default roster is used.
    pub fn candidates(self, cands: &[String]) -> Result<Builder, BallotError> {
        Ok(Builder {
            _candidates: Some(validate_roster(cands)?),
            ..self
        })
    }

    pub fn add_tally(&mut self, candidate: &str, count: u64) {
        self._tallies.insert(candidate.to_string(), count);
    }

    /// The stored total. It is only used to detect inconsistent inputs.
    pub fn total_votes(self, total: u64) -> Builder {
        Builder {
            _total_votes: Some(total),
            ..self
        }
    }

    pub fn voting_open(self, open: bool) -> Builder {
        Builder {
            _voting_open: open,
            ..self
        }
    }

    pub fn build(self) -> Result<BallotStore, BallotError> {
        let candidates = self._candidates.unwrap_or_else(default_candidates);
        let mut vote_counts: HashMap<String, u64> = HashMap::new();
        for name in candidates.iter() {
            let count = match self._tallies.get(name) {
                Some(c) => *c,
                None => {
                    debug!("build: no tally for {:?}, starting at 0", name);
                    0
                }
            };
            vote_counts.insert(name.clone(), count);
        }
        for (name, count) in self._tallies.iter() {
            if !vote_counts.contains_key(name) {
                warn!(
                    "build: dropping {} votes for {:?} which is not on the roster",
                    count, name
                );
            }
        }

        let sum = vote_counts
            .values()
            .try_fold(0u64, |acc, c| acc.checked_add(*c))
            .ok_or(BallotError::TallyOverflow)?;
        let total_votes = match self._total_votes {
            Some(total) if total != sum => {
                warn!(
                    "build: stored total {} does not match the tallies, using {}",
                    total, sum
                );
                sum
            }
            _ => sum,
        };

        Ok(BallotStore::from_state(BallotState {
            candidates,
            vote_counts,
            total_votes,
            voting_open: self._voting_open,
        }))
    }
}
