// ********* Ballot data structures ***********

use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;

/// The largest roster a ballot may hold.
pub const MAX_CANDIDATES: usize = 32;

/// The number of placeholder candidates on a fresh ballot.
pub const DEFAULT_CANDIDATE_COUNT: usize = 10;

/// The roster used on first run: `Candidate 1` to `Candidate 10`.
pub fn default_candidates() -> Vec<String> {
    (1..=DEFAULT_CANDIDATE_COUNT)
        .map(|i| format!("Candidate {}", i))
        .collect()
}

/// The complete state of the ballot box at a point in time.
///
/// Every mutation exposed by [`crate::BallotStore`] keeps two invariants:
/// - `total_votes` is the sum of all the values of `vote_counts`
/// - the keys of `vote_counts` are exactly the names in `candidates`
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotState {
    /// The roster, in display order.
    pub candidates: Vec<String>,
    pub vote_counts: HashMap<String, u64>,
    pub total_votes: u64,
    pub voting_open: bool,
}

impl BallotState {
    /// A closed ballot with the given roster and all tallies at zero.
    ///
    /// The roster is taken as is. Use [`crate::validate_roster`] first for untrusted input.
    pub fn with_candidates(candidates: Vec<String>) -> BallotState {
        let vote_counts = candidates.iter().map(|c| (c.clone(), 0)).collect();
        BallotState {
            candidates,
            vote_counts,
            total_votes: 0,
            voting_open: false,
        }
    }
}

impl Default for BallotState {
    fn default() -> Self {
        BallotState::with_candidates(default_candidates())
    }
}

// ******** Output data structures *********

/// One line of the detailed results.
#[derive(PartialEq, Debug, Clone)]
pub struct ResultRow {
    /// 1-based position in the sorted results.
    pub rank: u32,
    pub name: String,
    pub votes: u64,
    /// Share of the total, in percent, rounded to one decimal.
    pub percentage: f64,
}

/// What happened to the open/closed flag after a request to change it.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Transition {
    Opened,
    Closed,
    /// The ballot was already in the requested state.
    Unchanged,
}

/// Errors that reject an operation. The state is never modified when one is returned.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum BallotError {
    /// The administrator password did not verify.
    Auth,
    VotingClosed,
    /// The selection is not on the current roster. An empty string means no selection.
    InvalidCandidate(String),
    Validation(String),
    LimitExceeded { count: usize },
    DuplicateName(String),
    /// A tally or the total would not fit in a `u64`.
    TallyOverflow,
    /// No administrator password could be established.
    MissingCredential,
}

impl Error for BallotError {}

impl Display for BallotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BallotError::Auth => write!(f, "The password you entered is incorrect."),
            BallotError::VotingClosed => {
                write!(f, "We're sorry, the voting period is currently closed.")
            }
            BallotError::InvalidCandidate(name) if name.is_empty() => {
                write!(f, "Please select a candidate before casting your vote.")
            }
            BallotError::InvalidCandidate(name) => {
                write!(f, "'{}' is not a candidate on this ballot.", name)
            }
            BallotError::Validation(msg) => write!(f, "{}", msg),
            BallotError::LimitExceeded { count } => write!(
                f,
                "You can have a maximum of {} candidates. You have entered {}.",
                MAX_CANDIDATES, count
            ),
            BallotError::DuplicateName(name) => write!(
                f,
                "Candidate names must be unique: '{}' appears more than once.",
                name
            ),
            BallotError::TallyOverflow => {
                write!(f, "The vote counts are too large to be added up.")
            }
            BallotError::MissingCredential => write!(
                f,
                "An administrator password is required. The application will now exit."
            ),
        }
    }
}
