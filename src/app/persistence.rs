// Reading and writing the ballot and credential files.

use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use ballot_store::builder::Builder;
use ballot_store::credential::CredentialStore;
use ballot_store::{BallotState, BallotStore};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::app::settings::Settings;
use crate::app::*;

/// The ballot file, as written on disk.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
struct BallotRecord {
    #[serde(default)]
    candidates: Option<Vec<String>>,
    #[serde(default)]
    votes: BTreeMap<String, u64>,
    #[serde(default)]
    total_votes: Option<u64>,
    #[serde(default)]
    voting_open: bool,
}

impl BallotRecord {
    fn from_state(state: &BallotState) -> BallotRecord {
        BallotRecord {
            candidates: Some(state.candidates.clone()),
            votes: state
                .vote_counts
                .iter()
                .map(|(name, count)| (name.clone(), *count))
                .collect(),
            total_votes: Some(state.total_votes),
            voting_open: state.voting_open,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
struct CredentialRecord {
    #[serde(default)]
    password_hash: Option<String>,
}

/// Access to the ballot and credential files.
#[derive(Debug, Clone)]
pub struct Gateway {
    data_path: PathBuf,
    password_path: PathBuf,
}

impl Gateway {
    pub fn new(settings: &Settings) -> Gateway {
        Gateway {
            data_path: settings.data_path.clone(),
            password_path: settings.password_path.clone(),
        }
    }

    /// Loads the ballot.
    ///
    /// This never fails: a missing file gives the default ballot, and a file that cannot be read,
    /// parsed or validated gives the default ballot together with the reason.
    pub fn load_ballot_state(&self) -> (BallotStore, Option<AppError>) {
        match self.read_ballot() {
            Ok(Some(store)) => (store, None),
            Ok(None) => {
                info!(
                    "load_ballot_state: no ballot at {:?}, starting a fresh one",
                    self.data_path
                );
                (BallotStore::default(), None)
            }
            Err(e) => {
                warn!(
                    "load_ballot_state: could not load the ballot, starting with fresh data: {}",
                    e
                );
                (BallotStore::default(), Some(e))
            }
        }
    }

    fn read_ballot(&self) -> AppResult<Option<BallotStore>> {
        let path = display_path(&self.data_path);
        let record: BallotRecord = match read_record(&self.data_path)? {
            Some(r) => r,
            None => return Ok(None),
        };
        debug!("read_ballot: {:?}", record);

        let mut builder = Builder::new();
        if let Some(candidates) = record.candidates {
            builder = builder
                .candidates(&candidates)
                .context(InvalidRosterSnafu { path: path.clone() })?;
        }
        for (name, count) in record.votes.iter() {
            builder.add_tally(name, *count);
        }
        if let Some(total) = record.total_votes {
            builder = builder.total_votes(total);
        }
        let store = builder
            .voting_open(record.voting_open)
            .build()
            .context(InvalidTalliesSnafu { path })?;
        Ok(Some(store))
    }

    pub fn save_ballot_state(&self, state: &BallotState) -> AppResult<()> {
        write_record(&self.data_path, &BallotRecord::from_state(state))
    }

    /// The stored password hash, if there is one.
    ///
    /// A file that cannot be read or parsed gives no hash and the reason. Checking the format of
    /// the hash is left to [`CredentialStore::initialize`].
    pub fn load_credential(&self) -> (Option<String>, Option<AppError>) {
        match read_record::<CredentialRecord>(&self.password_path) {
            Ok(Some(record)) => (record.password_hash.filter(|h| !h.is_empty()), None),
            Ok(None) => (None, None),
            Err(e) => {
                warn!("load_credential: {}", e);
                (None, Some(e))
            }
        }
    }

    pub fn save_credential(&self, credential: &CredentialStore) -> AppResult<()> {
        let record = CredentialRecord {
            password_hash: Some(credential.password_hash().to_string()),
        };
        write_record(&self.password_path, &record)
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

// Ok(None) when the file does not exist.
fn read_record<T: for<'de> Deserialize<'de>>(path: &Path) -> AppResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let p = display_path(path);
    let contents = fs::read_to_string(path).context(ReadingFileSnafu { path: p.clone() })?;
    let record: T = serde_json::from_str(&contents).context(ParsingJsonSnafu { path: p })?;
    Ok(Some(record))
}

// The record goes to a sibling temporary file first, then replaces the target in one rename.
// A crash in the middle leaves the previous file in place.
fn write_record<T: Serialize>(path: &Path, record: &T) -> AppResult<()> {
    let p = display_path(path);
    let contents =
        serde_json::to_string_pretty(record).context(SerializingJsonSnafu { path: p.clone() })?;
    let tmp_path = temporary_sibling(path);
    fs::write(&tmp_path, contents).context(WritingFileSnafu {
        path: display_path(&tmp_path),
    })?;
    fs::rename(&tmp_path, path).context(WritingFileSnafu { path: p })?;
    debug!("write_record: saved {:?}", path);
    Ok(())
}

fn temporary_sibling(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
