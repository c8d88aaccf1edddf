use log::{debug, info, warn};

use ballot_store::credential::{CredentialOrigin, CredentialStore};
use ballot_store::*;
use snafu::Snafu;

use crate::app::audit::AuditLog;
use crate::app::persistence::Gateway;
use crate::app::settings::Settings;

pub mod audit;
pub mod console;
pub mod persistence;
pub mod settings;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AppError {
    #[snafu(display("{source}"))]
    Rejected { source: BallotError },

    #[snafu(display("Could not read {path}: {source}"))]
    ReadingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Could not save {path}: {source}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Could not parse {path}: {source}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Could not encode {path}: {source}"))]
    SerializingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("The candidate list in {path} is not valid: {source}"))]
    InvalidRoster { source: BallotError, path: String },
    #[snafu(display("The vote counts in {path} are not valid: {source}"))]
    InvalidTallies { source: BallotError, path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

impl From<BallotError> for AppError {
    fn from(source: BallotError) -> Self {
        AppError::Rejected { source }
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// A mutation that went through in memory.
///
/// `warning` holds the error of the save that followed, if any. The in-memory state stays the
/// reference for the rest of the session in that case.
#[derive(Debug)]
pub struct Committed<T> {
    pub value: T,
    pub warning: Option<AppError>,
}

/// Proof of a successful administrator login. It stands for an open administrator panel.
#[derive(Debug)]
pub struct AdminSession {
    _private: (),
}

/// What the administrator sees right after logging in.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AdminSummary {
    pub voting_open: bool,
    pub total_votes: u64,
    pub num_candidates: usize,
}

/// The whole mutable state of the application.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AppState {
    pub ballot: BallotStore,
    pub credential: CredentialStore,
}

/// The controller after startup, with everything the user should be told about.
#[derive(Debug)]
pub struct Startup {
    pub controller: Controller,
    pub credential_created: bool,
    /// Credential file problems. The stored ballot is not affected by them.
    pub warnings: Vec<AppError>,
    /// Why the stored ballot could not be used, in which case the controller starts with the
    /// default ballot.
    pub ballot_warning: Option<AppError>,
}

/// Routes the user actions to the stores, checks the administrator password where needed,
/// and saves and logs after every change.
///
/// It is the only writer of the state.
#[derive(Debug)]
pub struct Controller {
    state: AppState,
    gateway: Gateway,
    audit: AuditLog,
}

impl Controller {
    /// Loads the credential and the ballot.
    ///
    /// `prompt` is called for a new administrator password when none is stored. Failing to get
    /// one is the only fatal startup error.
    pub fn start<F>(settings: &Settings, prompt: F) -> AppResult<Startup>
    where
        F: FnOnce() -> Option<String>,
    {
        let gateway = Gateway::new(settings);
        let audit = AuditLog::new(&settings.log_path);
        let mut warnings: Vec<AppError> = Vec::new();

        let (stored_hash, cred_warning) = gateway.load_credential();
        warnings.extend(cred_warning);
        let (credential, origin) = CredentialStore::initialize(stored_hash.as_deref(), prompt)?;
        let credential_created = origin == CredentialOrigin::Created;
        if credential_created {
            if let Err(e) = gateway.save_credential(&credential) {
                warn!("start: the new credential could not be saved: {}", e);
                warnings.push(e);
            }
            audit.append("Administrator password created");
        }

        let (ballot, ballot_warning) = gateway.load_ballot_state();
        info!(
            "start: {} candidates, {} votes, voting open: {}",
            ballot.candidates().len(),
            ballot.total_votes(),
            ballot.is_open()
        );

        Ok(Startup {
            controller: Controller {
                state: AppState { ballot, credential },
                gateway,
                audit,
            },
            credential_created,
            warnings,
            ballot_warning,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The voter view: the roster and the open/closed flag.
    pub fn ballot(&self) -> &BallotStore {
        &self.state().ballot
    }

    pub fn cast_vote(&mut self, candidate: &str) -> AppResult<Committed<u64>> {
        let tally = self.state.ballot.cast_vote(candidate)?;
        Ok(self.commit_ballot(tally))
    }

    pub fn admin_login(&self, password: &str) -> AppResult<AdminSession> {
        self.authorize(password)?;
        debug!("admin_login: administrator logged in");
        Ok(AdminSession { _private: () })
    }

    pub fn admin_summary(&self, _session: &AdminSession) -> AdminSummary {
        AdminSummary {
            voting_open: self.state.ballot.is_open(),
            total_votes: self.state.ballot.total_votes(),
            num_candidates: self.state.ballot.candidates().len(),
        }
    }

    pub fn open_voting(&mut self, _session: &AdminSession) -> Committed<Transition> {
        let transition = self.state.ballot.open_voting();
        self.commit_transition(transition, false)
    }

    pub fn close_voting(&mut self, _session: &AdminSession) -> Committed<Transition> {
        let transition = self.state.ballot.close_voting();
        self.commit_transition(transition, false)
    }

    pub fn toggle_voting(&mut self, _session: &AdminSession) -> Committed<Transition> {
        let transition = self.state.ballot.toggle_voting();
        self.commit_transition(transition, true)
    }

    pub fn view_results(&self, password: &str) -> AppResult<Vec<ResultRow>> {
        self.authorize(password)?;
        Ok(self.state.ballot.compute_results())
    }

    pub fn reset_votes(&mut self, password: &str) -> AppResult<Committed<()>> {
        self.authorize(password)?;
        let dropped = self.state.ballot.total_votes();
        self.state.ballot.reset_votes();
        self.audit
            .append(&format!("All votes reset ({} votes deleted)", dropped));
        Ok(self.commit_ballot(()))
    }

    pub fn manage_candidates(
        &mut self,
        names: &[String],
        password: &str,
    ) -> AppResult<Committed<()>> {
        self.authorize(password)?;
        self.state.ballot.set_candidates(names)?;
        self.audit.append(&format!(
            "Candidate list updated ({} candidates). All votes have been reset.",
            self.state.ballot.candidates().len()
        ));
        Ok(self.commit_ballot(()))
    }

    pub fn change_password(
        &mut self,
        current: &str,
        new_password: &str,
    ) -> AppResult<Committed<()>> {
        self.state.credential.change(current, new_password)?;
        self.audit.append("Administrator password changed");
        let warning = self.gateway.save_credential(&self.state.credential).err();
        if let Some(e) = &warning {
            warn!("change_password: {}", e);
        }
        Ok(Committed { value: (), warning })
    }

    /// Saves the ballot one last time. Called when the console exits.
    pub fn shutdown(&self) -> AppResult<()> {
        debug!("shutdown: saving the ballot");
        self.gateway.save_ballot_state(self.state.ballot.state())
    }

    fn authorize(&self, password: &str) -> AppResult<()> {
        if self.state.credential.verify(password) {
            Ok(())
        } else {
            debug!("authorize: wrong administrator password");
            Err(BallotError::Auth.into())
        }
    }

    fn commit_transition(
        &mut self,
        transition: Transition,
        is_override: bool,
    ) -> Committed<Transition> {
        let message = match (transition, is_override) {
            (Transition::Unchanged, _) => {
                debug!("commit_transition: nothing to do");
                return Committed {
                    value: transition,
                    warning: None,
                };
            }
            (Transition::Opened, false) => "Voting Opened Manually",
            (Transition::Closed, false) => "Voting Closed Manually",
            (Transition::Opened, true) => "Voting Opened Manually (Override)",
            (Transition::Closed, true) => "Voting Closed Manually (Override)",
        };
        self.audit.append(message);
        self.commit_ballot(transition)
    }

    fn commit_ballot<T>(&self, value: T) -> Committed<T> {
        let warning = self
            .gateway
            .save_ballot_state(self.state.ballot.state())
            .err();
        if let Some(e) = &warning {
            warn!("commit_ballot: the ballot stays in memory only: {}", e);
        }
        Committed { value, warning }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    const PW: &str = "s3cret";

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn start(dir: &TempDir) -> Controller {
        let settings = Settings::in_dir(dir.path());
        Controller::start(&settings, || Some(PW.to_string()))
            .unwrap()
            .controller
    }

    fn audit_lines(dir: &TempDir) -> Vec<String> {
        let settings = Settings::in_dir(dir.path());
        fs::read_to_string(settings.log_path)
            .unwrap_or_default()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn first_run_creates_credential_and_default_ballot() {
        let dir = tempdir().unwrap();
        let settings = Settings::in_dir(dir.path());
        let startup = Controller::start(&settings, || Some(PW.to_string())).unwrap();
        assert!(startup.credential_created);
        assert!(startup.warnings.is_empty());
        assert!(startup.ballot_warning.is_none());
        assert!(settings.password_path.exists());
        assert_eq!(startup.controller.ballot(), &BallotStore::default());

        // The second start uses the stored credential.
        let startup = Controller::start(&settings, || panic!("no prompt expected")).unwrap();
        assert!(!startup.credential_created);
        assert!(startup.controller.admin_login(PW).is_ok());
        assert!(audit_lines(&dir)[0].ends_with("] Administrator password created"));
    }

    #[test]
    fn first_run_without_password_is_fatal() {
        let dir = tempdir().unwrap();
        let settings = Settings::in_dir(dir.path());
        let err = Controller::start(&settings, || None).unwrap_err();
        assert!(matches!(
            err,
            AppError::Rejected {
                source: BallotError::MissingCredential
            }
        ));
        assert!(!settings.password_path.exists());
    }

    #[test]
    fn voting_scenario_survives_restart() {
        let dir = tempdir().unwrap();
        let mut c = start(&dir);
        c.manage_candidates(&names(&["A", "B", "C"]), PW).unwrap();

        let err = c.cast_vote("A").unwrap_err();
        assert!(matches!(
            err,
            AppError::Rejected {
                source: BallotError::VotingClosed
            }
        ));

        let session = c.admin_login(PW).unwrap();
        assert_eq!(c.open_voting(&session).value, Transition::Opened);
        c.cast_vote("A").unwrap();
        c.cast_vote("A").unwrap();
        c.cast_vote("B").unwrap();

        let c = start(&dir);
        let results: Vec<(String, u64, f64)> = c
            .view_results(PW)
            .unwrap()
            .into_iter()
            .map(|r| (r.name, r.votes, r.percentage))
            .collect();
        assert_eq!(
            results,
            vec![
                ("A".to_string(), 2, 66.7),
                ("B".to_string(), 1, 33.3),
                ("C".to_string(), 0, 0.0)
            ]
        );
        assert!(c.ballot().is_open());
    }

    #[test]
    fn secure_actions_need_the_password() {
        let dir = tempdir().unwrap();
        let mut c = start(&dir);
        let session = c.admin_login(PW).unwrap();
        c.open_voting(&session);
        c.cast_vote("Candidate 3").unwrap();
        let settings = Settings::in_dir(dir.path());
        let on_disk = fs::read_to_string(&settings.data_path).unwrap();
        let before = c.state().clone();

        assert!(c.admin_login("nope").is_err());
        assert!(c.view_results("nope").is_err());
        assert!(c.reset_votes("nope").is_err());
        assert!(c
            .manage_candidates(&names(&["X", "Y"]), "nope")
            .is_err());
        assert!(c.change_password("nope", "other").is_err());

        assert_eq!(c.state(), &before);
        assert_eq!(fs::read_to_string(&settings.data_path).unwrap(), on_disk);
    }

    #[test]
    fn idempotent_open_close_are_not_logged_or_saved() {
        let dir = tempdir().unwrap();
        let data_path = Settings::in_dir(dir.path()).data_path;
        let mut c = start(&dir);
        let session = c.admin_login(PW).unwrap();
        let start_lines = audit_lines(&dir).len();

        assert_eq!(c.close_voting(&session).value, Transition::Unchanged);
        assert_eq!(audit_lines(&dir).len(), start_lines);
        assert!(!data_path.exists());

        c.open_voting(&session);
        assert!(data_path.exists());
        // A save would bring the file back.
        fs::remove_file(&data_path).unwrap();
        assert_eq!(c.open_voting(&session).value, Transition::Unchanged);
        assert!(!data_path.exists());
        c.close_voting(&session);
        assert!(data_path.exists());
        let lines = audit_lines(&dir);
        assert_eq!(lines.len(), start_lines + 2);
        assert!(lines[start_lines].ends_with("] Voting Opened Manually"));
        assert!(lines[start_lines + 1].ends_with("] Voting Closed Manually"));

        c.toggle_voting(&session);
        c.toggle_voting(&session);
        let lines = audit_lines(&dir);
        assert_eq!(lines.len(), start_lines + 4);
        assert!(lines[start_lines + 2].ends_with("] Voting Opened Manually (Override)"));
        assert!(lines[start_lines + 3].ends_with("] Voting Closed Manually (Override)"));
    }

    #[test]
    fn rejected_rosters_leave_state_untouched() {
        let dir = tempdir().unwrap();
        let mut c = start(&dir);
        let before = c.state().clone();

        let err = c
            .manage_candidates(&names(&["A", "B", "A"]), PW)
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Rejected {
                source: BallotError::DuplicateName(_)
            }
        ));

        let roster: Vec<String> = (1..=33).map(|i| format!("N{}", i)).collect();
        let err = c.manage_candidates(&roster, PW).unwrap_err();
        assert!(matches!(
            err,
            AppError::Rejected {
                source: BallotError::LimitExceeded { count: 33 }
            }
        ));
        assert_eq!(c.state(), &before);
    }

    #[test]
    fn reset_votes_is_persisted() {
        let dir = tempdir().unwrap();
        let mut c = start(&dir);
        let session = c.admin_login(PW).unwrap();
        c.open_voting(&session);
        c.cast_vote("Candidate 1").unwrap();
        c.cast_vote("Candidate 2").unwrap();
        let done = c.reset_votes(PW).unwrap();
        assert!(done.warning.is_none());

        let c = start(&dir);
        assert_eq!(c.ballot().total_votes(), 0);
        assert_eq!(c.ballot().candidates().len(), 10);
        assert!(audit_lines(&dir)
            .iter()
            .any(|l| l.ends_with("All votes reset (2 votes deleted)")));
    }

    #[test]
    fn password_change_is_persisted() {
        let dir = tempdir().unwrap();
        let mut c = start(&dir);
        let err = c.change_password(PW, "").unwrap_err();
        assert!(matches!(
            err,
            AppError::Rejected {
                source: BallotError::Validation(_)
            }
        ));
        c.change_password(PW, "n3w").unwrap();
        assert!(c.admin_login(PW).is_err());

        let c = start(&dir);
        assert!(c.admin_login("n3w").is_ok());
        assert!(c.admin_login(PW).is_err());
    }

    #[test]
    fn failed_saves_are_not_fatal() {
        let dir = tempdir().unwrap();
        let settings = Settings::in_dir(dir.path());
        // A directory where the ballot file should be: reads and renames fail.
        fs::create_dir(&settings.data_path).unwrap();
        let startup = Controller::start(&settings, || Some(PW.to_string())).unwrap();
        assert!(startup.warnings.is_empty());
        assert!(startup.ballot_warning.is_some());
        let mut c = startup.controller;
        assert_eq!(c.ballot(), &BallotStore::default());

        let session = c.admin_login(PW).unwrap();
        assert!(c.open_voting(&session).warning.is_some());
        let done = c.cast_vote("Candidate 4").unwrap();
        assert_eq!(done.value, 1);
        assert!(done.warning.is_some());
        assert_eq!(c.ballot().total_votes(), 1);
        assert!(c.shutdown().is_err());
    }
}
