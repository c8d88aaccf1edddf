// The text front end: turns user input into controller calls and renders the answers.

use log::debug;
use std::io::{BufRead, Write};

use ballot_store::{BallotError, BallotStore, ResultRow, Transition};
use snafu::prelude::*;

use crate::app::settings::Settings;
use crate::app::*;
use crate::args::Command;

const HELP: &str = "Commands:
  status              show whether voting is open and list the candidates
  vote <name|number>  cast a vote
  login               log in as administrator
  logout              leave the administrator panel
  open | close        open or close the voting period (administrator)
  toggle              flip the voting period (administrator)
  results             detailed results (asks for the password)
  reset               delete all votes (asks for the password)
  candidates          replace the list of candidates (asks for the password)
  passwd              change the administrator password
  help                show this message
  quit                save and leave";

pub struct Console<R: BufRead, W: Write> {
    input: R,
    output: W,
    // Given on the command line, used instead of asking.
    preset_password: Option<String>,
    // Passwords are read from the terminal without echo, not from `input`.
    hidden_secrets: bool,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Console<R, W> {
        Console {
            input,
            output,
            preset_password: None,
            hidden_secrets: false,
        }
    }

    pub fn with_password(self, password: Option<String>) -> Console<R, W> {
        Console {
            preset_password: password,
            ..self
        }
    }

    pub fn with_hidden_secrets(self, hidden_secrets: bool) -> Console<R, W> {
        Console {
            hidden_secrets,
            ..self
        }
    }

    /// Starts the controller, asking for the initial administrator password if needed.
    pub fn start(&mut self, settings: &Settings) -> AppResult<Controller> {
        let startup = Controller::start(settings, || self.prompt_new_password())?;
        if startup.credential_created {
            self.say("Administrator password has been set successfully.")?;
        }
        for w in startup.warnings.iter() {
            self.say(&format!("Warning: {}", w))?;
        }
        if let Some(w) = &startup.ballot_warning {
            self.say(&format!("Warning: {}. Starting with fresh data.", w))?;
        }
        Ok(startup.controller)
    }

    /// Runs a single command. Administrator commands ask for the password themselves.
    pub fn run_command(&mut self, controller: &mut Controller, command: &Command) -> AppResult<()> {
        let mut session: Option<AdminSession> = None;
        self.execute(controller, command, &mut session)
    }

    /// Reads commands until `quit` or the end of the input, then saves the ballot.
    ///
    /// Rejected actions are reported and the loop goes on.
    pub fn run_interactive(&mut self, controller: &mut Controller) -> AppResult<()> {
        self.say(HELP)?;
        self.show_status(controller.ballot())?;
        let mut session: Option<AdminSession> = None;
        loop {
            let line = match self.ask("> ")? {
                Some(l) => l,
                None => break,
            };
            let line = line.trim();
            let (word, rest) = match line.split_once(char::is_whitespace) {
                Some((w, r)) => (w, r.trim()),
                None => (line, ""),
            };
            debug!("run_interactive: {:?} {:?}", word, rest);
            let command = match word {
                "" => continue,
                "help" => {
                    self.say(HELP)?;
                    continue;
                }
                "quit" | "exit" => break,
                "logout" => {
                    session = None;
                    self.say("Logged out.")?;
                    continue;
                }
                "status" => Command::Status,
                "vote" => Command::Vote {
                    candidate: rest.to_string(),
                },
                "login" => Command::Login,
                "open" => Command::Open,
                "close" => Command::Close,
                "toggle" => Command::Toggle,
                "results" => Command::Results,
                "reset" => Command::Reset { yes: false },
                "candidates" => Command::Candidates {
                    names: self.read_names()?,
                },
                "passwd" | "change-password" => Command::ChangePassword,
                other => {
                    self.say(&format!("Unknown command '{}'. Type 'help'.", other))?;
                    continue;
                }
            };
            if let Err(e) = self.execute(controller, &command, &mut session) {
                self.say(&format!("Rejected: {}", e))?;
            }
        }
        if let Err(e) = controller.shutdown() {
            self.say(&format!("Warning: {}", e))?;
        }
        self.say("Goodbye.")
    }

    fn execute(
        &mut self,
        controller: &mut Controller,
        command: &Command,
        session: &mut Option<AdminSession>,
    ) -> AppResult<()> {
        match command {
            Command::Console => self.run_interactive(controller),
            Command::Status => self.show_status(controller.ballot()),
            Command::Vote { candidate } => {
                let name = resolve_selection(controller.ballot(), candidate);
                let done = controller.cast_vote(&name)?;
                self.say(&format!(
                    "Thank you! Your vote for '{}' has been successfully recorded.",
                    name
                ))?;
                self.report_unsaved(&done.warning)
            }
            Command::Login => {
                let password = self.ask_admin_password("Enter administrator password: ")?;
                let s = controller.admin_login(&password)?;
                let summary = controller.admin_summary(&s);
                *session = Some(s);
                self.say(&render_summary(&summary))
            }
            Command::Open => {
                let s = self.session_for(controller, session)?;
                let done = controller.open_voting(s);
                self.report_transition(&done)
            }
            Command::Close => {
                let s = self.session_for(controller, session)?;
                let done = controller.close_voting(s);
                self.report_transition(&done)
            }
            Command::Toggle => {
                let s = self.session_for(controller, session)?;
                let done = controller.toggle_voting(s);
                self.report_transition(&done)
            }
            Command::Results => {
                let password = self.ask_admin_password(
                    "Enter administrator password to access secure functions: ",
                )?;
                let rows = controller.view_results(&password)?;
                let total = controller.ballot().total_votes();
                self.say(&render_results(&rows, total))
            }
            Command::Reset { yes } => {
                let password = self.ask_admin_password(
                    "This is a critical action. Enter the administrator password to confirm a full vote reset: ",
                )?;
                // Checked before the confirmation question, and again by the reset itself.
                controller.admin_login(&password)?;
                if !*yes
                    && !self.confirm(
                        "WARNING: This will permanently delete ALL cast votes and reset counts to zero. \
                         This action cannot be undone. Are you absolutely sure? [y/N] ",
                    )?
                {
                    return self.say("Reset cancelled.");
                }
                let done = controller.reset_votes(&password)?;
                self.say("All voting data has been successfully cleared.")?;
                self.report_unsaved(&done.warning)
            }
            Command::Candidates { names } => {
                let password = self.ask_admin_password("Enter administrator password: ")?;
                let done = controller.manage_candidates(names, &password)?;
                self.say("Candidate list updated. All votes have been reset.")?;
                self.report_unsaved(&done.warning)?;
                self.show_status(controller.ballot())
            }
            Command::ChangePassword => {
                let current = self.ask_admin_password("Current password: ")?;
                let new_password = self.ask_secret("New password: ")?;
                let confirmation = self.ask_secret("Confirm new password: ")?;
                if new_password != confirmation {
                    return Err(BallotError::Validation(
                        "New passwords do not match or are empty.".to_string(),
                    )
                    .into());
                }
                let done = controller.change_password(&current, &new_password)?;
                self.say("Password changed successfully.")?;
                self.report_unsaved(&done.warning)
            }
        }
    }

    // Logs in on demand when no administrator panel is open yet.
    fn session_for<'s>(
        &mut self,
        controller: &Controller,
        session: &'s mut Option<AdminSession>,
    ) -> AppResult<&'s AdminSession> {
        let s = match session.take() {
            Some(s) => s,
            None => {
                let password = self.ask_admin_password("Enter administrator password: ")?;
                controller.admin_login(&password)?
            }
        };
        Ok(session.insert(s))
    }

    /// Asks for the first administrator password. None means that the user declined.
    pub fn prompt_new_password(&mut self) -> Option<String> {
        if let Some(p) = self.preset_password.clone() {
            return Some(p);
        }
        let _ = self.say("Initial administrator setup.");
        match self.ask_secret("Please set a new administrator password: ") {
            Ok(p) if !p.is_empty() => Some(p),
            _ => None,
        }
    }

    fn read_names(&mut self) -> AppResult<Vec<String>> {
        self.say("Enter the candidate names, one per line. Finish with an empty line.")?;
        let mut names: Vec<String> = Vec::new();
        while let Some(line) = self.ask(&format!("{:2}. ", names.len() + 1))? {
            if line.trim().is_empty() {
                break;
            }
            names.push(line);
        }
        Ok(names)
    }

    fn report_transition(&mut self, done: &Committed<Transition>) -> AppResult<()> {
        let msg = match done.value {
            Transition::Opened => "The voting period is now OPEN.",
            Transition::Closed => "The voting period is now CLOSED.",
            Transition::Unchanged => "Nothing to do: the voting period is already in that state.",
        };
        self.say(msg)?;
        self.report_unsaved(&done.warning)
    }

    fn report_unsaved(&mut self, warning: &Option<AppError>) -> AppResult<()> {
        match warning {
            Some(e) => self.say(&format!(
                "Warning: {}. The change is kept in memory for this session.",
                e
            )),
            None => Ok(()),
        }
    }

    fn show_status(&mut self, ballot: &BallotStore) -> AppResult<()> {
        self.say(&render_status(ballot))
    }

    fn ask_admin_password(&mut self, question: &str) -> AppResult<String> {
        match self.preset_password.clone() {
            Some(p) => Ok(p),
            None => self.ask_secret(question),
        }
    }

    fn ask_secret(&mut self, question: &str) -> AppResult<String> {
        if self.hidden_secrets {
            return rpassword::prompt_password(question)
                .whatever_context::<_, AppError>("Could not read the password from the terminal");
        }
        match self.ask(question)? {
            Some(p) => Ok(p),
            None => whatever!("No password was given."),
        }
    }

    fn confirm(&mut self, question: &str) -> AppResult<bool> {
        let answer = self.ask(question)?.unwrap_or_default();
        Ok(matches!(
            answer.trim().to_lowercase().as_str(),
            "y" | "yes"
        ))
    }

    // None at the end of the input.
    fn ask(&mut self, question: &str) -> AppResult<Option<String>> {
        write!(self.output, "{}", question)
            .whatever_context::<_, AppError>("Could not write to the terminal")?;
        self.output
            .flush()
            .whatever_context::<_, AppError>("Could not write to the terminal")?;
        let mut line = String::new();
        let n = self
            .input
            .read_line(&mut line)
            .whatever_context::<_, AppError>("Could not read from the terminal")?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }

    fn say(&mut self, text: &str) -> AppResult<()> {
        writeln!(self.output, "{}", text).whatever_context("Could not write to the terminal")
    }
}

/// The candidate picked by the user: an exact name first, then a number in the displayed list.
pub fn resolve_selection(ballot: &BallotStore, selection: &str) -> String {
    let selection = selection.trim();
    let candidates = ballot.candidates();
    if candidates.iter().any(|c| c == selection) {
        return selection.to_string();
    }
    match selection.parse::<usize>() {
        Ok(n) if n >= 1 && n <= candidates.len() => candidates[n - 1].clone(),
        _ => selection.to_string(),
    }
}

pub fn render_status(ballot: &BallotStore) -> String {
    let mut s = if ballot.is_open() {
        "Voting is OPEN. Select a candidate and cast your vote.\n".to_string()
    } else {
        "Voting is CLOSED.\n".to_string()
    };
    for (idx, name) in ballot.candidates().iter().enumerate() {
        s.push_str(&format!("{:2}. {}\n", idx + 1, name));
    }
    s.trim_end().to_string()
}

pub fn render_summary(summary: &AdminSummary) -> String {
    format!(
        "Administrator panel. Voting is {}. Total votes cast: {} ({} candidates).",
        if summary.voting_open { "OPEN" } else { "CLOSED" },
        summary.total_votes,
        summary.num_candidates
    )
}

pub fn render_results(rows: &[ResultRow], total_votes: u64) -> String {
    let mut s = format!(
        "{:<6}{:<32}{:>8}{:>12}\n",
        "Rank", "Candidate Name", "Votes", "% of Total"
    );
    for r in rows.iter() {
        s.push_str(&format!(
            "{:<6}{:<32}{:>8}{:>11.1}%\n",
            r.rank, r.name, r.votes, r.percentage
        ));
    }
    s.push_str(&format!("Total votes: {}", total_votes));
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn run_script(settings: &Settings, script: &str) -> String {
        let mut out: Vec<u8> = Vec::new();
        {
            let mut console = Console::new(script.as_bytes(), &mut out);
            let mut controller = console.start(settings).unwrap();
            console.run_interactive(&mut controller).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn interactive_session() {
        let dir = tempdir().unwrap();
        let settings = Settings::in_dir(dir.path());
        let script = "pw\n\
                      vote 1\n\
                      login\n\
                      pw\n\
                      open\n\
                      vote 1\n\
                      vote Candidate 2\n\
                      vote Nobody\n\
                      results\n\
                      pw\n\
                      quit\n";
        let out = run_script(&settings, script);

        assert!(out.contains("Administrator password has been set successfully."));
        assert!(out.contains("Rejected: We're sorry, the voting period is currently closed."));
        assert!(out.contains("Administrator panel. Voting is CLOSED. Total votes cast: 0"));
        assert!(out.contains("The voting period is now OPEN."));
        assert!(out.contains("Your vote for 'Candidate 1' has been successfully recorded."));
        assert!(out.contains("Your vote for 'Candidate 2' has been successfully recorded."));
        assert!(out.contains("Rejected: 'Nobody' is not a candidate on this ballot."));
        assert!(out.contains("50.0%"));
        assert!(out.contains("Total votes: 2"));
        assert!(out.ends_with("Goodbye.\n"));

        let saved = fs::read_to_string(&settings.data_path).unwrap();
        let js: serde_json::Value = serde_json::from_str(&saved).unwrap();
        assert_eq!(js["total_votes"], 2);
        assert_eq!(js["voting_open"], true);
    }

    #[test]
    fn candidates_and_wrong_passwords() {
        let dir = tempdir().unwrap();
        let settings = Settings::in_dir(dir.path());
        let script = "pw\n\
                      candidates\n\
                      Alice\n\
                      Bob\n\
                      \n\
                      wrong\n\
                      candidates\n\
                      Alice\n\
                      Bob\n\
                      \n\
                      pw\n\
                      reset\n\
                      pw\n\
                      n\n\
                      passwd\n\
                      pw\n\
                      new\n\
                      other\n\
                      bogus\n";
        let out = run_script(&settings, script);

        assert!(out.contains("Rejected: The password you entered is incorrect."));
        assert!(out.contains("Candidate list updated. All votes have been reset."));
        assert!(out.contains(" 1. Alice\n 2. Bob"));
        assert!(out.contains("Reset cancelled."));
        assert!(out.contains("Rejected: New passwords do not match or are empty."));
        assert!(out.contains("Unknown command 'bogus'."));

        let log = fs::read_to_string(&settings.log_path).unwrap();
        assert!(log.contains("Candidate list updated (2 candidates)"));
        assert!(!log.contains("All votes reset"));
        assert!(!log.contains("password changed"));
    }

    #[test]
    fn one_shot_commands_with_preset_password() {
        let dir = tempdir().unwrap();
        let settings = Settings::in_dir(dir.path());
        let mut out: Vec<u8> = Vec::new();
        {
            let mut console = Console::new(&b""[..], &mut out).with_password(Some("pw".to_string()));
            let mut controller = console.start(&settings).unwrap();
            console.run_command(&mut controller, &Command::Toggle).unwrap();
            console
                .run_command(
                    &mut controller,
                    &Command::Vote {
                        candidate: "3".to_string(),
                    },
                )
                .unwrap();
            console
                .run_command(&mut controller, &Command::Reset { yes: true })
                .unwrap();
            assert_eq!(controller.ballot().total_votes(), 0);
        }
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("The voting period is now OPEN."));
        assert!(out.contains("Your vote for 'Candidate 3'"));
        assert!(out.contains("All voting data has been successfully cleared."));
    }

    #[test]
    fn preset_password_skips_the_hidden_prompt() {
        let dir = tempdir().unwrap();
        let settings = Settings::in_dir(dir.path());
        let mut out: Vec<u8> = Vec::new();
        {
            // Nothing may be read from the terminal here.
            let mut console = Console::new(&b""[..], &mut out)
                .with_password(Some("pw".to_string()))
                .with_hidden_secrets(true);
            let mut controller = console.start(&settings).unwrap();
            console.run_command(&mut controller, &Command::Login).unwrap();
            console.run_command(&mut controller, &Command::Results).unwrap();
        }
        let out = String::from_utf8(out).unwrap();
        assert!(!out.contains("password: "));
        assert!(out.contains("Administrator panel. Voting is CLOSED."));
    }

    #[test]
    fn only_ballot_load_failures_mention_fresh_data() {
        let dir = tempdir().unwrap();
        let settings = Settings::in_dir(dir.path());
        fs::write(&settings.password_path, "nonsense").unwrap();
        fs::write(&settings.data_path, "{ broken").unwrap();
        let mut out: Vec<u8> = Vec::new();
        {
            let mut console = Console::new(&b"pw\n"[..], &mut out);
            console.start(&settings).unwrap();
        }
        let out = String::from_utf8(out).unwrap();
        let warnings: Vec<&str> = out.lines().filter(|l| l.starts_with("Warning: ")).collect();
        assert_eq!(warnings.len(), 2);
        let credential = warnings
            .iter()
            .find(|l| l.contains("admin_password.json"))
            .unwrap();
        assert!(!credential.contains("fresh data"));
        let ballot = warnings
            .iter()
            .find(|l| l.contains("voting_data.json"))
            .unwrap();
        assert!(ballot.ends_with("Starting with fresh data."));
    }

    #[test]
    fn declining_the_initial_password_is_fatal() {
        let dir = tempdir().unwrap();
        let settings = Settings::in_dir(dir.path());
        let mut out: Vec<u8> = Vec::new();
        let mut console = Console::new(&b"\n"[..], &mut out);
        let err = console.start(&settings).unwrap_err();
        assert!(matches!(
            err,
            AppError::Rejected {
                source: BallotError::MissingCredential
            }
        ));
    }

    #[test]
    fn selection_by_name_or_number() {
        let mut ballot = BallotStore::default();
        ballot
            .set_candidates(&["Zed".to_string(), "2".to_string(), "Amy".to_string()])
            .unwrap();
        assert_eq!(resolve_selection(&ballot, "Amy"), "Amy");
        assert_eq!(resolve_selection(&ballot, "1"), "Zed");
        // An exact name wins over a position.
        assert_eq!(resolve_selection(&ballot, "2"), "2");
        assert_eq!(resolve_selection(&ballot, "3"), "Amy");
        assert_eq!(resolve_selection(&ballot, "4"), "4");
    }

    #[test]
    fn results_table() {
        let rows = vec![
            ResultRow {
                rank: 1,
                name: "A".to_string(),
                votes: 2,
                percentage: 66.7,
            },
            ResultRow {
                rank: 2,
                name: "B".to_string(),
                votes: 1,
                percentage: 33.3,
            },
        ];
        let table = render_results(&rows, 3);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Rank  Candidate Name"));
        assert!(lines[1].starts_with("1     A"));
        assert!(lines[1].ends_with("2       66.7%"));
        assert_eq!(lines[3], "Total votes: 3");
    }
}
