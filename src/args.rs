use clap::{Parser, Subcommand};

/// A ballot box for a single machine, with voter and administrator roles.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON settings file naming the data directory and the data files.
    /// For more information about the file format, read the documentation of the settings module.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory, default: current directory) Where the ballot, the password and the log files are kept.
    /// Setting this option overrides the directory that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub data_dir: Option<String>,

    /// (optional) The administrator password, for scripted use. When not given, the password is
    /// asked for on the terminal.
    #[clap(long, value_parser)]
    pub password: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    /// The action to run. Without one, an interactive console is started.
    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Shows whether voting is open and lists the candidates.
    Status,
    /// Casts one vote for the given candidate (name or number in the list).
    Vote {
        #[clap(value_parser)]
        candidate: String,
    },
    /// Checks the administrator password and shows the administrator summary.
    Login,
    /// Opens the voting period.
    Open,
    /// Closes the voting period.
    Close,
    /// Flips the voting period, whatever its current state.
    Toggle,
    /// Shows the detailed results.
    Results,
    /// Deletes all the votes cast so far.
    Reset {
        /// Skips the confirmation question.
        #[clap(long, takes_value = false)]
        yes: bool,
    },
    /// Replaces the list of candidates. All the votes are reset.
    Candidates {
        #[clap(value_parser, required = true)]
        names: Vec<String>,
    },
    /// Changes the administrator password.
    ChangePassword,
    /// Starts the interactive console.
    Console,
}
