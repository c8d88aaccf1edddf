use clap::Parser;
use log::debug;
use snafu::ErrorCompat;
use std::io::{self, IsTerminal};

mod app;
mod args;

use crate::app::console::Console;
use crate::app::settings::Settings;
use crate::app::AppResult;
use crate::args::{Args, Command};

fn run(args: &Args) -> AppResult<()> {
    let settings = Settings::resolve(args.config.as_deref(), args.data_dir.as_deref())?;
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut console = Console::new(stdin.lock(), io::stdout())
        .with_password(args.password.clone())
        .with_hidden_secrets(interactive);
    let mut controller = console.start(&settings)?;
    let command = args.command.clone().unwrap_or(Command::Console);
    debug!("run: {:?}", command);
    console.run_command(&mut controller, &command)
}

fn main() {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    debug!("main: {:?}", args.command);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("{}", bt);
        }
        std::process::exit(1);
    }
}
