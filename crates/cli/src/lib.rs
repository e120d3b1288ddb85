pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "parley",
    about = "Parley action server operator CLI",
    long_about = "Inspect effective configuration, check server readiness, and decode webhook payloads offline.",
    after_help = "Examples:\n  parley doctor --json\n  parley config\n  parley inspect request.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and check that the listen address can be bound")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Decode a webhook payload and summarize the tracker it carries")]
    Inspect {
        #[arg(help = "Path to a JSON webhook request body")]
        path: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Inspect { path } => commands::inspect::run(&path),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
