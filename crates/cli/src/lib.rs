pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "watchfinder",
    about = "Watchfinder operator CLI",
    long_about = "Inspect configuration, apply migrations, check readiness, and replay scripted conversations.",
    after_help = "Examples:\n  watchfinder doctor --json\n  watchfinder config\n  watchfinder replay data/replay.sample.json --catalog data/catalog.sample.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, search backend readiness, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run a scripted conversation against an in-memory catalog")]
    Replay {
        #[arg(help = "JSON script: {\"conversation_id\": .., \"turns\": [{\"intent\": .., \"entities\": ..}]}")]
        script: PathBuf,
        #[arg(long, help = "JSON catalog file (camelCase product entries)")]
        catalog: PathBuf,
        #[arg(long, default_value = commands::replay::DEFAULT_ORIGIN, help = "Origin used for reservation slip links")]
        origin: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Replay { script, catalog, origin } => {
            commands::replay::run(&script, &catalog, &origin)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
