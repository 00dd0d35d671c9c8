pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "smashbot",
    about = "Smashbot operator CLI",
    long_about = "Operate smashbot storage: migrations, catalog sync, vote statistics, and readiness checks.",
    after_help = "Examples:\n  smashbot migrate\n  smashbot sync\n  smashbot stats --json\n  smashbot doctor"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Create missing vote records for every catalog item")]
    Sync,
    #[command(about = "Print smash and pass totals for every item")]
    Stats {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Validate config, catalog, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Sync => commands::sync::run(),
        Command::Stats { json } => commands::stats::run(json),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
