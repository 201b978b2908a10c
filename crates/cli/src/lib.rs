pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "larder",
    about = "Larder operator CLI",
    long_about = "Operate the Larder inventory reminder service: migrations, config inspection, readiness checks, and manual reminder runs.",
    after_help = "Examples:\n  larder doctor --json\n  larder config\n  larder remind"
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
        about = "Inspect effective configuration values with secret redaction"
    )]
    Config,
    #[command(about = "Validate config, interpreter readiness, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run the manual reminder pipeline once and report what was sent")]
    Remind,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Remind => commands::remind::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
