pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::commands::inquiry::InquiryCommand;
use crate::commands::proposal::ProposalCommand;

#[derive(Debug, Parser)]
#[command(
    name = "atelier",
    about = "Atelier operator CLI",
    long_about = "Work the event inquiry pipeline: move inquiries through their statuses, \
                  build and send proposals, and inspect config, migrations and seed data.",
    after_help = "Examples:\n  atelier doctor --json\n  atelier inquiry list --status QUOTING\n  \
                  atelier inquiry set-status inquiry-new IN_REVIEW --actor planner-ava\n  \
                  atelier proposal accept proposal-quoted-waiting-v1 \
                  --package package-quoted-waiting-v1-signature"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic pipeline fixtures (one inquiry per status)")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity and schema migration checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Read and move inquiries through the pipeline")]
    Inquiry {
        #[arg(long, global = true, help = "User recorded as the actor on activity entries")]
        actor: Option<String>,
        #[command(subcommand)]
        command: InquiryCommand,
    },
    #[command(about = "Create, send and accept proposals")]
    Proposal {
        #[arg(long, global = true, help = "User recorded as the actor on activity entries")]
        actor: Option<String>,
        #[command(subcommand)]
        command: ProposalCommand,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Inquiry { actor, command } => commands::inquiry::run(command, actor),
        Command::Proposal { actor, command } => commands::proposal::run(command, actor),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
