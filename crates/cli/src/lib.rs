pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "helpdesk",
    about = "Helpdesk operator CLI",
    long_about = "Inspect configuration, check service readiness, and load the support knowledge base.",
    after_help = "Examples:\n  helpdesk doctor --json\n  helpdesk config\n  helpdesk kb-load --file knowledge_base.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM credentials, knowledge file and knowledge store")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Load knowledge-base entries into the configured store, skipping known ids")]
    KbLoad {
        #[arg(long, help = "Entries file to load instead of knowledge.kb_file")]
        file: Option<PathBuf>,
    },
}

pub fn run() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::KbLoad { file } => commands::kb_load::run(file.as_deref()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
