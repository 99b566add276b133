//! Offline validation for workflow configuration files.
//!
//! Lets operators check a workflows.yml before deploying it, with the same
//! validation rules the server applies at startup.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use packflow::config::WorkflowsConfig;

#[derive(Parser)]
#[command(name = "workflow-lint")]
#[command(about = "Validate packflow workflow configuration files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a workflow file
    Check {
        /// Path to the workflow file
        #[arg(short, long, default_value = "workflows.yml")]
        file: PathBuf,
    },
    /// Print the parsed steps of a workflow file
    Show {
        /// Path to the workflow file
        #[arg(short, long, default_value = "workflows.yml")]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { file } => match WorkflowsConfig::load(&file) {
            Ok(config) => {
                println!("OK: {} steps", config.steps.len());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Show { file } => match WorkflowsConfig::load(&file) {
            Ok(config) => {
                for (index, step) in config.steps.iter().enumerate() {
                    println!("{}. {}", index + 1, step.kind());
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        },
    }
}
