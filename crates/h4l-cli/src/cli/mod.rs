mod commands;

use clap::Parser;
use h4l_core::domain::{AnalysisError, ErrorCategory};

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error[{}]: {}", error.category().as_str(), error);
            error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(name = "h4l", about = "Four-lepton Higgs candidate selection")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Select four-lepton candidates from lepton ntuples or tables
    Select(commands::SelectArgs),
    /// Compute a Monte-Carlo normalization weight
    Weight(commands::WeightArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Select(args) => commands::run_select_command(args),
        CliCommand::Weight(args) => commands::run_weight_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Analysis(AnalysisError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Usage(_) => ErrorCategory::InputValidation,
            Self::Analysis(error) => error.category(),
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }
}
