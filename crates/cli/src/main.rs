// offergrade CLI - score extracted offer records against labeled ground truth

mod eval;
mod exit_codes;

use std::process::ExitCode;

use clap::Parser;
use offergrade_linkage::{ErrorCategory, LinkageError};
use tracing_subscriber::EnvFilter;

use exit_codes::{linkage_exit_code, EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "offergrade")]
#[command(about = "Link extracted offer records to labeled ground truth and score every field")]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). OFFERGRADE_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: eval::EvalCommands,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_env("OFFERGRADE_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match eval::cmd_eval(cli.command) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(EXIT_INVALID_CONFIG, msg)
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::new(EXIT_RUNTIME, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<LinkageError> for CliError {
    fn from(err: LinkageError) -> Self {
        let hint = match err.category() {
            ErrorCategory::Selection => {
                Some("check the unit key against the ground-truth columns and timestamp format")
            }
            ErrorCategory::Schema => Some("every [scoring] field must be present in both inputs"),
            ErrorCategory::Decode => Some("candidates must be a JSON object holding an array of offers"),
            _ => None,
        };
        Self {
            code: linkage_exit_code(&err),
            message: err.to_string(),
            hint: hint.map(String::from),
        }
    }
}
