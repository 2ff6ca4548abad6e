//! stage0 CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid input (descriptor or specification documents)
//! - 3: Environment or context resolution failure
//! - 4: Template error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};
use stage0_core::CoreError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_INPUT: u8 = 2;
    pub const RESOLUTION_FAILURE: u8 = 3;
    pub const TEMPLATE_ERROR: u8 = 4;
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "stage0=debug"
    } else if cli.quiet {
        "stage0=warn"
    } else {
        "stage0=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},warn", default_level)));

    // Already-initialized logging is fine.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Check(args) => commands::check::execute(args),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<CoreError>() {
        Some(
            CoreError::NotFound(_)
            | CoreError::Format { .. }
            | CoreError::Validation { .. }
            | CoreError::UnsupportedDirective { .. }
            | CoreError::Spec(_),
        ) => ExitCodes::INVALID_INPUT,
        Some(
            CoreError::MissingVariable(_)
            | CoreError::PathNotFound { .. }
            | CoreError::SelectorNotFound { .. }
            | CoreError::DirectiveTemplate { .. }
            | CoreError::TypeMismatch { .. }
            | CoreError::MissingRequirement { .. },
        ) => ExitCodes::RESOLUTION_FAILURE,
        Some(CoreError::Template(_)) => ExitCodes::TEMPLATE_ERROR,
        Some(CoreError::Io { .. }) | None => ExitCodes::GENERAL_ERROR,
    }
}
