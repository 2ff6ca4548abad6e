//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use stage0_core::ProcessorConfig;

pub mod check;
pub mod run;

/// stage0 - generate repository files from specifications and templates
#[derive(Parser)]
#[command(name = "stage0")]
#[command(version, about = "stage0 - generate repository files from specifications and templates")]
#[command(long_about = r#"
stage0 merges a tree of YAML specifications into the templates of a
repository, driven by the process descriptor found in the repository
(.stage0_template/process.yaml by default).

COMMANDS:
  run    → Resolve context, verify requirements and expand all templates
  check  → Resolve context and verify requirements without touching templates

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid input (descriptor or specification documents)
  3 - Environment or context resolution failure
  4 - Template error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Expand every template job of the descriptor
    Run(run::RunArgs),

    /// Validate the descriptor, context and requirements only
    Check(check::CheckArgs),
}

/// Input and output locations shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    /// Specification root directory
    #[arg(long, env = "SPECIFICATIONS_FOLDER", default_value = "/specifications")]
    pub specifications: PathBuf,

    /// Repository root directory
    #[arg(long, env = "REPO_FOLDER", default_value = "/repo")]
    pub repo: PathBuf,

    /// Process descriptor (defaults to <repo>/.stage0_template/process.yaml)
    #[arg(long, env = "STAGE0_DESCRIPTOR")]
    pub descriptor: Option<PathBuf>,
}

impl ProcessArgs {
    pub fn config(&self) -> ProcessorConfig {
        let config = ProcessorConfig::new(&self.specifications, &self.repo);
        match &self.descriptor {
            Some(descriptor) => config.with_descriptor(descriptor),
            None => config,
        }
    }
}
