//! Run command - Expand every template of the descriptor.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use stage0_core::{ProcessEnvironment, Processor};

use super::ProcessArgs;

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub process: ProcessArgs,

    /// Keep the descriptor's working directory after a successful run
    #[arg(long)]
    pub keep_working_dir: bool,
}

pub fn execute(args: RunArgs) -> Result<()> {
    let config = args.process.config();
    info!(
        "Merging specifications from {:?} into {:?}",
        config.specifications_dir, config.repo_dir
    );

    let processor = Processor::load(config).context("Failed to load process inputs")?;
    let report = processor
        .run(&ProcessEnvironment)
        .context("Template processing failed")?;

    for file in report.written() {
        info!("Wrote {}", file.display());
    }
    for file in report.removed() {
        info!("Consumed template {}", file.display());
    }

    if !args.keep_working_dir {
        if let Some(area) = processor
            .remove_working_area()
            .context("Failed to clean up working directory")?
        {
            info!("Removed working directory {}", area.display());
        }
    }

    info!(
        "Done: {} context values, {} requirements, {} files written",
        report.context_keys.len(),
        report.requirements_checked,
        report.written().count()
    );
    Ok(())
}
