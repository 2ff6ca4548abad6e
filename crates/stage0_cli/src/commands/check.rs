//! Check command - Resolve and verify without touching templates.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use stage0_core::{ProcessEnvironment, Processor};

use super::ProcessArgs;

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub process: ProcessArgs,
}

pub fn execute(args: CheckArgs) -> Result<()> {
    let processor = Processor::load(args.process.config()).context("Failed to load process inputs")?;
    let prepared = processor
        .prepare(&ProcessEnvironment)
        .context("Context resolution failed")?;

    for key in &prepared.context_keys {
        let kind = prepared
            .context
            .get(key)
            .map(|node| node.kind())
            .unwrap_or("missing");
        info!("Context '{}' resolved ({})", key, kind);
    }
    info!(
        "Check passed: {} templates ready, {} requirements verified",
        processor.descriptor().templates.len(),
        prepared.requirements_checked
    );
    Ok(())
}
