use anyhow::{Context, Result};
use bright_mask::cli::Cli;
use bright_mask::logging::init_logging;
use bright_mask::pipeline::MaskPipeline;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Argument Parsing & Logging ---
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet)?;

    // --- 2. Pipeline Run ---
    // Per-image failures are logged and counted; only scan errors end up here.
    let config = cli.into_config();
    let input_dir = config.input_dir.clone();
    MaskPipeline::new(config)
        .run()
        .await
        .with_context(|| format!("Failed to process {}", input_dir.display()))?;

    Ok(())
}
