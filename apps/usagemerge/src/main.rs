mod cli;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = cli::parse_args();
    let config = usagemerge_config::load_config_or_default(&args.config_path)
        .with_context(|| format!("failed to load config {}", args.config_path.display()))?;

    let summary = usagemerge_core::run_pipeline(&config)?;

    println!(
        "Final report has been rendered to {}",
        summary.report_path.display()
    );
    println!();
    println!("----- Service Guid Summary -----");
    for (service_guid, count) in &summary.service_counts {
        println!("{service_guid}: {count}");
    }

    Ok(())
}
