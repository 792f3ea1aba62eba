use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use market_agents::{run_market, MarketConfig};
use negotiation::{ServiceDirectory, YellowPages};
use tracing::info;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of simulated days (overrides config and MARKET_DAYS)
    #[arg(long)]
    days: Option<u32>,

    /// Milliseconds between clock ticks (overrides config and MARKET_TICK_MS)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Write the JSON run report here
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = MarketConfig::load(args.config.as_deref())?.with_overrides(args.days, args.tick_ms)?;
    info!(
        company = %config.company,
        technicians = config.technicians.len(),
        days = config.days,
        tick_ms = config.tick_ms,
        "Labor market starting"
    );

    let directory: Arc<dyn ServiceDirectory> = Arc::new(YellowPages::new());
    let report = run_market(&config, directory).await?;

    println!("{}", report.summary());
    if let Some(path) = &args.report {
        report.write_json(path)?;
    }

    Ok(())
}
