use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use keyhaul_core::{ProgressTracker, RedisConnector, RunSummary, TransferPipeline};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod progress;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // KEYHAUL_* defaults and RUST_LOG may live in a local .env
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(summary) => {
            info!(
                dispatched = summary.dispatched,
                total = ?summary.total,
                "migration complete"
            );
            println!("Done.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let show_progress = !cli.no_progress;
    let pipeline = TransferPipeline::new(Arc::new(RedisConnector), cli.into_config())
        .context("invalid transfer configuration")?;

    let tracker = ProgressTracker::new();
    let renderer = show_progress.then(|| progress::spawn_renderer(tracker.subscribe()));

    let result = pipeline.run(&tracker).await;

    drop(tracker);
    if let Some(renderer) = renderer {
        let _ = renderer.await;
    }

    result.context("transfer aborted")
}
