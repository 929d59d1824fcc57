//! Runs a single keyword watch from the command line until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use dropwatch::{
    CategoryFetcher, Cli, LogNotifier, SeenSet, SubscriptionKey, SubscriptionRegistry,
};
use std::sync::Arc;
use tracing::info;
use url::Url;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let controls = cli.build_controls();
    let target = Url::parse(&cli.target).context("target must be an absolute URL")?;

    let fetcher = CategoryFetcher::new(controls.proxy()).context("building http client")?;
    let registry = SubscriptionRegistry::new(
        Arc::new(fetcher),
        Arc::new(LogNotifier::new()),
        Arc::new(SeenSet::new()),
        controls.interval(),
    );

    let key = SubscriptionKey {
        target,
        keyword: cli.keyword.clone(),
        chat_id: cli.chat_id,
    };
    registry.add(key);
    info!(keyword = %cli.keyword, interval = ?controls.interval(), "watching; Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    registry.shutdown();
    info!("shut down");
    Ok(())
}
