//! Marketplace search runner
//!
//! Searches every keyword given on the command line, filters the results and
//! prints them as JSON on stdout. Logs go to stderr.

use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use market_scraper::config::Config;
use market_scraper::error::{AppError, AppResult};
use market_scraper::filter::DataProcessor;
use market_scraper::search::SearchOrchestrator;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Search run failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run() -> AppResult<()> {
    let keywords: Vec<String> = std::env::args()
        .skip(1)
        .map(|arg| arg.trim().to_string())
        .filter(|arg| !arg.is_empty())
        .collect();
    if keywords.is_empty() {
        return Err(AppError::validation(
            "usage: market-search <keyword> [<keyword>...]",
        ));
    }

    let config = Config::from_env()?;
    let processor = match &config.filters {
        Some(filters) => DataProcessor::with_filters(filters.clone()),
        None => DataProcessor::with_default_filters(),
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling remaining searches");
            on_interrupt.cancel();
        }
    });

    info!(
        keywords = keywords.len(),
        limit = config.result_limit,
        concurrency = config.max_concurrency,
        "Starting search run"
    );

    let orchestrator = Arc::new(SearchOrchestrator::new(&config));
    let outcome = orchestrator
        .search_many(&keywords, config.result_limit, &cancel)
        .await;

    if !outcome.is_complete() {
        warn!(cancelled = ?outcome.cancelled, "Some keywords were not searched");
    }

    let records = outcome.into_filtered(&processor);
    info!(records = records.len(), "Search run finished");

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
