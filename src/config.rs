//! Configuration module for the marketplace scraper
//!
//! Handles loading environment variables and application configuration.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::filter::FilterStrategy;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Site root visited for cookie bootstrap
    pub base_url: String,
    /// Host serving listing pages
    pub listing_url: String,
    /// Maximum records taken from one listing page
    pub result_limit: usize,
    /// Maximum keyword searches running at once
    pub max_concurrency: usize,
    /// Minimum spacing between consecutive outbound requests
    pub min_request_interval: Duration,
    /// Upper bound of the random delay added on top of the spacing
    pub request_jitter: Duration,
    /// Total timeout for one request
    pub request_timeout: Duration,
    /// Timeout for establishing a connection
    pub connect_timeout: Duration,
    /// Append-only log of per-item extraction failures
    pub error_log_path: PathBuf,
    /// Filter chain from `FILTERS`, if set
    pub filters: Option<Vec<FilterStrategy>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://www.mercadolivre.com.br".to_string(),
            listing_url: "https://lista.mercadolivre.com.br".to_string(),
            result_limit: 10,
            max_concurrency: 2,
            min_request_interval: Duration::from_millis(500),
            request_jitter: Duration::ZERO,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            error_log_path: PathBuf::from("scraping_errors.log"),
            filters: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset variables fall back to [`Config::default`]; set but malformed
    /// values are rejected.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let filters = match env::var("FILTERS") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                serde_json::from_str::<Vec<FilterStrategy>>(&raw)
                    .map_err(|e| AppError::config(format!("FILTERS is not valid: {}", e)))?,
            ),
            _ => None,
        };

        Ok(Self {
            base_url: env::var("MARKET_BASE_URL").unwrap_or(defaults.base_url),
            listing_url: env::var("MARKET_LISTING_URL").unwrap_or(defaults.listing_url),
            result_limit: parse_var("SEARCH_LIMIT", defaults.result_limit)?,
            max_concurrency: parse_var("SEARCH_CONCURRENCY", defaults.max_concurrency)?.max(1),
            min_request_interval: Duration::from_millis(parse_var(
                "REQUEST_INTERVAL_MS",
                defaults.min_request_interval.as_millis() as u64,
            )?),
            request_jitter: Duration::from_millis(parse_var(
                "REQUEST_JITTER_MS",
                defaults.request_jitter.as_millis() as u64,
            )?),
            request_timeout: Duration::from_secs(parse_var(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            connect_timeout: Duration::from_secs(parse_var(
                "CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout.as_secs(),
            )?),
            error_log_path: env::var("SCRAPE_ERROR_LOG")
                .map(PathBuf::from)
                .unwrap_or(defaults.error_log_path),
            filters,
        })
    }
}

/// Read `name` and parse it, falling back to `default` when unset
fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::config(format!("{} must be a valid number, got {:?}", name, raw))),
        Err(_) => Ok(default),
    }
}
