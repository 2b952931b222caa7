//! Search orchestration
//!
//! [`SearchOrchestrator::search`] drives one keyword through bootstrap,
//! fetch, parse and assembly, and never fails: any fetch problem is logged
//! and becomes an empty result. [`SearchOrchestrator::search_many`] runs
//! several keywords on a bounded worker pool that shares one request gate.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::constants::endpoints;
use crate::error_log::ErrorLog;
use crate::filter::DataProcessor;
use crate::models::ProductRecord;
use crate::parser::{Layout, ListingPage, ResultAssembler};
use crate::scraper::{FetchError, FetchResult, PageFetcher, RateGate, RequestProfile, SessionBootstrapper, Timeouts};

/// Records produced for one keyword
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordResults {
    pub keyword: String,
    pub records: Vec<ProductRecord>,
}

/// Outcome of a multi-keyword search
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Completed keywords, in input order
    pub results: Vec<KeywordResults>,
    /// Keywords aborted by cancellation before they completed, in input order
    pub cancelled: Vec<String>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.cancelled.is_empty()
    }

    /// Union of every keyword's records, unfiltered
    pub fn into_records(self) -> Vec<ProductRecord> {
        self.results.into_iter().flat_map(|r| r.records).collect()
    }

    /// Filter each keyword's records, then union them in keyword order
    pub fn into_filtered(self, processor: &DataProcessor) -> Vec<ProductRecord> {
        let mut all = Vec::new();
        for KeywordResults { keyword, records } in self.results {
            let found = records.len();
            let kept = processor.process(records);
            info!(keyword = %keyword, found, kept = kept.len(), "Filtered keyword results");
            all.extend(kept);
        }
        all
    }
}

/// Entry point of the search pipeline
pub struct SearchOrchestrator {
    bootstrapper: SessionBootstrapper,
    fetcher: PageFetcher,
    assembler: ResultAssembler,
    listing_url: String,
    max_concurrency: usize,
}

impl SearchOrchestrator {
    /// Build an orchestrator with its own request gate and error log
    pub fn new(config: &Config) -> Self {
        let gate = Arc::new(RateGate::with_jitter(
            config.min_request_interval,
            config.request_jitter,
        ));
        let error_log = Arc::new(ErrorLog::new(config.error_log_path.clone()));
        Self::with_parts(config, RequestProfile::default(), gate, error_log)
    }

    /// Build an orchestrator from explicit parts, e.g. to share a gate
    pub fn with_parts(
        config: &Config,
        profile: RequestProfile,
        gate: Arc<RateGate>,
        error_log: Arc<ErrorLog>,
    ) -> Self {
        Self {
            bootstrapper: SessionBootstrapper::new(
                profile,
                Timeouts::from(config),
                config.base_url.clone(),
                Arc::clone(&gate),
            ),
            fetcher: PageFetcher::new(gate),
            assembler: ResultAssembler::new(error_log),
            listing_url: config.listing_url.clone(),
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    /// Search one keyword, returning at most `limit` records
    ///
    /// A failed search and a search without results both return an empty
    /// list; failures are only visible in the logs.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<ProductRecord> {
        let page = match self.fetch_listing(query).await {
            Ok(page) => page,
            Err(e) => {
                warn!(query, error = %e, "Search failed, returning no results");
                return Vec::new();
            }
        };

        // Parsing is CPU-bound and failures are appended to the error log
        // with blocking writes, so both stay off the runtime's workers.
        let assembler = self.assembler.clone();
        let owned_query = query.to_string();
        let extracted =
            task::spawn_blocking(move || extract(&assembler, &page.html, &owned_query, limit)).await;

        let listing = match extracted {
            Ok(listing) => listing,
            Err(e) => {
                error!(query, error = %e, "Listing extraction task failed");
                return Vec::new();
            }
        };

        match listing.layout {
            Layout::Unrecognized => {
                warn!(query, "Results container found but no known item markup matched")
            }
            Layout::NoResults => info!(query, "Listing page has no results"),
            Layout::Legacy | Layout::Grid => {}
        }
        info!(
            query,
            layout = ?listing.layout,
            items = listing.items,
            records = listing.records.len(),
            "Assembled listing"
        );
        listing.records
    }

    async fn fetch_listing(&self, query: &str) -> Result<FetchResult, FetchError> {
        let session = self.bootstrapper.bootstrap().await?;

        let url = endpoints::listing(&self.listing_url, query);
        info!(query, url = %url, "Fetching listing page");
        let page = self.fetcher.fetch(&session, &url).await?;
        debug!(query, bytes = page.html.len(), status = page.status, "Fetched listing page");

        Ok(page)
    }

    /// Search several keywords concurrently
    ///
    /// At most `max_concurrency` searches run at once. Cancelling `cancel`
    /// aborts queued and in-flight searches; keywords that already completed
    /// keep their records.
    pub async fn search_many(
        self: &Arc<Self>,
        keywords: &[String],
        limit: usize,
        cancel: &CancellationToken,
    ) -> BatchOutcome {
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, keyword) in keywords.iter().cloned().enumerate() {
            let orchestrator = Arc::clone(self);
            let permits = Arc::clone(&permits);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let records = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    records = async {
                        let _permit = permits.acquire_owned().await.ok()?;
                        Some(orchestrator.search(&keyword, limit).await)
                    } => records,
                };
                (index, keyword, records)
            });
        }

        let mut completed: Vec<Option<KeywordResults>> = vec![None; keywords.len()];
        let mut cancelled = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, keyword, Some(records))) => {
                    completed[index] = Some(KeywordResults { keyword, records });
                }
                Ok((index, keyword, None)) => {
                    debug!(keyword = %keyword, "Keyword search cancelled");
                    cancelled.push((index, keyword));
                }
                Err(e) => error!(error = %e, "Keyword search task failed"),
            }
        }

        cancelled.sort_by_key(|(index, _)| *index);
        if !cancelled.is_empty() {
            warn!(cancelled = cancelled.len(), "Batch search was cancelled");
        }

        BatchOutcome {
            results: completed.into_iter().flatten().collect(),
            cancelled: cancelled.into_iter().map(|(_, keyword)| keyword).collect(),
        }
    }
}

/// What one listing page yielded
struct ExtractedListing {
    layout: Layout,
    items: usize,
    records: Vec<ProductRecord>,
}

/// Parse and assemble a fetched page
fn extract(assembler: &ResultAssembler, html: &str, query: &str, limit: usize) -> ExtractedListing {
    let page = ListingPage::parse(html);
    let items = page.items(limit);
    let records = assembler.assemble(&items.nodes, query);

    ExtractedListing {
        layout: items.layout,
        items: items.nodes.len(),
        records,
    }
}
