//! Scraper module for fetching listing pages from the marketplace
//!
//! This module provides the browser-like request profile, the per-search
//! [`Session`] with its own cookie jar, the cookie bootstrap step and the
//! page fetcher. Every outbound request passes through a shared [`RateGate`].

pub mod gate;

pub use gate::RateGate;

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::constants::endpoints;

/// Errors that can occur while fetching a listing page
#[derive(Error, Debug)]
pub enum FetchError {
    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Network-related errors (DNS failure, refused or reset connection, etc.)
    #[error("Failed to connect to server: {0}")]
    Network(String),

    /// HTTP error status codes
    #[error("Server returned status {0}")]
    Http(u16),

    /// Error reading response body
    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Network(format!("connection failed: {}", e))
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Errors from the cookie bootstrap request; never surfaced past the bootstrapper
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Home page request failed: {0}")]
    Network(String),

    #[error("Home page returned status {0}")]
    Http(u16),
}

/// Result of a successful page fetch
#[derive(Debug)]
pub struct FetchResult {
    /// The HTML content of the page
    pub html: String,
    /// The HTTP status code
    pub status: u16,
}

/// Browser-fidelity headers sent with every request
#[derive(Debug, Clone)]
pub struct RequestProfile {
    pub user_agent: &'static str,
    pub accept: &'static str,
    pub accept_language: &'static str,
    pub referer: &'static str,
}

impl Default for RequestProfile {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            accept_language: "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7",
            referer: "https://www.mercadolivre.com.br/",
        }
    }
}

impl RequestProfile {
    /// Headers installed as client defaults for a session
    pub fn headers(&self) -> Result<HeaderMap, FetchError> {
        let pairs = [
            (reqwest::header::USER_AGENT, self.user_agent),
            (reqwest::header::ACCEPT, self.accept),
            (reqwest::header::ACCEPT_LANGUAGE, self.accept_language),
            (reqwest::header::REFERER, self.referer),
        ];

        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            let value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::Client(format!("invalid {} header: {}", name, e)))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

/// Navigation hints added to the listing request, as a browser sends them
/// when following a link from the home page
const NAVIGATION_HINTS: &[(&str, &str)] = &[
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "same-origin"),
    ("sec-fetch-user", "?1"),
];

/// Timeouts applied to every request of a session
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub request: Duration,
    pub connect: Duration,
}

impl From<&Config> for Timeouts {
    fn from(config: &Config) -> Self {
        Self {
            request: config.request_timeout,
            connect: config.connect_timeout,
        }
    }
}

/// One search call's HTTP state: a client and its private cookie jar
///
/// Sessions are created per search and dropped with it; they are never shared
/// between concurrent searches.
pub struct Session {
    client: Client,
    cookies: Arc<Jar>,
}

impl Session {
    /// Create a session with an empty cookie jar
    pub fn new(profile: &RequestProfile, timeouts: Timeouts) -> Result<Self, FetchError> {
        let cookies = Arc::new(Jar::default());
        let client = Client::builder()
            .default_headers(profile.headers()?)
            .cookie_provider(Arc::clone(&cookies))
            .timeout(timeouts.request)
            .connect_timeout(timeouts.connect)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client, cookies })
    }

    /// The `Cookie` header this session would send to `url`, if any
    pub(crate) fn cookie_header(&self, url: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        self.cookies
            .cookies(&url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }
}

/// Creates sessions and warms their cookie jars by visiting the home page
pub struct SessionBootstrapper {
    profile: RequestProfile,
    timeouts: Timeouts,
    base_url: String,
    gate: Arc<RateGate>,
}

impl SessionBootstrapper {
    pub fn new(
        profile: RequestProfile,
        timeouts: Timeouts,
        base_url: impl Into<String>,
        gate: Arc<RateGate>,
    ) -> Self {
        Self {
            profile,
            timeouts,
            base_url: base_url.into(),
            gate,
        }
    }

    /// Create a fresh session and visit the home page once to collect cookies
    ///
    /// A failed home page visit only degrades the session (it proceeds without
    /// cookies); the error returned here means the client itself could not be
    /// built.
    pub async fn bootstrap(&self) -> Result<Session, FetchError> {
        let session = Session::new(&self.profile, self.timeouts)?;

        if let Err(e) = self.warm_up(&session).await {
            warn!(error = %e, "Cookie bootstrap failed, continuing without cookies");
        }

        Ok(session)
    }

    async fn warm_up(&self, session: &Session) -> Result<(), BootstrapError> {
        let url = endpoints::home(&self.base_url);
        self.gate.wait().await;
        debug!(url = %url, "Visiting home page for cookies");

        let response = session
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BootstrapError::Network(FetchError::from(e).to_string()))?;

        let status = response.status();
        // Drain the body so the connection can be reused; its content is irrelevant.
        let _ = response.bytes().await;

        if !status.is_success() {
            return Err(BootstrapError::Http(status.as_u16()));
        }
        if session.cookie_header(&url).is_none() {
            debug!(url = %url, "Home page set no cookies");
        }
        Ok(())
    }
}

/// Issues the listing request through a bootstrapped session
pub struct PageFetcher {
    gate: Arc<RateGate>,
}

impl PageFetcher {
    pub fn new(gate: Arc<RateGate>) -> Self {
        Self { gate }
    }

    /// Fetch `url` with the session's cookies and the navigation hints
    ///
    /// Any status outside 2xx is an error; its body is never returned.
    pub async fn fetch(&self, session: &Session, url: &str) -> Result<FetchResult, FetchError> {
        self.gate.wait().await;

        let mut request = session.client.get(url);
        for &(name, value) in NAVIGATION_HINTS {
            request = request.header(HeaderName::from_static(name), HeaderValue::from_static(value));
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let html = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Body(e.to_string())
            }
        })?;

        Ok(FetchResult {
            html,
            status: status.as_u16(),
        })
    }
}
