//! Mercado Livre search scraper
//!
//! Fetches listing pages for search keywords, extracts product records from
//! either page layout and narrows them with composable filters.

pub mod config;
pub mod constants;
pub mod error;
pub mod error_log;
pub mod filter;
pub mod models;
pub mod parser;
pub mod scraper;
pub mod search;
