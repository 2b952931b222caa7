//! Constants module for the marketplace scraper
//!
//! Contains endpoint URL builders that use the base URLs from configuration,
//! plus the marker phrases used to classify shipping programs.

/// URL builder functions for all endpoints
pub mod endpoints {
    /// Home page URL, visited once per session to collect anti-bot cookies
    pub fn home(base_url: &str) -> String {
        format!("{}/", base_url.trim_end_matches('/'))
    }

    /// Listing page URL for a query
    ///
    /// Spaces become hyphens ("caixa de som" -> "caixa-de-som") and the
    /// result is percent-encoded as a single path segment.
    pub fn listing(listing_url: &str, query: &str) -> String {
        let slug = query.trim().replace(' ', "-");
        format!(
            "{}/{}",
            listing_url.trim_end_matches('/'),
            urlencoding::encode(&slug)
        )
    }
}

/// Shipping text markers, matched against lowercased text
pub mod shipping {
    /// Any of these in the shipping text marks the item as Full
    pub const FULL_MARKERS: &[&str] = &["full"];

    /// Any of these in the shipping text marks the item as Flex
    pub const FLEX_MARKERS: &[&str] = &["chegará hoje", "chegará amanhã", "flex"];
}

/// Filter defaults
pub mod filters {
    /// Accessory terms that pollute searches for the device itself
    pub const DEFAULT_NEGATIVE_KEYWORDS: &[&str] =
        &["capa", "capinha", "película", "vidro", "suporte", "cabo"];

    /// Condition kept by the default filter chain
    pub const DEFAULT_TARGET_CONDITION: &str = "Novo";
}
