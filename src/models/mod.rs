//! Data models for the marketplace scraper
//!
//! This module contains the canonical product record handed to reporting
//! collaborators, and the logistics tag set it carries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Title used when no title candidate matched an item
pub const TITLE_NOT_FOUND: &str = "Título não encontrado";

/// Listing pages never expose the seller, so every record carries this value
pub const SELLER_UNAVAILABLE: &str = "N/A (Via Scraping)";

/// Condition assumed when an item carries no condition tag
pub const DEFAULT_CONDITION: &str = "Novo";

/// Represents one product scraped from a listing page
///
/// Every field is always populated. Missing markup is replaced by the
/// documented default rather than left optional, because filters and report
/// generators read these fields unconditionally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// The query that produced this record
    pub search_term: String,
    /// Trimmed title text, or [`TITLE_NOT_FOUND`]
    pub title: String,
    /// Price in reais, 0.0 when unresolved
    pub price: f64,
    /// Product URL taken verbatim from the listing
    pub link: String,
    /// Always [`SELLER_UNAVAILABLE`]
    pub seller: String,
    /// Shipping program tags
    pub logistics: Logistics,
    /// Condition label (e.g. "Novo", "Usado", "Recondicionado")
    pub condition: String,
    /// Comma-joined attribute list, empty when none
    pub attributes: String,
    /// Image URL, empty when unresolved
    pub image_url: String,
}

impl ProductRecord {
    /// Create a record for `search_term` with every field at its default
    pub fn empty(search_term: impl Into<String>) -> Self {
        Self {
            search_term: search_term.into(),
            title: TITLE_NOT_FOUND.to_string(),
            price: 0.0,
            link: String::new(),
            seller: SELLER_UNAVAILABLE.to_string(),
            logistics: Logistics::default(),
            condition: DEFAULT_CONDITION.to_string(),
            attributes: String::new(),
            image_url: String::new(),
        }
    }
}

/// Marketplace shipping programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogisticsTag {
    /// Fulfilled from the marketplace's own warehouse
    Full,
    /// Same-day / next-day delivery by the seller
    Flex,
    /// Anything else
    Normal,
}

impl LogisticsTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogisticsTag::Full => "Full",
            LogisticsTag::Flex => "Flex",
            LogisticsTag::Normal => "Normal",
        }
    }
}

impl fmt::Display for LogisticsTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogisticsTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(LogisticsTag::Full),
            "flex" => Ok(LogisticsTag::Flex),
            "normal" => Ok(LogisticsTag::Normal),
            other => Err(format!("unknown logistics tag: {}", other)),
        }
    }
}

/// Ordered, de-duplicated set of logistics tags
///
/// `Normal` is only ever present on its own: it is the fallback for items
/// with no Full or Flex signal. Renders as a `", "`-joined string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logistics(Vec<LogisticsTag>);

impl Logistics {
    /// Build a tag set from the signals that fired, in the order given
    pub fn from_tags<I>(tags: I) -> Self
    where
        I: IntoIterator<Item = LogisticsTag>,
    {
        let mut set = Vec::new();
        for tag in tags {
            if tag != LogisticsTag::Normal && !set.contains(&tag) {
                set.push(tag);
            }
        }
        if set.is_empty() {
            set.push(LogisticsTag::Normal);
        }
        Self(set)
    }

    pub fn tags(&self) -> &[LogisticsTag] {
        &self.0
    }

    pub fn contains(&self, tag: LogisticsTag) -> bool {
        self.0.contains(&tag)
    }
}

impl Default for Logistics {
    fn default() -> Self {
        Self(vec![LogisticsTag::Normal])
    }
}

impl fmt::Display for Logistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(LogisticsTag::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&joined)
    }
}

impl FromStr for Logistics {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tags = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(LogisticsTag::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_tags(tags))
    }
}

impl Serialize for Logistics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Logistics {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
