//! Parser module for extracting product records from listing pages
//!
//! The marketplace serves two markup generations: the legacy list layout
//! (`li.ui-search-layout__item`) and the newer grid layout (`div.poly-card`).
//! A page is served in one family at a time, so the item selectors are tried
//! in that order and never merged.

pub mod assemble;
pub mod extract;

pub use assemble::ResultAssembler;
pub use extract::{extract_record, parse_price, price_or_default, ExtractionError};

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static LEGACY_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.ui-search-layout__item").unwrap());

static GRID_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.poly-card").unwrap());

/// Containers that only appear on a search results page
static RESULTS_CONTAINER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".ui-search-results, .ui-search-layout, .ui-search-main").unwrap()
});

/// Which markup family a listing page was read with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Items matched the legacy list markup
    Legacy,
    /// Items matched the grid card markup
    Grid,
    /// No item markup and no results container: an empty search
    NoResults,
    /// A results container exists but none of the known item markups match
    Unrecognized,
}

/// A parsed listing page
pub struct ListingPage {
    document: Html,
}

/// Item nodes located on a listing page, in document order
#[derive(Debug)]
pub struct ListingItems<'a> {
    pub layout: Layout,
    pub nodes: Vec<ElementRef<'a>>,
}

impl ListingPage {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// Locate at most `limit` item nodes
    ///
    /// The legacy selector is tried first; the grid selector is only used
    /// when the legacy one matches nothing.
    pub fn items(&self, limit: usize) -> ListingItems<'_> {
        if self.document.select(&LEGACY_ITEM).next().is_some() {
            return ListingItems {
                layout: Layout::Legacy,
                nodes: self.document.select(&LEGACY_ITEM).take(limit).collect(),
            };
        }

        if self.document.select(&GRID_ITEM).next().is_some() {
            return ListingItems {
                layout: Layout::Grid,
                nodes: self.document.select(&GRID_ITEM).take(limit).collect(),
            };
        }

        let layout = if self.document.select(&RESULTS_CONTAINER).next().is_some() {
            Layout::Unrecognized
        } else {
            Layout::NoResults
        };

        ListingItems {
            layout,
            nodes: Vec::new(),
        }
    }
}
