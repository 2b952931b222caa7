//! Field extraction for a single listing item
//!
//! Each field has an ordered slice of strategies. A strategy is a pure
//! function from the item node to an optional value; the resolver returns the
//! first value found, or the field's default when every strategy misses.

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use thiserror::Error;

use crate::constants::shipping::{FLEX_MARKERS, FULL_MARKERS};
use crate::models::{
    Logistics, LogisticsTag, ProductRecord, DEFAULT_CONDITION, SELLER_UNAVAILABLE, TITLE_NOT_FOUND,
};

/// Errors that make a single item unusable
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A title was found but no link could be resolved for it
    #[error("item {title:?} has a title but no link")]
    MissingLink { title: String },

    /// An extractor panicked while reading the item
    #[error("extraction panicked: {message}")]
    Panicked { message: String },
}

/// One extraction strategy for a field
pub type Strategy<T> = fn(&ElementRef<'_>) -> Option<T>;

/// Apply strategies in order, returning the first hit
pub fn first_match<T>(item: &ElementRef<'_>, strategies: &[Strategy<T>]) -> Option<T> {
    strategies.iter().find_map(|strategy| strategy(item))
}

macro_rules! selector {
    ($name:ident, $css:expr) => {
        static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

selector!(GRID_TITLE, "a.poly-component__title");
selector!(LEGACY_TITLE, "h2.ui-search-item__title");
selector!(LEGACY_TITLE_CARD, "a.ui-search-item__group__element.ui-search-link__title-card");
selector!(LEGACY_LINK, "a.ui-search-link");

selector!(LEGACY_PRICE, "div.ui-search-price__second-line");
selector!(GRID_PRICE, "div.poly-price__current");
selector!(PRICE_FRACTION, "span.andes-money-amount__fraction");
selector!(PRICE_CENTS, "span.andes-money-amount__cents");

selector!(FULFILLMENT_LABEL, "span.ui-search-item__fulfillment-label");
selector!(SHIPPING_SPAN, "span.poly-component__shipping");
selector!(SHIPPING_DIV, "div.poly-component__shipping");

selector!(CONDITION, "span.poly-component__item-condition");

selector!(LEGACY_ATTRIBUTES, "ul.ui-search-card-attributes");
selector!(GRID_ATTRIBUTES, "ul.poly-component__attributes-list");
selector!(LIST_ITEM, "li");

selector!(LEGACY_IMAGE, "img.ui-search-result-image__element");
selector!(GRID_IMAGE, "img.poly-component__picture");

/// Trimmed text content of an element
fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Attribute value, treating blank values as absent
fn non_empty_attr(el: &ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}

/// Text of the first element matching `selector`, if non-empty
fn first_text(item: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    item.select(selector)
        .next()
        .map(|el| element_text(&el))
        .filter(|text| !text.is_empty())
}

// ---------------------------------------------------------------------------
// Title and link
// ---------------------------------------------------------------------------

/// A resolved title with whatever link was found alongside it
#[derive(Debug, Clone, PartialEq)]
pub struct TitleMatch {
    pub title: String,
    pub link: Option<String>,
}

const TITLE_STRATEGIES: &[Strategy<TitleMatch>] =
    &[grid_title, legacy_heading_title, legacy_title_card];

fn anchor_title(item: &ElementRef<'_>, selector: &Selector) -> Option<TitleMatch> {
    let anchor = item.select(selector).next()?;
    let title = element_text(&anchor);
    if title.is_empty() {
        return None;
    }
    Some(TitleMatch {
        title,
        link: non_empty_attr(&anchor, "href"),
    })
}

fn grid_title(item: &ElementRef<'_>) -> Option<TitleMatch> {
    anchor_title(item, &GRID_TITLE)
}

fn legacy_title_card(item: &ElementRef<'_>) -> Option<TitleMatch> {
    anchor_title(item, &LEGACY_TITLE_CARD)
}

/// Legacy headings carry no href; the link lives on an enclosing anchor
fn legacy_heading_title(item: &ElementRef<'_>) -> Option<TitleMatch> {
    let heading = item.select(&LEGACY_TITLE).next()?;
    let title = element_text(&heading);
    if title.is_empty() {
        return None;
    }

    let link = non_empty_attr(&heading, "href")
        .or_else(|| enclosing_anchor_href(item, &heading))
        .or_else(|| {
            item.select(&LEGACY_LINK)
                .find_map(|anchor| non_empty_attr(&anchor, "href"))
        });

    Some(TitleMatch { title, link })
}

/// href of the nearest `<a>` between `el` and the item root
fn enclosing_anchor_href(item: &ElementRef<'_>, el: &ElementRef<'_>) -> Option<String> {
    el.ancestors()
        .take_while(|node| node.id() != item.id())
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "a")
        .and_then(|anchor| non_empty_attr(&anchor, "href"))
}

/// Resolve the title and link of an item
///
/// Falls back to [`TITLE_NOT_FOUND`] and an empty link when no title
/// candidate matches. A title without any link is an error.
pub fn resolve_title_link(item: &ElementRef<'_>) -> Result<(String, String), ExtractionError> {
    match first_match(item, TITLE_STRATEGIES) {
        Some(TitleMatch {
            title,
            link: Some(link),
        }) => Ok((title, link)),
        Some(TitleMatch { title, link: None }) => Err(ExtractionError::MissingLink { title }),
        None => Ok((TITLE_NOT_FOUND.to_string(), String::new())),
    }
}

// ---------------------------------------------------------------------------
// Price
// ---------------------------------------------------------------------------

const PRICE_STRATEGIES: &[Strategy<String>] = &[legacy_price_text, grid_price_text];

fn legacy_price_text(item: &ElementRef<'_>) -> Option<String> {
    price_text_in(item, &LEGACY_PRICE)
}

fn grid_price_text(item: &ElementRef<'_>) -> Option<String> {
    price_text_in(item, &GRID_PRICE)
}

/// Integer part of the price inside `container`, with cents appended when
/// they are rendered separately
fn price_text_in(item: &ElementRef<'_>, container: &Selector) -> Option<String> {
    let container = item.select(container).next()?;
    let fraction = first_text(&container, &PRICE_FRACTION)?;

    if fraction.contains(',') {
        return Some(fraction);
    }
    match first_text(&container, &PRICE_CENTS) {
        Some(cents) => Some(format!("{},{}", fraction, cents)),
        None => Some(fraction),
    }
}

/// Parse a Brazilian-formatted price ("1.234,56")
///
/// `.` is a thousands separator and `,` the decimal separator. Returns `None`
/// for anything that does not parse to a finite number.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned = text.trim().replace('.', "").replace(',', ".");
    cleaned.parse::<f64>().ok().filter(|price| price.is_finite())
}

/// Parse a price, substituting 0.0 when it cannot be parsed
pub fn price_or_default(text: &str) -> f64 {
    parse_price(text).unwrap_or(0.0)
}

pub fn resolve_price(item: &ElementRef<'_>) -> f64 {
    first_match(item, PRICE_STRATEGIES)
        .map(|text| price_or_default(&text))
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Logistics
// ---------------------------------------------------------------------------

const SHIPPING_STRATEGIES: &[Strategy<String>] = &[shipping_span_text, shipping_div_text];

fn shipping_span_text(item: &ElementRef<'_>) -> Option<String> {
    first_text(item, &SHIPPING_SPAN)
}

fn shipping_div_text(item: &ElementRef<'_>) -> Option<String> {
    first_text(item, &SHIPPING_DIV)
}

/// Classify shipping programs from the fulfillment label and shipping text
pub fn classify_logistics(has_full_label: bool, shipping_text: &str) -> Logistics {
    let text = shipping_text.to_lowercase();
    let mut tags = Vec::new();

    if has_full_label || FULL_MARKERS.iter().any(|marker| text.contains(marker)) {
        tags.push(LogisticsTag::Full);
    }
    if FLEX_MARKERS.iter().any(|marker| text.contains(marker)) {
        tags.push(LogisticsTag::Flex);
    }

    Logistics::from_tags(tags)
}

pub fn resolve_logistics(item: &ElementRef<'_>) -> Logistics {
    let has_full_label = item.select(&FULFILLMENT_LABEL).next().is_some();
    let shipping_text = first_match(item, SHIPPING_STRATEGIES).unwrap_or_default();
    classify_logistics(has_full_label, &shipping_text)
}

// ---------------------------------------------------------------------------
// Condition, attributes, image
// ---------------------------------------------------------------------------

/// Absence of a condition tag means the item is new
pub fn resolve_condition(item: &ElementRef<'_>) -> String {
    first_text(item, &CONDITION).unwrap_or_else(|| DEFAULT_CONDITION.to_string())
}

const ATTRIBUTE_STRATEGIES: &[Strategy<String>] = &[legacy_attributes, grid_attributes];

fn legacy_attributes(item: &ElementRef<'_>) -> Option<String> {
    attribute_list(item, &LEGACY_ATTRIBUTES)
}

fn grid_attributes(item: &ElementRef<'_>) -> Option<String> {
    attribute_list(item, &GRID_ATTRIBUTES)
}

fn attribute_list(item: &ElementRef<'_>, container: &Selector) -> Option<String> {
    let list = item.select(container).next()?;
    let attributes: Vec<String> = list
        .select(&LIST_ITEM)
        .map(|li| element_text(&li))
        .filter(|text| !text.is_empty())
        .collect();

    if attributes.is_empty() {
        None
    } else {
        Some(attributes.join(", "))
    }
}

pub fn resolve_attributes(item: &ElementRef<'_>) -> String {
    first_match(item, ATTRIBUTE_STRATEGIES).unwrap_or_default()
}

const IMAGE_STRATEGIES: &[Strategy<String>] = &[legacy_image, grid_image];

fn legacy_image(item: &ElementRef<'_>) -> Option<String> {
    image_source(item, &LEGACY_IMAGE)
}

fn grid_image(item: &ElementRef<'_>) -> Option<String> {
    image_source(item, &GRID_IMAGE)
}

/// Lazy-loaded `data-src` wins over `src`, which often holds a placeholder
fn image_source(item: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    let img = item.select(selector).next()?;
    non_empty_attr(&img, "data-src").or_else(|| non_empty_attr(&img, "src"))
}

pub fn resolve_image(item: &ElementRef<'_>) -> String {
    first_match(item, IMAGE_STRATEGIES).unwrap_or_default()
}

/// Build the canonical record for one item node
pub fn extract_record(item: &ElementRef<'_>, query: &str) -> Result<ProductRecord, ExtractionError> {
    let (title, link) = resolve_title_link(item)?;

    Ok(ProductRecord {
        search_term: query.to_string(),
        title,
        price: resolve_price(item),
        link,
        seller: SELLER_UNAVAILABLE.to_string(),
        logistics: resolve_logistics(item),
        condition: resolve_condition(item),
        attributes: resolve_attributes(item),
        image_url: resolve_image(item),
    })
}
