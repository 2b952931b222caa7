//! Filter chain applied to assembled product records
//!
//! Filters are plain data: a closed set of variants, each carrying only its
//! construction parameters. They only ever remove records and keep the order
//! of the survivors.

use serde::{Deserialize, Serialize};

use crate::constants::filters::{DEFAULT_NEGATIVE_KEYWORDS, DEFAULT_TARGET_CONDITION};
use crate::models::ProductRecord;

/// A predicate over product records
///
/// Deserializes from the caller's configuration form, e.g.
/// `{"kind": "NegativeKeyword", "params": ["capa", "película"]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params")]
pub enum FilterStrategy {
    /// Keep records whose condition contains the target (case-insensitive)
    Condition(String),
    /// Drop records whose title contains any banned term (case-insensitive)
    NegativeKeyword(Vec<String>),
    /// Keep records whose logistics equals one of the allowed values
    /// (case-insensitive); an empty list keeps everything
    Logistics(Vec<String>),
}

impl FilterStrategy {
    pub fn condition(target: impl Into<String>) -> Self {
        FilterStrategy::Condition(target.into())
    }

    pub fn negative_keywords<I, S>(banned: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterStrategy::NegativeKeyword(banned.into_iter().map(Into::into).collect())
    }

    pub fn logistics<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterStrategy::Logistics(allowed.into_iter().map(Into::into).collect())
    }

    /// Apply the filter, keeping survivors in their original order
    pub fn apply(&self, mut records: Vec<ProductRecord>) -> Vec<ProductRecord> {
        match self {
            FilterStrategy::Condition(target) => {
                let target = target.to_lowercase();
                records.retain(|record| record.condition.to_lowercase().contains(&target));
            }
            FilterStrategy::NegativeKeyword(banned) => {
                let banned = normalized_terms(banned);
                if !banned.is_empty() {
                    records.retain(|record| {
                        let title = record.title.to_lowercase();
                        !banned.iter().any(|term| title.contains(term.as_str()))
                    });
                }
            }
            FilterStrategy::Logistics(allowed) => {
                let allowed = normalized_terms(allowed);
                if !allowed.is_empty() {
                    records.retain(|record| {
                        let logistics = record.logistics.to_string().to_lowercase();
                        allowed.contains(&logistics)
                    });
                }
            }
        }
        records
    }
}

/// Lowercased, trimmed terms with blanks removed
fn normalized_terms(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

/// Ordered filter chain
#[derive(Debug, Clone, Default)]
pub struct DataProcessor {
    filters: Vec<FilterStrategy>,
}

impl DataProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filters(filters: Vec<FilterStrategy>) -> Self {
        Self { filters }
    }

    /// New items only, without common accessories
    pub fn with_default_filters() -> Self {
        Self::with_filters(vec![
            FilterStrategy::condition(DEFAULT_TARGET_CONDITION),
            FilterStrategy::negative_keywords(DEFAULT_NEGATIVE_KEYWORDS.iter().copied()),
        ])
    }

    pub fn add_filter(&mut self, filter: FilterStrategy) -> &mut Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(&self) -> &[FilterStrategy] {
        &self.filters
    }

    /// Run every filter in registration order
    pub fn process(&self, records: Vec<ProductRecord>) -> Vec<ProductRecord> {
        if records.is_empty() {
            return Vec::new();
        }

        self.filters
            .iter()
            .fold(records, |remaining, filter| filter.apply(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Logistics, LogisticsTag};

    fn record(title: &str, condition: &str) -> ProductRecord {
        let mut record = ProductRecord::empty("iphone 15");
        record.title = title.to_string();
        record.condition = condition.to_string();
        record
    }

    fn with_logistics(title: &str, tags: &[LogisticsTag]) -> ProductRecord {
        let mut record = record(title, "Novo");
        record.logistics = Logistics::from_tags(tags.iter().copied());
        record
    }

    fn titles(records: &[ProductRecord]) -> Vec<&str> {
        records.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let records = vec![
            record("iPhone 15 Novo", "Novo"),
            record("iPhone 15 Usado", "Usado"),
            record("Capa para iPhone 15", "Novo"),
        ];

        let mut processor = DataProcessor::new();
        processor
            .add_filter(FilterStrategy::condition("Novo"))
            .add_filter(FilterStrategy::negative_keywords(["capa"]));

        let result = processor.process(records);
        assert_eq!(titles(&result), vec!["iPhone 15 Novo"]);
    }

    #[test]
    fn test_condition_is_case_insensitive_substring() {
        let records = vec![
            record("A", "NOVO"),
            record("B", "Recondicionado"),
            record("C", "novo - lacrado"),
        ];
        let result = FilterStrategy::condition("novo").apply(records);
        assert_eq!(titles(&result), vec!["A", "C"]);
    }

    #[test]
    fn test_negative_keyword_is_case_insensitive() {
        let records = vec![
            record("Película de Vidro iPhone", "Novo"),
            record("iPhone 15", "Novo"),
            record("SUPORTE veicular", "Novo"),
        ];
        let result = FilterStrategy::negative_keywords(["película", "Suporte"]).apply(records);
        assert_eq!(titles(&result), vec!["iPhone 15"]);
    }

    #[test]
    fn test_negative_keyword_empty_is_identity() {
        let records = vec![record("A", "Novo"), record("B", "Usado")];
        let result = FilterStrategy::negative_keywords(Vec::<String>::new()).apply(records.clone());
        assert_eq!(result, records);

        let result = FilterStrategy::negative_keywords(["  "]).apply(records.clone());
        assert_eq!(result, records);
    }

    #[test]
    fn test_logistics_exact_match() {
        let records = vec![
            with_logistics("full", &[LogisticsTag::Full]),
            with_logistics("flex", &[LogisticsTag::Flex]),
            with_logistics("both", &[LogisticsTag::Full, LogisticsTag::Flex]),
            with_logistics("normal", &[]),
        ];

        let result = FilterStrategy::logistics(["FULL"]).apply(records.clone());
        assert_eq!(titles(&result), vec!["full"]);

        let result = FilterStrategy::logistics(["full, flex", "normal"]).apply(records);
        assert_eq!(titles(&result), vec!["both", "normal"]);
    }

    #[test]
    fn test_logistics_empty_is_pass_through() {
        let records = vec![
            with_logistics("full", &[LogisticsTag::Full]),
            with_logistics("normal", &[]),
        ];
        let result = FilterStrategy::logistics(Vec::<String>::new()).apply(records.clone());
        assert_eq!(result, records);
    }

    #[test]
    fn test_empty_input_short_circuits() {
        let processor = DataProcessor::with_default_filters();
        assert!(processor.process(Vec::new()).is_empty());
        assert!(DataProcessor::new().process(Vec::new()).is_empty());
    }

    #[test]
    fn test_no_filters_is_identity() {
        let records = vec![record("A", "Usado")];
        assert_eq!(DataProcessor::new().process(records.clone()), records);
    }

    #[test]
    fn test_default_filters() {
        let processor = DataProcessor::with_default_filters();
        assert_eq!(processor.filters().len(), 2);

        let records = vec![
            record("Cabo USB-C", "Novo"),
            record("Carregador 20W", "Novo"),
            record("Carregador 20W", "Usado"),
            record("Capinha silicone", "Novo"),
        ];
        let result = processor.process(records);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].condition, "Novo");
        assert_eq!(result[0].title, "Carregador 20W");
    }

    #[test]
    fn test_filter_config_deserialization() {
        let json = r#"[
            {"kind": "Condition", "params": "Novo"},
            {"kind": "NegativeKeyword", "params": ["capa", "vidro"]},
            {"kind": "Logistics", "params": ["Full"]}
        ]"#;
        let filters: Vec<FilterStrategy> = serde_json::from_str(json).unwrap();
        assert_eq!(
            filters,
            vec![
                FilterStrategy::condition("Novo"),
                FilterStrategy::negative_keywords(["capa", "vidro"]),
                FilterStrategy::logistics(["Full"]),
            ]
        );
    }

    #[test]
    fn test_filter_config_rejects_unknown_kind() {
        let json = r#"[{"kind": "Price", "params": 100}]"#;
        assert!(serde_json::from_str::<Vec<FilterStrategy>>(json).is_err());
    }
}
