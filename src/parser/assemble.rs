//! Turns located item nodes into product records
//!
//! One malformed item never costs the rest of the batch: its failure is
//! written to the [`ErrorLog`] and the item is skipped. This holds for
//! extractor panics as well as extraction errors.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use scraper::ElementRef;
use tracing::warn;

use crate::error_log::ErrorLog;
use crate::models::ProductRecord;
use crate::parser::extract::{extract_record, ExtractionError};

#[derive(Clone)]
pub struct ResultAssembler {
    error_log: Arc<ErrorLog>,
}

impl ResultAssembler {
    pub fn new(error_log: Arc<ErrorLog>) -> Self {
        Self { error_log }
    }

    #[cfg(test)]
    pub(crate) fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// Build one record per item node, preserving node order
    ///
    /// Nodes that fail extraction are logged and dropped, so N nodes with K
    /// failures yield N - K records.
    pub fn assemble(&self, items: &[ElementRef<'_>], query: &str) -> Vec<ProductRecord> {
        self.assemble_with(items, query, extract_record)
    }

    fn assemble_with<F>(&self, items: &[ElementRef<'_>], query: &str, extract: F) -> Vec<ProductRecord>
    where
        F: Fn(&ElementRef<'_>, &str) -> Result<ProductRecord, ExtractionError>,
    {
        let mut records = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| extract(item, query)))
                .unwrap_or_else(|payload| {
                    Err(ExtractionError::Panicked {
                        message: panic_message(payload.as_ref()),
                    })
                });

            match outcome {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(query, index, error = %e, "Skipping item that failed extraction");
                    self.error_log.record(query, index, &e);
                }
            }
        }

        records
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
