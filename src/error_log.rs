//! Append-only log of per-item extraction failures
//!
//! Each failure becomes one self-delimiting block so a run's failures can be
//! counted after the fact. Writers are serialized through a mutex and each
//! block is written with a single `write_all`, so concurrent searches never
//! interleave lines.

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use tracing::error;

/// First line of every entry
pub const ENTRY_MARKER: &str = "----- ITEM EXTRACTION FAILURE -----";

/// Last line of every entry
pub const ENTRY_END: &str = "----- END -----";

/// File-backed failure log shared by all assemblers
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    writer: Mutex<()>,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one failure entry
    ///
    /// Failing to write the log is reported through tracing and otherwise
    /// ignored; it must not take the search down with it.
    pub fn record(&self, query: &str, index: usize, err: &dyn StdError) {
        let entry = format_entry(query, index, err, &Backtrace::force_capture());

        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.append(&entry) {
            error!(path = %self.path.display(), error = %e, "Failed to write extraction error log");
        }
    }

    fn append(&self, entry: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.as_bytes())
    }

    /// Number of entries currently in the log file (0 when it does not exist)
    pub fn count_entries(&self) -> io::Result<usize> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.lines().filter(|line| *line == ENTRY_MARKER).count()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }
}

fn format_entry(query: &str, index: usize, err: &dyn StdError, backtrace: &Backtrace) -> String {
    let mut entry = String::new();
    entry.push_str(ENTRY_MARKER);
    entry.push('\n');
    entry.push_str(&format!("timestamp: {}\n", Utc::now().to_rfc3339()));
    entry.push_str(&format!("query: {}\n", query));
    entry.push_str(&format!("item: {}\n", index));
    entry.push_str(&format!("error: {}\n", err));

    let mut source = err.source();
    while let Some(cause) = source {
        entry.push_str(&format!("caused by: {}\n", cause));
        source = cause.source();
    }

    entry.push_str("backtrace:\n");
    entry.push_str(&backtrace.to_string());
    if !entry.ends_with('\n') {
        entry.push('\n');
    }
    entry.push_str(ENTRY_END);
    entry.push('\n');
    entry
}
