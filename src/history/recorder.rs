use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::csv::{escape_field, HISTORY_HEADER, TIMESTAMP_FORMAT};
use crate::data::types::Listing;

/// Append-only CSV history of fetched listings.
///
/// The file is created with its header on the first non-empty append; after
/// that every call only appends. Existing rows are never rewritten here.
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    /// Point at the log location. No I/O happens until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one fetch batch, every row stamped with `fetched_at` at second
    /// precision. An empty batch is a no-op: no file or directory is created
    /// or touched.
    ///
    /// Filesystem errors propagate to the caller; unlike the fetcher, this
    /// side swallows nothing.
    pub fn append_batch(&self, rows: &[Listing], fetched_at: NaiveDateTime) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create history directory {}", parent.display())
                })?;
            }
        }

        // Checked before the open below, since create(true) would hide
        // whether the file pre-existed.
        let needs_header = !self.path.exists();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open history file {}", self.path.display()))?;

        if needs_header {
            writeln!(file, "{}", HISTORY_HEADER)?;
        }

        // One shared stamp for the whole batch; formatting at second
        // precision performs the truncation.
        let stamp = fetched_at.format(TIMESTAMP_FORMAT).to_string();
        for row in rows {
            writeln!(
                file,
                "{:.2},{},{},{},{},{},{}",
                row.price,
                row.float_value,
                escape_field(&row.paint_seed),
                escape_field(&row.id),
                escape_field(&row.inspect_link),
                escape_field(&row.image),
                stamp
            )?;
        }

        Ok(())
    }
}
