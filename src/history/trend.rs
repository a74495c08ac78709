use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::csv::{split_line, HISTORY_HEADER, TIMESTAMP_FORMAT};
use crate::data::types::Listing;

/// One row of the history file: the listing plus the batch stamp it was
/// recorded under.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub listing: Listing,
    pub timestamp: NaiveDateTime,
}

/// Lowest recorded price for one fetch batch.
#[derive(Debug, Clone, PartialEq)]
pub struct FloorPoint {
    pub timestamp: NaiveDateTime,
    pub price: f64,
}

/// Load and parse the whole history file.
pub fn read_history(path: &Path) -> Result<Vec<HistoryEntry>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {}", path.display()))?;
    parse_history(&contents)
}

fn parse_history(contents: &str) -> Result<Vec<HistoryEntry>> {
    let mut lines = contents.lines();
    let header = match lines.next() {
        Some(line) => line,
        None => anyhow::bail!("History file is empty"),
    };
    if header != HISTORY_HEADER {
        anyhow::bail!("Unexpected history header: {}", header);
    }

    let mut entries = Vec::new();
    for (idx, line) in lines.enumerate() {
        // Header was line 1.
        let line_no = idx + 2;
        if line.is_empty() {
            continue;
        }

        let fields = split_line(line);
        if fields.len() != 7 {
            anyhow::bail!(
                "History line {} has {} fields, expected 7",
                line_no,
                fields.len()
            );
        }

        let price: f64 = fields[0]
            .parse()
            .with_context(|| format!("Bad price on history line {}", line_no))?;
        let float_value: f64 = fields[1]
            .parse()
            .with_context(|| format!("Bad float value on history line {}", line_no))?;
        let timestamp = NaiveDateTime::parse_from_str(&fields[6], TIMESTAMP_FORMAT)
            .with_context(|| format!("Bad timestamp on history line {}", line_no))?;

        entries.push(HistoryEntry {
            listing: Listing {
                price,
                float_value,
                paint_seed: fields[2].clone(),
                id: fields[3].clone(),
                inspect_link: fields[4].clone(),
                image: fields[5].clone(),
            },
            timestamp,
        });
    }

    Ok(entries)
}

/// Collapse history rows into one floor price per batch stamp, oldest first.
pub fn floor_series(entries: &[HistoryEntry]) -> Vec<FloorPoint> {
    let mut floors: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
    for entry in entries {
        floors
            .entry(entry.timestamp)
            .and_modify(|price| *price = price.min(entry.listing.price))
            .or_insert(entry.listing.price);
    }

    floors
        .into_iter()
        .map(|(timestamp, price)| FloorPoint { timestamp, price })
        .collect()
}
