use serde::{Deserialize, Serialize};

/// One normalized marketplace listing for the tracked item.
///
/// `price` is in whole currency units (the API reports cents), `float_value`
/// is the wear reading, and the remaining fields are taken verbatim from the
/// listing with defaults filled in for anything the API omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub price: f64,
    pub float_value: f64,
    pub paint_seed: String,
    pub id: String,
    pub inspect_link: String,
    pub image: String,
}

/// Headline metrics for one fetch batch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSummary {
    pub floor_price: f64,
    pub best_float: f64,
    pub average_price: f64,
}

impl FetchSummary {
    /// Summarize a batch: lowest price, lowest float, mean price.
    /// Returns `None` for an empty batch.
    pub fn from_listings(listings: &[Listing]) -> Option<Self> {
        if listings.is_empty() {
            return None;
        }

        let floor_price = listings
            .iter()
            .map(|l| l.price)
            .fold(f64::INFINITY, f64::min);
        let best_float = listings
            .iter()
            .map(|l| l.float_value)
            .fold(f64::INFINITY, f64::min);
        let average_price =
            listings.iter().map(|l| l.price).sum::<f64>() / listings.len() as f64;

        Some(Self {
            floor_price,
            best_float,
            average_price,
        })
    }
}
