mod config;
mod data;
mod history;

use anyhow::Result;
use chrono::Local;
use config::{Config, EnvConfig};
use data::csfloat::CsfloatClient;
use data::types::FetchSummary;
use data::ListingSource;
use history::recorder::HistoryLog;
use history::trend;

const TREND_TAIL: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    tracing::info!("🎯 CSFloat floor tracker starting...");

    // Load configuration
    let config = Config::load_or_default("config.toml")?;
    let env_config = EnvConfig::load();
    if env_config.csfloat_api_key.is_none() {
        tracing::warn!("CSFLOAT_API_KEY is not set; the listings request will be rejected");
    }

    tracing::info!("Tracking item: {}", config.tracker.market_hash_name);
    tracing::info!("History file: {}", config.history.path.display());

    let client = CsfloatClient::new(&config, env_config.csfloat_api_key)?;
    let listings = client.fetch_listings().await;
    tracing::info!("Found {} listings", listings.len());

    // One timestamp per fetch cycle; every row in this batch shares it.
    let fetched_at = Local::now().naive_local();
    let log = HistoryLog::new(&config.history.path);
    log.append_batch(&listings, fetched_at)?;

    match FetchSummary::from_listings(&listings) {
        Some(summary) => {
            tracing::info!("✅ Saved fetch to {}", config.history.path.display());
            println!(
                "Floor ${:.2} | Best float {:.6} | Avg ${:.2}",
                summary.floor_price, summary.best_float, summary.average_price
            );
            println!("{}", "-".repeat(50));
            println!("{:<10} | {:<10} | {}", "PRICE", "FLOAT", "ID");
            for listing in &listings {
                println!(
                    "${:<9.2} | {:<10.6} | {}",
                    listing.price, listing.float_value, listing.id
                );
            }
        }
        None => {
            println!("No listings found (empty result or fetch failure).");
        }
    }

    // Show how the floor has moved across everything recorded so far. A
    // broken history file should not fail the run that just appended to it.
    if log.path().exists() {
        match trend::read_history(log.path()) {
            Ok(entries) => print_floor_trend(&trend::floor_series(&entries)),
            Err(e) => tracing::error!("Could not read history file: {:#}", e),
        }
    }

    Ok(())
}

fn print_floor_trend(series: &[trend::FloorPoint]) {
    if series.is_empty() {
        return;
    }

    println!();
    println!("Floor price trend (last {} fetches):", TREND_TAIL.min(series.len()));
    let tail_start = series.len().saturating_sub(TREND_TAIL);
    for point in &series[tail_start..] {
        println!(
            "  {}  ${:.2}",
            point.timestamp.format("%Y-%m-%d %H:%M:%S"),
            point.price
        );
    }
}
