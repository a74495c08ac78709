use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::config::Config;
use crate::data::types::Listing;
use crate::data::ListingSource;

// CSFloat fronts the API with browser-fingerprint checks; requests without a
// desktop browser user agent are served a challenge page instead of JSON.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";

// Longest slice of an error body kept for diagnostics.
const BODY_SNIPPET_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("listings request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("listings endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed listings payload: {0}")]
    Decode(#[from] serde_json::Error),
}

pub struct CsfloatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    market_hash_name: String,
    sort_by: String,
    listing_type: String,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct ListingsResponse {
    data: Vec<RawListing>,
}

#[derive(Debug, Deserialize)]
struct RawListing {
    #[serde(default)]
    id: Option<StringOrNumber>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    item: Option<RawItem>,
}

#[derive(Debug, Default, Deserialize)]
struct RawItem {
    #[serde(default)]
    float_value: Option<f64>,
    #[serde(default)]
    paint_seed: Option<StringOrNumber>,
    #[serde(default)]
    inspect_link: Option<String>,
    #[serde(default)]
    icon_url: Option<String>,
}

// `paint_seed` (and occasionally `id`) arrives as either a JSON number or a
// string depending on the listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Int(i64),
    Float(f64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::Text(s) => s,
            StringOrNumber::Int(i) => i.to_string(),
            StringOrNumber::Float(f) => f.to_string(),
        }
    }
}

impl RawListing {
    /// Flatten one raw entry into the normalized record, filling the
    /// documented defaults for anything the API omitted.
    fn normalize(self) -> Listing {
        let item = self.item.unwrap_or_default();

        Listing {
            price: self.price.unwrap_or(0.0) / 100.0,
            float_value: item.float_value.unwrap_or(0.0),
            paint_seed: item
                .paint_seed
                .map(StringOrNumber::into_string)
                .unwrap_or_else(|| "N/A".to_string()),
            id: self.id.map(StringOrNumber::into_string).unwrap_or_default(),
            inspect_link: item.inspect_link.unwrap_or_default(),
            image: item.icon_url.unwrap_or_default(),
        }
    }
}

/// Decode a listings payload and normalize every entry, preserving the
/// server's price-ascending order.
pub fn parse_listings(body: &str) -> Result<Vec<Listing>, FetchError> {
    let response: ListingsResponse = serde_json::from_str(body)?;

    Ok(response
        .data
        .into_iter()
        .map(RawListing::normalize)
        .collect())
}

impl CsfloatClient {
    /// Build the client from configuration threaded in by the caller.
    ///
    /// The one `reqwest::Client` is constructed here and nowhere else, so a
    /// different challenge-capable transport can be swapped in at this seam.
    pub fn new(config: &Config, api_key: Option<String>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(secs) = config.api.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api.base_url.clone(),
            api_key,
            market_hash_name: config.tracker.market_hash_name.clone(),
            sort_by: config.tracker.sort_by.clone(),
            listing_type: config.tracker.listing_type.clone(),
            limit: config.tracker.limit,
        })
    }

    /// Fetch the current lowest-priced listings for the tracked item.
    ///
    /// Fallible form: transport, HTTP-status, and decode failures stay
    /// distinguishable here. `ListingSource::fetch_listings` collapses them
    /// all into an empty batch for the caller.
    pub async fn try_fetch_listings(&self) -> Result<Vec<Listing>, FetchError> {
        let url = format!("{}/api/v1/listings", self.base_url);
        let limit = self.limit.to_string();

        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .query(&[
                ("market_hash_name", self.market_hash_name.as_str()),
                ("sort_by", self.sort_by.as_str()),
                ("limit", limit.as_str()),
                ("type", self.listing_type.as_str()),
            ]);
        // The request still goes out without a credential; the server's
        // rejection comes back as an ordinary status failure.
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, key.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status,
                body: body.chars().take(BODY_SNIPPET_LEN).collect(),
            });
        }

        let body = response.text().await?;
        parse_listings(&body)
    }
}

impl ListingSource for CsfloatClient {
    async fn fetch_listings(&self) -> Vec<Listing> {
        match self.try_fetch_listings().await {
            Ok(listings) => listings,
            Err(e) => {
                warn!("Listings fetch failed, returning empty batch: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "data": [
            {
                "id": "324744231917061302",
                "price": 1000,
                "item": {
                    "float_value": 0.061234,
                    "paint_seed": 420,
                    "inspect_link": "steam://rungame/730/765612022/+csgo_econ_action_preview%20S1A2D3",
                    "icon_url": "https://community.cloudflare.steamstatic.com/economy/image/m9-1"
                }
            },
            {
                "id": "324744231917061303",
                "price": 2500,
                "item": {
                    "float_value": 0.012501,
                    "paint_seed": "77",
                    "inspect_link": "steam://rungame/730/765612022/+csgo_econ_action_preview%20S4A5D6",
                    "icon_url": "https://community.cloudflare.steamstatic.com/economy/image/m9-2"
                }
            },
            {
                "id": "324744231917061304",
                "price": 500,
                "item": {
                    "float_value": 0.034002,
                    "paint_seed": 311,
                    "inspect_link": "steam://rungame/730/765612022/+csgo_econ_action_preview%20S7A8D9",
                    "icon_url": "https://community.cloudflare.steamstatic.com/economy/image/m9-3"
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_preserves_count_and_order() {
        let listings = parse_listings(FIXTURE).unwrap();

        assert_eq!(listings.len(), 3);
        assert_eq!(listings[0].price, 10.0);
        assert_eq!(listings[1].price, 25.0);
        assert_eq!(listings[2].price, 5.0);
        assert_eq!(listings[0].id, "324744231917061302");
    }

    #[test]
    fn test_price_minor_units_conversion() {
        let listings = parse_listings(r#"{"data": [{"price": 250}]}"#).unwrap();
        assert_eq!(listings[0].price, 2.50);
    }

    #[test]
    fn test_paint_seed_accepts_number_or_string() {
        let listings = parse_listings(FIXTURE).unwrap();
        assert_eq!(listings[0].paint_seed, "420");
        assert_eq!(listings[1].paint_seed, "77");
    }

    #[test]
    fn test_defaults_when_item_is_missing() {
        let listings =
            parse_listings(r#"{"data": [{"id": "abc", "price": 750}]}"#).unwrap();

        let listing = &listings[0];
        assert_eq!(listing.price, 7.50);
        assert_eq!(listing.id, "abc");
        assert_eq!(listing.float_value, 0.0);
        assert_eq!(listing.paint_seed, "N/A");
        assert_eq!(listing.inspect_link, "");
        assert_eq!(listing.image, "");
    }

    #[test]
    fn test_defaults_when_entry_is_empty() {
        let listings = parse_listings(r#"{"data": [{}]}"#).unwrap();

        let listing = &listings[0];
        assert_eq!(listing.price, 0.0);
        assert_eq!(listing.id, "");
        assert_eq!(listing.paint_seed, "N/A");
    }

    #[test]
    fn test_empty_data_array_is_success() {
        let listings = parse_listings(r#"{"data": []}"#).unwrap();
        assert!(listings.is_empty());
    }

    #[test]
    fn test_missing_data_key_is_an_error() {
        assert!(matches!(
            parse_listings(r#"{"code": 20001, "message": "invalid api key"}"#),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_non_json_body_is_an_error() {
        assert!(parse_listings("<html>challenge page</html>").is_err());
    }

    #[tokio::test]
    async fn test_fetch_collapses_transport_failure_to_empty() {
        let mut config = Config::default();
        // Nothing listens here, so the connection is refused immediately.
        config.api.base_url = "http://127.0.0.1:1".to_string();
        config.api.request_timeout_secs = Some(5);

        let client = CsfloatClient::new(&config, None).unwrap();
        assert!(client.fetch_listings().await.is_empty());
    }

    // Serves one canned HTTP/1.1 response on a local port and hands back the
    // raw request bytes for inspection.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            request
        });

        (format!("http://{}", addr), server)
    }

    #[tokio::test]
    async fn test_fetch_sends_expected_request_shape() {
        let (base_url, server) = serve_once("200 OK", FIXTURE).await;

        let mut config = Config::default();
        config.api.base_url = base_url;
        let client = CsfloatClient::new(&config, Some("test-key".to_string())).unwrap();

        let listings = client.try_fetch_listings().await.unwrap();
        assert_eq!(listings.len(), 3);
        assert_eq!(listings[0].price, 10.0);

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /api/v1/listings?"));
        assert!(request.contains("sort_by=lowest_price"));
        assert!(request.contains("limit=10"));
        assert!(request.contains("type=buy_now"));
        assert!(request.contains("accept: application/json"));
        assert!(request.contains("authorization: test-key"));
        assert!(request.contains("user-agent: mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let (base_url, server) = serve_once("429 Too Many Requests", "rate limited").await;

        let mut config = Config::default();
        config.api.base_url = base_url;
        let client = CsfloatClient::new(&config, None).unwrap();

        match client.try_fetch_listings().await {
            Err(FetchError::Status { status, body }) => {
                assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
                assert!(body.contains("rate limited"));
            }
            other => panic!("expected status error, got {:?}", other),
        }

        // No credential was configured, so none may be sent.
        let request = server.await.unwrap().to_lowercase();
        assert!(!request.contains("authorization:"));
    }
}
