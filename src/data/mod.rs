pub mod csfloat;
pub mod types;

use self::types::Listing;

/// A feed able to produce the current listings for the tracked item.
///
/// The contract is total: implementations log failures and surface them as an
/// empty batch, so callers treat emptiness as the only failure signal.
pub trait ListingSource {
    fn fetch_listings(&self) -> impl std::future::Future<Output = Vec<Listing>> + Send;
}
