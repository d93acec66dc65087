use async_trait::async_trait;

use crate::error::ScrapeError;
use crate::models::Listing;

/// Common trait for all listing fetch strategies
/// This allows the orchestrator to walk them in order until one yields results
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Fetch listings for a query, walking up to `max_pages` result pages.
    ///
    /// `Ok` with an empty vec means the strategy ran cleanly but found
    /// nothing; `Err` means it could not get a usable page at all.
    async fn fetch(&self, query: &str, max_pages: u32) -> Result<Vec<Listing>, ScrapeError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}
