use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::ScoutConfig;
use crate::error::ScrapeError;
use crate::models::Listing;
use crate::scrapers::traits::FetchStrategy;

/// Terminal strategy that synthesizes placeholder listings, so a run still
/// produces inspectable output when every real strategy came up empty
pub struct SampleStrategy {
    config: Arc<ScoutConfig>,
}

impl SampleStrategy {
    pub fn new(config: Arc<ScoutConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl FetchStrategy for SampleStrategy {
    async fn fetch(&self, query: &str, _max_pages: u32) -> Result<Vec<Listing>, ScrapeError> {
        info!("Creating sample data for '{}'", query);
        let base = &self.config.site.base_url;

        Ok((1..=5)
            .map(|i| Listing {
                title: format!("Sample {query} {i}"),
                price: format!("₹{}", i * 500),
                location: "Sample Location".to_string(),
                date: "Today".to_string(),
                seller: "Sample Seller".to_string(),
                url: format!("{base}/sample-{i}"),
                image: "https://via.placeholder.com/150".to_string(),
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "sample-data"
    }
}
