use thiserror::Error;

/// Failures a fetch strategy can hit while pulling listing pages.
///
/// A strategy that errors before landing a single page reports the error;
/// once at least one page of listings has been collected, later failures
/// end the pagination loop but keep what was already gathered.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status code {0}")]
    Status(reqwest::StatusCode),

    #[error("page looks blocked: {0}")]
    Blocked(String),

    #[error("browser error: {0}")]
    Browser(String),
}
