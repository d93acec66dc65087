//! Web API for driving scrapes and downloading the resulting artifacts.
//!
//! Three endpoints mirror the scrape lifecycle:
//! - `POST /` runs a scrape and returns the listings inline
//! - `POST /scrape` runs a scrape and reports the written artifacts
//! - `GET /download/:filename` hands an artifact back as an attachment

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::scout::MarketScout;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub scout: Arc<MarketScout>,
    pub downloads_dir: PathBuf,
}

impl AppState {
    pub fn new(scout: Arc<MarketScout>) -> Self {
        let downloads_dir = PathBuf::from(&scout.config().downloads_dir);
        Self {
            scout,
            downloads_dir,
        }
    }
}

/// Start the web server.
pub async fn serve(scout: Arc<MarketScout>) -> anyhow::Result<()> {
    let addr: SocketAddr = scout.config().bind_addr.parse()?;
    let state = AppState::new(scout);
    let app = create_router(state);

    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::config::ScoutConfig;
    use crate::scrapers::delay::DelayPolicy;
    use crate::scrapers::{FetchStrategy, SampleStrategy};

    fn test_config(dir: &tempfile::TempDir) -> Arc<ScoutConfig> {
        let mut config = ScoutConfig::default();
        config.downloads_dir = dir
            .path()
            .join("downloads")
            .to_string_lossy()
            .into_owned();
        config.delays = DelayPolicy::none();
        Arc::new(config)
    }

    /// App whose scout always lands on the placeholder data.
    fn sample_app(dir: &tempfile::TempDir) -> axum::Router {
        let config = test_config(dir);
        let strategies: Vec<Box<dyn FetchStrategy>> =
            vec![Box::new(SampleStrategy::new(Arc::clone(&config)))];
        let scout = MarketScout::with_strategies(config, strategies);
        create_router(AppState::new(Arc::new(scout)))
    }

    /// App whose scout has no strategies at all, so every run comes back empty.
    fn empty_app(dir: &tempfile::TempDir) -> axum::Router {
        let config = test_config(dir);
        let scout = MarketScout::with_strategies(config, Vec::new());
        create_router(AppState::new(Arc::new(scout)))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_index_page() {
        let dir = tempdir().unwrap();
        let app = sample_app(&dir);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains("search_query"));
    }

    #[tokio::test]
    async fn test_search_returns_listing_array() {
        let dir = tempdir().unwrap();
        let app = sample_app(&dir);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let listings = json.as_array().unwrap();
        assert_eq!(listings.len(), 5);
        // defaults applied: query falls back to "car cover"
        assert_eq!(listings[0]["title"], "Sample car cover 1");
        assert_eq!(listings[4]["title"], "Sample car cover 5");
    }

    #[tokio::test]
    async fn test_search_honours_the_query_field() {
        let dir = tempdir().unwrap();
        let app = sample_app(&dir);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"query": "bike", "pages": 1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json[0]["title"], "Sample bike 1");
    }

    #[tokio::test]
    async fn test_search_bad_json_is_a_500() {
        let dir = tempdir().unwrap();
        let app = sample_app(&dir);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_search_empty_results_yield_an_empty_array() {
        let dir = tempdir().unwrap();
        let app = empty_app(&dir);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_scrape_form_reports_written_artifacts() {
        let dir = tempdir().unwrap();
        let app = sample_app(&dir);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/scrape")
                    .header(
                        header::CONTENT_TYPE,
                        "application/x-www-form-urlencoded",
                    )
                    .body(Body::from("search_query=car+cover&pages=2&format=both"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["total_listings"], 5);

        let files = json["files"].as_array().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0]["type"], "JSON");
        assert_eq!(files[1]["type"], "CSV");

        for info in files {
            let name = info["path"].as_str().unwrap();
            assert!(name.starts_with("olx_car_cover_"), "{name}");
            assert!(dir.path().join("downloads").join(name).exists());
        }
    }

    #[tokio::test]
    async fn test_scrape_zero_results_is_a_404() {
        let dir = tempdir().unwrap();
        let app = empty_app(&dir);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/scrape")
                    .header(
                        header::CONTENT_TYPE,
                        "application/x-www-form-urlencoded",
                    )
                    .body(Body::from("search_query=unobtainium&format=csv"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], "No results found for your search query.");

        let downloads = dir.path().join("downloads");
        let wrote_csv = std::fs::read_dir(&downloads)
            .map(|entries| {
                entries
                    .flatten()
                    .any(|entry| entry.path().extension().is_some_and(|ext| ext == "csv"))
            })
            .unwrap_or(false);
        assert!(!wrote_csv);
    }

    #[tokio::test]
    async fn test_scrape_unknown_format_is_a_500() {
        let dir = tempdir().unwrap();
        let app = sample_app(&dir);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/scrape")
                    .header(
                        header::CONTENT_TYPE,
                        "application/x-www-form-urlencoded",
                    )
                    .body(Body::from("format=xml"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_download_serves_an_attachment() {
        let dir = tempdir().unwrap();
        let downloads = dir.path().join("downloads");
        std::fs::create_dir_all(&downloads).unwrap();
        std::fs::write(downloads.join("olx_test.json"), br#"[{"title":"x"}]"#).unwrap();

        let app = sample_app(&dir);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/download/olx_test.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .unwrap(),
            "attachment; filename=\"olx_test.json\""
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], br#"[{"title":"x"}]"#);
    }

    #[tokio::test]
    async fn test_download_missing_file_is_a_404() {
        let dir = tempdir().unwrap();
        let app = sample_app(&dir);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/download/no_such_file.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_rejects_path_traversal() {
        let dir = tempdir().unwrap();
        let downloads = dir.path().join("downloads");
        std::fs::create_dir_all(&downloads).unwrap();
        // a file just outside the downloads directory
        std::fs::write(dir.path().join("secret.txt"), b"keep out").unwrap();

        let app = sample_app(&dir);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/download/..%2Fsecret.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
