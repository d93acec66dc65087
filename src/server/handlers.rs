//! Request handlers for the scrape API.

use std::path::Path as FsPath;

use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::AppState;
use crate::models::{FileInfo, OutputFormat};

const DEFAULT_QUERY: &str = "car cover";
const DEFAULT_PAGES: u32 = 3;

const INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Market Scout</title></head>
<body>
    <h1>Market Scout</h1>
    <p>Scrape marketplace listings and download them as JSON or CSV.</p>
    <form action="/scrape" method="post">
        <label>Search query <input type="text" name="search_query" value="car cover"></label>
        <label>Pages <input type="number" name="pages" value="3" min="1" max="10"></label>
        <label>Format
            <select name="format">
                <option value="both">Both</option>
                <option value="json">JSON</option>
                <option value="csv">CSV</option>
            </select>
        </label>
        <button type="submit">Scrape</button>
    </form>
    <p>POST / with a JSON body {"query", "pages"} returns the listings inline.</p>
</body>
</html>
"#;

fn default_query() -> String {
    DEFAULT_QUERY.to_string()
}

fn default_pages() -> u32 {
    DEFAULT_PAGES
}

/// JSON body accepted by `POST /`
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default = "default_pages")]
    pub pages: u32,
}

/// Form fields accepted by `POST /scrape`
#[derive(Debug, Deserialize)]
pub struct ScrapeForm {
    #[serde(default = "default_query")]
    pub search_query: String,
    #[serde(default = "default_pages")]
    pub pages: u32,
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub total_listings: usize,
    pub files: Vec<FileInfo>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Usage page.
pub async fn index() -> impl IntoResponse {
    Html(INDEX_PAGE)
}

/// Run a scrape and return the listings directly as a JSON array.
pub async fn search_inline(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            error!("Bad search payload: {}", rejection);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, rejection.body_text());
        }
    };

    info!(
        "Starting scrape for: {}, pages: {}",
        request.query, request.pages
    );

    match state
        .scout
        .run(&request.query, request.pages, OutputFormat::Json)
        .await
    {
        Ok(outcome) => Json(outcome.listings).into_response(),
        Err(err) => {
            error!("Error in index endpoint: {:#}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
        }
    }
}

/// Run a scrape and report the artifacts written for download.
pub async fn scrape(
    State(state): State<AppState>,
    payload: Result<Form<ScrapeForm>, FormRejection>,
) -> Response {
    let Form(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            error!("Bad scrape form: {}", rejection);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, rejection.body_text());
        }
    };

    info!(
        "Starting scrape for: {}, pages: {}, format: {:?}",
        request.search_query, request.pages, request.format
    );

    match state
        .scout
        .run(&request.search_query, request.pages, request.format)
        .await
    {
        Ok(outcome) if outcome.total() == 0 => error_response(
            StatusCode::NOT_FOUND,
            "No results found for your search query.",
        ),
        Ok(outcome) => Json(ScrapeResponse {
            total_listings: outcome.total(),
            files: outcome.files,
        })
        .into_response(),
        Err(err) => {
            error!("Error in /scrape endpoint: {:#}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
        }
    }
}

/// Serve a previously written artifact as a download.
pub async fn download(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    let file_path = state.downloads_dir.join(&filename);

    if !file_path.exists() {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }

    // Security: only files inside the downloads directory are served
    let downloads_root = match state.downloads_dir.canonicalize() {
        Ok(root) => root,
        Err(_) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
    };
    match file_path.canonicalize() {
        Ok(canonical) if canonical.starts_with(&downloads_root) => {}
        Ok(_) => return (StatusCode::FORBIDDEN, "Access denied").into_response(),
        Err(_) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
    }

    let content = match tokio::fs::read(&file_path).await {
        Ok(content) => content,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file").into_response();
        }
    };

    let mime = mime_guess::from_path(&file_path)
        .first_or_octet_stream()
        .to_string();
    let display_name = FsPath::new(&filename)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());

    (
        [
            (header::CONTENT_TYPE, mime),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{display_name}\""),
            ),
        ],
        content,
    )
        .into_response()
}
