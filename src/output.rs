use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;
use uuid::Uuid;

use crate::config::ScoutConfig;
use crate::models::{FileInfo, Listing, OutputFormat};

/// Collision-free artifact basename: slug, underscored query, wall-clock
/// timestamp and a short random id.
pub fn unique_basename(slug: &str, query: &str) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let id = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}_{}",
        slug,
        query.replace(' ', "_"),
        timestamp,
        &id[..8]
    )
}

/// Write the requested artifacts into the downloads directory.
///
/// A JSON file is written whenever asked for, even for an empty result
/// set; a CSV is skipped when there are no rows to put under the header.
pub async fn write_outputs(
    config: &ScoutConfig,
    query: &str,
    listings: &[Listing],
    format: OutputFormat,
) -> Result<Vec<FileInfo>> {
    let dir = Path::new(&config.downloads_dir);
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let base = unique_basename(&config.site.slug, query);
    let mut files = Vec::new();

    if format.wants_json() {
        let name = format!("{base}.json");
        let payload =
            serde_json::to_string_pretty(listings).context("Failed to serialize listings")?;
        tokio::fs::write(dir.join(&name), payload)
            .await
            .with_context(|| format!("Failed to write {name}"))?;
        info!("Saved {} listings to {}", listings.len(), name);
        files.push(FileInfo {
            path: name,
            kind: "JSON".to_string(),
        });
    }

    if format.wants_csv() && !listings.is_empty() {
        let name = format!("{base}.csv");
        let mut bytes = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut bytes);
            for listing in listings {
                writer
                    .serialize(listing)
                    .context("Failed to serialize listing row")?;
            }
            writer.flush().context("Failed to finish CSV buffer")?;
        }
        tokio::fs::write(dir.join(&name), bytes)
            .await
            .with_context(|| format!("Failed to write {name}"))?;
        info!("Saved {} listings to {}", listings.len(), name);
        files.push(FileInfo {
            path: name,
            kind: "CSV".to_string(),
        });
    }

    Ok(files)
}
