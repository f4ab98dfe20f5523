//! Discovered-links cache
//!
//! Discovery walks every index page, which is slow against a politely paced
//! wiki. The result is saved as TOML so a later run against the same index can
//! skip straight to crawling:
//!
//! ```toml
//! index-url = "https://or.wikipedia.org/"
//! saved-at = "2024-05-01T10:00:00Z"
//!
//! [links]
//! "ପୁରୀ" = "https://or.wikipedia.org/wiki/%E0%AC%AA..."
//! ```

use crate::crawler::DiscoveredLinks;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

#[derive(Debug, Serialize, Deserialize)]
struct LinksFile {
    #[serde(rename = "index-url")]
    index_url: String,

    #[serde(rename = "saved-at")]
    saved_at: DateTime<Utc>,

    links: BTreeMap<String, String>,
}

/// Saves discovered links for `index_url` to `path`
///
/// The file is written next to its final location and renamed into place.
pub async fn save_links(path: &Path, index_url: &Url, links: &DiscoveredLinks) -> Result<(), HarvestError> {
    let file = LinksFile {
        index_url: index_url.to_string(),
        saved_at: Utc::now(),
        links: links
            .iter()
            .map(|(identifier, url)| (identifier.clone(), url.to_string()))
            .collect(),
    };

    let contents = toml::to_string_pretty(&file)
        .map_err(|e| HarvestError::LinksCache(format!("failed to serialize links: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    tokio::fs::write(&partial, contents).await?;
    tokio::fs::rename(&partial, path).await?;

    tracing::info!("Saved {} links to {}", links.len(), path.display());
    Ok(())
}

/// Loads links previously saved for `index_url`
///
/// # Returns
///
/// * `Ok(Some(links))` - A cache for this index exists
/// * `Ok(None)` - No cache file, or the cache belongs to a different index
/// * `Err(HarvestError::LinksCache)` - The file exists but cannot be parsed
pub async fn load_links(path: &Path, index_url: &Url) -> Result<Option<DiscoveredLinks>, HarvestError> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let file: LinksFile = toml::from_str(&contents).map_err(|e| {
        HarvestError::LinksCache(format!("failed to parse {}: {}", path.display(), e))
    })?;

    if file.index_url != index_url.as_str() {
        tracing::info!(
            cached = %file.index_url,
            current = %index_url,
            "Links cache belongs to a different index, ignoring"
        );
        return Ok(None);
    }

    let mut links = DiscoveredLinks::new();
    for (identifier, raw) in file.links {
        let url = Url::parse(&raw).map_err(|e| {
            HarvestError::LinksCache(format!("invalid URL for {:?}: {}", identifier, e))
        })?;
        links.insert(identifier, url);
    }

    tracing::info!(
        "Loaded {} links saved at {}",
        links.len(),
        file.saved_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(Some(links))
}
