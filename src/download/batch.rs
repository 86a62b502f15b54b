// src/download/batch.rs
// =============================================================================
// The -i / --input-file mode: read a file of URLs (one per line) and
// download them all concurrently.
//
// Each URL goes through the same fetch-and-persist path the mirror uses,
// so directory structure and naming rules match; duplicates within the
// file are dropped before anything is fetched.
// =============================================================================

use anyhow::{Context, Result};
use futures::future::join_all;
use reqwest::Client;
use std::collections::HashSet;
use tokio::fs;

use super::persist::{expand_path, persist};
use super::rate_limit::RateLimit;

/// Downloads every URL listed in `input_file` concurrently.
///
/// Per-URL failures are reported and skipped; only an unreadable input
/// file aborts the whole batch.
pub async fn download_all(
    input_file: &str,
    directory: Option<&str>,
    limit: Option<&RateLimit>,
) -> Result<()> {
    let contents = fs::read_to_string(input_file)
        .await
        .with_context(|| format!("error opening file {}", input_file))?;

    let mut seen = HashSet::new();
    let urls: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .collect();

    let root = expand_path(directory.unwrap_or("."));
    let client = Client::new();

    let downloads = urls.into_iter().map(|url| {
        let client = &client;
        let root = &root;
        async move {
            if let Err(e) = persist(client, url, None, limit, root).await {
                eprintln!("Error downloading {}: {}", url, e);
            }
        }
    });
    join_all(downloads).await;

    Ok(())
}
