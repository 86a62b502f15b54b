// src/download/persist.rs
// =============================================================================
// Fetch-and-persist: download one URL into a directory tree that mirrors
// the URL's path hierarchy.
//
// This is the workhorse of the mirror engine. Given
//   http://site.example/img/logo.png  with root "site.example"
// it writes                            site.example/img/logo.png
//
// Naming rules (matching wget):
// - empty last segment or URL ending in "/"  -> index.html
// - Content-Type text/html without ".html"   -> ".html" appended
//
// Re-runs are idempotent: if the destination file already exists the body
// is not written again. A failed transfer leaves a partial file behind and
// is reported; the caller carries on with other downloads.
// =============================================================================

use anyhow::{bail, Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

use super::rate_limit::RateLimit;

/// Downloads `url` under `root`, mirroring the URL path on disk.
///
/// The caller is responsible for dedup (registry claims); this function
/// only talks HTTP and writes files.
pub async fn persist(
    client: &Client,
    url: &str,
    name_hint: Option<&str>,
    limit: Option<&RateLimit>,
    root: &Path,
) -> Result<()> {
    let parsed = Url::parse(url).with_context(|| format!("invalid URL '{}'", url))?;

    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("error fetching {}", url))?;
    if !response.status().is_success() {
        bail!("status {} for {}", response.status(), url);
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    let destination = derive_output_path(&parsed, name_hint, &content_type, root);
    if let Some(dir) = destination.parent() {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("error creating path {}", dir.display()))?;
    }

    // Already mirrored on a previous run (or by a racing sibling): skip.
    if fs::try_exists(&destination).await.unwrap_or(false) {
        return Ok(());
    }

    let mut file = fs::File::create(&destination)
        .await
        .with_context(|| format!("error creating file {}", destination.display()))?;

    let mut throttle = limit.map(|l| l.throttler());
    while let Some(chunk) = response
        .chunk()
        .await
        .context("error reading response body")?
    {
        file.write_all(&chunk)
            .await
            .context("error writing to file")?;
        if let Some(throttle) = throttle.as_mut() {
            throttle.consume(chunk.len()).await;
        }
    }

    file.flush().await.context("error flushing file")?;

    println!("\x1b[32mDownloaded [{}]\x1b[0m", url);
    Ok(())
}

/// Computes where a URL lands on disk, given the response Content-Type.
pub fn derive_output_path(
    url: &Url,
    name_hint: Option<&str>,
    content_type: &str,
    root: &Path,
) -> PathBuf {
    let trimmed = url.path().trim_matches('/');
    let mut components: Vec<&str> = if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    };
    let last_segment = components.pop().unwrap_or("");

    let mut dir = root.to_path_buf();
    for component in components {
        dir.push(component);
    }

    let mut name = match name_hint {
        Some(hint) if !hint.is_empty() => hint.to_string(),
        _ => last_segment.to_string(),
    };
    if name.is_empty() || url.path().ends_with('/') {
        name = "index.html".to_string();
    } else if content_type.starts_with("text/html") && !name.ends_with(".html") {
        name.push_str(".html");
    }

    dir.join(name)
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if path == "~" {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home);
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home).join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_plain_asset_path() {
        let dest = derive_output_path(
            &url("http://site.example/img/a.png"),
            None,
            "image/png",
            Path::new("site.example"),
        );
        assert_eq!(dest, Path::new("site.example/img/a.png"));
    }

    #[test]
    fn test_bare_domain_becomes_index_html() {
        let dest = derive_output_path(
            &url("http://site.example/"),
            None,
            "text/html; charset=utf-8",
            Path::new("site.example"),
        );
        assert_eq!(dest, Path::new("site.example/index.html"));
    }

    #[test]
    fn test_trailing_slash_becomes_index_html() {
        let dest = derive_output_path(
            &url("http://site.example/docs/"),
            None,
            "text/html",
            Path::new("site.example"),
        );
        assert_eq!(dest, Path::new("site.example/docs/index.html"));
    }

    #[test]
    fn test_html_suffix_appended_for_html_content() {
        let dest = derive_output_path(
            &url("http://site.example/about"),
            None,
            "text/html; charset=utf-8",
            Path::new("site.example"),
        );
        assert_eq!(dest, Path::new("site.example/about.html"));
    }

    #[test]
    fn test_html_suffix_not_doubled() {
        let dest = derive_output_path(
            &url("http://site.example/about.html"),
            None,
            "text/html",
            Path::new("site.example"),
        );
        assert_eq!(dest, Path::new("site.example/about.html"));
    }

    #[test]
    fn test_name_hint_wins_over_url_segment() {
        let dest = derive_output_path(
            &url("http://site.example/download/archive.bin"),
            Some("saved.bin"),
            "application/octet-stream",
            Path::new("out"),
        );
        assert_eq!(dest, Path::new("out/download/saved.bin"));
    }

    #[test]
    fn test_expand_path_home() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(expand_path("~/mirror"), Path::new("/home/tester/mirror"));
        assert_eq!(expand_path("~"), Path::new("/home/tester"));
        assert_eq!(expand_path("plain/dir"), Path::new("plain/dir"));
    }

    #[tokio::test]
    async fn test_persist_writes_then_skips_existing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/data/file.txt")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("first body")
            .expect(2)
            .create_async()
            .await;

        let root = tempfile::tempdir().unwrap();
        let client = Client::new();
        let url = format!("{}/data/file.txt", server.url());

        persist(&client, &url, None, None, root.path()).await.unwrap();
        let saved = root.path().join("data/file.txt");
        assert_eq!(std::fs::read_to_string(&saved).unwrap(), "first body");

        // Second run: file exists, body must not be rewritten
        std::fs::write(&saved, "kept").unwrap();
        persist(&client, &url, None, None, root.path()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&saved).unwrap(), "kept");

        drop(mock);
    }

    #[tokio::test]
    async fn test_persist_does_not_create_file_on_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.png")
            .with_status(404)
            .create_async()
            .await;

        let root = tempfile::tempdir().unwrap();
        let client = Client::new();
        let url = format!("{}/missing.png", server.url());

        assert!(persist(&client, &url, None, None, root.path()).await.is_err());
        assert!(!root.path().join("missing.png").exists());
    }
}
