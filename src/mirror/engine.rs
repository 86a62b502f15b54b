// src/mirror/engine.rs
// =============================================================================
// The crawl engine.
//
// How a mirror run works:
// 1. The start URL is seeded as both a Page job (crawl it for links) and
//    an Asset job (save it to disk).
// 2. A fixed pool of workers pulls jobs from a shared queue. Page jobs
//    fetch + parse HTML and enqueue more jobs for every same-domain
//    reference they find; Asset jobs fetch-and-persist one URL.
// 3. The pool size bounds simultaneous outbound fetches; the session's
//    outstanding-job count tells us when the whole crawl has drained.
// 4. With --convert-links, saved HTML is rewritten afterwards so the tree
//    browses offline.
//
// Per-link failures (unparsable URL, bad status, I/O trouble) are logged
// and that branch is abandoned; nothing short of a configuration error
// aborts the crawl. Nothing is retried.
// =============================================================================

use anyhow::{bail, Context, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

use super::resolver::{extract_domain, resolve};
use super::rewrite;
use super::session::{Job, MirrorOptions, MirrorSession};
use crate::download::persist;

/// Upper bound on simultaneous outbound fetches (worker pool size).
pub const MAX_CONCURRENT_FETCHES: usize = 50;

/// Mirrors the site rooted at `start_url` into the session root directory.
pub async fn run(start_url: &str, options: MirrorOptions) -> Result<()> {
    let domain = extract_domain(start_url)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let session = Arc::new(MirrorSession::new(domain, &options, tx));
    println!(
        "Mirroring {} into {}/",
        start_url,
        session.root().display()
    );

    // The root is both a page to crawl and a document to save; everything
    // else is fetched as discovered.
    session.enqueue(Job::Page(start_url.to_string()));
    session.enqueue(Job::Asset(start_url.to_string()));

    let rx = Arc::new(tokio::sync::Mutex::new(rx));
    let mut workers = Vec::with_capacity(MAX_CONCURRENT_FETCHES);
    for _ in 0..MAX_CONCURRENT_FETCHES {
        let session = Arc::clone(&session);
        let rx = Arc::clone(&rx);
        workers.push(tokio::spawn(async move {
            loop {
                // Hold the receiver lock only while waiting for the next
                // job; processing happens with the lock released so the
                // rest of the pool keeps flowing.
                let job = { rx.lock().await.recv().await };
                match job {
                    Some(Job::Page(url)) => crawl_page(&session, &url).await,
                    Some(Job::Asset(url)) => fetch_asset(&session, &url).await,
                    None => break,
                }
                session.job_done();
            }
        }));
    }

    session.wait_until_drained().await;
    session.close();
    for worker in workers {
        let _ = worker.await;
    }

    if options.convert_links {
        rewrite::rewrite_tree(session.root())?;
    }

    println!("Mirroring completed.");
    Ok(())
}

/// Handles one Page job: claim, fetch, parse, enqueue children.
async fn crawl_page(session: &Arc<MirrorSession>, url: &str) {
    // Someone else got here first: duplicate suppression, not an error
    if !session.pages.claim(url) {
        return;
    }

    let base = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Could not parse page URL {}: {}", url, e);
            return;
        }
    };

    let body = match fetch_page(session.client(), url).await {
        Ok(body) => body,
        Err(e) => {
            eprintln!("Error fetching page {}: {}", url, e);
            return;
        }
    };

    for (tag, reference) in extract_references(&body) {
        let absolute = resolve(&base, &reference);

        let link_domain = match extract_domain(&absolute) {
            Ok(domain) => domain,
            Err(e) => {
                eprintln!("Skipping link on {}: {}", url, e);
                continue;
            }
        };
        // Off-domain references are dropped silently
        if link_domain != session.domain() {
            continue;
        }
        if session.is_rejected(&absolute) {
            println!("Skipping rejected file: {}", absolute);
            continue;
        }
        if session.is_excluded(&absolute) {
            continue;
        }

        // Same-domain anchors recurse; every matched reference (anchors
        // included) is also saved as an asset. The registries dedup.
        if tag == "a" {
            session.enqueue(Job::Page(absolute.clone()));
        }
        session.enqueue(Job::Asset(absolute));
    }
}

/// Handles one Asset job: claim, then fetch-and-persist.
async fn fetch_asset(session: &Arc<MirrorSession>, url: &str) {
    if !session.assets.claim(url) {
        return;
    }
    if let Err(e) = persist(session.client(), url, None, None, session.root()).await {
        eprintln!("Error downloading {}: {}", url, e);
    }
}

async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("error fetching URL {}", url))?;
    if !response.status().is_success() {
        bail!("status {}", response.status());
    }
    response.text().await.context("error reading page body")
}

/// Pulls every link-bearing attribute out of a page:
/// a/href, link/href, img/src, script/src.
///
/// Fragments are stripped here so "#section" references vanish instead of
/// resolving back to the page itself.
fn extract_references(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href], link[href], img[src], script[src]").unwrap();

    let mut references = Vec::new();
    for element in document.select(&selector) {
        let tag = element.value().name().to_string();
        let attr = if tag == "a" || tag == "link" {
            "href"
        } else {
            "src"
        };
        if let Some(value) = element.value().attr(attr) {
            let value = value.split('#').next().unwrap_or("").trim();
            if !value.is_empty() {
                references.push((tag.clone(), value.to_string()));
            }
        }
    }
    references
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_references_finds_all_four_kinds() {
        let html = r##"
            <html><head>
              <link rel="stylesheet" href="/css/site.css">
              <script src="/js/app.js"></script>
            </head><body>
              <a href="/about">About</a>
              <img src="img/logo.png">
              <a href="#top">Top</a>
              <a href="">Empty</a>
            </body></html>
        "##;
        let refs = extract_references(html);
        assert_eq!(
            refs,
            vec![
                ("link".to_string(), "/css/site.css".to_string()),
                ("script".to_string(), "/js/app.js".to_string()),
                ("a".to_string(), "/about".to_string()),
                ("img".to_string(), "img/logo.png".to_string()),
            ]
        );
    }

    #[test]
    fn test_extract_references_same_url_in_two_elements() {
        // Dedup is the registries' job, not the walk's: both show up
        let html = r#"<a href="/x.png">x</a><img src="/x.png">"#;
        let refs = extract_references(html);
        assert_eq!(refs.len(), 2);
    }

    #[tokio::test]
    async fn test_mirror_fetches_same_domain_only_and_honors_reject() {
        let mut server = mockito::Server::new_async().await;
        let page = r#"<html><body>
                <a href="/about">about</a>
                <img src="/img/a.png">
                <script src="http://other.invalid/b.js"></script>
                <a href="/report.pdf">report</a>
            </body></html>"#;
        server
            .mock("GET", "/")
            .with_header("content-type", "text/html")
            .with_body(page)
            .create_async()
            .await;
        server
            .mock("GET", "/about")
            .with_header("content-type", "text/html")
            .with_body("<html><body>leaf</body></html>")
            .create_async()
            .await;
        server
            .mock("GET", "/img/a.png")
            .with_header("content-type", "image/png")
            .with_body("png-bytes")
            .create_async()
            .await;
        let rejected = server
            .mock("GET", "/report.pdf")
            .expect(0)
            .create_async()
            .await;

        let root = tempfile::tempdir().unwrap();
        let options = MirrorOptions {
            reject: vec![".pdf".to_string()],
            root: Some(root.path().to_path_buf()),
            ..Default::default()
        };
        run(&format!("{}/", server.url()), options).await.unwrap();

        assert!(root.path().join("index.html").exists());
        assert!(root.path().join("about.html").exists());
        assert_eq!(
            std::fs::read_to_string(root.path().join("img/a.png")).unwrap(),
            "png-bytes"
        );
        // the off-domain script was never mirrored
        assert!(!root.path().join("b.js").exists());
        // the rejected link was never requested and never written
        rejected.assert_async().await;
        assert!(!root.path().join("report.pdf").exists());
    }

    #[tokio::test]
    async fn test_second_run_leaves_existing_files_alone() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .with_header("content-type", "text/html")
            .with_body("<html><body><img src=\"/pix.png\"></body></html>")
            .create_async()
            .await;
        server
            .mock("GET", "/pix.png")
            .with_body("pixels")
            .create_async()
            .await;

        let root = tempfile::tempdir().unwrap();
        let url = format!("{}/", server.url());

        let options = MirrorOptions {
            root: Some(root.path().to_path_buf()),
            ..Default::default()
        };
        run(&url, options).await.unwrap();
        let saved = root.path().join("pix.png");
        assert_eq!(std::fs::read_to_string(&saved).unwrap(), "pixels");

        // Tamper with the file, mirror again: the existing file must win
        std::fs::write(&saved, "local edit").unwrap();
        let options = MirrorOptions {
            root: Some(root.path().to_path_buf()),
            ..Default::default()
        };
        run(&url, options).await.unwrap();
        assert_eq!(std::fs::read_to_string(&saved).unwrap(), "local edit");
    }

    #[tokio::test]
    async fn test_exclude_prefix_skips_subtree() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .with_header("content-type", "text/html")
            .with_body(
                "<html><body><a href=\"/private/secret.html\">s</a>\
                 <img src=\"/open.png\"></body></html>",
            )
            .create_async()
            .await;
        server
            .mock("GET", "/open.png")
            .with_body("ok")
            .create_async()
            .await;
        let private = server
            .mock("GET", "/private/secret.html")
            .expect(0)
            .create_async()
            .await;

        let root = tempfile::tempdir().unwrap();
        let options = MirrorOptions {
            exclude: vec!["/private".to_string()],
            root: Some(root.path().to_path_buf()),
            ..Default::default()
        };
        run(&format!("{}/", server.url()), options).await.unwrap();

        assert!(root.path().join("open.png").exists());
        private.assert_async().await;
        assert!(!root.path().join("private").exists());
    }
}
