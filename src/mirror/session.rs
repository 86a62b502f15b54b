// src/mirror/session.rs
// =============================================================================
// Per-run crawl state. One MirrorSession is built for each mirror command
// and handed (behind an Arc) to every worker - nothing is global, so two
// mirror runs in one process would never share registries, and tests can
// inject their own root directory.
//
// The session owns:
// - the shared HTTP client,
// - the origin domain every link must stay inside,
// - the mirror root directory (./<domain> by default),
// - the reject-suffix and exclude-prefix filters,
// - the two dedup registries (pages / assets),
// - the job queue sender and the outstanding-job count used to detect
//   when the crawl has drained.
// =============================================================================

use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Notify;
use url::Url;

use super::registry::VisitedSet;
use crate::download::expand_path;

/// One unit of crawl work. Recursing into a page and saving an asset go
/// through the same queue; they are both just jobs.
#[derive(Debug)]
pub enum Job {
    Page(String),
    Asset(String),
}

/// What the CLI asked a mirror run to do.
#[derive(Debug, Default)]
pub struct MirrorOptions {
    pub convert_links: bool,
    /// Suffixes to skip, e.g. [".pdf", ".doc"]
    pub reject: Vec<String>,
    /// URL path prefixes to skip, e.g. ["/private"]
    pub exclude: Vec<String>,
    /// Mirror root override; defaults to ./<domain>
    pub root: Option<PathBuf>,
}

pub struct MirrorSession {
    client: Client,
    domain: String,
    root: PathBuf,
    reject: Vec<String>,
    exclude: Vec<String>,
    pub pages: VisitedSet,
    pub assets: VisitedSet,
    queue: Mutex<Option<UnboundedSender<Job>>>,
    outstanding: AtomicUsize,
    drain_notify: Notify,
}

impl MirrorSession {
    pub fn new(domain: String, options: &MirrorOptions, queue: UnboundedSender<Job>) -> MirrorSession {
        let root = options
            .root
            .clone()
            .unwrap_or_else(|| expand_path(&domain));
        // Exclude prefixes are matched against URL paths, which always
        // start with '/'
        let exclude = options
            .exclude
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| {
                if p.starts_with('/') {
                    p.clone()
                } else {
                    format!("/{}", p)
                }
            })
            .collect();

        MirrorSession {
            client: Client::new(),
            domain,
            root,
            reject: options.reject.clone(),
            exclude,
            pages: VisitedSet::new(),
            assets: VisitedSet::new(),
            queue: Mutex::new(Some(queue)),
            outstanding: AtomicUsize::new(0),
            drain_notify: Notify::new(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Adds a job to the queue, counting it as outstanding until a worker
    /// reports it done.
    pub fn enqueue(&self, job: Job) {
        let guard = self.queue.lock().unwrap();
        if let Some(sender) = guard.as_ref() {
            self.outstanding.fetch_add(1, Ordering::SeqCst);
            if sender.send(job).is_err() {
                self.outstanding.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    /// Called by a worker after finishing a job (success or failure).
    pub fn job_done(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drain_notify.notify_waiters();
        }
    }

    /// Resolves once every enqueued job has been processed, transitively:
    /// jobs enqueued by running jobs extend the wait.
    pub async fn wait_until_drained(&self) {
        loop {
            // register before checking so a final job_done is not missed
            let notified = self.drain_notify.notified();
            if self.outstanding.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Closes the queue; workers exit once the backlog is consumed.
    pub fn close(&self) {
        self.queue.lock().unwrap().take();
    }

    /// --reject: skip URLs ending with any listed suffix, before any fetch.
    pub fn is_rejected(&self, url: &str) -> bool {
        self.reject
            .iter()
            .any(|suffix| !suffix.is_empty() && url.ends_with(suffix.as_str()))
    }

    /// --exclude: skip URLs whose path falls under any listed prefix.
    pub fn is_excluded(&self, url: &str) -> bool {
        if self.exclude.is_empty() {
            return false;
        }
        match Url::parse(url) {
            Ok(parsed) => {
                let path = parsed.path();
                self.exclude.iter().any(|prefix| path.starts_with(prefix))
            }
            Err(_) => false,
        }
    }
}
