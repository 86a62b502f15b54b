// src/mirror/registry.rs
// =============================================================================
// Dedup registries for the crawl.
//
// A mirror run keeps two of these: one for pages (crawled for links) and
// one for assets (fetched to disk). They are independent because the same
// URL can legitimately be both a page to crawl and an asset to save.
//
// claim() is a single lock-protected check-and-insert, so when several
// crawl branches discover the same URL at once exactly one of them wins.
// =============================================================================

use std::collections::HashSet;
use std::sync::Mutex;

/// A set of URLs that have already been handled this run.
#[derive(Debug, Default)]
pub struct VisitedSet {
    inner: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> VisitedSet {
        VisitedSet::default()
    }

    /// Atomically tests membership and inserts if absent.
    ///
    /// Returns true exactly once per URL per run: the caller that gets
    /// true proceeds, everyone else skips.
    pub fn claim(&self, url: &str) -> bool {
        self.inner.lock().unwrap().insert(url.to_string())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}
