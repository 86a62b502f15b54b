// src/mirror/mod.rs
// =============================================================================
// The site-mirroring engine (--mirror).
//
// - resolver: relative reference -> absolute URL, plus domain extraction
// - registry: lock-protected visited sets (pages / assets)
// - session:  per-run state: client, filters, registries, job queue
// - engine:   bounded worker pool crawling pages and saving assets
// - rewrite:  post-crawl offline link conversion (--convert-links)
// =============================================================================

mod engine;
mod registry;
mod resolver;
mod rewrite;
mod session;

pub use engine::{run, MAX_CONCURRENT_FETCHES};
pub use session::MirrorOptions;
