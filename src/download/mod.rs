// src/download/mod.rs
// =============================================================================
// Everything that moves bytes from an HTTP response onto the disk:
//
// - single:     sequential one-file download with a progress bar
// - batch:      concurrent downloads from an input file (-i)
// - persist:    fetch-and-persist into a mirrored directory tree
// - rate_limit: --rate-limit parsing and transfer throttling
// =============================================================================

mod batch;
mod persist;
mod rate_limit;
mod single;

pub use batch::download_all;
pub use persist::{derive_output_path, expand_path, persist};
pub use rate_limit::{RateLimit, Throttle, CHUNK_SIZE};
pub use single::{download, Report, LOG_FILE};
