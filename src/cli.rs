// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// webgrab mimics wget's flag surface:
//   webgrab <url>                         plain download
//   webgrab <url> -O name -P dir          choose output name / directory
//   webgrab <url> --rate-limit 200k       throttle the transfer
//   webgrab <url> -B                      download detached, log to wget-log
//   webgrab -i urls.txt                   download every URL in a file
//   webgrab <url> --mirror                mirror the whole site
//   webgrab <url> --mirror --convert-links --reject .pdf --exclude /private
//
// Flag combinations are validated here, before any network or file I/O,
// so configuration errors never leave side effects behind.
// =============================================================================

use anyhow::{bail, Result};
use clap::Parser;

use crate::download::RateLimit;

#[derive(Parser, Debug, Default)]
#[command(
    name = "webgrab",
    version = "0.1.0",
    about = "A wget-style downloader with recursive website mirroring",
    long_about = "webgrab downloads files over HTTP(S) and, with --mirror, recursively \
                  copies an entire website for offline browsing: it crawls pages, fetches \
                  same-domain assets, and (with --convert-links) rewrites references so \
                  the saved tree works without a network connection."
)]
pub struct Cli {
    /// URL to download (required unless --input-file is given)
    pub url: Option<String>,

    /// Save the download under this file name instead of the URL's last segment
    #[arg(short = 'O', long = "output")]
    pub output: Option<String>,

    /// Directory to save into (supports a leading ~)
    #[arg(short = 'P', long = "directory-prefix")]
    pub directory: Option<String>,

    /// Limit download speed, e.g. 400k or 2M (bytes per second)
    #[arg(long = "rate-limit")]
    pub rate_limit: Option<String>,

    /// Download in the background; output goes to wget-log
    #[arg(short = 'B', long = "background")]
    pub background: bool,

    /// File containing one URL per line, all downloaded concurrently
    #[arg(short = 'i', long = "input-file")]
    pub input_file: Option<String>,

    /// Mirror the website rooted at URL into ./<domain>/
    #[arg(long)]
    pub mirror: bool,

    /// After mirroring, rewrite links in saved HTML for offline viewing
    #[arg(long = "convert-links")]
    pub convert_links: bool,

    /// Comma-separated suffixes to skip while mirroring, e.g. .pdf,.doc
    #[arg(short = 'R', long = "reject", value_delimiter = ',')]
    pub reject: Vec<String>,

    /// Comma-separated path prefixes to skip while mirroring, e.g. /cgi-bin
    #[arg(short = 'X', long = "exclude", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Internal: write status lines to wget-log (set by the -B re-exec)
    #[arg(long = "log-to-file", hide = true)]
    pub log_to_file: bool,
}

impl Cli {
    /// Checks flag combinations and flag syntax before any I/O happens.
    ///
    /// Everything rejected here is a configuration error: the process exits
    /// without having touched the network or the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_none() && self.input_file.is_none() {
            bail!("URL not provided");
        }

        if self.mirror {
            // --mirror only combines with --convert-links, --reject, --exclude
            if self.output.is_some()
                || self.directory.is_some()
                || self.rate_limit.is_some()
                || self.input_file.is_some()
                || self.background
            {
                bail!(
                    "--mirror can only be used with --convert-links, --reject, \
                     --exclude, and a URL"
                );
            }
            if self.url.is_none() {
                bail!("--mirror requires a URL");
            }
        } else if self.convert_links || !self.reject.is_empty() || !self.exclude.is_empty() {
            bail!("--convert-links, --reject, and --exclude can only be used with --mirror");
        }

        // Surface a malformed rate limit now, not mid-transfer
        if let Some(spec) = &self.rate_limit {
            RateLimit::parse(spec)?;
        }

        Ok(())
    }

    /// Parses the already-validated rate limit flag.
    pub fn rate_limit(&self) -> Option<RateLimit> {
        self.rate_limit
            .as_deref()
            .and_then(|spec| RateLimit::parse(spec).ok())
    }
}
