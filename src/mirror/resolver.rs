// src/mirror/resolver.rs
// =============================================================================
// Turning the references found in a page into absolute URLs, and deciding
// which domain a URL belongs to.
//
// Resolution rules (in order):
// 1. fragment ("#...") is stripped before anything else
// 2. already absolute (http:// or https://)  -> returned unchanged
// 3. scheme-relative ("//cdn.example/x")     -> base's scheme prepended
// 4. site-absolute ("/css/site.css"),
//    dot-relative ("./img/a.png"),
//    or bare relative ("img/a.png")          -> joined to the base URL's
//                                               scheme+host origin
//
// The base is a parsed `url::Url`, so bases with query strings or missing
// paths resolve correctly - no string-index splitting.
// =============================================================================

use anyhow::{anyhow, Result};
use url::{Position, Url};

/// Resolves a reference found in a document against the page's URL.
pub fn resolve(base: &Url, reference: &str) -> String {
    let reference = reference.split('#').next().unwrap_or("");

    if reference.starts_with("http://") || reference.starts_with("https://") {
        return reference.to_string();
    }

    if reference.starts_with("//") {
        return format!("{}:{}", base.scheme(), reference);
    }

    // scheme://host[:port], no path
    let origin = &base[..Position::BeforePath];
    if let Some(rest) = reference.strip_prefix("./") {
        format!("{}/{}", origin, rest)
    } else if reference.starts_with('/') {
        format!("{}{}", origin, reference)
    } else {
        format!("{}/{}", origin, reference)
    }
}

/// Extracts the host component of a URL (no scheme, no port).
///
/// Used purely for same-origin comparison; an unparsable URL is an error
/// the caller logs before skipping that link.
pub fn extract_domain(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| anyhow!("could not parse URL '{}': {}", url, e))?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("URL has no host: {}", url))
}
