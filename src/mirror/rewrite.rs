// src/mirror/rewrite.rs
// =============================================================================
// Offline link rewriting (--convert-links).
//
// After the crawl drains, every saved .html file is rewritten in place so
// its references point into the mirrored tree instead of the live site:
//
//   https://example.com/x/y.png  ->  example.com/x/y.png
//   //example.com/x/y.png        ->  example.com/x/y.png
//   /css/site.css                ->  ./css/site.css
//   img/a.png                    ->  img/a.png        (already relative)
//
// The same mapping runs over href/src attributes, inline style attributes,
// and the text of <style> elements, where CSS url(...) references are
// located by pattern and reserialized as url('...'). Non-HTML files are
// left untouched.
// =============================================================================

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use std::fs;
use std::path::Path;
use url::Url;

/// Walks the mirror root and rewrites every saved HTML file for offline
/// viewing.
pub fn rewrite_tree(root: &Path) -> Result<()> {
    let entries = fs::read_dir(root)
        .with_context(|| format!("error reading directory {}", root.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            rewrite_tree(&path)?;
        } else {
            rewrite_file(&path)?;
        }
    }
    Ok(())
}

/// Rewrites one file in place; anything not ending in .html is a no-op.
pub fn rewrite_file(path: &Path) -> Result<()> {
    if path.extension().and_then(|e| e.to_str()) != Some("html") {
        return Ok(());
    }

    let contents =
        fs::read_to_string(path).with_context(|| format!("error reading {}", path.display()))?;
    let rewritten = rewrite_html(&contents);
    fs::write(path, rewritten).with_context(|| format!("error writing {}", path.display()))?;

    println!("Links converted for offline viewing in {}", path.display());
    Ok(())
}

/// Applies the offline mapping to a whole HTML document.
pub fn rewrite_html(html: &str) -> String {
    // href="..." / src="..." (either quote style; the \s keeps data-src
    // and friends out of the match)
    let attr = Regex::new(r#"(?i)(\s)(href|src)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
    let rewritten = attr.replace_all(html, |caps: &Captures| {
        let value = caps.get(3).or_else(|| caps.get(4)).map_or("", |m| m.as_str());
        format!("{}{}=\"{}\"", &caps[1], &caps[2], local_path(value))
    });

    // style="..." attributes: CSS url(...) references inside the value
    let style_attr = Regex::new(r#"(?i)(\s)style\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
    let rewritten = style_attr.replace_all(&rewritten, |caps: &Captures| {
        let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        format!("{}style=\"{}\"", &caps[1], rewrite_css_urls(value))
    });

    // <style> elements: same treatment for the sheet's text
    let style_block = Regex::new(r"(?is)(<style[^>]*>)(.*?)(</style>)").unwrap();
    let rewritten = style_block.replace_all(&rewritten, |caps: &Captures| {
        format!("{}{}{}", &caps[1], rewrite_css_urls(&caps[2]), &caps[3])
    });

    rewritten.into_owned()
}

/// Rewrites every url(...) reference in a chunk of CSS.
fn rewrite_css_urls(css: &str) -> String {
    let url_ref = Regex::new(r"url\(([^)]+)\)").unwrap();
    url_ref
        .replace_all(css, |caps: &Captures| {
            let reference = caps[1].trim().trim_matches(|c| c == '\'' || c == '"');
            format!("url('{}')", local_path(reference))
        })
        .into_owned()
}

/// Maps one reference to its place in the mirrored tree.
fn local_path(reference: &str) -> String {
    if reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("//")
    {
        let absolute = if reference.starts_with("//") {
            format!("http:{}", reference)
        } else {
            reference.to_string()
        };
        match Url::parse(&absolute) {
            Ok(parsed) => {
                let host = parsed.host_str().unwrap_or("");
                if parsed.path() == "/" {
                    host.to_string()
                } else {
                    format!("{}{}", host, parsed.path())
                }
            }
            Err(_) => reference.to_string(),
        }
    } else if reference.starts_with('/') {
        format!(".{}", reference)
    } else {
        reference.to_string()
    }
}
