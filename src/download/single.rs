// src/download/single.rs
// =============================================================================
// Plain one-file download: the `webgrab <url>` path.
//
// What happens here:
// 1. Print "Start at <timestamp>"
// 2. GET the URL, report the response status and content size
// 3. Decide the output name (-O flag, else last URL segment)
// 4. Stream the body in 32 KiB chunks, drawing an in-place progress bar
//    (percent, speed, ETA), throttled when --rate-limit is set
// 5. Print "Downloaded [url]" and "Finished at <timestamp>"
//
// The same code serves the background mode: with -B the process re-execs
// itself detached, and the child routes every status line to `wget-log`
// instead of stdout (no progress bar there, log files don't like \r).
// =============================================================================

use anyhow::{bail, Context, Result};
use chrono::Local;
use reqwest::Client;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

use super::persist::expand_path;
use super::rate_limit::RateLimit;

/// Name of the log file used by background downloads, same as wget's.
pub const LOG_FILE: &str = "wget-log";

/// Where status lines go: the terminal, or an appended log file.
pub enum Report {
    Stdout,
    LogFile(File),
}

impl Report {
    pub fn stdout() -> Report {
        Report::Stdout
    }

    /// Opens (or creates) `wget-log` for appending.
    pub fn wget_log() -> Result<Report> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(LOG_FILE)
            .context("error opening log file")?;
        Ok(Report::LogFile(file))
    }

    pub fn line(&mut self, message: &str) {
        match self {
            Report::Stdout => println!("{}", message),
            Report::LogFile(file) => {
                let _ = writeln!(file, "{}", message);
            }
        }
    }

    fn interactive(&self) -> bool {
        matches!(self, Report::Stdout)
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Downloads one URL sequentially, reporting progress as it goes.
pub async fn download(
    url: &str,
    output: Option<&str>,
    directory: Option<&str>,
    limit: Option<&RateLimit>,
    report: &mut Report,
) -> Result<()> {
    report.line(&format!("Start at {}", timestamp()));

    let client = Client::new();
    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("error downloading {}", url))?;
    if !response.status().is_success() {
        bail!("status {}", response.status());
    }
    report.line(&format!(
        "Sending request, awaiting response... status {}",
        response.status()
    ));

    let content_length = response.content_length();
    match content_length {
        Some(len) => report.line(&format!(
            "Content size: {} bytes [~{:.2}MB]",
            len,
            len as f64 / 1024.0 / 1024.0
        )),
        None => report.line("Content size: unknown"),
    }

    let destination = output_path(url, output, directory)?;
    if let Some(dir) = destination.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("error creating path {}", dir.display()))?;
        }
    }
    report.line(&format!("Saving file to: {}", destination.display()));

    let mut file = fs::File::create(&destination)
        .await
        .with_context(|| format!("error creating file {}", destination.display()))?;

    let mut throttle = limit.map(|l| l.throttler());
    let mut downloaded: u64 = 0;
    let started = std::time::Instant::now();

    while let Some(chunk) = response
        .chunk()
        .await
        .context("error reading response body")?
    {
        file.write_all(&chunk)
            .await
            .context("error writing to file")?;
        downloaded += chunk.len() as u64;

        if report.interactive() {
            if let Some(total) = content_length {
                draw_progress(downloaded, total, started.elapsed());
            }
        }
        if let Some(throttle) = throttle.as_mut() {
            throttle.consume(chunk.len()).await;
        }
    }

    file.flush().await.context("error flushing file")?;

    if report.interactive() {
        println!();
    }
    report.line(&format!("Downloaded [{}]", url));
    report.line(&format!("Finished at {}", timestamp()));
    Ok(())
}

/// Output name: -O if given, else the URL's last path segment
/// (index.html for a bare domain), placed under the -P directory.
fn output_path(
    url: &str,
    output: Option<&str>,
    directory: Option<&str>,
) -> Result<std::path::PathBuf> {
    let parsed = Url::parse(url).with_context(|| format!("invalid URL '{}'", url))?;
    let name = match output {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            let segment = parsed
                .path_segments()
                .and_then(|segments| segments.last())
                .unwrap_or("");
            if segment.is_empty() {
                "index.html".to_string()
            } else {
                segment.to_string()
            }
        }
    };
    let dir = expand_path(directory.unwrap_or("."));
    Ok(dir.join(name))
}

/// Redraws the single progress line:
///   1024.00 KiB / 2048.00 KiB [=====   ] 50.00% 312.44 KiB/s 3s
fn draw_progress(downloaded: u64, total: u64, elapsed: std::time::Duration) {
    let percent = downloaded as f64 / total as f64 * 100.0;
    let speed = downloaded as f64 / elapsed.as_secs_f64().max(0.001);
    let remaining = (total.saturating_sub(downloaded)) as f64 / speed.max(1.0);

    let mut bar = String::with_capacity(100);
    for i in 0..100 {
        bar.push(if (i as f64) < percent { '=' } else { ' ' });
    }

    print!(
        "\r{:.2} KiB / {:.2} KiB [{}] {:.2}% {:.2} KiB/s {:.0}s",
        downloaded as f64 / 1024.0,
        total as f64 / 1024.0,
        bar,
        percent,
        speed / 1024.0,
        remaining
    );
    let _ = std::io::stdout().flush();
}
