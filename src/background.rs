// src/background.rs
// =============================================================================
// The -B / --background mode.
//
// Instead of downloading in this process, webgrab re-executes itself with
// the same download arguments plus the hidden --log-to-file flag, detached
// from the terminal. The child performs the download and appends its
// status lines to wget-log; the parent prints one notice and exits.
// =============================================================================

use anyhow::{Context, Result};
use std::process::{Command, Stdio};

use crate::cli::Cli;
use crate::download::LOG_FILE;

/// Spawns the detached child process and returns without waiting for it.
pub fn spawn_detached(cli: &Cli) -> Result<()> {
    let exe = std::env::current_exe().context("could not locate own executable")?;

    println!("Output will be written to ‘{}’.", LOG_FILE);

    Command::new(exe)
        .args(child_args(cli))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("error starting background download")?;

    Ok(())
}

/// Rebuilds the child's argument list from the parsed flags, swapping -B
/// for --log-to-file.
fn child_args(cli: &Cli) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(url) = &cli.url {
        args.push(url.clone());
    }
    if let Some(output) = &cli.output {
        args.push("-O".to_string());
        args.push(output.clone());
    }
    if let Some(directory) = &cli.directory {
        args.push("-P".to_string());
        args.push(directory.clone());
    }
    if let Some(rate) = &cli.rate_limit {
        args.push("--rate-limit".to_string());
        args.push(rate.clone());
    }
    if let Some(input_file) = &cli.input_file {
        args.push("-i".to_string());
        args.push(input_file.clone());
    }
    args.push("--log-to-file".to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_args_carry_download_flags() {
        let cli = Cli {
            url: Some("http://example.com/big.iso".to_string()),
            output: Some("big.iso".to_string()),
            rate_limit: Some("500k".to_string()),
            background: true,
            ..Default::default()
        };
        assert_eq!(
            child_args(&cli),
            vec![
                "http://example.com/big.iso",
                "-O",
                "big.iso",
                "--rate-limit",
                "500k",
                "--log-to-file",
            ]
        );
    }

    #[test]
    fn test_child_args_minimal() {
        let cli = Cli {
            url: Some("http://example.com/f".to_string()),
            background: true,
            ..Default::default()
        };
        assert_eq!(
            child_args(&cli),
            vec!["http://example.com/f", "--log-to-file"]
        );
    }
}
