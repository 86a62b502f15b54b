// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Validate flag combinations (configuration errors abort before any I/O)
// 3. Dispatch to the right mode:
//      -B              spawn a detached child logging to wget-log
//      --mirror        recursive site mirroring
//      -i file         concurrent batch download
//      (default)       single sequential download with progress
// 4. Exit with 0 on success, 1 on any error
// =============================================================================

mod background;
mod cli;
mod download;
mod mirror;

use anyhow::Result;
use clap::Parser;

use cli::Cli;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };
    std::process::exit(exit_code);
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.validate()?;

    if cli.background {
        return background::spawn_detached(&cli);
    }

    if cli.mirror {
        // validate() guarantees the URL is present in mirror mode
        let url = cli.url.as_deref().unwrap_or_default();
        let options = mirror::MirrorOptions {
            convert_links: cli.convert_links,
            reject: cli.reject.clone(),
            exclude: cli.exclude.clone(),
            root: None,
        };
        return mirror::run(url, options).await;
    }

    let limit = cli.rate_limit();

    if let Some(input_file) = &cli.input_file {
        return download::download_all(input_file, cli.directory.as_deref(), limit.as_ref()).await;
    }

    let url = cli.url.as_deref().unwrap_or_default();
    let mut report = if cli.log_to_file {
        download::Report::wget_log()?
    } else {
        download::Report::stdout()
    };

    match download::download(
        url,
        cli.output.as_deref(),
        cli.directory.as_deref(),
        limit.as_ref(),
        &mut report,
    )
    .await
    {
        Ok(()) => Ok(()),
        Err(e) => {
            // the background child has no terminal; leave the reason in the log
            if cli.log_to_file {
                report.line(&format!("Error: {}", e));
            }
            Err(e)
        }
    }
}
