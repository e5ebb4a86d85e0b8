// CLI entry point for media-grabber.

use anyhow::{bail, Result};
use clap::Parser;
use media_grabber_lib::downloader::LogSink;
use media_grabber_lib::{load_links, Config, Downloader, ProgressSink, ToolManager, Workspace};
use tracing::{debug, info, warn};

mod cli;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?cli, "CLI arguments parsed");

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.download_dir {
        config.download_dir = dir;
    }

    match cli.command {
        Command::Extract { file } => {
            for link in load_links(&file) {
                println!("{}", serde_json::to_string(&link)?);
            }
        }
        Command::Download {
            url,
            title,
            quality,
        } => {
            let downloader = build_downloader(&config).await?;
            let sink: &dyn ProgressSink = &LogSink;
            let artifact = downloader
                .download(&url, title.as_deref(), quality.as_deref(), Some(sink))
                .await?;
            println!("{}", serde_json::to_string(&artifact)?);
        }
        Command::Batch { file, quality } => {
            let links = load_links(&file);
            if links.is_empty() {
                info!("No links found in input");
                return Ok(());
            }

            let downloader = build_downloader(&config).await?;
            let sink: &dyn ProgressSink = &LogSink;
            let mut completed = 0usize;
            let mut failed = 0usize;

            for (idx, link) in links.iter().enumerate() {
                info!(item = idx + 1, total = links.len(), title = %link.title, "processing link");
                match downloader
                    .download(&link.url, Some(&link.title), quality.as_deref(), Some(sink))
                    .await
                {
                    Ok(artifact) => {
                        completed += 1;
                        println!("{}", serde_json::to_string(&artifact)?);
                    }
                    // already logged by the dispatcher
                    Err(_) => failed += 1,
                }
            }

            info!(completed, failed, total = links.len(), "Batch complete");
            if completed == 0 {
                bail!("all {failed} downloads failed");
            }
        }
        Command::Cleanup { keep } => {
            let report = Workspace::new(&config.download_dir).cleanup(&keep);
            for (path, error) in &report.failed {
                warn!(path = %path.display(), %error, "could not delete");
            }
            for path in &report.removed {
                println!("{}", path.display());
            }
        }
        Command::Tools => {
            let manager = ToolManager::new(&config);
            for tool in manager.get_all_tools().await {
                println!("{}", serde_json::to_string(&tool)?);
            }
        }
    }

    Ok(())
}

/// Probe the DRM backend once and build the dispatcher around the result
async fn build_downloader(config: &Config) -> Result<Downloader> {
    Workspace::new(&config.download_dir).ensure_exists()?;
    let capabilities = ToolManager::new(config).probe_capabilities().await;
    Ok(Downloader::new(config, capabilities))
}
