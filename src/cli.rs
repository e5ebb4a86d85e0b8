// CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Download lecture and course videos, routing DRM-protected links to N_m3u8DL-RE.
#[derive(Parser, Debug)]
#[command(name = "media-grabber")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to <config dir>/media-grabber/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the download directory
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print links found in a text or PDF file, one JSON object per line
    Extract {
        file: PathBuf,
    },

    /// Download a single URL
    Download {
        url: String,

        /// Human readable name used for the output file
        #[arg(short, long)]
        title: Option<String>,

        /// Quality tier (360, 480, 720, 1080, best, audio)
        #[arg(long)]
        quality: Option<String>,
    },

    /// Extract links from a file and download them one after another
    Batch {
        file: PathBuf,

        /// Quality tier applied to every link
        #[arg(long)]
        quality: Option<String>,
    },

    /// Delete files in the download directory
    Cleanup {
        /// Files to keep (full path or bare file name), repeatable
        #[arg(short, long)]
        keep: Vec<PathBuf>,
    },

    /// Show whether yt-dlp and N_m3u8DL-RE are installed
    Tools,
}
