use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use crate::config::Config;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::QualityTable;
use crate::downloader::tools::resolve_binary;
use crate::downloader::traits::DownloaderBackend;
use crate::downloader::utils::{self, find_output_file, truncate_chars};

const CONCURRENT_FRAGMENTS: u32 = 5;
const RETRIES: u32 = 10;
const FRAGMENT_RETRIES: u32 = 10;
const SOCKET_TIMEOUT_SECS: u32 = 30;
/// 10 MiB
const HTTP_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// Merge output normally lands as mp4, but yt-dlp may keep mkv/webm for some codec mixes
pub const CANDIDATE_EXTENSIONS: &[&str] = &[".mp4", ".mkv", ".webm"];

/// General purpose backend for everything yt-dlp has an extractor for
pub struct YtDlpBackend {
    ytdlp_bin: String,
    qualities: QualityTable,
    merge_output_format: String,
    proxy: Option<String>,
    timeout: Option<Duration>,
}

impl YtDlpBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            ytdlp_bin: resolve_binary(&config.ytdlp_binary),
            qualities: config.quality_table(),
            merge_output_format: config.merge_output_format.clone(),
            proxy: config.proxy.clone(),
            timeout: config.invoke_timeout(),
        }
    }

    fn build_args(&self, url: &str, output_stem: &Path, quality: &str) -> Vec<String> {
        let template = format!("{}.%(ext)s", output_stem.to_string_lossy());

        let mut args = vec![
            "-f".to_string(),
            self.qualities.resolve(quality).to_string(),
            "-o".to_string(),
            template,
            "--merge-output-format".to_string(),
            self.merge_output_format.clone(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "--concurrent-fragments".to_string(),
            CONCURRENT_FRAGMENTS.to_string(),
            "--retries".to_string(),
            RETRIES.to_string(),
            "--fragment-retries".to_string(),
            FRAGMENT_RETRIES.to_string(),
            "--socket-timeout".to_string(),
            SOCKET_TIMEOUT_SECS.to_string(),
            "--http-chunk-size".to_string(),
            HTTP_CHUNK_SIZE.to_string(),
            "--no-check-certificates".to_string(),
            "--no-allow-unplayable-formats".to_string(),
        ];

        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        // A URL starting with '-' must not be read as an option
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl DownloaderBackend for YtDlpBackend {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn invoke(
        &self,
        url: &str,
        output_stem: &Path,
        quality: &str,
    ) -> Result<PathBuf, DownloadError> {
        info!(url = %truncate_chars(url, 50), quality, "downloading with yt-dlp");

        let args = self.build_args(url, output_stem, quality);
        let output = utils::run_output_with_timeout(&self.ytdlp_bin, &args, self.timeout)
            .await
            .inspect_err(|e| error!(error = %e, "yt-dlp error"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = truncate_chars(stderr.trim(), 200);
            error!(code = ?output.status.code(), %stderr, "yt-dlp failed");
            return Err(DownloadError::ExecutionFailed {
                tool: self.name().to_string(),
                code: output.status.code(),
                stderr,
            });
        }

        match find_output_file(output_stem, CANDIDATE_EXTENSIONS) {
            Some(path) => {
                info!(path = %path.display(), "downloaded");
                Ok(path)
            }
            None => {
                error!(stem = %output_stem.display(), "output file not found");
                Err(DownloadError::OutputNotFound {
                    stem: output_stem.to_path_buf(),
                })
            }
        }
    }
}
