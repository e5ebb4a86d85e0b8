// Downloader backend and progress sink traits

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::errors::DownloadError;

/// Trait for downloader backend implementations
#[async_trait]
pub trait DownloaderBackend: Send + Sync {
    /// Name of the backend (for logging)
    fn name(&self) -> &'static str;

    /// Download `url` next to `output_stem` and return the file that was produced.
    ///
    /// `output_stem` has no extension; the engine picks the container, so the
    /// implementation has to find out which file actually appeared.
    async fn invoke(
        &self,
        url: &str,
        output_stem: &Path,
        quality: &str,
    ) -> Result<PathBuf, DownloadError>;
}

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Somewhere to push a one-line status for the user (chat message, terminal, ...)
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn update(&self, status: &str) -> Result<(), SinkError>;
}

/// Sink that only writes to the log
pub struct LogSink;

#[async_trait]
impl ProgressSink for LogSink {
    async fn update(&self, status: &str) -> Result<(), SinkError> {
        tracing::info!(status, "progress");
        Ok(())
    }
}
