// Dispatcher: picks one backend per URL and validates what it produced
//
// The decision is a two-input table (DRM backend installed, URL looks protected).
// There is no fallback between backends: the chosen backend failing ends the call.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::backends::{NM3u8DlBackend, YtDlpBackend};
use super::classifier::ProtectionClassifier;
use super::errors::DownloadError;
use super::models::{BackendKind, Capabilities, MediaArtifact};
use super::traits::{DownloaderBackend, ProgressSink};
use super::utils::{format_mib, sanitize_filename, truncate_chars, DEFAULT_TITLE};
use crate::config::Config;

/// Longest error text pushed to a progress sink
const SINK_MESSAGE_CHARS: usize = 100;

pub struct Downloader {
    download_dir: PathBuf,
    max_file_size: u64,
    default_quality: String,
    capabilities: Capabilities,
    classifier: ProtectionClassifier,
    specialized: Box<dyn DownloaderBackend>,
    general: Box<dyn DownloaderBackend>,
    /// One lock per sanitized title so concurrent calls never share an output stem
    title_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Downloader {
    /// Dispatcher wired to the real N_m3u8DL-RE and yt-dlp backends
    pub fn new(config: &Config, capabilities: Capabilities) -> Self {
        Self::with_backends(
            config,
            capabilities,
            Box::new(NM3u8DlBackend::new(config)),
            Box::new(YtDlpBackend::new(config)),
        )
    }

    pub fn with_backends(
        config: &Config,
        capabilities: Capabilities,
        specialized: Box<dyn DownloaderBackend>,
        general: Box<dyn DownloaderBackend>,
    ) -> Self {
        Self {
            download_dir: config.download_dir.clone(),
            max_file_size: config.max_file_size,
            default_quality: config.default_quality.clone(),
            capabilities,
            classifier: ProtectionClassifier::new()
                .with_extra_markers(&config.extra_protected_markers),
            specialized,
            general,
            title_locks: DashMap::new(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Specialized iff the DRM backend is installed and the URL looks protected
    pub fn select_backend(&self, url: &str) -> BackendKind {
        if self.capabilities.drm_backend && self.classifier.is_protected(url) {
            BackendKind::Specialized
        } else {
            BackendKind::General
        }
    }

    /// Download `url` into the working directory under a name derived from `title`.
    ///
    /// Failures are logged and, when `progress` is given, reported to it as a
    /// short one-liner. A sink that fails to accept the message never hides the
    /// original error.
    pub async fn download(
        &self,
        url: &str,
        title: Option<&str>,
        quality: Option<&str>,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<MediaArtifact, DownloadError> {
        match self.try_download(url, title, quality).await {
            Ok(artifact) => Ok(artifact),
            Err(e) => {
                error!(url = %truncate_chars(url, 50), error = %e, "download failed");
                if let Some(sink) = progress {
                    let message = format!(
                        "❌ Download failed: {}",
                        truncate_chars(&e.to_string(), SINK_MESSAGE_CHARS)
                    );
                    if let Err(sink_err) = sink.update(&message).await {
                        warn!(error = %sink_err, "failed to report download failure");
                    }
                }
                Err(e)
            }
        }
    }

    async fn try_download(
        &self,
        url: &str,
        title: Option<&str>,
        quality: Option<&str>,
    ) -> Result<MediaArtifact, DownloadError> {
        let title = sanitize_filename(title.unwrap_or(DEFAULT_TITLE));
        let output_stem = self.download_dir.join(&title);
        let quality = quality.unwrap_or(&self.default_quality);

        let kind = self.select_backend(url);
        let backend = match kind {
            BackendKind::Specialized => {
                info!("DRM-protected link detected - using N_m3u8DL-RE");
                self.specialized.as_ref()
            }
            BackendKind::General => {
                info!("standard link - using yt-dlp");
                self.general.as_ref()
            }
        };

        let lock = self.title_lock(&title);
        let result = {
            let _guard = lock.lock().await;
            debug!(%title, backend = backend.name(), "acquired output lock");

            match backend.invoke(url, &output_stem, quality).await {
                Ok(path) => self.validate(path).await,
                Err(e) => Err(e),
            }
        };
        drop(lock);
        self.release_title_lock(&title);

        result
    }

    fn title_lock(&self, title: &str) -> Arc<Mutex<()>> {
        self.title_locks
            .entry(title.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget the lock once no other call holds or waits on it
    fn release_title_lock(&self, title: &str) {
        self.title_locks
            .remove_if(title, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn validate(&self, path: PathBuf) -> Result<MediaArtifact, DownloadError> {
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DownloadError::OutputNotFound { stem: path });
            }
            Err(e) => return Err(DownloadError::io(path, e)),
        };
        let size = metadata.len();

        if size > self.max_file_size {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "failed to delete oversized file");
            }
            return Err(DownloadError::SizeExceeded {
                path,
                size,
                limit: self.max_file_size,
            });
        }

        info!(size = %format_mib(size), path = %path.display(), "download complete");
        Ok(MediaArtifact {
            path,
            size_bytes: size,
        })
    }
}
