use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::downloader::errors::DownloadError;
use crate::downloader::tools::resolve_binary;
use crate::downloader::traits::DownloaderBackend;
use crate::downloader::utils::{self, find_output_file, truncate_chars};

const THREAD_COUNT: u32 = 16;
const DOWNLOAD_RETRY_COUNT: u32 = 10;

/// N_m3u8DL-RE picks the container after muxing, so any of these may appear
pub const CANDIDATE_EXTENSIONS: &[&str] = &[".mp4", ".mkv", ".ts"];

/// Encrypted HLS/DASH backend
pub struct NM3u8DlBackend {
    binary_path: String,
    tmp_dir: PathBuf,
    proxy: Option<String>,
    timeout: Option<Duration>,
}

impl NM3u8DlBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            binary_path: resolve_binary(&config.n_m3u8dl_binary),
            tmp_dir: config.download_dir.clone(),
            proxy: config.proxy.clone(),
            timeout: config.invoke_timeout(),
        }
    }

    fn build_args(&self, url: &str, output_stem: &Path) -> Vec<String> {
        let save_name = output_stem
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| utils::DEFAULT_TITLE.to_string());
        let save_dir = output_stem
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut args = vec![
            url.to_string(),
            "--save-name".to_string(),
            save_name,
            "--save-dir".to_string(),
            save_dir.to_string_lossy().into_owned(),
            "--tmp-dir".to_string(),
            self.tmp_dir.to_string_lossy().into_owned(),
            "--thread-count".to_string(),
            THREAD_COUNT.to_string(),
            "--download-retry-count".to_string(),
            DOWNLOAD_RETRY_COUNT.to_string(),
            "--auto-select".to_string(),
            "--check-segments-count".to_string(),
            "false".to_string(),
            "--binary-merge".to_string(),
            "--log-level".to_string(),
            "INFO".to_string(),
        ];

        if let Some(proxy) = &self.proxy {
            args.push("--custom-proxy".to_string());
            args.push(proxy.clone());
        }

        args
    }
}

#[async_trait]
impl DownloaderBackend for NM3u8DlBackend {
    fn name(&self) -> &'static str {
        "N_m3u8DL-RE"
    }

    async fn invoke(
        &self,
        url: &str,
        output_stem: &Path,
        quality: &str,
    ) -> Result<PathBuf, DownloadError> {
        info!(url = %truncate_chars(url, 50), "downloading with N_m3u8DL-RE");
        // Stream selection is left to --auto-select
        debug!(quality, "quality tier ignored by N_m3u8DL-RE");

        let args = self.build_args(url, output_stem);
        let output = utils::run_output_with_timeout(&self.binary_path, &args, self.timeout)
            .await
            .inspect_err(|e| error!(error = %e, "N_m3u8DL-RE error"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = truncate_chars(&stderr, 200);
            error!(code = ?output.status.code(), %stderr, "N_m3u8DL-RE failed");
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
                error!(stem = %output_stem.display(), "output file not found after download");
                Err(DownloadError::OutputNotFound {
                    stem: output_stem.to_path_buf(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(proxy: Option<&str>) -> NM3u8DlBackend {
        let config = Config {
            download_dir: PathBuf::from("/data/downloads"),
            proxy: proxy.map(str::to_string),
            ..Config::default()
        };
        NM3u8DlBackend::new(&config)
    }

    #[test]
    fn test_args_split_stem_into_name_and_dir() {
        let args = backend(None).build_args(
            "https://cdn.test/drm/master.m3u8",
            Path::new("/data/downloads/Lecture 1.5"),
        );

        assert_eq!(args[0], "https://cdn.test/drm/master.m3u8");
        let value_of = |flag: &str| {
            let idx = args.iter().position(|a| a == flag).unwrap();
            args[idx + 1].clone()
        };
        assert_eq!(value_of("--save-name"), "Lecture 1.5");
        assert_eq!(value_of("--save-dir"), "/data/downloads");
        assert_eq!(value_of("--tmp-dir"), "/data/downloads");
        assert_eq!(value_of("--thread-count"), "16");
        assert_eq!(value_of("--download-retry-count"), "10");
        assert_eq!(value_of("--check-segments-count"), "false");
        assert!(args.contains(&"--auto-select".to_string()));
        assert!(args.contains(&"--binary-merge".to_string()));
        assert!(!args.contains(&"--custom-proxy".to_string()));
    }

    #[test]
    fn test_args_relative_stem_uses_current_dir() {
        let args = backend(None).build_args("https://x.test/a.m3u8", Path::new("clip"));
        let idx = args.iter().position(|a| a == "--save-dir").unwrap();
        assert_eq!(args[idx + 1], ".");
    }

    #[test]
    fn test_args_include_proxy() {
        let args = backend(Some("http://127.0.0.1:8080"))
            .build_args("https://x.test/a.m3u8", Path::new("/d/a"));
        assert_eq!(&args[args.len() - 2..], ["--custom-proxy", "http://127.0.0.1:8080"]);
    }
}
