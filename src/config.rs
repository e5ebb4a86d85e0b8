// Runtime configuration: JSON file, then environment overrides.
//
// Every field has a default, so an absent or partial config file is fine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::downloader::models::{default_quality_formats, QualityTable, DEFAULT_QUALITY};

const APP_DIR: &str = "media-grabber";
const CONFIG_FILE: &str = "config.json";

/// 2 GiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

pub const ENV_DOWNLOAD_DIR: &str = "MEDIA_GRABBER_DOWNLOAD_DIR";
pub const ENV_MAX_FILE_SIZE: &str = "MEDIA_GRABBER_MAX_FILE_SIZE";
pub const ENV_YTDLP: &str = "MEDIA_GRABBER_YTDLP";
pub const ENV_N_M3U8DL: &str = "MEDIA_GRABBER_N_M3U8DL";
pub const ENV_PROXY: &str = "MEDIA_GRABBER_PROXY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shared working directory for in-flight and finished downloads
    pub download_dir: PathBuf,
    /// Artifacts above this many bytes are deleted and reported as failures
    pub max_file_size: u64,
    /// Tier used when none is requested and for unknown tiers
    pub default_quality: String,
    /// Tier token -> yt-dlp format expression
    pub quality_options: BTreeMap<String, String>,
    /// Container yt-dlp merges into
    pub merge_output_format: String,
    pub ytdlp_binary: String,
    pub n_m3u8dl_binary: String,
    pub probe_timeout_secs: u64,
    /// Upper bound for one backend run; `None` waits for the process forever
    pub invoke_timeout_secs: Option<u64>,
    pub proxy: Option<String>,
    /// Added to the built-in protected platform markers
    pub extra_protected_markers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            default_quality: DEFAULT_QUALITY.to_string(),
            quality_options: default_quality_formats(),
            merge_output_format: "mp4".to_string(),
            ytdlp_binary: "yt-dlp".to_string(),
            n_m3u8dl_binary: "N_m3u8DL-RE".to_string(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            invoke_timeout_secs: None,
            proxy: None,
            extra_protected_markers: Vec::new(),
        }
    }
}

impl Config {
    /// `<config dir>/media-grabber/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load `path` (or the default location), then apply environment overrides.
    ///
    /// A missing file at the default location yields defaults; a missing file
    /// that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => {
                    debug!("no config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Apply `MEDIA_GRABBER_*` overrides. `lookup` is `std::env::var` outside tests.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DOWNLOAD_DIR) {
            self.download_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_MAX_FILE_SIZE) {
            self.max_file_size =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: ENV_MAX_FILE_SIZE,
                        value: raw.clone(),
                    })?;
        }
        if let Some(bin) = lookup(ENV_YTDLP) {
            self.ytdlp_binary = bin;
        }
        if let Some(bin) = lookup(ENV_N_M3U8DL) {
            self.n_m3u8dl_binary = bin;
        }
        if let Some(proxy) = lookup(ENV_PROXY) {
            self.proxy = Some(proxy).filter(|p| !p.trim().is_empty());
        }
        Ok(())
    }

    pub fn quality_table(&self) -> QualityTable {
        QualityTable::new(self.default_quality.clone(), self.quality_options.clone())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn invoke_timeout(&self) -> Option<Duration> {
        self.invoke_timeout_secs.map(Duration::from_secs)
    }
}
