use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::downloader::models::Capabilities;
use crate::downloader::utils::{run_output_with_timeout, truncate_chars};

const COMMON_BIN_DIRS: &[&str] = &["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    NM3u8DlRe,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::NM3u8DlRe => "N_m3u8DL-RE",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: String,
    pub is_available: bool,
}

/// Finds the backend binaries and asks them for their version
pub struct ToolManager {
    ytdlp_binary: String,
    n_m3u8dl_binary: String,
    probe_timeout: Duration,
}

impl ToolManager {
    pub fn new(config: &Config) -> Self {
        Self {
            ytdlp_binary: resolve_binary(&config.ytdlp_binary),
            n_m3u8dl_binary: resolve_binary(&config.n_m3u8dl_binary),
            probe_timeout: config.probe_timeout(),
        }
    }

    pub fn binary(&self, tool_type: ToolType) -> &str {
        match tool_type {
            ToolType::YtDlp => &self.ytdlp_binary,
            ToolType::NM3u8DlRe => &self.n_m3u8dl_binary,
        }
    }

    pub async fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let version = self.get_version(tool_type).await;

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            is_available: version.is_some(),
            version,
            path: self.binary(tool_type).to_string(),
        }
    }

    pub async fn get_all_tools(&self) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ToolType::YtDlp).await,
            self.get_tool_info(ToolType::NM3u8DlRe).await,
        ]
    }

    /// `true` when `<binary> --version` exits 0 within the probe timeout
    pub async fn probe(&self, tool_type: ToolType) -> bool {
        self.get_version(tool_type).await.is_some()
    }

    /// One-shot startup probe. The result is meant to be kept for the whole process.
    pub async fn probe_capabilities(&self) -> Capabilities {
        let drm_backend = self.probe(ToolType::NM3u8DlRe).await;
        if drm_backend {
            info!("N_m3u8DL-RE is available - DRM support enabled");
        } else {
            warn!("N_m3u8DL-RE not found - using yt-dlp only");
        }
        Capabilities::new(drm_backend)
    }

    async fn get_version(&self, tool_type: ToolType) -> Option<String> {
        let binary = self.binary(tool_type);
        let args = vec!["--version".to_string()];

        match run_output_with_timeout(binary, &args, Some(self.probe_timeout)).await {
            Ok(output) if output.status.success() => {
                let out = String::from_utf8_lossy(&output.stdout);
                let version = out.lines().next().unwrap_or("").trim().to_string();
                debug!(tool = tool_type.as_str(), %version, "version probe succeeded");
                Some(version)
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(
                    tool = tool_type.as_str(),
                    code = ?output.status.code(),
                    stderr = %truncate_chars(stderr.trim(), 200),
                    "version probe exited with failure"
                );
                None
            }
            Err(e) => {
                warn!(tool = tool_type.as_str(), error = %e, "version probe failed");
                None
            }
        }
    }
}

/// Bare names are looked up in the usual install prefixes before trusting `PATH`
pub fn resolve_binary(name: &str) -> String {
    if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
        return name.to_string();
    }

    COMMON_BIN_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(name))
        .find(|candidate| candidate.is_file())
        .map(|candidate| candidate.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_paths_are_kept() {
        assert_eq!(resolve_binary("/opt/tools/yt-dlp"), "/opt/tools/yt-dlp");
        assert_eq!(resolve_binary("./bin/N_m3u8DL-RE"), "./bin/N_m3u8DL-RE");
    }

    #[test]
    fn test_unknown_bare_name_falls_back_to_path_lookup() {
        assert_eq!(
            resolve_binary("surely-not-installed-anywhere"),
            "surely-not-installed-anywhere"
        );
    }

    #[tokio::test]
    async fn test_missing_binary_probes_false() {
        let config = Config {
            n_m3u8dl_binary: "/nonexistent/N_m3u8DL-RE".to_string(),
            ytdlp_binary: "/nonexistent/yt-dlp".to_string(),
            ..Config::default()
        };
        let manager = ToolManager::new(&config);

        assert_eq!(manager.probe_capabilities().await, Capabilities::new(false));

        let tools = manager.get_all_tools().await;
        assert_eq!(tools.len(), 2);
        assert!(tools.iter().all(|t| !t.is_available && t.version.is_none()));
        assert_eq!(tools[1].name, "N_m3u8DL-RE");
    }
}
