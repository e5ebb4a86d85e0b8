// Common data models for downloader

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Tier used when the caller does not ask for one, and the fallback for unknown tiers.
pub const DEFAULT_QUALITY: &str = "720";

/// Last-resort expression if the table does not even contain its default tier
const BEST_FORMAT: &str = "bv*+ba/best";

/// A downloaded file that passed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Which backend handles a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// N_m3u8DL-RE, for encrypted streams
    Specialized,
    /// yt-dlp, for everything else
    General,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Specialized => write!(f, "specialized"),
            Self::General => write!(f, "general"),
        }
    }
}

/// What the host can do, probed once at startup and never refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// N_m3u8DL-RE answered `--version` with exit code 0
    pub drm_backend: bool,
}

impl Capabilities {
    pub fn new(drm_backend: bool) -> Self {
        Self { drm_backend }
    }
}

/// Maps a quality tier token ("720", "1080", "audio", ...) to a yt-dlp format expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTable {
    default_tier: String,
    formats: BTreeMap<String, String>,
}

impl QualityTable {
    pub fn new(default_tier: impl Into<String>, formats: BTreeMap<String, String>) -> Self {
        Self {
            default_tier: default_tier.into(),
            formats,
        }
    }

    pub fn default_tier(&self) -> &str {
        &self.default_tier
    }

    /// Format expression for `tier`; unknown tiers get the default tier's expression.
    ///
    /// "720p" is accepted as an alias of "720".
    pub fn resolve(&self, tier: &str) -> &str {
        let tier = tier.trim();
        let normalized = tier.strip_suffix('p').unwrap_or(tier);

        self.formats
            .get(tier)
            .or_else(|| self.formats.get(normalized))
            .or_else(|| self.formats.get(&self.default_tier))
            .map(String::as_str)
            .unwrap_or(BEST_FORMAT)
    }

    pub fn tiers(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }
}

impl Default for QualityTable {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY, default_quality_formats())
    }
}

/// Built-in tier table
pub fn default_quality_formats() -> BTreeMap<String, String> {
    let mut formats = BTreeMap::new();
    for height in [360, 480, 720, 1080] {
        formats.insert(
            height.to_string(),
            format!("bv*[height<={height}]+ba/b[height<={height}]/bv*+ba/best"),
        );
    }
    formats.insert("best".to_string(), BEST_FORMAT.to_string());
    formats.insert("audio".to_string(), "ba/b".to_string());
    formats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tier_resolves() {
        let table = QualityTable::default();
        assert_eq!(
            table.resolve("1080"),
            "bv*[height<=1080]+ba/b[height<=1080]/bv*+ba/best"
        );
        assert_eq!(table.resolve("audio"), "ba/b");
    }

    #[test]
    fn test_unknown_tier_falls_back_to_default_tier() {
        let table = QualityTable::default();
        assert_eq!(table.resolve("4320"), table.resolve(DEFAULT_QUALITY));
        assert_eq!(table.resolve(""), table.resolve(DEFAULT_QUALITY));
    }

    #[test]
    fn test_p_suffix_is_an_alias() {
        let table = QualityTable::default();
        assert_eq!(table.resolve("480p"), table.resolve("480"));
    }

    #[test]
    fn test_table_without_default_tier_uses_best() {
        let table = QualityTable::new("720", BTreeMap::new());
        assert_eq!(table.resolve("720"), BEST_FORMAT);
    }

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Specialized.to_string(), "specialized");
        assert_eq!(BackendKind::General.to_string(), "general");
    }
}
