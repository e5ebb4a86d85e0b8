// Protected platform detection
//
// Plain substring heuristics. A miss sends protected content to yt-dlp where it
// fails; a false hit sends ordinary content to N_m3u8DL-RE, which usually copes.

/// Markers checked against the lowercased URL. Not overridable, only extendable.
pub const BUILTIN_PROTECTED_MARKERS: &[&str] = &[
    "testbook.com",
    "classplusapp.com",
    "appx.com",
    "drm",
    "/drm/",
    "encrypted",
];

/// Check if URL belongs to a DRM-gated platform using the built-in markers
pub fn is_drm_protected(url: &str) -> bool {
    let lower = url.to_lowercase();
    BUILTIN_PROTECTED_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Built-in markers plus any extra ones from the config file
#[derive(Debug, Clone, Default)]
pub struct ProtectionClassifier {
    extra_markers: Vec<String>,
}

impl ProtectionClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extra_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra_markers.extend(
            markers
                .into_iter()
                .map(|m| m.as_ref().trim().to_lowercase())
                .filter(|m| !m.is_empty()),
        );
        self
    }

    pub fn is_protected(&self, url: &str) -> bool {
        if is_drm_protected(url) {
            return true;
        }
        let lower = url.to_lowercase();
        self.extra_markers.iter().any(|m| lower.contains(m.as_str()))
    }
}
