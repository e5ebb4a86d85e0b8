// Error types for downloader backends and the dispatcher

use std::path::PathBuf;

use thiserror::Error;

use super::utils::format_gib;

/// Everything that can go wrong between picking a backend and handing back a file.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Backend binary could not be started (missing, not executable, ...)
    #[error("tool not found: {tool}: {source}")]
    ToolNotFound {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// Backend ran longer than the configured invocation timeout
    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    /// Backend exited with a non-zero status. `stderr` is already truncated.
    #[error("{tool} failed (exit code {code:?}): {stderr}")]
    ExecutionFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Backend reported success but none of the candidate files exist
    #[error("output file not found for {}", stem.display())]
    OutputNotFound { stem: PathBuf },

    /// Artifact is larger than the configured ceiling and has been deleted
    #[error("file too large: {} (limit {})", format_gib(*size), format_gib(*limit))]
    SizeExceeded {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    /// Filesystem error while validating or reading process output
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The backend itself failed: could not start, timed out, exited non-zero,
    /// or exited cleanly without leaving a file behind.
    pub fn is_invocation_failure(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound { .. }
                | Self::Timeout { .. }
                | Self::ExecutionFailed { .. }
                | Self::OutputNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_exceeded_message_uses_binary_units() {
        let err = DownloadError::SizeExceeded {
            path: PathBuf::from("/tmp/x.mp4"),
            size: 3 * 1024 * 1024 * 1024,
            limit: 2 * 1024 * 1024 * 1024,
        };
        assert_eq!(err.to_string(), "file too large: 3.00 GB (limit 2.00 GB)");
        assert!(!err.is_invocation_failure());
    }

    #[test]
    fn test_invocation_failure_grouping() {
        let failed = DownloadError::ExecutionFailed {
            tool: "yt-dlp".to_string(),
            code: Some(1),
            stderr: "ERROR: Unsupported URL".to_string(),
        };
        assert!(failed.is_invocation_failure());
        assert!(DownloadError::OutputNotFound {
            stem: PathBuf::from("downloads/a")
        }
        .is_invocation_failure());
        assert!(!DownloadError::io("a", std::io::Error::other("boom")).is_invocation_failure());
    }
}
