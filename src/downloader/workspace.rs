// Shared download directory housekeeping
//
// Not coordinated with in-flight downloads: run cleanup between batches.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use super::errors::DownloadError;

/// What a cleanup pass did
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, std::io::Error)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_exists(&self) -> Result<(), DownloadError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| DownloadError::io(&self.dir, e))
    }

    /// Delete every regular file directly under the directory except those in `keep`.
    ///
    /// `keep` entries match by full path, or by bare file name. Failures are
    /// logged per file and never stop the pass.
    pub fn cleanup(&self, keep: &[PathBuf]) -> CleanupReport {
        self.cleanup_with(keep, |path| std::fs::remove_file(path))
    }

    fn cleanup_with<F>(&self, keep: &[PathBuf], remove: F) -> CleanupReport
    where
        F: Fn(&Path) -> std::io::Result<()>,
    {
        let mut report = CleanupReport::default();
        let keep = KeepList::new(keep);

        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return report,
            Err(e) => {
                error!(dir = %self.dir.display(), error = %e, "cleanup error");
                report.failed.push((self.dir.clone(), e));
                return report;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    error!(dir = %self.dir.display(), error = %e, "unreadable directory entry");
                    report.failed.push((self.dir.clone(), e));
                    continue;
                }
            };
            let path = entry.path();

            if !path.is_file() || keep.contains(&path) {
                continue;
            }

            match remove(&path) {
                Ok(()) => report.removed.push(path),
                Err(e) => {
                    error!(path = %path.display(), error = %e, "error deleting file");
                    report.failed.push((path, e));
                }
            }
        }

        info!(
            removed = report.removed.len(),
            failed = report.failed.len(),
            "cleanup complete"
        );
        report
    }
}

/// Keep entries resolved once per pass
///
/// Paths are compared canonicalized, so `./downloads/a.mp4`, an absolute path
/// and `downloads/a.mp4` all name the same file. An entry that does not
/// resolve can still match by bare file name.
struct KeepList {
    paths: Vec<PathBuf>,
    names: Vec<OsString>,
}

impl KeepList {
    fn new(keep: &[PathBuf]) -> Self {
        let mut paths = Vec::new();
        let mut names = Vec::new();

        for entry in keep {
            if entry.components().count() == 1 {
                names.push(entry.as_os_str().to_os_string());
            }
            match entry.canonicalize() {
                Ok(path) => paths.push(path),
                Err(e) => debug!(path = %entry.display(), error = %e, "keep entry does not resolve"),
            }
        }

        Self { paths, names }
    }

    fn contains(&self, path: &Path) -> bool {
        if path
            .file_name()
            .is_some_and(|name| self.names.iter().any(|n| n == name))
        {
            return true;
        }
        let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.paths.contains(&resolved)
    }
}
