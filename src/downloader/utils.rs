// Helper functions for backend implementations

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::errors::DownloadError;

/// Longest file stem we will hand to a backend.
pub const MAX_TITLE_CHARS: usize = 200;

/// Fallback stem when a title sanitizes to nothing.
pub const DEFAULT_TITLE: &str = "video";

const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Run command with an optional timeout, capturing stdout and stderr.
///
/// The child is killed if the timeout fires or if the returned future is dropped.
pub async fn run_output_with_timeout(
    program: &str,
    args: &[String],
    limit: Option<Duration>,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| DownloadError::ToolNotFound {
            tool: program.to_string(),
            source,
        })?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        DownloadError::io(program, std::io::Error::other("failed to capture stdout"))
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        DownloadError::io(program, std::io::Error::other("failed to capture stderr"))
    })?;

    let stdout_task: JoinHandle<std::io::Result<Vec<u8>>> = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await?;
        Ok(buf)
    });
    let stderr_task: JoinHandle<std::io::Result<Vec<u8>>> = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await?;
        Ok(buf)
    });

    let waited = match limit {
        Some(limit) => match timeout(limit, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                let _ = child.kill().await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(DownloadError::Timeout {
                    tool: program.to_string(),
                    secs: limit.as_secs(),
                });
            }
        },
        None => child.wait().await,
    };

    let status = waited.map_err(|e| DownloadError::io(program, e))?;
    let stdout = collect_pipe(stdout_task, program).await?;
    let stderr = collect_pipe(stderr_task, program).await?;

    Ok(std::process::Output {
        status,
        stdout,
        stderr,
    })
}

async fn collect_pipe(
    task: JoinHandle<std::io::Result<Vec<u8>>>,
    program: &str,
) -> Result<Vec<u8>, DownloadError> {
    match task.await {
        Ok(Ok(buf)) => Ok(buf),
        Ok(Err(e)) => Err(DownloadError::io(program, e)),
        Err(e) => Err(DownloadError::io(program, std::io::Error::other(e))),
    }
}

/// Make a title safe to use as a file stem.
///
/// Drops characters Windows and POSIX reject in file names, collapses runs of
/// whitespace, caps the length at [`MAX_TITLE_CHARS`] characters and falls
/// back to [`DEFAULT_TITLE`] when nothing usable is left.
pub fn sanitize_filename(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| !INVALID_FILENAME_CHARS.contains(c))
        .filter(|c| c.is_whitespace() || !c.is_control())
        .collect();

    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed.chars().take(MAX_TITLE_CHARS).collect();
    let capped = capped.trim_end();

    // "." and ".." would resolve outside the download directory
    if capped.is_empty() || capped.chars().all(|c| c == '.') {
        return DEFAULT_TITLE.to_string();
    }
    capped.to_string()
}

/// `downloads/Lecture 1.5` + `.mp4` -> `downloads/Lecture 1.5.mp4`
///
/// Unlike `Path::with_extension` this never eats a dotted suffix of the title.
pub fn append_extension(stem: &Path, ext: &str) -> PathBuf {
    let mut raw = stem.as_os_str().to_os_string();
    raw.push(ext);
    PathBuf::from(raw)
}

/// Return the first `stem + ext` that exists as a regular file.
pub fn find_output_file(stem: &Path, candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|ext| append_extension(stem, ext))
        .find(|path| path.is_file())
}

/// Keep at most `max` characters, never splitting a UTF-8 sequence.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub fn format_mib(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MIB)
}

pub fn format_gib(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / BYTES_PER_GIB)
}
