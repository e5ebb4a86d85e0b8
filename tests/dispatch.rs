//! Dispatcher behaviour with in-process fake backends.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use media_grabber_lib::downloader::{
    BackendKind, Capabilities, DownloadError, Downloader, DownloaderBackend, ProgressSink,
    SinkError,
};
use media_grabber_lib::Config;
use tempfile::TempDir;

#[derive(Clone, Copy)]
enum Behavior {
    /// Write `bytes` bytes to `stem + ext` and return that path
    Write { ext: &'static str, bytes: usize },
    /// Exit non-zero
    Fail,
    /// Claim success for a file that was never written
    Phantom,
}

#[derive(Debug, Clone)]
struct Call {
    url: String,
    stem: PathBuf,
    quality: String,
}

struct FakeBackend {
    name: &'static str,
    behavior: Behavior,
    delay: Duration,
    calls: Arc<Mutex<Vec<Call>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl FakeBackend {
    fn new(name: &'static str, behavior: Behavior) -> Self {
        Self {
            name,
            behavior,
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> Arc<Mutex<Vec<Call>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl DownloaderBackend for FakeBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn invoke(
        &self,
        url: &str,
        output_stem: &Path,
        quality: &str,
    ) -> Result<PathBuf, DownloadError> {
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            stem: output_stem.to_path_buf(),
            quality: quality.to_string(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut target = output_stem.as_os_str().to_os_string();
        match self.behavior {
            Behavior::Write { ext, bytes } => {
                target.push(ext);
                let target = PathBuf::from(target);
                std::fs::write(&target, vec![0u8; bytes]).unwrap();
                Ok(target)
            }
            Behavior::Fail => Err(DownloadError::ExecutionFailed {
                tool: self.name.to_string(),
                code: Some(1),
                stderr: "ERROR: simulated failure".to_string(),
            }),
            Behavior::Phantom => {
                target.push(".mp4");
                Ok(PathBuf::from(target))
            }
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn update(&self, status: &str) -> Result<(), SinkError> {
        self.messages.lock().unwrap().push(status.to_string());
        Ok(())
    }
}

struct BrokenSink;

#[async_trait]
impl ProgressSink for BrokenSink {
    async fn update(&self, _status: &str) -> Result<(), SinkError> {
        Err("message was deleted".into())
    }
}

fn config(dir: &TempDir, max_file_size: u64) -> Config {
    Config {
        download_dir: dir.path().to_path_buf(),
        max_file_size,
        ..Config::default()
    }
}

const PROTECTED_URL: &str = "https://testbook.com/course/lesson-1/master.m3u8";
const PLAIN_URL: &str = "https://example.com/watch?v=42";

struct Harness {
    downloader: Downloader,
    specialized_calls: Arc<Mutex<Vec<Call>>>,
    general_calls: Arc<Mutex<Vec<Call>>>,
}

fn harness(
    dir: &TempDir,
    drm_backend: bool,
    specialized: Behavior,
    general: Behavior,
    max_file_size: u64,
) -> Harness {
    let specialized = FakeBackend::new("fake-drm", specialized);
    let general = FakeBackend::new("fake-general", general);
    let specialized_calls = specialized.calls();
    let general_calls = general.calls();

    let downloader = Downloader::with_backends(
        &config(dir, max_file_size),
        Capabilities::new(drm_backend),
        Box::new(specialized),
        Box::new(general),
    );

    Harness {
        downloader,
        specialized_calls,
        general_calls,
    }
}

const SMALL: Behavior = Behavior::Write {
    ext: ".mp4",
    bytes: 16,
};

#[tokio::test]
async fn test_protected_url_with_drm_backend_goes_to_specialized() {
    let dir = TempDir::new().unwrap();
    let h = harness(&dir, true, SMALL, SMALL, 1024);

    assert_eq!(h.downloader.select_backend(PROTECTED_URL), BackendKind::Specialized);
    let artifact = h
        .downloader
        .download(PROTECTED_URL, Some("Lesson 1"), None, None)
        .await
        .unwrap();

    assert_eq!(h.specialized_calls.lock().unwrap().len(), 1);
    assert!(h.general_calls.lock().unwrap().is_empty());
    assert_eq!(artifact.path, dir.path().join("Lesson 1.mp4"));
    assert_eq!(artifact.size_bytes, 16);
}

#[tokio::test]
async fn test_protected_url_without_drm_backend_goes_to_general() {
    let dir = TempDir::new().unwrap();
    let h = harness(&dir, false, SMALL, SMALL, 1024);

    assert_eq!(h.downloader.select_backend(PROTECTED_URL), BackendKind::General);
    h.downloader
        .download(PROTECTED_URL, Some("Lesson 1"), None, None)
        .await
        .unwrap();

    assert!(h.specialized_calls.lock().unwrap().is_empty());
    assert_eq!(h.general_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_plain_url_with_drm_backend_goes_to_general() {
    let dir = TempDir::new().unwrap();
    let h = harness(&dir, true, SMALL, SMALL, 1024);

    assert_eq!(h.downloader.select_backend(PLAIN_URL), BackendKind::General);
    h.downloader.download(PLAIN_URL, None, None, None).await.unwrap();

    assert!(h.specialized_calls.lock().unwrap().is_empty());
    assert_eq!(h.general_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_extra_markers_from_config_route_to_specialized() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        extra_protected_markers: vec!["unacademy.com".to_string()],
        ..config(&dir, 1024)
    };
    let downloader = Downloader::with_backends(
        &config,
        Capabilities::new(true),
        Box::new(FakeBackend::new("fake-drm", SMALL)),
        Box::new(FakeBackend::new("fake-general", SMALL)),
    );

    assert_eq!(
        downloader.select_backend("https://unacademy.com/lesson/7"),
        BackendKind::Specialized
    );
}

#[tokio::test]
async fn test_failure_is_not_retried_on_other_backend() {
    let dir = TempDir::new().unwrap();
    let h = harness(&dir, true, Behavior::Fail, SMALL, 1024);

    let err = h
        .downloader
        .download(PROTECTED_URL, Some("Lesson 1"), None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::ExecutionFailed { .. }));
    assert_eq!(h.specialized_calls.lock().unwrap().len(), 1);
    assert!(h.general_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_artifact_is_deleted() {
    let dir = TempDir::new().unwrap();
    let big = Behavior::Write {
        ext: ".mkv",
        bytes: 4096,
    };
    let h = harness(&dir, false, SMALL, big, 1000);

    let err = h
        .downloader
        .download(PLAIN_URL, Some("Big One"), None, None)
        .await
        .unwrap_err();

    match err {
        DownloadError::SizeExceeded { path, size, limit } => {
            assert_eq!(size, 4096);
            assert_eq!(limit, 1000);
            assert!(!path.exists());
        }
        other => panic!("expected SizeExceeded, got {other:?}"),
    }
    assert!(!dir.path().join("Big One.mkv").exists());
}

#[tokio::test]
async fn test_artifact_at_exact_limit_is_accepted() {
    let dir = TempDir::new().unwrap();
    let exact = Behavior::Write {
        ext: ".mp4",
        bytes: 1000,
    };
    let h = harness(&dir, false, SMALL, exact, 1000);

    let artifact = h.downloader.download(PLAIN_URL, None, None, None).await.unwrap();
    assert_eq!(artifact.size_bytes, 1000);
    assert!(artifact.path.exists());
}

#[tokio::test]
async fn test_missing_output_is_output_not_found() {
    let dir = TempDir::new().unwrap();
    let h = harness(&dir, false, SMALL, Behavior::Phantom, 1024);

    let err = h.downloader.download(PLAIN_URL, None, None, None).await.unwrap_err();
    assert!(matches!(err, DownloadError::OutputNotFound { .. }));
    assert!(err.is_invocation_failure());
}

#[tokio::test]
async fn test_title_and_quality_defaults() {
    let dir = TempDir::new().unwrap();
    let h = harness(&dir, false, SMALL, SMALL, 1024);

    h.downloader.download(PLAIN_URL, None, None, None).await.unwrap();
    h.downloader
        .download(PLAIN_URL, Some(r#"Week 3: "Vectors" / Part <1>"#), Some("1080"), None)
        .await
        .unwrap();

    let calls = h.general_calls.lock().unwrap();
    assert_eq!(calls[0].stem, dir.path().join("video"));
    assert_eq!(calls[0].quality, "720");
    assert_eq!(calls[0].url, PLAIN_URL);
    assert_eq!(calls[1].stem, dir.path().join("Week 3 Vectors Part 1"));
    assert_eq!(calls[1].quality, "1080");
}

#[tokio::test]
async fn test_failure_is_reported_to_sink() {
    let dir = TempDir::new().unwrap();
    let h = harness(&dir, false, SMALL, Behavior::Fail, 1024);
    let sink = RecordingSink::default();

    let result = h
        .downloader
        .download(PLAIN_URL, None, None, Some(&sink as &dyn ProgressSink))
        .await;

    assert!(result.is_err());
    let messages = sink.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    let message = &messages[0];
    let detail = message.strip_prefix("❌ Download failed: ").unwrap();
    assert!(detail.chars().count() <= 100);
    assert!(detail.contains("simulated failure"));
}

#[tokio::test]
async fn test_success_is_not_reported_to_sink() {
    let dir = TempDir::new().unwrap();
    let h = harness(&dir, false, SMALL, SMALL, 1024);
    let sink = RecordingSink::default();

    h.downloader
        .download(PLAIN_URL, None, None, Some(&sink as &dyn ProgressSink))
        .await
        .unwrap();

    assert!(sink.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_broken_sink_does_not_mask_original_error() {
    let dir = TempDir::new().unwrap();
    let big = Behavior::Write {
        ext: ".mp4",
        bytes: 2048,
    };
    let h = harness(&dir, false, SMALL, big, 10);

    let err = h
        .downloader
        .download(PLAIN_URL, None, None, Some(&BrokenSink as &dyn ProgressSink))
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::SizeExceeded { size: 2048, .. }));
}

#[tokio::test]
async fn test_same_title_downloads_are_serialized() {
    let dir = TempDir::new().unwrap();
    let general = FakeBackend::new("fake-general", SMALL).with_delay(Duration::from_millis(50));
    let max_in_flight = Arc::clone(&general.max_in_flight);
    let downloader = Downloader::with_backends(
        &config(&dir, 1024),
        Capabilities::new(false),
        Box::new(FakeBackend::new("fake-drm", SMALL)),
        Box::new(general),
    );

    let (a, b, c) = tokio::join!(
        downloader.download(PLAIN_URL, Some("Same Title"), None, None),
        downloader.download(PLAIN_URL, Some("Same  Title"), None, None),
        downloader.download(PLAIN_URL, Some("Same Title?"), None, None),
    );

    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
}
