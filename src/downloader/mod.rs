// Downloader module - backend dispatch, validation and workspace housekeeping

pub mod backends;
pub mod classifier;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod tools;
pub mod traits;
pub mod utils;
pub mod workspace;

pub use classifier::{is_drm_protected, ProtectionClassifier};
pub use errors::DownloadError;
pub use models::{BackendKind, Capabilities, MediaArtifact, QualityTable, DEFAULT_QUALITY};
pub use orchestrator::Downloader;
pub use tools::{ToolInfo, ToolManager, ToolType};
pub use traits::{DownloaderBackend, LogSink, ProgressSink, SinkError};
pub use utils::sanitize_filename;
pub use workspace::{CleanupReport, Workspace};
