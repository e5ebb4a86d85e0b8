pub mod config;
pub mod downloader;
pub mod links;

pub use config::{Config, ConfigError};
pub use downloader::{
    BackendKind, Capabilities, CleanupReport, DownloadError, Downloader, MediaArtifact,
    ProgressSink, ToolManager, Workspace,
};
pub use links::{load_links, ExtractionError, LinkRecord};
