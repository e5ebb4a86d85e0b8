// Errors raised while turning link sources into records.

use std::path::PathBuf;

use thiserror::Error;

/// The source could not be read or understood.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A text source that is not UTF-8.
    #[error("{} is not valid UTF-8", path.display())]
    Encoding {
        /// File that failed.
        path: PathBuf,
    },

    /// The bytes are not a PDF we can parse.
    #[error("failed to parse document: {0}")]
    Document(#[from] lopdf::Error),
}
