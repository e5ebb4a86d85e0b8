// Link extraction from text files and PDF documents.
//
// Produces ordered `LinkRecord`s for the caller to feed into the
// dispatcher one by one.

mod document;
mod error;
mod text;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub use document::{extract_from_document, extract_from_pages};
pub use error::ExtractionError;
pub use text::extract_from_text;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// One media reference found in a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub url: String,
    pub title: String,
}

impl LinkRecord {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }

    /// Record titled `Video_<position>`.
    pub fn untitled(url: impl Into<String>, position: usize) -> Self {
        Self::new(url, format!("Video_{position}"))
    }
}

/// Read a UTF-8 text file and extract its links.
pub fn extract_from_text_file(path: &Path) -> Result<Vec<LinkRecord>, ExtractionError> {
    let bytes = read(path)?;
    let content = String::from_utf8(bytes).map_err(|_| ExtractionError::Encoding {
        path: path.to_path_buf(),
    })?;
    Ok(extract_from_text(&content))
}

/// Read a PDF file and extract its links.
pub fn extract_from_document_file(path: &Path) -> Result<Vec<LinkRecord>, ExtractionError> {
    extract_from_document(&read(path)?)
}

/// Extract links from `path`, whatever its kind. Never fails.
///
/// PDFs are recognised by their magic bytes or a `.pdf` extension; anything
/// else is read as text. Errors are logged and yield an empty list.
pub fn load_links(path: &Path) -> Vec<LinkRecord> {
    let result = read(path).and_then(|bytes| {
        if is_pdf(path, &bytes) {
            extract_from_document(&bytes)
        } else {
            String::from_utf8(bytes)
                .map(|content| extract_from_text(&content))
                .map_err(|_| ExtractionError::Encoding {
                    path: path.to_path_buf(),
                })
        }
    });

    match result {
        Ok(links) => {
            info!(count = links.len(), path = %path.display(), "extracted links");
            links
        }
        Err(e) => {
            error!(error = %e, "error extracting links");
            Vec::new()
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    std::fs::read(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn is_pdf(path: &Path, bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
        || path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_links_from_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.txt");
        std::fs::write(&path, "Intro:https://x.test/intro.m3u8\nhttps://x.test/2.mp4\n").unwrap();

        let links = load_links(&path);
        assert_eq!(
            links,
            vec![
                LinkRecord::new("https://x.test/intro.m3u8", "Intro"),
                LinkRecord::new("https://x.test/2.mp4", "Video_2"),
            ]
        );
    }

    #[test]
    fn test_load_links_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_links(&dir.path().join("missing.txt")).is_empty());
    }

    #[test]
    fn test_load_links_broken_pdf_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("course.pdf");
        std::fs::write(&path, "https://x.test/looks-like-text.mp4").unwrap();
        assert!(load_links(&path).is_empty());
    }

    #[test]
    fn test_text_file_must_be_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, b'h']).unwrap();

        assert!(matches!(
            extract_from_text_file(&path),
            Err(ExtractionError::Encoding { .. })
        ));
        assert!(load_links(&path).is_empty());
    }

    #[test]
    fn test_pdf_sniffing() {
        assert!(is_pdf(Path::new("notes.bin"), b"%PDF-1.7\n"));
        assert!(is_pdf(Path::new("NOTES.PDF"), b""));
        assert!(!is_pdf(Path::new("notes.txt"), b"https://x.test"));
    }
}
