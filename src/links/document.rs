// Links embedded in PDF documents.

use lazy_static::lazy_static;
use lopdf::Document;
use regex::Regex;
use tracing::{debug, warn};

use super::{ExtractionError, LinkRecord};

lazy_static! {
    static ref URL_RE: Regex = Regex::new(r"https?://\S+").unwrap();
}

/// Scan already extracted page texts, in the order given.
///
/// Titles are `PDF_Page<page>_Video_<n>` where `n` counts across all pages.
pub fn extract_from_pages<I, S>(pages: I) -> Vec<LinkRecord>
where
    I: IntoIterator<Item = (u32, S)>,
    S: AsRef<str>,
{
    let mut links = Vec::new();

    for (page_number, text) in pages {
        for found in URL_RE.find_iter(text.as_ref()) {
            let title = format!("PDF_Page{}_Video_{}", page_number, links.len() + 1);
            links.push(LinkRecord::new(found.as_str().trim(), title));
        }
    }

    links
}

/// Parse PDF bytes and extract every link, page by page.
///
/// A page whose text cannot be decoded is skipped with a warning; a document
/// that cannot be parsed at all is an error.
pub fn extract_from_document(bytes: &[u8]) -> Result<Vec<LinkRecord>, ExtractionError> {
    let document = Document::load_mem(bytes)?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().into_keys() {
        match document.extract_text(&[page_number]) {
            Ok(text) => pages.push((page_number, text)),
            Err(e) => warn!(page = page_number, error = %e, "could not extract page text"),
        }
    }

    let links = extract_from_pages(pages);
    debug!(count = links.len(), "extracted links from document");
    Ok(links)
}
