// Link lists written by hand: one link per line, optionally `Title:URL`.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::LinkRecord;

lazy_static! {
    /// `Lecture 3: Vectors:https://...` splits at the colon right before the URL
    static ref TITLED_LINE_RE: Regex =
        Regex::new(r"^(?P<title>.*?):\s*(?P<url>https?://.*)$").unwrap();
}

/// Extract links from plain text.
///
/// Blank lines and `#` comments are ignored. A line is either a bare URL
/// (`https://...`) or `Title:URL`. Lines matching neither are skipped.
/// Untitled links are named `Video_<n>`, `n` being their 1-based position
/// among the extracted records.
pub fn extract_from_text(content: &str) -> Vec<LinkRecord> {
    let mut links = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_line(line, links.len() + 1) {
            Some(record) => links.push(record),
            None => debug!(line, "skipping line without a link"),
        }
    }

    debug!(count = links.len(), "extracted links from text");
    links
}

fn parse_line(line: &str, position: usize) -> Option<LinkRecord> {
    if line.starts_with("http://") || line.starts_with("https://") {
        return Some(LinkRecord::untitled(line, position));
    }

    let caps = TITLED_LINE_RE.captures(line)?;
    let title = caps["title"].trim().trim_end_matches(':').trim_end();
    let url = caps["url"].trim();

    if title.is_empty() {
        Some(LinkRecord::untitled(url, position))
    } else {
        Some(LinkRecord::new(url, title))
    }
}
