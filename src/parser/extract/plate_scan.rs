use std::sync::LazyLock;

use regex::Regex;

use super::{ExtractionStrategy, ISO_TIMESTAMP_RE};
use crate::error::ExtractError;
use crate::parser::{Page, Report};

static PLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]{2,3}\s*\d{1,5}[A-Z]*").unwrap());

/// How far past a plate to look for its timestamp, in characters.
const DATE_WINDOW: usize = 200;
/// Upper bound on a comment body when no newline ends it, in characters.
const COMMENT_WINDOW: usize = 500;

/// Finds every plate-like token and pairs it with the next nearby timestamp.
pub struct PlateScan;

impl ExtractionStrategy for PlateScan {
    fn name(&self) -> &'static str {
        "plate-scan"
    }

    fn extract(&self, page: &Page) -> Result<Vec<Report>, ExtractError> {
        let text = page.text.as_str();
        let mut reports = Vec::new();

        for plate in PLATE_RE.find_iter(text) {
            let window_start = plate.end();
            let window = &text[window_start..advance(text, window_start, DATE_WINDOW)];
            let Some(date) = ISO_TIMESTAMP_RE.find(window) else {
                continue;
            };

            let body_start = window_start + date.end();
            let body_cap = advance(text, body_start, COMMENT_WINDOW);
            let body_end = text[body_start..body_cap]
                .find('\n')
                .map_or(body_cap, |nl| body_start + nl);

            if let Some(report) =
                Report::from_parts(plate.as_str(), date.as_str(), &text[body_start..body_end])
            {
                reports.push(report);
            }
        }

        Ok(reports)
    }
}

/// Byte offset `chars` characters past `from`, clamped to the end of `text`.
fn advance(text: &str, from: usize, chars: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(i, _)| from + i)
}
