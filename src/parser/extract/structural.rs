use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{ExtractionStrategy, ISO_TIMESTAMP_RE};
use crate::error::ExtractError;
use crate::parser::{Page, Report};

static FRAGMENT_FILTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]{2,3}\s*\d").unwrap());
static PLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]{2,3}\s*\d{1,5}[A-Z]*").unwrap());

const FRAGMENT_SELECTOR: &str = "div, p, span";
const MAX_FRAGMENTS: usize = 50;

/// Works on the element tree: each innermost text block that mentions a plate
/// is treated as one comment.
pub struct Structural;

impl ExtractionStrategy for Structural {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn extract(&self, page: &Page) -> Result<Vec<Report>, ExtractError> {
        let selector = Selector::parse(FRAGMENT_SELECTOR).map_err(|e| ExtractError::Selector {
            selector: FRAGMENT_SELECTOR.to_string(),
            reason: e.to_string(),
        })?;
        let document = Html::parse_document(&page.markup);

        let reports = document
            .select(&selector)
            .filter(|el| mentions_plate(el) && !el.select(&selector).any(|inner| mentions_plate(&inner)))
            .take(MAX_FRAGMENTS)
            .filter_map(|el| parse_fragment(text_of(&el).trim()))
            .collect();

        Ok(reports)
    }
}

fn text_of(el: &ElementRef) -> String {
    el.text().collect()
}

fn mentions_plate(el: &ElementRef) -> bool {
    FRAGMENT_FILTER_RE.is_match(&text_of(el))
}

fn parse_fragment(text: &str) -> Option<Report> {
    let plate = PLATE_RE.find(text)?;
    let date = ISO_TIMESTAMP_RE.find(text)?;
    Report::from_parts(plate.as_str(), date.as_str(), &text[date.end()..])
}
