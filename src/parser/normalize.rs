use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::debug;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static REGION_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"^([A-Z]{2,3})\s+\d").unwrap(), // WA 1234, WWL 1234
        Regex::new(r"^([A-Z]{2,3})\d").unwrap(),    // WA1234, WWL1234
        Regex::new(r"^([A-Z]{2,3})").unwrap(),
    ]
});
static LEADING_LETTERS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]+").unwrap());

pub const UNKNOWN_REGION: &str = "UNK";

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%d.%m.%Y %H:%M:%S", "%d-%m-%Y %H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d-%m-%Y"];
const SLASHED_DATETIME: &str = "%d/%m/%Y %H:%M:%S";
const SLASHED_DATE: &str = "%d/%m/%Y";

/// Parse a date string in any of the listing's known formats.
/// Date-only inputs resolve to midnight. Returns `None` when nothing matches.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    let parsed = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| DATE_FORMATS.iter().find_map(|fmt| parse_date(text, fmt)))
        .or_else(|| NaiveDateTime::parse_from_str(text, SLASHED_DATETIME).ok())
        .or_else(|| parse_date(text, SLASHED_DATE));

    if parsed.is_none() {
        debug!("Cannot parse date: {:?}", text);
    }
    parsed
}

fn parse_date(text: &str, fmt: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(text, fmt)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Regional prefix of a plate ("WA 12345" → "WA"). Degrades to [`UNKNOWN_REGION`].
pub fn derive_region_code(plate: &str) -> String {
    let clean = WHITESPACE_RE
        .replace_all(plate.trim(), " ")
        .trim()
        .to_uppercase();

    if let Some(caps) = REGION_RES.iter().find_map(|re| re.captures(&clean)) {
        return caps[1].to_string();
    }

    match LEADING_LETTERS_RE.find(&clean) {
        Some(m) => m.as_str().chars().take(3).collect(),
        None => UNKNOWN_REGION.to_string(),
    }
}

/// Truncate to at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
