pub mod extract;
pub mod normalize;

use chrono::NaiveDateTime;
use scraper::Html;

use normalize::{derive_region_code, parse_timestamp, truncate_chars};

pub const MAX_AUTHOR_CHARS: usize = 255;
pub const MAX_COMMENT_CHARS: usize = 1000;
pub const ANONYMOUS: &str = "Anonymous";

/// One user comment about a plate, as recovered from a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub plate: String,
    pub timestamp: NaiveDateTime,
    pub author: String,
    pub comment: String,
}

impl Report {
    /// Build a report from raw matched pieces. `trailing` is the text after the
    /// timestamp: its first word is the author, the rest the comment.
    /// Returns `None` when the date does not parse.
    pub fn from_parts(plate: &str, date: &str, trailing: &str) -> Option<Report> {
        let timestamp = parse_timestamp(date)?;
        let mut words = trailing.split_whitespace();
        let author = words.next().unwrap_or(ANONYMOUS);
        let comment = words.collect::<Vec<_>>().join(" ");

        Some(Report {
            plate: plate.trim().to_string(),
            timestamp,
            author: truncate_chars(author, MAX_AUTHOR_CHARS),
            comment: truncate_chars(&comment, MAX_COMMENT_CHARS),
        })
    }

    pub fn region_code(&self) -> String {
        derive_region_code(&self.plate)
    }
}

/// A fetched page: the raw markup plus its flattened text.
pub struct Page {
    pub markup: String,
    pub text: String,
}

impl Page {
    pub fn new(markup: String) -> Self {
        let text = Html::parse_document(&markup)
            .root_element()
            .text()
            .collect::<String>();
        Page { markup, text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_splits_author_and_comment() {
        let r = Report::from_parts(" WA 12345 ", "2024-03-01 10:00:00", "JohnDoe  terrible   merge ")
            .unwrap();
        assert_eq!(r.plate, "WA 12345");
        assert_eq!(r.author, "JohnDoe");
        assert_eq!(r.comment, "terrible merge");
        assert_eq!(r.region_code(), "WA");
    }

    #[test]
    fn report_defaults_when_trailing_text_missing() {
        let r = Report::from_parts("KR 1", "01.02.2023", "   ").unwrap();
        assert_eq!(r.author, ANONYMOUS);
        assert_eq!(r.comment, "");

        let r = Report::from_parts("KR 1", "01.02.2023", "solo").unwrap();
        assert_eq!(r.author, "solo");
        assert_eq!(r.comment, "");
    }

    #[test]
    fn report_dropped_without_date() {
        assert!(Report::from_parts("WA 1", "not a date", "x y").is_none());
    }

    #[test]
    fn report_truncates_long_fields() {
        let author = "a".repeat(300);
        let comment = "b ".repeat(800);
        let r = Report::from_parts("WA 1", "2024-01-01", &format!("{author} {comment}")).unwrap();
        assert_eq!(r.author.chars().count(), MAX_AUTHOR_CHARS);
        assert_eq!(r.comment.chars().count(), MAX_COMMENT_CHARS);
    }

    #[test]
    fn page_flattens_markup() {
        let page = Page::new("<div><b>WA 1</b> &middot; text</div>".to_string());
        assert!(page.text.contains("WA 1 · text"));

        let plain = Page::new("WA 12345 · 2024-03-01 10:00:00 JohnDoe".to_string());
        assert_eq!(plain.text, "WA 12345 · 2024-03-01 10:00:00 JohnDoe");
    }
}
