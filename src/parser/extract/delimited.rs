use std::sync::LazyLock;

use regex::Regex;

use super::ExtractionStrategy;
use crate::error::ExtractError;
use crate::parser::{Page, Report};

// PLATE · DATE rest-of-line
static DELIMITED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([A-Z]{1,4}\s*\d{1,5}[A-Z]*)\s*[·•]\s*(\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2})[ \t]*([^\n]*)",
    )
    .unwrap()
});

/// Lines of the form `PLATE · YYYY-MM-DD HH:MM:SS author comment…`.
pub struct Delimited;

impl ExtractionStrategy for Delimited {
    fn name(&self) -> &'static str {
        "delimited"
    }

    fn extract(&self, page: &Page) -> Result<Vec<Report>, ExtractError> {
        Ok(DELIMITED_RE
            .captures_iter(&page.text)
            .filter_map(|caps| Report::from_parts(&caps[1], &caps[2], &caps[3]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> Vec<Report> {
        Delimited.extract(&Page::new(text.to_string())).unwrap()
    }

    #[test]
    fn one_report_per_line() {
        let reports = run(
            "WA 12345 · 2024-03-01 10:00:00 JohnDoe terrible merge\n\
             KR92CF • 2024-03-02 18:30:00 ania parked across two spots\n",
        );
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].plate, "KR92CF");
        assert_eq!(reports[1].author, "ania");
        assert_eq!(reports[1].comment, "parked across two spots");
    }

    #[test]
    fn single_letter_prefix_accepted() {
        let reports = run("W 1 · 2024-03-01 10:00:00 x y");
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].plate, "W 1");
    }

    #[test]
    fn comment_does_not_run_into_next_line() {
        let reports = run("PO 4411 · 2024-03-03 09:00:00\nnext line text");
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].author, crate::parser::ANONYMOUS);
        assert_eq!(reports[0].comment, "");
    }

    #[test]
    fn impossible_date_dropped() {
        assert!(run("WA 1 · 2024-13-45 10:00:00 someone").is_empty());
    }

    #[test]
    fn needs_the_delimiter() {
        assert!(run("WA 12345 2024-03-01 10:00:00 JohnDoe").is_empty());
    }
}
