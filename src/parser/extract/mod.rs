pub mod delimited;
pub mod plate_scan;
pub mod structural;

use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use super::{Page, Report};
use crate::error::ExtractError;

/// `YYYY-MM-DD HH:MM:SS`, the only timestamp shape the listing prints inline.
pub(crate) static ISO_TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2}").unwrap());

/// One way of recovering reports from a page.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, page: &Page) -> Result<Vec<Report>, ExtractError>;
}

/// Ordered strategy list; the first one to produce anything wins.
pub struct Extractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Extractor::new(vec![
            Box::new(delimited::Delimited),
            Box::new(plate_scan::PlateScan),
            Box::new(structural::Structural),
        ])
    }
}

impl Extractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Extractor { strategies }
    }

    /// Runs each strategy in turn. A strategy that errors or panics counts as
    /// finding nothing, so the next one still gets the page.
    pub fn extract(&self, page: &Page) -> Vec<Report> {
        for (i, strategy) in self.strategies.iter().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| strategy.extract(page)))
                .unwrap_or_else(|payload| Err(ExtractError::from_panic(payload)));
            match outcome {
                Ok(reports) if !reports.is_empty() => {
                    info!(
                        "Strategy {} ({}) found {} reports",
                        i + 1,
                        strategy.name(),
                        reports.len()
                    );
                    return reports;
                }
                Ok(_) => info!("Strategy {} ({}) found 0 reports", i + 1, strategy.name()),
                Err(e) => warn!("Strategy {} ({}) failed: {}", i + 1, strategy.name(), e),
            }
        }
        Vec::new()
    }
}
