use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::Instant;
use tracing::{error, info, instrument, warn, Span};

use crate::db::{ReportSink, SaveOutcome};
use crate::fetch::PageSource;
use crate::pacer::Pacer;
use crate::parser::extract::Extractor;
use crate::parser::Page;

/// Progress lines are logged for the first few pages and then every Nth page.
const REPORT_EVERY: u64 = 5;
/// Pages up to this number may legitimately be empty; after it, empty pages are flagged.
const WARMUP_PAGES: u32 = 5;
const DEBUG_PREVIEW_CHARS: usize = 500;

/// Counters for one run.
#[derive(Debug, Clone)]
pub struct CrawlState {
    pub start_time: Instant,
    pub pages_processed: u64,
    pub records_saved: u64,
    pub error_count: u64,
    pub total_pages: u64,
}

impl CrawlState {
    pub fn new(total_pages: u64) -> Self {
        CrawlState {
            start_time: Instant::now(),
            pages_processed: 0,
            records_saved: 0,
            error_count: 0,
            total_pages,
        }
    }

    pub fn eta(&self) -> Option<Duration> {
        self.eta_after(self.start_time.elapsed())
    }

    /// Linear extrapolation of the time left, given the time spent so far.
    pub fn eta_after(&self, elapsed: Duration) -> Option<Duration> {
        if self.pages_processed == 0 {
            return None;
        }
        let per_page = elapsed.as_secs_f64() / self.pages_processed as f64;
        let remaining = self.total_pages.saturating_sub(self.pages_processed);
        Some(Duration::from_secs_f64(per_page * remaining as f64))
    }

    pub fn percent_done(&self) -> f64 {
        if self.total_pages == 0 {
            return 100.0;
        }
        self.pages_processed as f64 / self.total_pages as f64 * 100.0
    }

    pub fn should_report(&self) -> bool {
        self.pages_processed % REPORT_EVERY == 0 || self.pages_processed <= REPORT_EVERY
    }

    pub fn progress_line(&self) -> String {
        format!(
            "Processed: {}/{} ({:.2}%) | Records: {} | Errors: {} | ETA: {}",
            self.pages_processed,
            self.total_pages,
            self.percent_done(),
            self.records_saved,
            self.error_count,
            format_eta(self.eta()),
        )
    }
}

/// `H:MM:SS`, or "unknown" before anything has been measured.
pub fn format_eta(eta: Option<Duration>) -> String {
    eta.map_or_else(|| "unknown".to_string(), format_hms)
}

pub fn format_hms(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Final totals of a run.
#[derive(Debug, Clone)]
pub struct Summary {
    pub pages_processed: u64,
    pub records_saved: u64,
    pub error_count: u64,
    pub duration: Duration,
    pub interrupted: bool,
}

impl Summary {
    fn from_state(state: &CrawlState, interrupted: bool) -> Self {
        Summary {
            pages_processed: state.pages_processed,
            records_saved: state.records_saved,
            error_count: state.error_count,
            duration: state.start_time.elapsed(),
            interrupted,
        }
    }

    pub fn avg_per_page(&self) -> Option<Duration> {
        (self.pages_processed > 0).then(|| self.duration / self.pages_processed as u32)
    }

    pub fn log(&self) {
        if self.interrupted {
            info!("Stopped early on user request");
        }
        info!("=== PARSING SUMMARY ===");
        info!("Processed pages: {}", self.pages_processed);
        info!("Saved records: {}", self.records_saved);
        info!("Errors: {}", self.error_count);
        info!("Duration: {}", format_hms(self.duration));
        match self.avg_per_page() {
            Some(avg) => info!("Average per page: {:.2}s", avg.as_secs_f64()),
            None => info!("Average per page: n/a"),
        }
    }
}

/// Drives fetch → extract → save over a page range, one page at a time.
pub struct Crawler<S, K> {
    source: S,
    sink: K,
    pacer: Pacer,
    extractor: Arc<Extractor>,
    shutdown: Arc<AtomicBool>,
    debug_dump: Option<PathBuf>,
}

impl<S: PageSource, K: ReportSink> Crawler<S, K> {
    pub fn new(source: S, sink: K, pacer: Pacer) -> Self {
        Crawler {
            source,
            sink,
            pacer,
            extractor: Arc::new(Extractor::default()),
            shutdown: Arc::new(AtomicBool::new(false)),
            debug_dump: None,
        }
    }

    #[cfg(test)]
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Dump every fetched page to `path` and log a preview of its text.
    pub fn with_debug_dump(mut self, path: PathBuf) -> Self {
        self.debug_dump = Some(path);
        self
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Crawl `start..=end`. Never fails: per-page problems are counted and skipped.
    pub async fn run(&mut self, start: u32, end: u32) -> Summary {
        let total = u64::from(end.saturating_sub(start)) + u64::from(start <= end);
        let mut state = CrawlState::new(total);

        info!("Starting parsing of pages {}-{}", start, end);
        if self.debug_dump.is_some() {
            info!("DEBUG MODE ENABLED - will save debug info");
        }

        let pb = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }

        let mut interrupted = false;
        for page in start..=end {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("Interrupted by user");
                interrupted = true;
                break;
            }

            let saved = match self.process_page(page).await {
                Ok(outcome) => {
                    state.error_count += outcome.failed as u64;
                    if outcome.saved == 0 && page > WARMUP_PAGES {
                        warn!(page, "Page contains no data");
                    }
                    outcome.saved
                }
                Err(e) => {
                    error!(page, "Error processing page: {:#}", e);
                    state.error_count += 1;
                    0
                }
            };

            state.pages_processed += 1;
            state.records_saved += saved as u64;
            pb.inc(1);

            if state.should_report() {
                info!("{}", state.progress_line());
            }
        }

        pb.finish_and_clear();
        Summary::from_state(&state, interrupted)
    }

    #[instrument(skip(self))]
    async fn process_page(&mut self, page: u32) -> Result<SaveOutcome> {
        self.pacer.wait().await;
        let markup = self
            .source
            .fetch(page)
            .await
            .with_context(|| format!("Fetching page {} failed", page))?;

        if let Some(path) = &self.debug_dump {
            match tokio::fs::write(path, &markup).await {
                Ok(()) => info!(path = ?path, "DEBUG: Saved page content"),
                Err(e) => warn!(path = ?path, error = %e, "DEBUG: Could not write page content"),
            }
        }

        let extractor = Arc::clone(&self.extractor);
        let span = Span::current();
        let (parsed, reports) = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            let parsed = Page::new(markup);
            let reports = extractor.extract(&parsed);
            (parsed, reports)
        })
        .await
        .with_context(|| format!("Extraction crashed on page {}", page))?;

        if self.debug_dump.is_some() {
            let preview: String = parsed.text.chars().take(DEBUG_PREVIEW_CHARS).collect();
            info!(chars = parsed.text.chars().count(), "DEBUG: Page content length");
            info!("DEBUG: First {} chars: {}", DEBUG_PREVIEW_CHARS, preview);
        }

        let outcome = self
            .sink
            .save(&reports)
            .with_context(|| format!("Saving {} reports from page {} failed", reports.len(), page))?;

        info!(
            "Page {}: Found {} reports, saved {}",
            page,
            reports.len(),
            outcome.saved
        );
        Ok(outcome)
    }
}
