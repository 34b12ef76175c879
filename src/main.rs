mod crawl;
mod db;
mod error;
mod fetch;
mod pacer;
mod parser;
mod settings;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crawl::Crawler;
use db::ReportStore;
use fetch::HttpPageSource;
use pacer::Pacer;
use settings::Settings;

/// Pages crawled by the interactive trial run.
const TRIAL_PAGES: (u32, u32) = (1, 3);

#[derive(Parser, Debug)]
#[command(
    name = "plate_reports",
    about = "Crawl license plate comments from tablica-rejestracyjna.pl into SQLite"
)]
struct Cli {
    /// First page to crawl
    start: Option<u32>,
    /// Last page to crawl (default: the last listing page, or START with --debug)
    end: Option<u32>,
    /// Dump each fetched page and log a preview of its text
    #[arg(long)]
    debug: bool,
    /// SQLite database path (overrides PLATES_DB_PATH)
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(db) = &cli.db {
        settings.db_path = db.clone();
    }
    init_tracing(&settings.log_file);

    match run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Critical parser error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_file: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let file_layer = match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(file) => Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
        Err(e) => {
            eprintln!("Cannot open log file {:?}: {}", log_file, e);
            None
        }
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init();
}

async fn run(cli: Cli, settings: Settings) -> Result<()> {
    let (start, end, debug) = match resolve_range(&cli, settings.last_page)? {
        Some(range) => (range.0, range.1, cli.debug),
        None => {
            if !confirm_trial_run() {
                return Ok(());
            }
            (TRIAL_PAGES.0, TRIAL_PAGES.1, true)
        }
    };

    let store = ReportStore::open(&settings.db_path)?;
    info!("Database: {:?}", settings.db_path);
    let source = HttpPageSource::new(&settings)?;
    let pacer = Pacer::from_millis(settings.min_delay_ms, settings.max_delay_ms);

    let shutdown = Arc::new(AtomicBool::new(false));
    let mut crawler = Crawler::new(source, store, pacer).with_shutdown(Arc::clone(&shutdown));
    if debug {
        crawler = crawler.with_debug_dump(settings.debug_dump.clone());
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing current page");
            shutdown.store(true, Ordering::SeqCst);
        }
    });

    let summary = crawler.run(start, end).await;
    summary.log();
    match crawler.sink().count() {
        Ok(n) => info!("Reports in database: {}", n),
        Err(e) => warn!("Could not count stored reports: {:#}", e),
    }
    Ok(())
}

/// Page range from the command line; `None` means ask the user.
fn resolve_range(cli: &Cli, last_page: u32) -> Result<Option<(u32, u32)>> {
    let (start, end) = match (cli.start, cli.end, cli.debug) {
        (None, None, false) => return Ok(None),
        (start, end, true) => {
            let start = start.unwrap_or(1);
            (start, end.unwrap_or(start))
        }
        (Some(start), end, false) => (start, end.unwrap_or(last_page)),
        (None, Some(_), false) => bail!("An end page needs a start page"),
    };

    if start == 0 {
        bail!("Pages are numbered from 1");
    }
    if start > end {
        bail!("Start page {} is after end page {}", start, end);
    }
    Ok(Some((start, end)))
}

fn confirm_trial_run() -> bool {
    println!("Parser for tablica-rejestracyjna.pl");
    println!("Usage:");
    println!("  plate_reports <start_page> [end_page]");
    println!("  plate_reports --debug [page] [end_page]");
    println!("  plate_reports 1 {}   # full crawl", settings::DEFAULT_LAST_PAGE);
    println!();

    dialoguer::Confirm::new()
        .with_prompt(format!(
            "Run test with pages {}-{}?",
            TRIAL_PAGES.0, TRIAL_PAGES.1
        ))
        .default(false)
        .interact()
        .unwrap_or(false)
}
