use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::warn;

use crate::error::StoreError;
use crate::parser::Report;

/// How much of a batch made it into the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    pub saved: usize,
    pub failed: usize,
}

/// Destination for extracted reports. Individual rows may fail without
/// failing the batch; `Err` means the batch as a whole was lost.
pub trait ReportSink {
    fn save(&mut self, reports: &[Report]) -> Result<SaveOutcome, StoreError>;
}

pub struct ReportStore {
    conn: Connection,
}

impl ReportStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {:?}", dir))?;
        }
        let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?)
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS reports (
            id            INTEGER PRIMARY KEY,
            license_plate TEXT NOT NULL CHECK(length(license_plate) > 0),
            region_code   TEXT NOT NULL,
            report_date   TEXT NOT NULL,
            comment_text  TEXT NOT NULL DEFAULT '',
            author_name   TEXT NOT NULL,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_reports_region ON reports(region_code);
        CREATE INDEX IF NOT EXISTS idx_reports_date ON reports(report_date);
        ",
    )?;
    Ok(())
}

impl ReportSink for ReportStore {
    fn save(&mut self, reports: &[Report]) -> Result<SaveOutcome, StoreError> {
        let mut outcome = SaveOutcome::default();
        if reports.is_empty() {
            return Ok(outcome);
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO reports (license_plate, region_code, report_date, comment_text, author_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for report in reports {
                let result = stmt.execute(rusqlite::params![
                    report.plate,
                    report.region_code(),
                    report.timestamp,
                    report.comment,
                    report.author,
                ]);
                match result {
                    Ok(_) => outcome.saved += 1,
                    Err(e) => {
                        warn!("Error saving report {:?}: {}", report.plate, e);
                        outcome.failed += 1;
                    }
                }
            }
        }
        tx.commit()?;
        Ok(outcome)
    }
}
