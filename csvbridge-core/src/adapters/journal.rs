//! DuckDB import journal
//!
//! Remembers which CSV lines were already submitted (by fingerprint) and
//! keeps a record of every import run.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use serde::Serialize;
use uuid::Uuid;

use crate::services::migration::{MigrationResult, MigrationService};

/// Maximum number of retries when the journal file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Counters stored when a run finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub lines: i64,
    pub submitted: i64,
    pub duplicates: i64,
    pub failed: i64,
}

/// A recorded import run
#[derive(Debug, Clone, Serialize)]
pub struct ImportRun {
    pub run_id: String,
    pub file_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stats: RunStats,
}

/// DuckDB backed journal
pub struct ImportJournal {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl ImportJournal {
    /// Open (or create) the journal and bring its schema up to date
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Self::open_with_retry(db_path)?;
        let journal = Self {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
        };
        journal.run_migrations()?;
        Ok(journal)
    }

    /// In-memory journal, nothing is persisted
    pub fn in_memory() -> Result<Self> {
        let journal = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: PathBuf::from(":memory:"),
        };
        journal.run_migrations()?;
        Ok(journal)
    }

    fn open_with_retry(db_path: &Path) -> Result<Connection> {
        let mut attempt = 0;
        loop {
            match Connection::open(db_path) {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    let err_msg = e.to_string();
                    if !is_retryable_error(&err_msg) || attempt + 1 >= MAX_RETRIES {
                        return Err(anyhow!(
                            "Failed to open journal {}: {}",
                            db_path.display(),
                            err_msg
                        ));
                    }
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                    tracing::warn!(
                        "journal busy, retrying in {}ms (attempt {}/{}): {}",
                        delay.as_millis(),
                        attempt + 1,
                        MAX_RETRIES,
                        err_msg
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Run pending schema migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Record the start of a run, returning its ID
    pub fn start_run(&self, file_name: &str) -> Result<String> {
        let run_id = Uuid::new_v4().to_string();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO import_runs (run_id, file_name, started_at) VALUES (?, ?, ?)",
            params![run_id, file_name, Utc::now().to_rfc3339()],
        )?;
        Ok(run_id)
    }

    /// Store the final counters of a run
    pub fn finish_run(&self, run_id: &str, stats: &RunStats) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE import_runs
             SET finished_at = ?, line_count = ?, submitted = ?, duplicates = ?, failed = ?
             WHERE run_id = ?",
            params![
                Utc::now().to_rfc3339(),
                stats.lines,
                stats.submitted,
                stats.duplicates,
                stats.failed,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(anyhow!("Import run not found: {}", run_id));
        }
        Ok(())
    }

    /// Whether a line with this fingerprint was submitted before
    pub fn has_line(&self, fingerprint: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM imported_lines WHERE fingerprint = ?",
            [fingerprint],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Remember a submitted line
    pub fn record_line(&self, fingerprint: &str, run_id: &str, group_id: Option<i64>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO imported_lines (fingerprint, run_id, group_id, imported_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (fingerprint) DO NOTHING",
            params![fingerprint, run_id, group_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Most recent runs first
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<ImportRun>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT run_id, file_name, started_at, finished_at,
                    line_count, submitted, duplicates, failed
             FROM import_runs
             ORDER BY started_at DESC
             LIMIT ?",
        )?;

        let runs = stmt
            .query_map([limit as i64], |row| {
                let started: String = row.get(2)?;
                let finished: Option<String> = row.get(3)?;
                Ok(ImportRun {
                    run_id: row.get(0)?,
                    file_name: row.get(1)?,
                    started_at: parse_timestamp(&started),
                    finished_at: finished.as_deref().map(parse_timestamp),
                    stats: RunStats {
                        lines: row.get(4)?,
                        submitted: row.get(5)?,
                        duplicates: row.get(6)?,
                        failed: row.get(7)?,
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    /// Delete a run and the lines it recorded, so they can be imported again
    ///
    /// Returns the number of forgotten lines.
    pub fn forget_run(&self, run_id: &str) -> Result<u64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let exists: i64 = tx.query_row(
            "SELECT COUNT(*) FROM import_runs WHERE run_id = ?",
            [run_id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(anyhow!("Import run not found: {}", run_id));
        }

        let lines = tx.execute("DELETE FROM imported_lines WHERE run_id = ?", [run_id])?;
        tx.execute("DELETE FROM import_runs WHERE run_id = ?", [run_id])?;
        tx.commit()?;
        Ok(lines as u64)
    }

    /// Path of the journal database
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run raw SQL against the journal, for tests that need to break it
    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
