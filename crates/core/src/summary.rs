//! Result summary shown once a job reaches a terminal status.
//!
//! Row counters are independent: a `completed` job may still carry errors
//! and skips, and a `failed` job may have created some records.

use serde::Serialize;

use crate::job::{JobStatus, LogLevel, MigrationJob, MigrationLogEntry};

/// Summary of a finished (or still running) import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub status: JobStatus,
    pub total_rows: u64,
    pub processed_rows: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub skipped_count: u64,
    pub progress_percentage: f64,
    pub error_message: Option<String>,
    /// Error-level log entries, in row order.
    pub row_errors: Vec<MigrationLogEntry>,
    /// Warning-level log entries, in row order.
    pub row_warnings: Vec<MigrationLogEntry>,
}

impl ImportSummary {
    pub fn new(job: &MigrationJob, logs: &[MigrationLogEntry]) -> Self {
        let by_level = |level: LogLevel| {
            let mut entries: Vec<MigrationLogEntry> =
                logs.iter().filter(|e| e.level == level).cloned().collect();
            entries.sort_by_key(|e| e.row_number);
            entries
        };

        Self {
            status: job.status,
            total_rows: job.total_rows,
            processed_rows: job.processed_rows,
            success_count: job.success_count,
            error_count: job.error_count,
            skipped_count: job.skipped_count,
            progress_percentage: job.progress_percentage(),
            error_message: job.error_message.clone(),
            row_errors: by_level(LogLevel::Error),
            row_warnings: by_level(LogLevel::Warning),
        }
    }

    /// Completed with every processed row successful.
    pub fn is_clean(&self) -> bool {
        self.status == JobStatus::Completed && self.error_count == 0 && self.skipped_count == 0
    }

    /// Some rows succeeded and some did not.
    pub fn is_partial(&self) -> bool {
        self.success_count > 0 && (self.error_count > 0 || self.skipped_count > 0)
    }

    /// One-line human-readable outcome.
    pub fn headline(&self) -> String {
        let counts = format!(
            "{} imported, {} skipped, {} failed",
            self.success_count, self.skipped_count, self.error_count
        );
        match self.status {
            JobStatus::Completed => format!("Import completed: {counts}"),
            JobStatus::Failed => match &self.error_message {
                Some(msg) => format!("Import failed ({msg}): {counts}"),
                None => format!("Import failed: {counts}"),
            },
            JobStatus::Cancelled => format!("Import cancelled: {counts}"),
            JobStatus::Pending | JobStatus::Running => format!(
                "Import in progress ({:.0}%): {counts}",
                self.progress_percentage
            ),
        }
    }
}
