//! Migration job types shared by the Job Service client and the wizard.
//!
//! The backend owns the authoritative job record; these types mirror its
//! payloads with closed enums so every status and log level is handled
//! exhaustively.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::mapping::{FieldMapping, TransformationRules};
use crate::preview::FormatOptions;
use crate::types::{JobId, SourceRow, Timestamp};

// ---------------------------------------------------------------------------
// Job status
// ---------------------------------------------------------------------------

/// Status of a migration job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Return the status name as sent by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a status string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// All valid status values.
    pub const ALL: &'static [&'static str] =
        &["pending", "running", "completed", "failed", "cancelled"];

    /// Completed, failed and cancelled jobs never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether a job in this status may be observed in `next` afterwards.
    ///
    /// Statuses only move forward: `pending -> running -> terminal`, with
    /// `pending` allowed to fail or be cancelled before it starts. Seeing
    /// the same status again is always allowed.
    pub fn can_advance_to(&self, next: JobStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            Self::Pending => next != Self::Pending,
            Self::Running => next.is_terminal(),
            Self::Completed | Self::Failed | Self::Cancelled => false,
        }
    }

    /// Check a transition, returning [`CoreError::InvalidTransition`] when
    /// it would move the job backwards.
    pub fn validate_transition(&self, next: JobStatus) -> Result<(), CoreError> {
        if self.can_advance_to(next) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Local mirror of a backend migration job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationJob {
    pub id: JobId,
    #[serde(default)]
    pub name: String,
    pub entity_type: String,
    pub status: JobStatus,
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub processed_rows: u64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub error_count: u64,
    #[serde(default)]
    pub skipped_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl MigrationJob {
    /// Processed share of the file, 0-100.
    ///
    /// A terminal job with no rows reports 100.
    pub fn progress_percentage(&self) -> f64 {
        if self.total_rows == 0 {
            return if self.status.is_terminal() { 100.0 } else { 0.0 };
        }
        let pct = self.processed_rows as f64 * 100.0 / self.total_rows as f64;
        pct.clamp(0.0, 100.0)
    }

    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// ---------------------------------------------------------------------------
// Log entries
// ---------------------------------------------------------------------------

/// Severity of a row-level log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row-level entry of a job's append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationLogEntry {
    pub row_number: u64,
    pub level: LogLevel,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Duplicate handling
// ---------------------------------------------------------------------------

/// What the backend does with a row matching an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicatePolicy {
    pub skip_duplicates: bool,
    /// Only meaningful when `skip_duplicates` is set.
    pub update_existing: bool,
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        Self {
            skip_duplicates: true,
            update_existing: false,
        }
    }
}

/// Resolved action for a duplicate row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateAction {
    /// No duplicate detection: the row is created like any other.
    Create,
    /// The row is skipped and counted in `skipped_count`.
    Skip,
    /// The existing record is updated from the row.
    Update,
}

impl DuplicatePolicy {
    pub fn action(&self) -> DuplicateAction {
        match (self.skip_duplicates, self.update_existing) {
            (false, _) => DuplicateAction::Create,
            (true, false) => DuplicateAction::Skip,
            (true, true) => DuplicateAction::Update,
        }
    }
}

// ---------------------------------------------------------------------------
// Job Service request / response payloads
// ---------------------------------------------------------------------------

/// Everything needed to create a job: name, entity type and the raw file.
#[derive(Clone)]
pub struct CreateJobRequest {
    pub name: String,
    pub entity_type: String,
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
    pub options: FormatOptions,
}

impl std::fmt::Debug for CreateJobRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateJobRequest")
            .field("name", &self.name)
            .field("entity_type", &self.entity_type)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("content_len", &self.content.len())
            .field("options", &self.options)
            .finish()
    }
}

/// Finalized mapping sent before the job is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfiguration {
    pub field_mapping: FieldMapping,
    pub transformation_rules: TransformationRules,
    #[serde(flatten)]
    pub duplicate_policy: DuplicatePolicy,
}

/// Filters for listing jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

impl JobFilters {
    pub fn matches(&self, job: &MigrationJob) -> bool {
        self.status.map_or(true, |s| s == job.status)
            && self
                .entity_type
                .as_deref()
                .map_or(true, |e| e == job.entity_type)
    }
}

/// Server-side authoritative preview of a created job's file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPreview {
    pub headers: Vec<String>,
    pub sample_rows: Vec<SourceRow>,
    pub total_rows: u64,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn job(status: JobStatus, processed: u64, total: u64) -> MigrationJob {
        MigrationJob {
            id: 1,
            name: "test".into(),
            entity_type: "suppliers".into(),
            status,
            total_rows: total,
            processed_rows: processed,
            success_count: 0,
            error_count: 0,
            skipped_count: 0,
            error_message: None,
            created_at: None,
            started_at: None,
            completed_at: None,
        }
    }

    // -- JobStatus -----------------------------------------------------------

    #[test]
    fn status_round_trip() {
        for s in JobStatus::ALL {
            let status = JobStatus::from_str(s).unwrap();
            assert_eq!(status.as_str(), *s);
            assert_eq!(format!("{status}"), *s);
        }
        assert!(JobStatus::from_str("paused").is_none());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn forward_transitions_allowed() {
        assert!(JobStatus::Pending.can_advance_to(JobStatus::Running));
        assert!(JobStatus::Pending.can_advance_to(JobStatus::Failed));
        assert!(JobStatus::Running.can_advance_to(JobStatus::Completed));
        assert!(JobStatus::Running.can_advance_to(JobStatus::Cancelled));
        assert!(JobStatus::Running.can_advance_to(JobStatus::Running));
    }

    #[test]
    fn nothing_reenters_pending_or_leaves_terminal() {
        assert!(!JobStatus::Running.can_advance_to(JobStatus::Pending));
        assert!(!JobStatus::Completed.can_advance_to(JobStatus::Running));
        assert!(!JobStatus::Cancelled.can_advance_to(JobStatus::Completed));
        assert_matches!(
            JobStatus::Failed.validate_transition(JobStatus::Pending),
            Err(CoreError::InvalidTransition {
                from: JobStatus::Failed,
                to: JobStatus::Pending
            })
        );
    }

    #[test]
    fn status_deserializes_from_snake_case() {
        let s: JobStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(s, JobStatus::Cancelled);
    }

    // -- MigrationJob --------------------------------------------------------

    #[test]
    fn progress_is_clamped_share_of_rows() {
        assert_eq!(job(JobStatus::Running, 25, 100).progress_percentage(), 25.0);
        assert_eq!(job(JobStatus::Running, 150, 100).progress_percentage(), 100.0);
        assert_eq!(job(JobStatus::Pending, 0, 0).progress_percentage(), 0.0);
        assert_eq!(job(JobStatus::Completed, 0, 0).progress_percentage(), 100.0);
    }

    #[test]
    fn job_deserializes_with_missing_counters() {
        let j: MigrationJob = serde_json::from_value(serde_json::json!({
            "id": 7,
            "entity_type": "products",
            "status": "pending",
            "progress_percentage": 0,
        }))
        .unwrap();
        assert_eq!(j.id, 7);
        assert_eq!(j.total_rows, 0);
        assert!(j.error_message.is_none());
    }

    // -- DuplicatePolicy -----------------------------------------------------

    #[test]
    fn duplicate_policy_actions() {
        let p = |skip, update| DuplicatePolicy {
            skip_duplicates: skip,
            update_existing: update,
        };
        assert_eq!(p(false, false).action(), DuplicateAction::Create);
        assert_eq!(p(false, true).action(), DuplicateAction::Create);
        assert_eq!(p(true, false).action(), DuplicateAction::Skip);
        assert_eq!(p(true, true).action(), DuplicateAction::Update);
    }

    #[test]
    fn configuration_flattens_policy() {
        let config = JobConfiguration {
            field_mapping: FieldMapping::from([("Nom".to_string(), "name".to_string())]),
            transformation_rules: TransformationRules::new(),
            duplicate_policy: DuplicatePolicy::default(),
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["skip_duplicates"], true);
        assert_eq!(json["update_existing"], false);
        assert_eq!(json["field_mapping"]["Nom"], "name");
    }

    // -- JobFilters ----------------------------------------------------------

    #[test]
    fn filters_match_status_and_entity() {
        let j = job(JobStatus::Running, 0, 10);
        assert!(JobFilters::default().matches(&j));
        let by_status = JobFilters {
            status: Some(JobStatus::Completed),
            entity_type: None,
        };
        assert!(!by_status.matches(&j));
        let by_entity = JobFilters {
            status: None,
            entity_type: Some("suppliers".into()),
        };
        assert!(by_entity.matches(&j));
    }
}
