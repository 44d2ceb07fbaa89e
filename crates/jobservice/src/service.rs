//! The Job Service contract consumed by the import wizard.

use async_trait::async_trait;
use bizflow_core::job::{
    CreateJobRequest, JobConfiguration, JobFilters, MigrationJob, MigrationLogEntry,
    ServerPreview,
};
use bizflow_core::types::JobId;

use crate::error::JobServiceError;

/// Backend operations the import pipeline relies on.
///
/// The backend owns every job: it parses the full file, validates and
/// creates/updates each row, and maintains the counters and the log. The
/// client only submits configuration and observes.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Upload the source file and create a job in `pending`.
    async fn create_job(&self, request: CreateJobRequest) -> Result<MigrationJob, JobServiceError>;

    /// Authoritative preview parsed by the backend from the full file.
    async fn preview_job(&self, id: JobId) -> Result<ServerPreview, JobServiceError>;

    /// Store the finalized mapping, rules and duplicate policy.
    async fn configure_job(
        &self,
        id: JobId,
        config: &JobConfiguration,
    ) -> Result<MigrationJob, JobServiceError>;

    /// Hand the job to the backend processing loop (`running`).
    async fn start_job(&self, id: JobId) -> Result<MigrationJob, JobServiceError>;

    /// Ask the backend to stop a running job (`cancelled`).
    async fn cancel_job(&self, id: JobId) -> Result<MigrationJob, JobServiceError>;

    async fn get_job(&self, id: JobId) -> Result<MigrationJob, JobServiceError>;

    /// Full row-level log of the job, oldest first.
    async fn get_job_logs(&self, id: JobId) -> Result<Vec<MigrationLogEntry>, JobServiceError>;

    async fn list_jobs(&self, filters: &JobFilters) -> Result<Vec<MigrationJob>, JobServiceError>;

    /// Server-generated CSV of the existing records of an entity type,
    /// suitable for editing and re-importing.
    async fn export_entities(&self, entity_type: &str) -> Result<Vec<u8>, JobServiceError>;
}
