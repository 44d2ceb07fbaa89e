//! Client-side lifecycle of one migration job.
//!
//! [`MigrationRun`] wraps the job record returned by the Job Service and
//! guards each call with the local status rules, so an operation that the
//! backend would refuse is rejected before any request is sent. Server
//! snapshots are adopted only when they move the status forward.

use bizflow_core::job::{CreateJobRequest, JobConfiguration, JobStatus, MigrationJob};
use bizflow_core::types::JobId;
use bizflow_jobservice::JobService;

use crate::error::WizardError;

/// One submitted job and what the client knows about it.
#[derive(Debug, Clone)]
pub struct MigrationRun {
    job: MigrationJob,
    configured: bool,
}

impl MigrationRun {
    /// Upload the file and create the job (`pending`).
    pub async fn create<S>(service: &S, request: CreateJobRequest) -> Result<Self, WizardError>
    where
        S: JobService + ?Sized,
    {
        let job = service.create_job(request).await?;
        tracing::info!(job_id = job.id, entity_type = %job.entity_type, "Import job created");
        Ok(Self::from_job(job))
    }

    /// Track a job created elsewhere (e.g. picked from the job list).
    pub fn from_job(job: MigrationJob) -> Self {
        Self {
            job,
            configured: false,
        }
    }

    pub fn job(&self) -> &MigrationJob {
        &self.job
    }

    pub fn id(&self) -> JobId {
        self.job.id
    }

    pub fn status(&self) -> JobStatus {
        self.job.status
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Send mapping, rules and duplicate policy. Only while `pending`.
    pub async fn configure<S>(
        &mut self,
        service: &S,
        config: &JobConfiguration,
    ) -> Result<(), WizardError>
    where
        S: JobService + ?Sized,
    {
        self.require(JobStatus::Pending, "configure")?;
        let job = service.configure_job(self.job.id, config).await?;
        self.apply_snapshot(job);
        self.configured = true;
        tracing::info!(job_id = self.job.id, "Import job configured");
        Ok(())
    }

    /// Start processing. Requires a successful [`configure`](Self::configure).
    pub async fn start<S>(&mut self, service: &S) -> Result<(), WizardError>
    where
        S: JobService + ?Sized,
    {
        self.require(JobStatus::Pending, "start")?;
        if !self.configured {
            return Err(WizardError::NotConfigured(self.job.id));
        }
        let job = service.start_job(self.job.id).await?;
        self.apply_snapshot(job);
        tracing::info!(job_id = self.job.id, status = %self.job.status, "Import job started");
        Ok(())
    }

    /// Ask the backend to stop the job. Only while `running`.
    pub async fn cancel<S>(&mut self, service: &S) -> Result<(), WizardError>
    where
        S: JobService + ?Sized,
    {
        self.require(JobStatus::Running, "cancel")?;
        let job = service.cancel_job(self.job.id).await?;
        self.apply_snapshot(job);
        tracing::info!(
            job_id = self.job.id,
            status = %self.job.status,
            "Import job cancel requested",
        );
        Ok(())
    }

    /// Re-read the job from the backend.
    pub async fn refresh<S>(&mut self, service: &S) -> Result<&MigrationJob, WizardError>
    where
        S: JobService + ?Sized,
    {
        let job = service.get_job(self.job.id).await?;
        self.apply_snapshot(job);
        Ok(&self.job)
    }

    /// Adopt a server snapshot of the job.
    ///
    /// Returns `false` (keeping the local copy) when the snapshot belongs
    /// to another job or would move the status backwards.
    pub fn apply_snapshot(&mut self, job: MigrationJob) -> bool {
        if job.id != self.job.id {
            tracing::warn!(
                job_id = self.job.id,
                other_id = job.id,
                "Ignoring snapshot of another job",
            );
            return false;
        }
        if let Err(e) = self.job.status.validate_transition(job.status) {
            tracing::warn!(job_id = self.job.id, error = %e, "Ignoring stale job snapshot");
            return false;
        }
        self.job = job;
        true
    }

    fn require(&self, status: JobStatus, action: &'static str) -> Result<(), WizardError> {
        if self.job.status == status {
            Ok(())
        } else {
            Err(WizardError::InvalidTransition {
                action,
                status: self.job.status,
            })
        }
    }
}
