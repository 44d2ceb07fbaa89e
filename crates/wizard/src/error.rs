use bizflow_core::error::{CoreError, FileError};
use bizflow_core::job::JobStatus;
use bizflow_core::types::JobId;
use bizflow_jobservice::JobServiceError;
use serde::Serialize;

use crate::wizard::WizardStep;

/// Submission call that failed when the import was launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStage {
    Create,
    Configure,
    Start,
}

impl SubmissionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Configure => "configure",
            Self::Start => "start",
        }
    }
}

impl std::fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the import wizard.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    /// The picked file was rejected before reaching the Job Service.
    #[error(transparent)]
    File(#[from] FileError),

    /// `next()` was called on a step whose readiness condition fails.
    #[error("Step '{step}' is not complete: {reason}")]
    StepNotReady { step: WizardStep, reason: String },

    /// Creating, configuring or starting the job failed.
    #[error("Import could not be submitted ({stage} failed): {source}")]
    Submission {
        stage: SubmissionStage,
        #[source]
        source: JobServiceError,
    },

    /// The job's status does not allow the requested operation.
    #[error("Cannot {action} a {status} job")]
    InvalidTransition {
        action: &'static str,
        status: JobStatus,
    },

    /// `start` was requested before the job was configured.
    #[error("Migration job {0} has not been configured")]
    NotConfigured(JobId),

    #[error("No import job is active")]
    NoActiveJob,

    #[error("No entity type selected")]
    NoEntitySelected,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Service(#[from] JobServiceError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WizardError {
    /// Re-label a service failure as a submission failure at `stage`.
    pub(crate) fn at_stage(self, stage: SubmissionStage) -> Self {
        match self {
            Self::Service(source) => Self::Submission { stage, source },
            other => other,
        }
    }
}
