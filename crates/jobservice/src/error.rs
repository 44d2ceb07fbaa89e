use bizflow_core::job::JobStatus;
use bizflow_core::types::JobId;

/// Errors from the Job Service layer.
#[derive(Debug, thiserror::Error)]
pub enum JobServiceError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The Job Service returned a non-2xx status code.
    #[error("Job service error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The job does not exist (or is not visible to this user).
    #[error("Migration job {0} not found")]
    NotFound(JobId),

    /// The job's current status does not allow the operation.
    #[error("Migration job {id} is {status}: {message}")]
    InvalidState {
        id: JobId,
        status: JobStatus,
        message: String,
    },

    /// The request was rejected by server-side validation.
    #[error("Invalid request: {0}")]
    Invalid(String),

    /// Missing or malformed client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}
