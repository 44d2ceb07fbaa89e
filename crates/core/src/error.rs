use crate::job::JobStatus;

/// Domain errors raised by the pure import logic.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown entity type '{0}'")]
    UnknownEntity(String),

    #[error("Invalid job status transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while accepting a source file, before anything reaches
/// the Job Service.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// The file has no non-blank line at all.
    #[error("The file is empty")]
    Empty,

    /// The file could not be decoded as UTF-8 text.
    #[error("Unable to read the file: {0}")]
    Read(String),

    /// The MIME type / extension is not an accepted delimited-text format.
    #[error("Unsupported file type '{0}'")]
    UnsupportedType(String),

    /// The file exceeds the upload limit.
    #[error("File is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
}
