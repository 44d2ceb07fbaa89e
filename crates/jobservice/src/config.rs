use std::time::Duration;

use crate::error::JobServiceError;

/// Connection settings for the backend Job Service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobServiceConfig {
    /// Base URL of the backend API, e.g. `https://erp.example/api`.
    pub base_url: String,
    /// Bearer token issued by the authentication store, if any.
    pub token: Option<String>,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
}

impl JobServiceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            request_timeout: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Load configuration from environment variables (and `.env`).
    ///
    /// | Env Var                    | Default    |
    /// |----------------------------|------------|
    /// | `JOB_SERVICE_URL`          | (required) |
    /// | `JOB_SERVICE_TOKEN`        | none       |
    /// | `JOB_SERVICE_TIMEOUT_SECS` | none       |
    pub fn from_env() -> Result<Self, JobServiceError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, JobServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("JOB_SERVICE_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| JobServiceError::Config("JOB_SERVICE_URL must be set".into()))?;

        let token = lookup("JOB_SERVICE_TOKEN").filter(|s| !s.trim().is_empty());

        let request_timeout = match lookup("JOB_SERVICE_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    JobServiceError::Config(format!(
                        "JOB_SERVICE_TIMEOUT_SECS must be a number of seconds, got '{raw}'"
                    ))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            base_url,
            token,
            request_timeout,
        })
    }
}
