use std::time::Duration;

use bizflow_core::upload::MAX_FILE_BYTES;

use crate::error::WizardError;

/// Default interval between two progress polls (2 seconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Wizard runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardConfig {
    /// How often the monitor reads job status and logs.
    pub poll_interval: Duration,
    /// Largest accepted source file.
    pub max_file_bytes: u64,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_file_bytes: MAX_FILE_BYTES,
        }
    }
}

impl WizardConfig {
    /// Load configuration from environment variables (and `.env`).
    ///
    /// | Env Var                   | Default  |
    /// |---------------------------|----------|
    /// | `IMPORT_POLL_INTERVAL_MS` | 2000     |
    /// | `IMPORT_MAX_FILE_BYTES`   | 10485760 |
    pub fn from_env() -> Result<Self, WizardError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, WizardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let poll_ms = parse_u64(&lookup, "IMPORT_POLL_INTERVAL_MS")?
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        if poll_ms == 0 {
            return Err(WizardError::Config(
                "IMPORT_POLL_INTERVAL_MS must be greater than zero".into(),
            ));
        }

        let max_file_bytes =
            parse_u64(&lookup, "IMPORT_MAX_FILE_BYTES")?.unwrap_or(defaults.max_file_bytes);

        Ok(Self {
            poll_interval: Duration::from_millis(poll_ms),
            max_file_bytes,
        })
    }
}

fn parse_u64<F>(lookup: &F, key: &str) -> Result<Option<u64>, WizardError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| {
                WizardError::Config(format!("{key} must be a positive integer, got '{raw}'"))
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config = WizardConfig::from_lookup(|_: &str| None).unwrap();
        assert_eq!(config, WizardConfig::default());
        assert_eq!(config.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn values_are_read() {
        let config = WizardConfig::from_lookup(|key: &str| match key {
            "IMPORT_POLL_INTERVAL_MS" => Some("500".into()),
            "IMPORT_MAX_FILE_BYTES" => Some("1024".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.max_file_bytes, 1024);
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert_matches!(
            WizardConfig::from_lookup(|key: &str| {
                (key == "IMPORT_POLL_INTERVAL_MS").then(|| "0".to_string())
            }),
            Err(WizardError::Config(_))
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert_matches!(
            WizardConfig::from_lookup(|_: &str| Some("lots".to_string())),
            Err(WizardError::Config(msg)) if msg.contains("lots")
        );
    }
}
