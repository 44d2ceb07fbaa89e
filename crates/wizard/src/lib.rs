//! Import wizard for the bizflow data migration pipeline.
//!
//! [`ImportWizard`] drives a user through five steps (entity, file,
//! mapping, preview, import), submits the job through a
//! [`JobService`](bizflow_jobservice::JobService) and tracks it with a
//! background [`monitor`] until it reaches a terminal status.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod monitor;
pub mod wizard;

pub use config::WizardConfig;
pub use error::{SubmissionStage, WizardError};
pub use lifecycle::MigrationRun;
pub use monitor::{MonitorHandle, ProgressSnapshot};
pub use wizard::{ImportWizard, WizardStep};
