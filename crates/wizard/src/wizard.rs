//! The five-step import wizard.
//!
//! ```text
//! EntitySelection -> FileSelection -> Mapping -> Preview -> Import
//! ```
//!
//! Each step has a readiness condition checked by [`ImportWizard::next`].
//! Leaving the preview step submits the job (create, configure, start) and
//! starts a progress monitor; the import step is final.

use std::path::Path;
use std::sync::Arc;

use bizflow_core::error::FileError;
use bizflow_core::job::{
    CreateJobRequest, DuplicatePolicy, JobConfiguration, JobStatus, MigrationJob,
    MigrationLogEntry,
};
use bizflow_core::mapping::{MappingEditor, MappingValidation, TransformationKind};
use bizflow_core::preview::{detect_delimiter, parse_preview, FormatOptions, PreviewResult};
use bizflow_core::profile::{find_profile, EntityImportProfile, ProfileField};
use bizflow_core::suggestion::suggest;
use bizflow_core::summary::ImportSummary;
use bizflow_core::template::{field_template, template_file_name};
use bizflow_core::types::DestinationRecord;
use bizflow_core::upload::{check_upload, FileUpload};
use bizflow_jobservice::JobService;
use serde::Serialize;

use crate::config::WizardConfig;
use crate::error::{SubmissionStage, WizardError};
use crate::lifecycle::MigrationRun;
use crate::monitor::{self, MonitorHandle, ProgressSnapshot};

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// The five wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    EntitySelection,
    FileSelection,
    Mapping,
    Preview,
    Import,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        Self::EntitySelection,
        Self::FileSelection,
        Self::Mapping,
        Self::Preview,
        Self::Import,
    ];

    /// 0-based position of the step.
    pub fn index(self) -> usize {
        match self {
            Self::EntitySelection => 0,
            Self::FileSelection => 1,
            Self::Mapping => 2,
            Self::Preview => 3,
            Self::Import => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Human-readable label for the step.
    pub fn label(self) -> &'static str {
        match self {
            Self::EntitySelection => "Entity selection",
            Self::FileSelection => "File selection",
            Self::Mapping => "Field mapping",
            Self::Preview => "Preview",
            Self::Import => "Import",
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Wizard
// ---------------------------------------------------------------------------

/// State of one import session.
pub struct ImportWizard<S: JobService + ?Sized + 'static> {
    service: Arc<S>,
    config: WizardConfig,
    step: WizardStep,
    profile: Option<&'static EntityImportProfile>,
    file: Option<FileUpload>,
    format: FormatOptions,
    /// Set once the user picks a delimiter; disables detection.
    delimiter_chosen: bool,
    job_name: String,
    preview: Option<PreviewResult>,
    editor: MappingEditor,
    duplicate_policy: DuplicatePolicy,
    run: Option<MigrationRun>,
    logs: Vec<MigrationLogEntry>,
    monitor: Option<MonitorHandle>,
    banner: Option<String>,
}

impl<S: JobService + ?Sized + 'static> ImportWizard<S> {
    pub fn new(service: Arc<S>, config: WizardConfig) -> Self {
        Self {
            service,
            config,
            step: WizardStep::EntitySelection,
            profile: None,
            file: None,
            format: FormatOptions::default(),
            delimiter_chosen: false,
            job_name: String::new(),
            preview: None,
            editor: MappingEditor::new(),
            duplicate_policy: DuplicatePolicy::default(),
            run: None,
            logs: Vec::new(),
            monitor: None,
            banner: None,
        }
    }

    // ---- accessors ----

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    pub fn profile(&self) -> Option<&'static EntityImportProfile> {
        self.profile
    }

    pub fn file(&self) -> Option<&FileUpload> {
        self.file.as_ref()
    }

    pub fn format_options(&self) -> FormatOptions {
        self.format
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn preview(&self) -> Option<&PreviewResult> {
        self.preview.as_ref()
    }

    pub fn editor(&self) -> &MappingEditor {
        &self.editor
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    /// The submitted job, as last observed.
    pub fn job(&self) -> Option<&MigrationJob> {
        self.run.as_ref().map(MigrationRun::job)
    }

    pub fn logs(&self) -> &[MigrationLogEntry] {
        &self.logs
    }

    /// Message of the last failed submission, until dismissed.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn is_import_running(&self) -> bool {
        self.job().is_some_and(MigrationJob::is_running)
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.as_ref().is_some_and(|m| !m.is_finished())
    }

    // ---- step 0: entity ----

    /// Choose the entity type to import. Choosing a different type drops
    /// the file, preview and mapping.
    pub fn select_entity(&mut self, entity_key: &str) -> Result<(), WizardError> {
        self.ensure_idle("change the entity of")?;
        let profile = find_profile(entity_key)?;
        if self.profile.map(|p| p.entity_key) != Some(profile.entity_key) {
            self.clear_file_state();
            self.profile = Some(profile);
            tracing::debug!(entity_type = profile.entity_key, "Import entity selected");
        }
        Ok(())
    }

    /// Field template CSV for the selected entity: `(file_name, bytes)`.
    pub fn field_template(&self) -> Result<(String, Vec<u8>), WizardError> {
        let profile = self.profile.ok_or(WizardError::NoEntitySelected)?;
        let bytes = field_template(profile, self.format.delimiter)?;
        Ok((template_file_name(profile), bytes))
    }

    /// Current records of the selected entity as CSV, for round-trip editing.
    pub async fn export_existing(&self) -> Result<Vec<u8>, WizardError> {
        let profile = self.profile.ok_or(WizardError::NoEntitySelected)?;
        Ok(self.service.export_entities(profile.entity_key).await?)
    }

    // ---- step 1: file ----

    /// Accept a picked file: check it, build the preview and suggest a
    /// mapping. The delimiter is detected unless one was set with
    /// [`set_format_options`](Self::set_format_options). A rejected file
    /// leaves the previous file state untouched.
    pub fn select_file(&mut self, upload: FileUpload) -> Result<(), WizardError> {
        self.ensure_idle("replace the file of")?;
        let profile = self.profile.ok_or(WizardError::NoEntitySelected)?;
        check_upload(&upload, self.config.max_file_bytes)?;

        let format = if self.delimiter_chosen {
            self.format
        } else {
            FormatOptions {
                delimiter: detect_delimiter(&upload.content),
                has_header: self.format.has_header,
            }
        };
        let preview = parse_preview(&upload.content, format)?;
        let mapping = suggest(&preview.headers, profile);

        tracing::info!(
            entity_type = profile.entity_key,
            file_name = %upload.file_name,
            columns = preview.headers.len(),
            rows = preview.total_row_count,
            suggested = mapping.len(),
            "Import file accepted",
        );

        if self.job_name.trim().is_empty() {
            self.job_name = format!("{} import ({})", profile.label, upload.file_name);
        }
        self.format = format;
        self.editor = MappingEditor::from_mapping(mapping);
        self.preview = Some(preview);
        self.file = Some(upload);
        self.run = None;
        Ok(())
    }

    /// Read a file from disk and accept it.
    pub async fn select_file_path(&mut self, path: impl AsRef<Path>) -> Result<(), WizardError> {
        let path = path.as_ref();
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| FileError::Read(format!("{}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        self.select_file(FileUpload::new(file_name, content))
    }

    /// Change delimiter or header mode. The preview is rebuilt and the
    /// mapping re-suggested from the new headers.
    pub fn set_format_options(&mut self, options: FormatOptions) -> Result<(), WizardError> {
        self.ensure_idle("reformat the file of")?;
        if let (Some(profile), Some(file)) = (self.profile, self.file.as_ref()) {
            let preview = parse_preview(&file.content, options)?;
            self.editor = MappingEditor::from_mapping(suggest(&preview.headers, profile));
            self.preview = Some(preview);
            self.run = None;
        }
        self.format = options;
        self.delimiter_chosen = true;
        Ok(())
    }

    pub fn set_job_name(&mut self, name: impl Into<String>) {
        self.job_name = name.into();
    }

    // ---- step 2: mapping ----

    pub fn set_mapping(&mut self, source: &str, destination: Option<&str>) {
        self.editor.set_mapping(source, destination);
    }

    pub fn set_transformation(&mut self, source: &str, kind: Option<TransformationKind>) {
        self.editor.set_transformation(source, kind);
    }

    pub fn set_duplicate_policy(&mut self, policy: DuplicatePolicy) {
        self.duplicate_policy = policy;
    }

    /// Restore the suggested mapping for the current preview.
    pub fn resuggest(&mut self) {
        if let (Some(profile), Some(preview)) = (self.profile, self.preview.as_ref()) {
            self.editor = MappingEditor::from_mapping(suggest(&preview.headers, profile));
        }
    }

    pub fn mapping_validation(&self) -> Option<MappingValidation> {
        self.profile.map(|p| self.editor.validate(p))
    }

    /// Destination fields selectable for `source`.
    pub fn available_destinations(&self, source: &str) -> Vec<&'static ProfileField> {
        match self.profile {
            Some(profile) => self.editor.available_destinations(source, profile),
            None => Vec::new(),
        }
    }

    // ---- step 3: preview ----

    /// Preview rows as they will be sent, after mapping and transformations.
    pub fn mapped_preview(&self) -> Vec<DestinationRecord> {
        self.preview
            .as_ref()
            .map(|p| p.rows.iter().map(|row| self.editor.apply_to_row(row)).collect())
            .unwrap_or_default()
    }

    // ---- navigation ----

    /// Whether `step`'s readiness condition holds.
    pub fn is_step_ready(&self, step: WizardStep) -> bool {
        self.readiness(step).is_ok()
    }

    pub fn can_go_next(&self) -> bool {
        self.is_step_ready(self.step)
    }

    /// Advance one step. From the preview step this submits the import.
    ///
    /// On any error the step is unchanged; a submission error is also kept
    /// as the banner message.
    pub async fn next(&mut self) -> Result<WizardStep, WizardError> {
        if let Err(reason) = self.readiness(self.step) {
            return Err(WizardError::StepNotReady {
                step: self.step,
                reason,
            });
        }

        if self.step == WizardStep::Preview {
            match self.submit().await {
                Ok(()) => self.banner = None,
                Err(e) => {
                    tracing::error!(error = %e, "Import submission failed");
                    self.banner = Some(e.to_string());
                    return Err(e);
                }
            }
        }

        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    /// Go back one step. No side effects; refused while the import runs.
    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_idle("go back from")?;
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        Ok(self.step)
    }

    /// Return to an empty wizard. Polling stops; the server job, if any,
    /// keeps running.
    pub fn reset(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
        self.step = WizardStep::EntitySelection;
        self.profile = None;
        self.clear_file_state();
        self.format = FormatOptions::default();
        self.delimiter_chosen = false;
        self.job_name.clear();
        self.duplicate_policy = DuplicatePolicy::default();
        self.banner = None;
        tracing::debug!("Import wizard reset");
    }

    // ---- import ----

    /// Pull the latest monitor snapshot into the wizard.
    pub fn refresh(&mut self) -> Option<&MigrationJob> {
        if let (Some(monitor), Some(run)) = (self.monitor.as_ref(), self.run.as_mut()) {
            let snapshot = monitor.snapshot();
            if snapshot.job.id == run.id() {
                run.apply_snapshot(snapshot.job);
                if snapshot.polls > 0 {
                    self.logs = snapshot.logs;
                }
            }
        }
        self.job()
    }

    /// Ask the server to cancel the running import. Polling stops once the
    /// job reports a terminal status; a job still `running` after the
    /// request stays monitored.
    pub async fn cancel_import(&mut self) -> Result<(), WizardError> {
        self.refresh();
        let service = Arc::clone(&self.service);
        let run = self.run.as_mut().ok_or(WizardError::NoActiveJob)?;
        run.cancel(&*service).await?;

        let job_id = run.id();
        if !run.job().is_terminal() {
            let snapshot = ProgressSnapshot::new(run.job().clone());
            if !self.is_monitoring() {
                self.monitor = Some(monitor::spawn(service, snapshot, self.config.poll_interval));
            }
            tracing::info!(job_id, "Cancel pending, still monitoring");
            return Ok(());
        }

        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
        match service.get_job_logs(job_id).await {
            Ok(logs) => self.logs = logs,
            Err(e) => tracing::warn!(job_id, error = %e, "Failed to read job log"),
        }
        Ok(())
    }

    /// Wait until the monitor sees a terminal status and return the summary.
    pub async fn wait_for_completion(&mut self) -> Result<ImportSummary, WizardError> {
        if let Some(monitor) = self.monitor.as_mut() {
            monitor.finished().await;
        }
        self.refresh();
        self.summary().ok_or(WizardError::NoActiveJob)
    }

    /// Result summary, once the job is terminal.
    pub fn summary(&self) -> Option<ImportSummary> {
        self.job()
            .filter(|job| job.is_terminal())
            .map(|job| ImportSummary::new(job, &self.logs))
    }

    // ---- private helpers ----

    fn readiness(&self, step: WizardStep) -> Result<(), String> {
        match step {
            WizardStep::EntitySelection => match self.profile {
                Some(_) => Ok(()),
                None => Err("select an entity type".into()),
            },
            WizardStep::FileSelection => {
                if self.file.is_none() || self.preview.is_none() {
                    Err("select a file to import".into())
                } else if self.job_name.trim().is_empty() {
                    Err("enter a name for the import".into())
                } else {
                    Ok(())
                }
            }
            WizardStep::Mapping => {
                let validation = self
                    .mapping_validation()
                    .ok_or_else(|| "select an entity type".to_string())?;
                let missing: Vec<&str> = validation.missing_required().collect();
                if !missing.is_empty() {
                    return Err(format!("map the required field(s): {}", missing.join(", ")));
                }
                if !validation.duplicate_destinations.is_empty() {
                    return Err(format!(
                        "field(s) mapped more than once: {}",
                        validation.duplicate_destinations.join(", ")
                    ));
                }
                Ok(())
            }
            WizardStep::Preview => Ok(()),
            WizardStep::Import => Err("the import is the last step".into()),
        }
    }

    fn ensure_idle(&mut self, action: &'static str) -> Result<(), WizardError> {
        self.refresh();
        if self.is_import_running() {
            return Err(WizardError::InvalidTransition {
                action,
                status: JobStatus::Running,
            });
        }
        Ok(())
    }

    fn clear_file_state(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
        self.file = None;
        self.preview = None;
        self.editor.clear();
        self.run = None;
        self.logs.clear();
    }

    fn build_request(&self) -> Result<CreateJobRequest, WizardError> {
        let profile = self.profile.ok_or(WizardError::NoEntitySelected)?;
        let file = self.file.as_ref().ok_or_else(|| WizardError::StepNotReady {
            step: WizardStep::FileSelection,
            reason: "select a file to import".into(),
        })?;
        Ok(CreateJobRequest {
            name: self.job_name.trim().to_string(),
            entity_type: profile.entity_key.to_string(),
            file_name: file.file_name.clone(),
            content_type: file.content_type.clone(),
            content: file.content.clone(),
            options: self.format,
        })
    }

    /// Create (or reuse a pending job), configure, start, then monitor.
    async fn submit(&mut self) -> Result<(), WizardError> {
        let service = Arc::clone(&self.service);

        let mut run = match self.run.take() {
            Some(mut run) if run.status() == JobStatus::Pending => {
                tracing::info!(job_id = run.id(), "Reusing pending import job");
                // An earlier start may have reached the server without a reply.
                if let Err(e) = run.refresh(&*service).await {
                    self.run = Some(run);
                    return Err(e.at_stage(SubmissionStage::Configure));
                }
                run
            }
            _ => {
                let request = self.build_request()?;
                MigrationRun::create(&*service, request)
                    .await
                    .map_err(|e| e.at_stage(SubmissionStage::Create))?
            }
        };

        if run.status() == JobStatus::Pending {
            let config = JobConfiguration {
                field_mapping: self.editor.mapping().clone(),
                transformation_rules: self.editor.rules().clone(),
                duplicate_policy: self.duplicate_policy,
            };
            if let Err(e) = run.configure(&*service, &config).await {
                self.run = Some(run);
                return Err(e.at_stage(SubmissionStage::Configure));
            }
            if let Err(e) = run.start(&*service).await {
                self.run = Some(run);
                return Err(e.at_stage(SubmissionStage::Start));
            }
        } else {
            tracing::info!(
                job_id = run.id(),
                status = %run.status(),
                "Pending import job was already started",
            );
        }

        if let Some(previous) = self.monitor.take() {
            previous.stop();
        }
        self.logs.clear();
        self.monitor = Some(monitor::spawn(
            service,
            ProgressSnapshot::new(run.job().clone()),
            self.config.poll_interval,
        ));
        self.run = Some(run);
        Ok(())
    }
}
