//! In-process Job Service.
//!
//! Implements the same contract as the backend: the whole file is parsed
//! on create, configuration is validated against the entity profile, and
//! a started job processes rows as it is polled. Each `get_job` call on a
//! running job advances it by `rows_per_poll` rows, so progress can be
//! observed deterministically from tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bizflow_core::job::{
    CreateJobRequest, DuplicateAction, JobConfiguration, JobFilters, JobStatus, LogLevel,
    MigrationJob, MigrationLogEntry, ServerPreview,
};
use bizflow_core::mapping::map_row;
use bizflow_core::preview::{FormatOptions, PREVIEW_ROW_LIMIT};
use bizflow_core::profile::{find_profile, EntityImportProfile};
use bizflow_core::types::{DestinationRecord, JobId, SourceRow};
use chrono::Utc;

use crate::error::JobServiceError;
use crate::service::JobService;

/// Rows processed per `get_job` call unless configured otherwise.
pub const DEFAULT_ROWS_PER_POLL: usize = 25;

/// Job Service operations, used for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Preview,
    Configure,
    Start,
    Cancel,
    GetJob,
    GetLogs,
    List,
    Export,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct StoredJob {
    job: MigrationJob,
    headers: Vec<String>,
    rows: Vec<SourceRow>,
    config: Option<JobConfiguration>,
    logs: Vec<MigrationLogEntry>,
    cursor: usize,
}

#[derive(Default)]
struct State {
    next_id: JobId,
    jobs: BTreeMap<JobId, StoredJob>,
    /// Existing records per entity key.
    records: HashMap<String, Vec<DestinationRecord>>,
    calls: HashMap<Operation, u32>,
    failures: HashMap<Operation, u32>,
}

/// Job Service backed by process memory.
pub struct MemoryJobService {
    state: Mutex<State>,
    rows_per_poll: usize,
}

impl Default for MemoryJobService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryJobService {
    pub fn new() -> Self {
        Self::with_rows_per_poll(DEFAULT_ROWS_PER_POLL)
    }

    /// Create a service that processes `rows_per_poll` rows (at least one)
    /// on every status read of a running job.
    pub fn with_rows_per_poll(rows_per_poll: usize) -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1,
                ..State::default()
            }),
            rows_per_poll: rows_per_poll.max(1),
        }
    }

    /// Register records that already exist for an entity type, so that
    /// imports can hit duplicates.
    pub fn seed_existing(&self, entity_type: &str, records: Vec<DestinationRecord>) {
        self.lock()
            .records
            .entry(entity_type.to_string())
            .or_default()
            .extend(records);
    }

    /// Records currently stored for an entity type.
    pub fn records(&self, entity_type: &str) -> Vec<DestinationRecord> {
        self.lock()
            .records
            .get(entity_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of times `operation` has been called, including failed calls.
    pub fn calls(&self, operation: Operation) -> u32 {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Make the next `times` calls of `operation` fail with a 503.
    pub fn fail_next(&self, operation: Operation, times: u32) {
        self.lock().failures.insert(operation, times);
    }

    // ---- private helpers ----

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call and consume one injected failure, if any.
    fn enter(&self, operation: Operation) -> Result<MutexGuard<'_, State>, JobServiceError> {
        let mut state = self.lock();
        *state.calls.entry(operation).or_insert(0) += 1;
        if let Some(remaining) = state.failures.get_mut(&operation) {
            if *remaining > 0 {
                *remaining -= 1;
                tracing::debug!(?operation, "Injected job service failure");
                return Err(JobServiceError::Api {
                    status: 503,
                    body: "service unavailable".to_string(),
                });
            }
        }
        Ok(state)
    }
}

fn stored_mut(state: &mut State, id: JobId) -> Result<&mut StoredJob, JobServiceError> {
    state.jobs.get_mut(&id).ok_or(JobServiceError::NotFound(id))
}

fn invalid_state(job: &MigrationJob, message: &str) -> JobServiceError {
    JobServiceError::InvalidState {
        id: job.id,
        status: job.status,
        message: message.to_string(),
    }
}

// ---------------------------------------------------------------------------
// File parsing
// ---------------------------------------------------------------------------

/// Parse the whole file into headers and rows.
fn parse_file(
    content: &[u8],
    options: FormatOptions,
) -> Result<(Vec<String>, Vec<SourceRow>), JobServiceError> {
    let delimiter = u8::try_from(options.delimiter).map_err(|_| {
        JobServiceError::Invalid(format!("unsupported delimiter {:?}", options.delimiter))
    })?;
    let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| JobServiceError::Invalid(format!("unreadable file: {e}")))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let mut records = records.into_iter();
    let headers = if options.has_header {
        records
            .next()
            .ok_or_else(|| JobServiceError::Invalid("the file is empty".to_string()))?
    } else {
        Vec::new()
    };

    let mut data: Vec<Vec<String>> = records.collect();
    let headers = if options.has_header {
        headers
    } else {
        let width = data.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            return Err(JobServiceError::Invalid("the file is empty".to_string()));
        }
        (1..=width).map(|n| format!("Column {n}")).collect()
    };

    let rows: Vec<SourceRow> = data
        .iter_mut()
        .map(|cells| {
            cells.resize(headers.len(), String::new());
            headers.iter().cloned().zip(cells.drain(..)).collect::<SourceRow>()
        })
        .collect();

    Ok((headers, rows))
}

// ---------------------------------------------------------------------------
// Row processing
// ---------------------------------------------------------------------------

impl StoredJob {
    /// Process up to `budget` rows, then finish the job once every row is
    /// handled.
    fn advance(&mut self, budget: usize, existing: &mut Vec<DestinationRecord>) {
        let Some(config) = self.config.clone() else {
            return;
        };
        let Ok(profile) = find_profile(&self.job.entity_type) else {
            return;
        };

        let end = (self.cursor + budget).min(self.rows.len());
        for index in self.cursor..end {
            let row_number = index as u64 + 1;
            let record = map_row(
                &config.field_mapping,
                &config.transformation_rules,
                &self.rows[index],
            );
            let (level, message) = process_row(profile, &config, record, existing);
            match level {
                LogLevel::Success => self.job.success_count += 1,
                LogLevel::Warning => self.job.skipped_count += 1,
                LogLevel::Error => self.job.error_count += 1,
            }
            self.job.processed_rows += 1;
            self.logs.push(MigrationLogEntry {
                row_number,
                level,
                message,
            });
        }
        self.cursor = end;

        if self.cursor >= self.rows.len() {
            self.finish();
        }
    }

    fn finish(&mut self) {
        if self.job.error_count > 0 && self.job.success_count == 0 && self.job.skipped_count == 0 {
            self.job.status = JobStatus::Failed;
            self.job.error_message = Some(format!(
                "All {} rows were rejected",
                self.job.error_count
            ));
        } else {
            self.job.status = JobStatus::Completed;
        }
        self.job.completed_at = Some(Utc::now());
        tracing::info!(
            job_id = self.job.id,
            status = %self.job.status,
            success = self.job.success_count,
            errors = self.job.error_count,
            skipped = self.job.skipped_count,
            "Migration job finished",
        );
    }
}

/// Validate and store one mapped row, returning its log entry.
fn process_row(
    profile: &EntityImportProfile,
    config: &JobConfiguration,
    record: DestinationRecord,
    existing: &mut Vec<DestinationRecord>,
) -> (LogLevel, String) {
    let missing: Vec<&str> = profile
        .required_names()
        .filter(|name| record.get(*name).map_or(true, |v| v.is_empty()))
        .collect();
    if !missing.is_empty() {
        return (
            LogLevel::Error,
            format!("Missing required field(s): {}", missing.join(", ")),
        );
    }

    let key = profile.duplicate_key;
    let key_value = record.get(key).cloned().unwrap_or_default();
    let duplicate = if key_value.is_empty() {
        None
    } else {
        existing
            .iter()
            .position(|r| r.get(key).is_some_and(|v| v.eq_ignore_ascii_case(&key_value)))
    };

    match (duplicate, config.duplicate_policy.action()) {
        (Some(_), DuplicateAction::Skip) => (
            LogLevel::Warning,
            format!("Skipped: a record with {key} '{key_value}' already exists"),
        ),
        (Some(position), DuplicateAction::Update) => {
            existing[position].extend(record);
            (LogLevel::Success, format!("Updated {key} '{key_value}'"))
        }
        (None, _) | (Some(_), DuplicateAction::Create) => {
            existing.push(record);
            (LogLevel::Success, format!("Created {key} '{key_value}'"))
        }
    }
}

// ---------------------------------------------------------------------------
// JobService implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl JobService for MemoryJobService {
    async fn create_job(&self, request: CreateJobRequest) -> Result<MigrationJob, JobServiceError> {
        let mut state = self.enter(Operation::Create)?;

        find_profile(&request.entity_type)
            .map_err(|e| JobServiceError::Invalid(e.to_string()))?;
        if request.name.trim().is_empty() {
            return Err(JobServiceError::Invalid("job name is required".to_string()));
        }
        let (headers, rows) = parse_file(&request.content, request.options)?;

        let id = state.next_id;
        state.next_id += 1;

        let job = MigrationJob {
            id,
            name: request.name,
            entity_type: request.entity_type,
            status: JobStatus::Pending,
            total_rows: rows.len() as u64,
            processed_rows: 0,
            success_count: 0,
            error_count: 0,
            skipped_count: 0,
            error_message: None,
            created_at: Some(Utc::now()),
            started_at: None,
            completed_at: None,
        };
        state.jobs.insert(
            id,
            StoredJob {
                job: job.clone(),
                headers,
                rows,
                config: None,
                logs: Vec::new(),
                cursor: 0,
            },
        );

        tracing::info!(
            job_id = id,
            entity_type = %job.entity_type,
            total_rows = job.total_rows,
            "Migration job created",
        );
        Ok(job)
    }

    async fn preview_job(&self, id: JobId) -> Result<ServerPreview, JobServiceError> {
        let mut state = self.enter(Operation::Preview)?;
        let stored = stored_mut(&mut state, id)?;
        Ok(ServerPreview {
            headers: stored.headers.clone(),
            sample_rows: stored.rows.iter().take(PREVIEW_ROW_LIMIT).cloned().collect(),
            total_rows: stored.rows.len() as u64,
        })
    }

    async fn configure_job(
        &self,
        id: JobId,
        config: &JobConfiguration,
    ) -> Result<MigrationJob, JobServiceError> {
        let mut state = self.enter(Operation::Configure)?;
        let stored = stored_mut(&mut state, id)?;
        if stored.job.status != JobStatus::Pending {
            return Err(invalid_state(&stored.job, "only pending jobs can be configured"));
        }

        let profile = find_profile(&stored.job.entity_type)
            .map_err(|e| JobServiceError::Invalid(e.to_string()))?;

        if let Some(source) = config
            .field_mapping
            .keys()
            .find(|source| !stored.headers.contains(source))
        {
            return Err(JobServiceError::Invalid(format!("unknown source column '{source}'")));
        }
        if let Some(dest) = config
            .field_mapping
            .values()
            .find(|dest| !profile.is_known_field(dest))
        {
            return Err(JobServiceError::Invalid(format!("unknown field '{dest}'")));
        }
        if let Some(required) = profile
            .required_names()
            .find(|name| !config.field_mapping.values().any(|d| d == name))
        {
            return Err(JobServiceError::Invalid(format!(
                "required field '{required}' is not mapped"
            )));
        }

        stored.config = Some(config.clone());
        Ok(stored.job.clone())
    }

    async fn start_job(&self, id: JobId) -> Result<MigrationJob, JobServiceError> {
        let mut state = self.enter(Operation::Start)?;
        let stored = stored_mut(&mut state, id)?;
        if stored.job.status != JobStatus::Pending {
            return Err(invalid_state(&stored.job, "only pending jobs can be started"));
        }
        if stored.config.is_none() {
            return Err(invalid_state(&stored.job, "job has not been configured"));
        }
        stored.job.status = JobStatus::Running;
        stored.job.started_at = Some(Utc::now());
        tracing::info!(job_id = id, "Migration job started");
        Ok(stored.job.clone())
    }

    async fn cancel_job(&self, id: JobId) -> Result<MigrationJob, JobServiceError> {
        let mut state = self.enter(Operation::Cancel)?;
        let stored = stored_mut(&mut state, id)?;
        if stored.job.is_terminal() {
            return Err(invalid_state(&stored.job, "job has already finished"));
        }
        stored.job.status = JobStatus::Cancelled;
        stored.job.completed_at = Some(Utc::now());
        tracing::info!(
            job_id = id,
            processed = stored.job.processed_rows,
            "Migration job cancelled",
        );
        Ok(stored.job.clone())
    }

    async fn get_job(&self, id: JobId) -> Result<MigrationJob, JobServiceError> {
        let mut guard = self.enter(Operation::GetJob)?;
        let state = &mut *guard;
        let stored = state.jobs.get_mut(&id).ok_or(JobServiceError::NotFound(id))?;
        if stored.job.is_running() {
            let existing = state
                .records
                .entry(stored.job.entity_type.clone())
                .or_default();
            stored.advance(self.rows_per_poll, existing);
        }
        Ok(stored.job.clone())
    }

    async fn get_job_logs(&self, id: JobId) -> Result<Vec<MigrationLogEntry>, JobServiceError> {
        let mut state = self.enter(Operation::GetLogs)?;
        Ok(stored_mut(&mut state, id)?.logs.clone())
    }

    async fn list_jobs(&self, filters: &JobFilters) -> Result<Vec<MigrationJob>, JobServiceError> {
        let state = self.enter(Operation::List)?;
        Ok(state
            .jobs
            .values()
            .rev()
            .map(|s| &s.job)
            .filter(|job| filters.matches(job))
            .cloned()
            .collect())
    }

    async fn export_entities(&self, entity_type: &str) -> Result<Vec<u8>, JobServiceError> {
        let state = self.enter(Operation::Export)?;
        let profile =
            find_profile(entity_type).map_err(|e| JobServiceError::Invalid(e.to_string()))?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        let names: Vec<&str> = profile.fields().map(|f| f.name).collect();
        let to_invalid = |e: csv::Error| JobServiceError::Invalid(e.to_string());
        writer.write_record(&names).map_err(to_invalid)?;
        for record in state.records.get(entity_type).into_iter().flatten() {
            let values = names
                .iter()
                .map(|n| record.get(*n).map(String::as_str).unwrap_or_default());
            writer.write_record(values).map_err(to_invalid)?;
        }
        writer
            .into_inner()
            .map_err(|e| JobServiceError::Invalid(e.to_string()))
    }
}
