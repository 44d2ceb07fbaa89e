//! Background progress polling for a running migration job.
//!
//! [`spawn`] starts a tokio task that reads the job and its log on a fixed
//! interval and publishes each result through a `watch` channel. The task
//! exits on its own once the job leaves `running`; [`MonitorHandle::stop`]
//! or dropping the handle ends it earlier. Stopping a monitor never
//! cancels the job on the server.

use std::sync::Arc;
use std::time::Duration;

use bizflow_core::job::{JobStatus, MigrationJob, MigrationLogEntry};
use bizflow_jobservice::JobService;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Latest known state of a monitored job.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub job: MigrationJob,
    /// Full log as last read from the server, oldest first.
    pub logs: Vec<MigrationLogEntry>,
    /// Number of completed poll ticks.
    pub polls: u64,
}

impl ProgressSnapshot {
    pub fn new(job: MigrationJob) -> Self {
        Self {
            job,
            logs: Vec::new(),
            polls: 0,
        }
    }
}

/// Owner of a running monitor task.
pub struct MonitorHandle {
    cancel: CancellationToken,
    rx: watch::Receiver<ProgressSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Most recently published snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.rx.borrow().clone()
    }

    /// A receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.rx.clone()
    }

    /// Whether the polling task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop polling. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the polling task to exit and return the final snapshot.
    pub async fn finished(&mut self) -> ProgressSnapshot {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Import monitor task failed");
            }
        }
        self.snapshot()
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start polling `initial.id` every `period`.
///
/// The first read happens one `period` after the call.
pub fn spawn<S>(service: Arc<S>, initial: ProgressSnapshot, period: Duration) -> MonitorHandle
where
    S: JobService + ?Sized + 'static,
{
    let cancel = CancellationToken::new();
    let (tx, rx) = watch::channel(initial);
    let first_tick = tokio::time::Instant::now() + period;
    let task = tokio::spawn(run(service, tx, first_tick, period, cancel.clone()));
    MonitorHandle {
        cancel,
        rx,
        task: Some(task),
    }
}

async fn run<S>(
    service: Arc<S>,
    tx: watch::Sender<ProgressSnapshot>,
    first_tick: tokio::time::Instant,
    period: Duration,
    cancel: CancellationToken,
) where
    S: JobService + ?Sized,
{
    let job_id = tx.borrow().job.id;
    if !tx.borrow().job.is_running() {
        tracing::debug!(job_id, "Import monitor not started, job is not running");
        return;
    }

    tracing::info!(job_id, interval_ms = period.as_millis() as u64, "Import monitor started");

    let mut interval = tokio::time::interval_at(first_tick, period);
    // A slow read pushes the next one back instead of bursting.
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job_id, "Import monitor stopping");
                break;
            }
            _ = interval.tick() => {
                let (job, logs) =
                    tokio::join!(service.get_job(job_id), service.get_job_logs(job_id));
                if cancel.is_cancelled() {
                    break;
                }

                // Measure the next period from the end of this read.
                interval.reset();

                tx.send_modify(|snapshot| {
                    match job {
                        Ok(job) if snapshot.job.status.can_advance_to(job.status) => {
                            snapshot.job = job
                        }
                        Ok(job) => tracing::warn!(
                            job_id,
                            current = %snapshot.job.status,
                            received = %job.status,
                            "Ignoring stale job status",
                        ),
                        Err(e) => tracing::warn!(job_id, error = %e, "Failed to read job status"),
                    }
                    match logs {
                        Ok(logs) => snapshot.logs = logs,
                        Err(e) => tracing::warn!(job_id, error = %e, "Failed to read job log"),
                    }
                    snapshot.polls += 1;
                });

                let status = {
                    let snapshot = tx.borrow();
                    tracing::debug!(
                        job_id,
                        status = %snapshot.job.status,
                        processed = snapshot.job.processed_rows,
                        total = snapshot.job.total_rows,
                        "Import progress",
                    );
                    snapshot.job.status
                };
                if status != JobStatus::Running {
                    tracing::info!(job_id, %status, "Import monitor finished");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bizflow_core::job::{
        CreateJobRequest, DuplicatePolicy, JobConfiguration, JobFilters, ServerPreview,
    };
    use bizflow_core::mapping::{FieldMapping, TransformationRules};
    use bizflow_core::preview::FormatOptions;
    use bizflow_core::types::JobId;
    use bizflow_jobservice::memory::Operation;
    use bizflow_jobservice::{JobServiceError, MemoryJobService};
    use tokio::time::Instant;

    use super::*;

    /// Memory backend whose first status read hangs for `delay`.
    struct SlowFirstRead {
        inner: MemoryJobService,
        delay: Duration,
        reads: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl JobService for SlowFirstRead {
        async fn create_job(
            &self,
            request: CreateJobRequest,
        ) -> Result<MigrationJob, JobServiceError> {
            self.inner.create_job(request).await
        }

        async fn preview_job(&self, id: JobId) -> Result<ServerPreview, JobServiceError> {
            self.inner.preview_job(id).await
        }

        async fn configure_job(
            &self,
            id: JobId,
            config: &JobConfiguration,
        ) -> Result<MigrationJob, JobServiceError> {
            self.inner.configure_job(id, config).await
        }

        async fn start_job(&self, id: JobId) -> Result<MigrationJob, JobServiceError> {
            self.inner.start_job(id).await
        }

        async fn cancel_job(&self, id: JobId) -> Result<MigrationJob, JobServiceError> {
            self.inner.cancel_job(id).await
        }

        async fn get_job(&self, id: JobId) -> Result<MigrationJob, JobServiceError> {
            let first = {
                let mut reads = self.reads.lock().unwrap();
                reads.push(Instant::now());
                reads.len() == 1
            };
            if first {
                tokio::time::sleep(self.delay).await;
            }
            self.inner.get_job(id).await
        }

        async fn get_job_logs(
            &self,
            id: JobId,
        ) -> Result<Vec<MigrationLogEntry>, JobServiceError> {
            self.inner.get_job_logs(id).await
        }

        async fn list_jobs(
            &self,
            filters: &JobFilters,
        ) -> Result<Vec<MigrationJob>, JobServiceError> {
            self.inner.list_jobs(filters).await
        }

        async fn export_entities(&self, entity_type: &str) -> Result<Vec<u8>, JobServiceError> {
            self.inner.export_entities(entity_type).await
        }
    }

    const PERIOD: Duration = Duration::from_secs(2);

    async fn running_job(service: &MemoryJobService, rows: usize) -> MigrationJob {
        let mut content = String::from("name\n");
        for i in 0..rows {
            content.push_str(&format!("Supplier {i}\n"));
        }
        let job = service
            .create_job(CreateJobRequest {
                name: "suppliers".into(),
                entity_type: "suppliers".into(),
                file_name: "s.csv".into(),
                content_type: "text/csv".into(),
                content: content.into_bytes(),
                options: FormatOptions::default(),
            })
            .await
            .unwrap();
        let config = JobConfiguration {
            field_mapping: FieldMapping::from([("name".to_string(), "name".to_string())]),
            transformation_rules: TransformationRules::new(),
            duplicate_policy: DuplicatePolicy::default(),
        };
        service.configure_job(job.id, &config).await.unwrap();
        service.start_job(job.id).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_terminal_then_stops() {
        let service = Arc::new(MemoryJobService::with_rows_per_poll(2));
        let job = running_job(&service, 5).await;

        let mut handle = spawn(service.clone(), ProgressSnapshot::new(job), PERIOD);
        let last = handle.finished().await;

        assert_eq!(last.job.status, JobStatus::Completed);
        assert_eq!(last.job.processed_rows, 5);
        assert_eq!(last.logs.len(), 5);
        assert_eq!(last.polls, 3);

        tokio::time::sleep(PERIOD * 5).await;
        assert_eq!(service.calls(Operation::GetJob), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn first_read_waits_one_period() {
        let service = Arc::new(MemoryJobService::with_rows_per_poll(1));
        let job = running_job(&service, 10).await;
        let handle = spawn(service.clone(), ProgressSnapshot::new(job), PERIOD);

        tokio::time::sleep(PERIOD / 2).await;
        assert_eq!(service.calls(Operation::GetJob), 0);

        tokio::time::sleep(PERIOD).await;
        assert_eq!(service.calls(Operation::GetJob), 1);
        assert_eq!(handle.snapshot().job.processed_rows, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_polling_without_cancelling_job() {
        let service = Arc::new(MemoryJobService::with_rows_per_poll(1));
        let job = running_job(&service, 10).await;
        let mut handle = spawn(service.clone(), ProgressSnapshot::new(job.clone()), PERIOD);

        tokio::time::sleep(PERIOD + PERIOD / 2).await;
        handle.stop();
        let last = handle.finished().await;
        assert_eq!(last.polls, 1);

        tokio::time::sleep(PERIOD * 5).await;
        assert_eq!(service.calls(Operation::GetJob), 1);
        assert_eq!(service.calls(Operation::Cancel), 0);
        assert_eq!(last.job.status, JobStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_polling() {
        let service = Arc::new(MemoryJobService::with_rows_per_poll(1));
        let job = running_job(&service, 10).await;
        let handle = spawn(service.clone(), ProgressSnapshot::new(job), PERIOD);
        drop(handle);

        tokio::time::sleep(PERIOD * 5).await;
        assert_eq!(service.calls(Operation::GetJob), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_reads_are_ignored() {
        let service = Arc::new(MemoryJobService::with_rows_per_poll(1));
        let job = running_job(&service, 2).await;
        service.fail_next(Operation::GetJob, 1);
        service.fail_next(Operation::GetLogs, 2);

        let mut handle = spawn(service.clone(), ProgressSnapshot::new(job), PERIOD);
        let last = handle.finished().await;

        assert_eq!(last.job.status, JobStatus::Completed);
        assert_eq!(last.polls, 3);
        assert_eq!(last.logs.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_read_delays_next_poll() {
        let inner = MemoryJobService::with_rows_per_poll(1);
        let job = running_job(&inner, 3).await;
        let service = Arc::new(SlowFirstRead {
            inner,
            delay: Duration::from_secs(7),
            reads: Mutex::new(Vec::new()),
        });

        let start = Instant::now();
        let mut handle = spawn(service.clone(), ProgressSnapshot::new(job), PERIOD);
        let last = handle.finished().await;
        assert_eq!(last.job.status, JobStatus::Completed);

        let offsets: Vec<u64> = service
            .reads
            .lock()
            .unwrap()
            .iter()
            .map(|t| (*t - start).as_millis() as u64)
            .collect();
        assert_eq!(offsets, vec![2_000, 11_000, 13_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn job_not_running_is_not_polled() {
        let service = Arc::new(MemoryJobService::new());
        let mut job = running_job(&service, 1).await;
        job.status = JobStatus::Completed;

        let mut handle = spawn(service.clone(), ProgressSnapshot::new(job), PERIOD);
        let last = handle.finished().await;
        assert_eq!(last.polls, 0);
        assert_eq!(service.calls(Operation::GetJob), 0);
    }
}
