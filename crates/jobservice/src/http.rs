//! REST client for the backend migration Job Service.
//!
//! Wraps the `/migration-jobs/` endpoints (create, preview, configure,
//! start, cancel, status, logs, list) and the per-entity CSV export using
//! [`reqwest`]. Every request carries the configured bearer token.

use async_trait::async_trait;
use bizflow_core::job::{
    CreateJobRequest, JobConfiguration, JobFilters, MigrationJob, MigrationLogEntry,
    ServerPreview,
};
use bizflow_core::types::JobId;
use reqwest::multipart::{Form, Part};

use crate::config::JobServiceConfig;
use crate::error::JobServiceError;
use crate::service::JobService;

/// HTTP client for one backend instance.
pub struct HttpJobService {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpJobService {
    /// Create a client from configuration, applying the request timeout.
    pub fn new(config: &JobServiceConfig) -> Result<Self, JobServiceError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, config))
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for sharing a connection pool with the rest of the app).
    pub fn with_client(client: reqwest::Client, config: &JobServiceConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn job_url(&self, id: JobId, action: &str) -> String {
        if action.is_empty() {
            self.url(&format!("/migration-jobs/{id}/"))
        } else {
            self.url(&format!("/migration-jobs/{id}/{action}/"))
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, JobServiceError> {
        Ok(self.authorize(request).send().await?)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`JobServiceError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, JobServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(JobServiceError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, JobServiceError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Parse a job-scoped response, turning a 404 into
    /// [`JobServiceError::NotFound`].
    async fn parse_job_response<T: serde::de::DeserializeOwned>(
        id: JobId,
        response: reqwest::Response,
    ) -> Result<T, JobServiceError> {
        match Self::parse_response(response).await {
            Err(JobServiceError::Api { status: 404, .. }) => Err(JobServiceError::NotFound(id)),
            other => other,
        }
    }
}

#[async_trait]
impl JobService for HttpJobService {
    async fn create_job(&self, request: CreateJobRequest) -> Result<MigrationJob, JobServiceError> {
        let file = Part::bytes(request.content)
            .file_name(request.file_name)
            .mime_str(&request.content_type)?;

        let form = Form::new()
            .text("name", request.name)
            .text("entity_type", request.entity_type.clone())
            .text("has_header", request.options.has_header.to_string())
            .text("delimiter", request.options.delimiter.to_string())
            .part("source_file", file);

        let response = self
            .send(self.client.post(self.url("/migration-jobs/")).multipart(form))
            .await?;
        let job: MigrationJob = Self::parse_response(response).await?;

        tracing::info!(
            job_id = job.id,
            entity_type = %request.entity_type,
            "Migration job created",
        );
        Ok(job)
    }

    async fn preview_job(&self, id: JobId) -> Result<ServerPreview, JobServiceError> {
        let response = self.send(self.client.get(self.job_url(id, "preview"))).await?;
        Self::parse_job_response(id, response).await
    }

    async fn configure_job(
        &self,
        id: JobId,
        config: &JobConfiguration,
    ) -> Result<MigrationJob, JobServiceError> {
        let response = self
            .send(self.client.post(self.job_url(id, "configure")).json(config))
            .await?;
        Self::parse_job_response(id, response).await
    }

    async fn start_job(&self, id: JobId) -> Result<MigrationJob, JobServiceError> {
        let response = self.send(self.client.post(self.job_url(id, "start"))).await?;
        Self::parse_job_response(id, response).await
    }

    async fn cancel_job(&self, id: JobId) -> Result<MigrationJob, JobServiceError> {
        let response = self.send(self.client.post(self.job_url(id, "cancel"))).await?;
        Self::parse_job_response(id, response).await
    }

    async fn get_job(&self, id: JobId) -> Result<MigrationJob, JobServiceError> {
        let response = self.send(self.client.get(self.job_url(id, ""))).await?;
        Self::parse_job_response(id, response).await
    }

    async fn get_job_logs(&self, id: JobId) -> Result<Vec<MigrationLogEntry>, JobServiceError> {
        let response = self.send(self.client.get(self.job_url(id, "logs"))).await?;
        Self::parse_job_response(id, response).await
    }

    async fn list_jobs(&self, filters: &JobFilters) -> Result<Vec<MigrationJob>, JobServiceError> {
        let response = self
            .send(self.client.get(self.url("/migration-jobs/")).query(filters))
            .await?;
        Self::parse_response(response).await
    }

    async fn export_entities(&self, entity_type: &str) -> Result<Vec<u8>, JobServiceError> {
        let response = self
            .send(self.client.get(self.url(&format!("/{entity_type}/export/"))))
            .await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
