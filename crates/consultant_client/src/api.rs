use consultant_core::{Comment, JobId, JobStatus, Notification};

use crate::error::ApiError;
use crate::settings::ApiSettings;
use crate::types::{
    AnalysisRequest, AsyncAccepted, JobListResponse, JobPage, NotificationListResponse,
    NotificationRecord,
};

/// REST surface of the ConsultantOS backend. Everything is consumed, never
/// served; the backend is an opaque collaborator.
#[async_trait::async_trait]
pub trait BackendApi: Send + Sync {
    async fn list_jobs(
        &self,
        statuses: &[JobStatus],
        limit: usize,
        offset: usize,
    ) -> Result<JobPage, ApiError>;

    /// Shared by "cancel active" and "delete terminal" semantics.
    async fn delete_job(&self, job_id: &JobId) -> Result<(), ApiError>;

    async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>, ApiError>;
    async fn mark_notification_read(&self, id: &str) -> Result<(), ApiError>;
    async fn mark_all_notifications_read(&self) -> Result<(), ApiError>;
    async fn delete_notification(&self, id: &str) -> Result<(), ApiError>;
    async fn clear_all_notifications(&self) -> Result<(), ApiError>;

    /// Synchronous submission: waits for completion, answers the result.
    async fn submit_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<serde_json::Value, ApiError>;
    /// Asynchronous submission: answers a job id immediately.
    async fn submit_analysis_async(&self, request: &AnalysisRequest) -> Result<JobId, ApiError>;
}

/// Comment persistence is owned by the embedding view; the sync layer only
/// delegates to caller-supplied handlers.
#[async_trait::async_trait]
pub trait CommentBackend: Send + Sync {
    async fn list(&self) -> Result<Vec<Comment>, ApiError>;
    async fn create_reply(&self, parent_id: &str, text: &str) -> Result<(), ApiError>;
    async fn update(&self, id: &str, text: &str) -> Result<(), ApiError>;
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestApi {
    /// REST client with a whole-request timeout.
    pub(crate) client: reqwest::Client,
    /// Stream client without a whole-request timeout; a progress stream is
    /// expected to stay open for the lifetime of a job.
    pub(crate) stream_client: reqwest::Client,
    pub(crate) settings: ApiSettings,
}

impl ReqwestApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        let stream_client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Ok(Self {
            client,
            stream_client,
            settings,
        })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url, path)
    }

    async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(response)
    }

    fn submission_request(&self, path: &str, request: &AnalysisRequest) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(self.url(path)).json(request);
        if let Some(api_key) = &self.settings.api_key {
            builder = builder.header("X-API-Key", api_key);
        }
        builder
    }
}

#[async_trait::async_trait]
impl BackendApi for ReqwestApi {
    async fn list_jobs(
        &self,
        statuses: &[JobStatus],
        limit: usize,
        offset: usize,
    ) -> Result<JobPage, ApiError> {
        let csv = statuses
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let response = self
            .client
            .get(self.url("/jobs"))
            .query(&[
                ("status", csv),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        let body: JobListResponse = response.json().await?;
        body.into_page()
    }

    async fn delete_job(&self, job_id: &JobId) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/jobs/{job_id}")))
            .send()
            .await?;
        Self::expect_success(response).await.map(|_| ())
    }

    async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>, ApiError> {
        let response = self
            .client
            .get(self.url("/notifications"))
            .query(&[("user_id", user_id)])
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        let body: NotificationListResponse = response.json().await?;
        Ok(body
            .notifications
            .into_iter()
            .map(NotificationRecord::into_notification)
            .collect())
    }

    async fn mark_notification_read(&self, id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.url(&format!("/notifications/{id}/read")))
            .send()
            .await?;
        Self::expect_success(response).await.map(|_| ())
    }

    async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.url("/notifications/read-all"))
            .send()
            .await?;
        Self::expect_success(response).await.map(|_| ())
    }

    async fn delete_notification(&self, id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/notifications/{id}")))
            .send()
            .await?;
        Self::expect_success(response).await.map(|_| ())
    }

    async fn clear_all_notifications(&self) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url("/notifications/clear-all"))
            .send()
            .await?;
        Self::expect_success(response).await.map(|_| ())
    }

    async fn submit_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<serde_json::Value, ApiError> {
        let response = self.submission_request("/analyze", request).send().await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json().await?)
    }

    async fn submit_analysis_async(&self, request: &AnalysisRequest) -> Result<JobId, ApiError> {
        let response = self
            .submission_request("/analyze/async", request)
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        let accepted: AsyncAccepted = response.json().await?;
        Ok(JobId::new(accepted.job_id))
    }
}
