//! Wire-format records and their mapping into core domain types.
//!
//! The backend speaks loosely-typed JSON; everything is validated here so
//! unknown status strings or missing fields never reach the pure core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use consultant_core::{
    Job, JobId, JobStatus, Notification, NotificationKind, ProgressUpdate,
};

use crate::error::ApiError;

pub(crate) fn parse_status(raw: &str) -> Result<JobStatus, ApiError> {
    match raw {
        "pending" => Ok(JobStatus::Pending),
        "running" => Ok(JobStatus::Running),
        "completed" => Ok(JobStatus::Completed),
        "failed" => Ok(JobStatus::Failed),
        other => Err(ApiError::Decode(format!("unknown job status {other:?}"))),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub status: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn into_job(self) -> Result<Job, ApiError> {
        Ok(Job {
            job_id: JobId::new(self.job_id),
            status: parse_status(&self.status)?,
            company: self.company,
            result: self.result.map(|value| value.to_string()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// `GET /jobs` answers either an envelope with a total count or a bare
/// array; both shapes are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JobListResponse {
    Envelope {
        jobs: Vec<JobRecord>,
        #[serde(default)]
        total: Option<usize>,
    },
    Bare(Vec<JobRecord>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    pub total: usize,
}

impl JobListResponse {
    pub fn into_page(self) -> Result<JobPage, ApiError> {
        let (records, total) = match self {
            JobListResponse::Envelope { jobs, total } => {
                let total = total.unwrap_or(jobs.len());
                (jobs, total)
            }
            JobListResponse::Bare(jobs) => {
                let total = jobs.len();
                (jobs, total)
            }
        };
        let jobs = records
            .into_iter()
            .map(JobRecord::into_job)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(JobPage { jobs, total })
    }
}

/// One SSE `data:` payload on the progress stream. Every field is optional
/// on the wire; partial events are normal early in a job.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressRecord {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub phase_name: String,
    #[serde(default)]
    pub phase_num: u32,
    #[serde(default)]
    pub total_phases: u32,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub current_agents: Vec<String>,
    #[serde(default)]
    pub completed_agents: Vec<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub estimated_seconds_remaining: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ProgressRecord {
    pub fn into_update(self) -> Result<ProgressUpdate, ApiError> {
        let status = self
            .status
            .as_deref()
            .map(parse_status)
            .transpose()?;
        Ok(ProgressUpdate {
            status,
            phase: self.phase,
            phase_name: self.phase_name,
            phase_num: self.phase_num,
            total_phases: self.total_phases,
            progress: self.progress.min(100),
            current_agents: self.current_agents,
            completed_agents: self.completed_agents,
            message: self.message,
            estimated_seconds_remaining: self.estimated_seconds_remaining,
            error: self.error,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    /// Referenced comment text, used as the body when no body is present.
    #[serde(default)]
    pub comment_text: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl NotificationRecord {
    /// Unknown notification types degrade to `Generic` rather than failing
    /// the whole fetch.
    pub fn into_notification(self) -> Notification {
        let kind = match self.kind.as_deref() {
            Some("comment") => NotificationKind::Comment,
            Some("reply") => NotificationKind::Reply,
            Some("mention") => NotificationKind::Mention,
            _ => NotificationKind::Generic,
        };
        Notification {
            id: self.id,
            kind,
            read: self.read,
            created_at: self.created_at,
            title: self.title,
            body: self.body.or(self.comment_text).unwrap_or_default(),
            link: self.link,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationListResponse {
    #[serde(default)]
    pub notifications: Vec<NotificationRecord>,
}

/// Analysis submission payload. Framework selection and other options pass
/// through opaquely.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub company: String,
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl AnalysisRequest {
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            options: serde_json::Map::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AsyncAccepted {
    pub job_id: String,
}
