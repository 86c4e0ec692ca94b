use std::fmt;

use chrono::{DateTime, Utc};

/// Opaque, server-assigned job identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// A terminal status never transitions again within a session.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// A server-side analysis task as seen by list endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub job_id: JobId,
    pub status: JobStatus,
    pub company: String,
    /// Opaque result payload, present only once the job completed.
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Point-in-time progress snapshot delivered over the event stream.
///
/// Only the latest snapshot per job is retained; rapid bursts coalesce to
/// last-write-wins. `phase_num` should be non-decreasing in a well-behaved
/// stream, but violations are tolerated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressUpdate {
    pub status: Option<JobStatus>,
    pub phase: String,
    pub phase_name: String,
    pub phase_num: u32,
    pub total_phases: u32,
    /// 0-100.
    pub progress: u8,
    pub current_agents: Vec<String>,
    pub completed_agents: Vec<String>,
    pub message: String,
    pub estimated_seconds_remaining: Option<u64>,
    pub error: Option<String>,
}

impl ProgressUpdate {
    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(JobStatus::is_terminal)
    }
}

/// Final outcome handed off once per job when its stream reaches a terminal
/// status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { result: Option<String> },
    Failed { error: String },
}

/// Default message surfaced when a failed job carries no error detail.
pub const DEFAULT_FAILURE_MESSAGE: &str = "analysis failed";
