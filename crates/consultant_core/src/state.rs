use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use crate::comments::{Comment, SortOrder};
use crate::job::{Job, JobId, JobStatus, ProgressUpdate};
use crate::notifications::Notification;

/// Explicit liveness state machine for a polled resource.
///
/// `Polling -> Idle` triggers when no tracked item remains in a non-terminal
/// state; `Idle -> Polling` when non-terminal items (re)appear. Transitions
/// are edge-triggered so the effect runner sees each timer start/stop once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollState {
    #[default]
    Idle,
    Polling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQueueConfig {
    /// Keep completed/failed jobs visible instead of dropping them on
    /// terminal transition.
    pub show_completed: bool,
    /// Upper bound on rows kept locally; also the list fetch limit.
    pub page_cap: usize,
    pub poll_interval: Duration,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            show_completed: false,
            page_cap: 50,
            poll_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    pub page_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    pub poll_interval: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub job_queue: JobQueueConfig,
    pub history: HistoryConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Default)]
pub struct JobQueueState {
    pub(crate) config: JobQueueConfig,
    pub(crate) open: bool,
    pub(crate) loaded: bool,
    /// BTreeMap for deterministic row order by job id.
    pub(crate) jobs: BTreeMap<JobId, Job>,
    /// Latest stream snapshot per job; last write wins, no history buffer.
    pub(crate) progress: HashMap<JobId, ProgressUpdate>,
    /// Jobs with an open progress subscription.
    pub(crate) streams: BTreeSet<JobId>,
    /// Rows removed optimistically, retained for rollback.
    pub(crate) pending_cancels: HashMap<JobId, Job>,
    pub(crate) poll: PollState,
    pub(crate) error: Option<String>,
}

impl JobQueueState {
    pub(crate) fn has_active(&self) -> bool {
        self.jobs.values().any(|job| !job.status.is_terminal())
    }

    pub(crate) fn fetch_statuses(&self) -> Vec<JobStatus> {
        let mut statuses = vec![JobStatus::Pending, JobStatus::Running];
        if self.config.show_completed {
            statuses.push(JobStatus::Completed);
            statuses.push(JobStatus::Failed);
        }
        statuses
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobHistoryState {
    pub(crate) config: HistoryConfig,
    pub(crate) open: bool,
    pub(crate) loaded: bool,
    /// 1-indexed current page.
    pub(crate) page: usize,
    /// Server-ordered rows for the current page.
    pub(crate) rows: Vec<Job>,
    pub(crate) total: usize,
    /// Removed rows with their index, retained for rollback.
    pub(crate) pending_deletes: HashMap<JobId, (usize, Job)>,
    pub(crate) error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationCenterState {
    pub(crate) config: NotificationConfig,
    pub(crate) open: bool,
    pub(crate) loaded: bool,
    pub(crate) user_id: Option<String>,
    pub(crate) items: Vec<Notification>,
    /// id -> pre-mutation read flag, for single-flag rollback.
    pub(crate) pending_reads: HashMap<String, bool>,
    /// id -> (index, item) for single-delete rollback.
    pub(crate) pending_deletes: HashMap<String, (usize, Notification)>,
    pub(crate) error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CommentThreadState {
    /// Flat source collection; the tree is derived on every view.
    pub(crate) comments: Vec<Comment>,
    pub(crate) sort: SortOrder,
    /// At most one reply target and one edit target, mutually exclusive.
    pub(crate) replying_to: Option<String>,
    pub(crate) editing: Option<String>,
    pub(crate) error: Option<String>,
}

impl CommentThreadState {
    pub(crate) fn contains(&self, id: &str) -> bool {
        self.comments.iter().any(|comment| comment.id == id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub(crate) job_queue: JobQueueState,
    pub(crate) history: JobHistoryState,
    pub(crate) notifications: NotificationCenterState,
    pub(crate) comments: CommentThreadState,
    /// Job ids observed in a terminal state this session. Status is
    /// monotonic per job: later fetches never revert these to active, and
    /// the finish hand-off fires at most once per id.
    pub(crate) terminal_jobs: BTreeSet<JobId>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            job_queue: JobQueueState {
                config: config.job_queue,
                ..JobQueueState::default()
            },
            history: JobHistoryState {
                config: config.history,
                ..JobHistoryState::default()
            },
            notifications: NotificationCenterState {
                config: config.notifications,
                ..NotificationCenterState::default()
            },
            ..Self::default()
        }
    }

    /// Returns whether the view changed since the last call, and resets the
    /// flag. The embedding shell uses this to coalesce re-renders.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn is_terminal_job(&self, job_id: &JobId) -> bool {
        self.terminal_jobs.contains(job_id)
    }

    pub(crate) fn record_terminal(&mut self, job_id: &JobId) {
        if !self.terminal_jobs.contains(job_id) {
            self.terminal_jobs.insert(job_id.clone());
        }
    }
}
