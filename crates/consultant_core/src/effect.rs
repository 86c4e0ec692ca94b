use std::time::Duration;

use crate::job::{JobId, JobOutcome, JobStatus};
use crate::notifications::Navigate;

/// IO requested by the pure update function. The effect runner owns all
/// network calls, timers, and stream connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    // --- Job queue ---
    FetchJobs {
        statuses: Vec<JobStatus>,
        limit: usize,
        offset: usize,
    },
    CancelJob { job_id: JobId },
    /// Edge-triggered: emitted once on the Idle -> Polling transition. The
    /// runner keeps at most one job poll timer alive and replaces it on a
    /// repeated start.
    StartJobPolling { interval: Duration },
    StopJobPolling,
    OpenProgressStream { job_id: JobId },
    CloseProgressStream { job_id: JobId },
    /// Single hand-off point between list polling and per-job streaming.
    /// Fired exactly once per job id.
    NotifyJobFinished { job_id: JobId, outcome: JobOutcome },

    // --- Job history ---
    FetchHistory { limit: usize, offset: usize },
    DeleteJob { job_id: JobId },
    /// Hand the opaque result payload to the embedding shell; no format
    /// assumptions are made here.
    DeliverResult { job_id: JobId, payload: String },

    // --- Notification center ---
    FetchNotifications { user_id: String },
    StartNotificationPolling { user_id: String, interval: Duration },
    StopNotificationPolling,
    MarkNotificationRead { id: String },
    MarkAllNotificationsRead,
    DeleteNotification { id: String },
    ClearAllNotifications,
    Navigate(Navigate),

    // --- Comment thread ---
    SubmitReply { parent_id: String, text: String },
    SubmitEdit { id: String, text: String },
    DeleteComment { id: String },
}
