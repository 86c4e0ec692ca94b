use crate::comments::Comment;
use crate::job::{Job, JobId, ProgressUpdate};
use crate::notifications::Notification;

/// Widgets that own an independent, dismissible error banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    JobQueue,
    JobHistory,
    Notifications,
    Comments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    // --- Job queue ---
    /// Queue widget mounted; triggers an immediate fetch.
    JobQueueOpened,
    /// Queue widget unmounted; all timers and streams for it must stop.
    JobQueueClosed,
    /// Poll timer tick for the job list.
    JobPollTick,
    /// Filtered job list arrived from the backend.
    JobsFetched { jobs: Vec<Job> },
    JobsFetchFailed { error: String },
    /// User asked to cancel a non-terminal job.
    CancelJobClicked { job_id: JobId },
    JobCancelConfirmed { job_id: JobId },
    JobCancelFailed { job_id: JobId, error: String },
    /// An async submission was accepted; a pending row appears immediately.
    AnalysisSubmitted { job: Job },
    AnalysisSubmitFailed { error: String },
    /// User opened the fine-grained progress view for one job.
    ProgressViewOpened { job_id: JobId },
    ProgressViewClosed { job_id: JobId },
    /// Decoded snapshot from the job's event stream.
    ProgressReceived { job_id: JobId, update: ProgressUpdate },

    // --- Job history ---
    JobHistoryOpened,
    HistoryPageChanged { page: usize },
    HistoryFetched { jobs: Vec<Job>, total: usize },
    HistoryFetchFailed { error: String },
    DeleteJobClicked { job_id: JobId },
    JobDeleteConfirmed { job_id: JobId },
    JobDeleteFailed { job_id: JobId, error: String },
    DownloadResultClicked { job_id: JobId },

    // --- Notification center ---
    NotificationCenterOpened { user_id: String },
    NotificationCenterClosed,
    NotificationPollTick,
    NotificationsFetched { notifications: Vec<Notification> },
    NotificationsFetchFailed { error: String },
    /// Click-through: mark read fire-and-forget, then navigate.
    NotificationClicked { id: String },
    MarkReadClicked { id: String },
    MarkReadConfirmed { id: String },
    MarkReadFailed { id: String, error: String },
    MarkAllReadClicked,
    MarkAllReadConfirmed,
    MarkAllReadFailed { error: String },
    DeleteNotificationClicked { id: String },
    DeleteNotificationConfirmed { id: String },
    DeleteNotificationFailed { id: String, error: String },
    ClearAllClicked,
    ClearAllConfirmed,
    ClearAllFailed { error: String },

    // --- Comment thread ---
    /// Fresh flat list from the owning view; the tree is rebuilt on read.
    CommentsFetched { comments: Vec<Comment> },
    CommentSortToggled,
    ReplyClicked { id: String },
    EditClicked { id: String },
    ComposerDismissed,
    ReplySubmitted { parent_id: String, text: String },
    EditSubmitted { id: String, text: String },
    DeleteCommentClicked { id: String },
    CommentMutationFailed { error: String },

    // --- Shared ---
    ErrorDismissed { widget: Widget },
    /// Fallback for placeholder wiring.
    NoOp,
}
