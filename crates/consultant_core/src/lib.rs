//! Consultant core: pure state machines and view-model helpers for the
//! ConsultantOS job, notification, and comment widgets.
mod comments;
mod effect;
mod job;
mod msg;
mod notifications;
mod paging;
mod state;
mod update;
mod view_model;

pub use comments::{
    build_comment_tree, comment_depth, flatten_ids, sort_comment_tree, Comment, CommentNode,
    SortOrder, REPLY_DEPTH_LIMIT,
};
pub use effect::Effect;
pub use job::{Job, JobId, JobOutcome, JobStatus, ProgressUpdate, DEFAULT_FAILURE_MESSAGE};
pub use msg::{Msg, Widget};
pub use notifications::{
    group_notifications, validate_link, Bucket, Navigate, Notification, NotificationKind,
};
pub use paging::{clamp_page, page_offset, total_pages};
pub use state::{
    AppConfig, AppState, HistoryConfig, JobQueueConfig, NotificationConfig, PollState,
};
pub use update::update;
pub use view_model::{
    format_duration, AppViewModel, CommentNodeView, CommentThreadView, HistoryRowView,
    JobHistoryView, JobQueueView, JobRowView, NotificationCenterView, NotificationGroupView,
    ProgressView, StreamView,
};
