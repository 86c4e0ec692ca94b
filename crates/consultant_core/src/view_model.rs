use chrono::{DateTime, Utc};

use crate::comments::{
    build_comment_tree, sort_comment_tree, CommentNode, SortOrder, REPLY_DEPTH_LIMIT,
};
use crate::job::{Job, JobId, JobStatus};
use crate::notifications::{group_notifications, Bucket, Notification};
use crate::paging::total_pages;
use crate::state::{AppState, PollState};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub job_queue: JobQueueView,
    pub history: JobHistoryView,
    pub notifications: NotificationCenterView,
    pub comments: CommentThreadView,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobQueueView {
    pub rows: Vec<JobRowView>,
    pub polling: bool,
    /// True until the first fetch lands; distinguishes the spinner from
    /// empty and error states.
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub company: String,
    pub status: JobStatus,
    /// Present while this job has an open progress subscription.
    pub stream: Option<StreamView>,
}

/// Fine-grained progress for one job. `Connecting` renders until the first
/// decoded snapshot arrives; transport blips fall back to it implicitly
/// because the last snapshot is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamView {
    Connecting,
    Streaming(ProgressView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub percent: u8,
    pub phase_num: u32,
    pub total_phases: u32,
    pub phase_name: String,
    pub message: String,
    pub current_agents: Vec<String>,
    pub completed_agents: Vec<String>,
    pub estimated_seconds_remaining: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobHistoryView {
    pub rows: Vec<HistoryRowView>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRowView {
    pub job_id: JobId,
    pub company: String,
    pub status: JobStatus,
    /// Presentation-only `updated_at - created_at`, e.g. "42s" or "2m 5s".
    pub duration: String,
    pub has_result: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationCenterView {
    pub groups: Vec<NotificationGroupView>,
    pub unread_count: usize,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationGroupView {
    pub bucket: Bucket,
    pub items: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentThreadView {
    pub roots: Vec<CommentNodeView>,
    pub sort: SortOrder,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNodeView {
    pub id: String,
    pub user_name: String,
    pub text: String,
    pub edited: bool,
    pub created_at: DateTime<Utc>,
    /// Roots are depth 0; indentation is proportional to this.
    pub depth: usize,
    pub can_reply: bool,
    pub replying: bool,
    pub editing: bool,
    pub replies: Vec<CommentNodeView>,
}

impl AppState {
    /// Derives the render model. `now` anchors recency grouping and is
    /// passed in to keep this function pure.
    pub fn view(&self, now: DateTime<Utc>) -> AppViewModel {
        AppViewModel {
            job_queue: self.job_queue_view(),
            history: self.history_view(),
            notifications: self.notifications_view(now),
            comments: self.comments_view(),
        }
    }

    fn job_queue_view(&self) -> JobQueueView {
        let rows = self
            .job_queue
            .jobs
            .values()
            .map(|job| JobRowView {
                job_id: job.job_id.clone(),
                company: job.company.clone(),
                status: job.status,
                stream: self.stream_view(&job.job_id),
            })
            .collect();
        JobQueueView {
            rows,
            polling: self.job_queue.poll == PollState::Polling,
            loading: self.job_queue.open && !self.job_queue.loaded,
            error: self.job_queue.error.clone(),
        }
    }

    fn stream_view(&self, job_id: &JobId) -> Option<StreamView> {
        let subscribed = self.job_queue.streams.contains(job_id);
        match self.job_queue.progress.get(job_id) {
            Some(update) => Some(StreamView::Streaming(ProgressView {
                percent: update.progress.min(100),
                phase_num: update.phase_num,
                total_phases: update.total_phases,
                phase_name: update.phase_name.clone(),
                message: update.message.clone(),
                current_agents: update.current_agents.clone(),
                completed_agents: update.completed_agents.clone(),
                estimated_seconds_remaining: update.estimated_seconds_remaining,
            })),
            None if subscribed => Some(StreamView::Connecting),
            None => None,
        }
    }

    fn history_view(&self) -> JobHistoryView {
        let rows = self
            .history
            .rows
            .iter()
            .map(|job| HistoryRowView {
                job_id: job.job_id.clone(),
                company: job.company.clone(),
                status: job.status,
                duration: format_duration(job),
                has_result: job.result.is_some(),
            })
            .collect();
        JobHistoryView {
            rows,
            page: self.history.page.max(1),
            total_pages: total_pages(self.history.total, self.history.config.page_size),
            total: self.history.total,
            loading: self.history.open && !self.history.loaded,
            error: self.history.error.clone(),
        }
    }

    fn notifications_view(&self, now: DateTime<Utc>) -> NotificationCenterView {
        let groups = group_notifications(&self.notifications.items, now)
            .into_iter()
            .map(|(bucket, items)| NotificationGroupView { bucket, items })
            .collect();
        NotificationCenterView {
            groups,
            unread_count: self
                .notifications
                .items
                .iter()
                .filter(|item| !item.read)
                .count(),
            loading: self.notifications.open && !self.notifications.loaded,
            error: self.notifications.error.clone(),
        }
    }

    fn comments_view(&self) -> CommentThreadView {
        let mut tree = build_comment_tree(&self.comments.comments);
        sort_comment_tree(&mut tree, self.comments.sort);
        CommentThreadView {
            roots: tree
                .iter()
                .map(|node| self.comment_node_view(node, 0))
                .collect(),
            sort: self.comments.sort,
            error: self.comments.error.clone(),
        }
    }

    fn comment_node_view(&self, node: &CommentNode, depth: usize) -> CommentNodeView {
        CommentNodeView {
            id: node.comment.id.clone(),
            user_name: node.comment.user_name.clone(),
            text: node.comment.text.clone(),
            edited: node.comment.updated_at.is_some(),
            created_at: node.comment.created_at,
            depth,
            can_reply: depth < REPLY_DEPTH_LIMIT,
            replying: self.comments.replying_to.as_deref() == Some(node.comment.id.as_str()),
            editing: self.comments.editing.as_deref() == Some(node.comment.id.as_str()),
            replies: node
                .replies
                .iter()
                .map(|reply| self.comment_node_view(reply, depth + 1))
                .collect(),
        }
    }
}

/// Renders `updated_at - created_at` as `Ns` under one minute, `Mm Ss`
/// otherwise. Negative spans clamp to `0s`.
pub fn format_duration(job: &Job) -> String {
    let seconds = (job.updated_at - job.created_at).num_seconds().max(0);
    if seconds < 60 {
        format!("{seconds}s")
    } else {
        format!("{}m {}s", seconds / 60, seconds % 60)
    }
}
