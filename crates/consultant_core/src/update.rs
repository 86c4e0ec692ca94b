use std::collections::BTreeMap;

use crate::comments::{comment_depth, REPLY_DEPTH_LIMIT};
use crate::job::{Job, JobId, JobOutcome, JobStatus, ProgressUpdate, DEFAULT_FAILURE_MESSAGE};
use crate::msg::Widget;
use crate::notifications::{validate_link, Notification};
use crate::paging::{clamp_page, page_offset, total_pages};
use crate::state::PollState;
use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        // --- Job queue ---
        Msg::JobQueueOpened => {
            state.job_queue.open = true;
            state.job_queue.loaded = false;
            state.mark_dirty();
            // Immediate fetch on mount, no initial delay. Polling starts only
            // once a fetch shows at least one active job.
            vec![fetch_jobs_effect(&state)]
        }
        Msg::JobQueueClosed => {
            state.job_queue.open = false;
            state.mark_dirty();
            let mut effects = Vec::new();
            // Unmount is the hard cancellation signal: no timer or stream
            // may outlive the widget.
            let streams = std::mem::take(&mut state.job_queue.streams);
            for job_id in streams {
                effects.push(Effect::CloseProgressStream { job_id });
            }
            state.job_queue.progress.clear();
            if state.job_queue.poll == PollState::Polling {
                state.job_queue.poll = PollState::Idle;
                effects.push(Effect::StopJobPolling);
            }
            effects
        }
        Msg::JobPollTick => {
            if state.job_queue.open && state.job_queue.poll == PollState::Polling {
                vec![fetch_jobs_effect(&state)]
            } else {
                Vec::new()
            }
        }
        Msg::JobsFetched { jobs } => {
            if !state.job_queue.open {
                return (state, Vec::new());
            }
            apply_jobs_fetched(&mut state, jobs);
            state.job_queue.loaded = true;
            state.job_queue.error = None;
            state.mark_dirty();
            let mut effects = Vec::new();
            sync_job_polling(&mut state, &mut effects);
            effects
        }
        Msg::JobsFetchFailed { error } => {
            // Transient failures recover on the next tick; the timer is not
            // stopped and no backoff is applied.
            state.job_queue.error = Some(error);
            state.mark_dirty();
            Vec::new()
        }
        Msg::CancelJobClicked { job_id } => {
            let Some(job) = state.job_queue.jobs.remove(&job_id) else {
                return (state, Vec::new());
            };
            if job.status.is_terminal() {
                state.job_queue.jobs.insert(job_id, job);
                return (state, Vec::new());
            }
            state.job_queue.pending_cancels.insert(job_id.clone(), job);
            state.job_queue.progress.remove(&job_id);
            state.mark_dirty();
            let mut effects = Vec::new();
            if state.job_queue.streams.remove(&job_id) {
                effects.push(Effect::CloseProgressStream {
                    job_id: job_id.clone(),
                });
            }
            effects.push(Effect::CancelJob { job_id });
            sync_job_polling(&mut state, &mut effects);
            effects
        }
        Msg::JobCancelConfirmed { job_id } => {
            state.job_queue.pending_cancels.remove(&job_id);
            Vec::new()
        }
        Msg::JobCancelFailed { job_id, error } => {
            // Optimistic removal failed: the row comes back, nothing is
            // silently lost.
            if let Some(job) = state.job_queue.pending_cancels.remove(&job_id) {
                state.job_queue.jobs.insert(job_id, job);
            }
            state.job_queue.error = Some(error);
            state.mark_dirty();
            let mut effects = Vec::new();
            sync_job_polling(&mut state, &mut effects);
            effects
        }
        Msg::AnalysisSubmitted { job } => {
            let job_id = job.job_id.clone();
            state.job_queue.jobs.insert(job_id.clone(), job);
            state.job_queue.streams.insert(job_id.clone());
            state.mark_dirty();
            let mut effects = vec![Effect::OpenProgressStream { job_id }];
            sync_job_polling(&mut state, &mut effects);
            effects
        }
        Msg::AnalysisSubmitFailed { error } => {
            state.job_queue.error = Some(error);
            state.mark_dirty();
            Vec::new()
        }
        Msg::ProgressViewOpened { job_id } => {
            if state.is_terminal_job(&job_id) {
                return (state, Vec::new());
            }
            if state.job_queue.streams.insert(job_id.clone()) {
                state.mark_dirty();
                vec![Effect::OpenProgressStream { job_id }]
            } else {
                Vec::new()
            }
        }
        Msg::ProgressViewClosed { job_id } => {
            state.job_queue.progress.remove(&job_id);
            if state.job_queue.streams.remove(&job_id) {
                state.mark_dirty();
                vec![Effect::CloseProgressStream { job_id }]
            } else {
                Vec::new()
            }
        }
        Msg::ProgressReceived { job_id, update } => apply_progress(&mut state, job_id, update),

        // --- Job history ---
        Msg::JobHistoryOpened => {
            state.history.open = true;
            state.history.loaded = false;
            state.history.page = 1;
            state.mark_dirty();
            vec![Effect::FetchHistory {
                limit: state.history.config.page_size,
                offset: 0,
            }]
        }
        Msg::HistoryPageChanged { page } => {
            if !state.history.open {
                return (state, Vec::new());
            }
            // Requests past the last page clamp rather than error.
            let page = clamp_page(page, state.history.total, state.history.config.page_size);
            if page == state.history.page {
                return (state, Vec::new());
            }
            state.history.page = page;
            state.mark_dirty();
            vec![fetch_history_effect(&state)]
        }
        Msg::HistoryFetched { jobs, total } => {
            if !state.history.open {
                return (state, Vec::new());
            }
            apply_history_fetched(&mut state, jobs, total);
            state.history.loaded = true;
            state.history.error = None;
            state.mark_dirty();
            // After deletes elsewhere the current page can fall off the end;
            // clamp and refetch once.
            let pages = total_pages(state.history.total, state.history.config.page_size);
            if state.history.page > pages {
                state.history.page = pages;
                vec![fetch_history_effect(&state)]
            } else {
                Vec::new()
            }
        }
        Msg::HistoryFetchFailed { error } => {
            state.history.error = Some(error);
            state.mark_dirty();
            Vec::new()
        }
        Msg::DeleteJobClicked { job_id } => {
            let Some(index) = state
                .history
                .rows
                .iter()
                .position(|job| job.job_id == job_id)
            else {
                return (state, Vec::new());
            };
            let job = state.history.rows.remove(index);
            state.history.total = state.history.total.saturating_sub(1);
            state
                .history
                .pending_deletes
                .insert(job_id.clone(), (index, job));
            state.mark_dirty();
            vec![Effect::DeleteJob { job_id }]
        }
        Msg::JobDeleteConfirmed { job_id } => {
            state.history.pending_deletes.remove(&job_id);
            if state.history.rows.is_empty() && state.history.total > 0 {
                state.history.page =
                    clamp_page(state.history.page, state.history.total, state.history.config.page_size);
                state.mark_dirty();
                vec![fetch_history_effect(&state)]
            } else {
                Vec::new()
            }
        }
        Msg::JobDeleteFailed { job_id, error } => {
            if let Some((index, job)) = state.history.pending_deletes.remove(&job_id) {
                let index = index.min(state.history.rows.len());
                state.history.rows.insert(index, job);
                state.history.total += 1;
            }
            state.history.error = Some(error);
            state.mark_dirty();
            Vec::new()
        }
        Msg::DownloadResultClicked { job_id } => {
            let payload = state
                .history
                .rows
                .iter()
                .find(|job| job.job_id == job_id)
                .and_then(|job| job.result.clone());
            match payload {
                Some(payload) => vec![Effect::DeliverResult { job_id, payload }],
                None => Vec::new(),
            }
        }

        // --- Notification center ---
        Msg::NotificationCenterOpened { user_id } => {
            state.notifications.open = true;
            state.notifications.loaded = false;
            state.notifications.user_id = Some(user_id.clone());
            state.mark_dirty();
            vec![
                Effect::FetchNotifications {
                    user_id: user_id.clone(),
                },
                Effect::StartNotificationPolling {
                    user_id,
                    interval: state.notifications.config.poll_interval,
                },
            ]
        }
        Msg::NotificationCenterClosed => {
            state.notifications.open = false;
            state.mark_dirty();
            vec![Effect::StopNotificationPolling]
        }
        Msg::NotificationPollTick => {
            if state.notifications.open {
                refetch_notifications(&state)
            } else {
                Vec::new()
            }
        }
        Msg::NotificationsFetched { notifications } => {
            if !state.notifications.open {
                return (state, Vec::new());
            }
            apply_notifications_fetched(&mut state, notifications);
            state.notifications.loaded = true;
            state.notifications.error = None;
            state.mark_dirty();
            Vec::new()
        }
        Msg::NotificationsFetchFailed { error } => {
            state.notifications.error = Some(error);
            state.mark_dirty();
            Vec::new()
        }
        Msg::NotificationClicked { id } => {
            let Some(index) = state
                .notifications
                .items
                .iter()
                .position(|item| item.id == id)
            else {
                return (state, Vec::new());
            };
            let mut effects = Vec::new();
            if !state.notifications.items[index].read {
                // Fire-and-forget: no rollback entry for click-through reads.
                state.notifications.items[index].read = true;
                state.mark_dirty();
                effects.push(Effect::MarkNotificationRead { id });
            }
            if let Some(link) = state.notifications.items[index].link.clone() {
                match validate_link(&link) {
                    Some(target) => effects.push(Effect::Navigate(target)),
                    None => {
                        log::warn!("rejected notification link with disallowed scheme: {link}")
                    }
                }
            }
            effects
        }
        Msg::MarkReadClicked { id } => {
            let Some(item) = state
                .notifications
                .items
                .iter_mut()
                .find(|item| item.id == id)
            else {
                return (state, Vec::new());
            };
            if item.read || state.notifications.pending_reads.contains_key(&id) {
                return (state, Vec::new());
            }
            let previous = item.read;
            item.read = true;
            state.notifications.pending_reads.insert(id.clone(), previous);
            state.mark_dirty();
            vec![Effect::MarkNotificationRead { id }]
        }
        Msg::MarkReadConfirmed { id } => {
            state.notifications.pending_reads.remove(&id);
            Vec::new()
        }
        Msg::MarkReadFailed { id, error } => {
            if let Some(previous) = state.notifications.pending_reads.remove(&id) {
                if let Some(item) = state
                    .notifications
                    .items
                    .iter_mut()
                    .find(|item| item.id == id)
                {
                    item.read = previous;
                }
            }
            state.notifications.error = Some(error);
            state.mark_dirty();
            Vec::new()
        }
        Msg::MarkAllReadClicked => {
            if state.notifications.items.iter().all(|item| item.read) {
                return (state, Vec::new());
            }
            for item in &mut state.notifications.items {
                item.read = true;
            }
            state.mark_dirty();
            vec![Effect::MarkAllNotificationsRead]
        }
        Msg::MarkAllReadConfirmed => Vec::new(),
        Msg::MarkAllReadFailed { error } => {
            // The pre-mutation flags were discarded; a re-fetch restores
            // server truth instead of reconstructing partial state.
            state.notifications.error = Some(error);
            state.mark_dirty();
            refetch_notifications(&state)
        }
        Msg::DeleteNotificationClicked { id } => {
            let Some(index) = state
                .notifications
                .items
                .iter()
                .position(|item| item.id == id)
            else {
                return (state, Vec::new());
            };
            let item = state.notifications.items.remove(index);
            state
                .notifications
                .pending_deletes
                .insert(id.clone(), (index, item));
            state.mark_dirty();
            vec![Effect::DeleteNotification { id }]
        }
        Msg::DeleteNotificationConfirmed { id } => {
            state.notifications.pending_deletes.remove(&id);
            Vec::new()
        }
        Msg::DeleteNotificationFailed { id, error } => {
            if let Some((index, item)) = state.notifications.pending_deletes.remove(&id) {
                let index = index.min(state.notifications.items.len());
                state.notifications.items.insert(index, item);
            }
            state.notifications.error = Some(error);
            state.mark_dirty();
            Vec::new()
        }
        Msg::ClearAllClicked => {
            if state.notifications.items.is_empty() {
                return (state, Vec::new());
            }
            state.notifications.items.clear();
            state.notifications.pending_reads.clear();
            // A stale single-delete failure must not restore its stashed row
            // into the emptied list.
            state.notifications.pending_deletes.clear();
            state.mark_dirty();
            vec![Effect::ClearAllNotifications]
        }
        Msg::ClearAllConfirmed => Vec::new(),
        Msg::ClearAllFailed { error } => {
            state.notifications.error = Some(error);
            state.mark_dirty();
            refetch_notifications(&state)
        }

        // --- Comment thread ---
        Msg::CommentsFetched { comments } => {
            state.comments.comments = comments;
            state.comments.error = None;
            // Composer targets that vanished with the refresh are dropped.
            if let Some(id) = state.comments.replying_to.clone() {
                if !state.comments.contains(&id) {
                    state.comments.replying_to = None;
                }
            }
            if let Some(id) = state.comments.editing.clone() {
                if !state.comments.contains(&id) {
                    state.comments.editing = None;
                }
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::CommentSortToggled => {
            state.comments.sort = state.comments.sort.toggled();
            state.mark_dirty();
            Vec::new()
        }
        Msg::ReplyClicked { id } => {
            if !state.comments.contains(&id) {
                return (state, Vec::new());
            }
            if comment_depth(&state.comments.comments, &id) >= REPLY_DEPTH_LIMIT {
                return (state, Vec::new());
            }
            // Opening a reply closes any open edit, and vice versa.
            state.comments.editing = None;
            state.comments.replying_to = match state.comments.replying_to.take() {
                Some(current) if current == id => None,
                _ => Some(id),
            };
            state.mark_dirty();
            Vec::new()
        }
        Msg::EditClicked { id } => {
            if !state.comments.contains(&id) {
                return (state, Vec::new());
            }
            state.comments.replying_to = None;
            state.comments.editing = match state.comments.editing.take() {
                Some(current) if current == id => None,
                _ => Some(id),
            };
            state.mark_dirty();
            Vec::new()
        }
        Msg::ComposerDismissed => {
            state.comments.replying_to = None;
            state.comments.editing = None;
            state.mark_dirty();
            Vec::new()
        }
        Msg::ReplySubmitted { parent_id, text } => {
            let text = text.trim().to_string();
            if text.is_empty() || !state.comments.contains(&parent_id) {
                return (state, Vec::new());
            }
            state.comments.replying_to = None;
            state.mark_dirty();
            vec![Effect::SubmitReply { parent_id, text }]
        }
        Msg::EditSubmitted { id, text } => {
            let text = text.trim().to_string();
            if text.is_empty() || !state.comments.contains(&id) {
                return (state, Vec::new());
            }
            state.comments.editing = None;
            state.mark_dirty();
            vec![Effect::SubmitEdit { id, text }]
        }
        Msg::DeleteCommentClicked { id } => {
            if state.comments.contains(&id) {
                vec![Effect::DeleteComment { id }]
            } else {
                Vec::new()
            }
        }
        Msg::CommentMutationFailed { error } => {
            state.comments.error = Some(error);
            state.mark_dirty();
            Vec::new()
        }

        // --- Shared ---
        Msg::ErrorDismissed { widget } => {
            let slot = match widget {
                Widget::JobQueue => &mut state.job_queue.error,
                Widget::JobHistory => &mut state.history.error,
                Widget::Notifications => &mut state.notifications.error,
                Widget::Comments => &mut state.comments.error,
            };
            if slot.take().is_some() {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn fetch_jobs_effect(state: &AppState) -> Effect {
    Effect::FetchJobs {
        statuses: state.job_queue.fetch_statuses(),
        limit: state.job_queue.config.page_cap,
        offset: 0,
    }
}

fn fetch_history_effect(state: &AppState) -> Effect {
    Effect::FetchHistory {
        limit: state.history.config.page_size,
        offset: page_offset(state.history.page, state.history.config.page_size),
    }
}

fn refetch_notifications(state: &AppState) -> Vec<Effect> {
    match &state.notifications.user_id {
        Some(user_id) => vec![Effect::FetchNotifications {
            user_id: user_id.clone(),
        }],
        None => Vec::new(),
    }
}

/// Replaces the queue's job set from a fresh list fetch, honoring the
/// terminal-status monotonicity invariant.
fn apply_jobs_fetched(state: &mut AppState, jobs: Vec<Job>) {
    let cap = state.job_queue.config.page_cap;
    let show_completed = state.job_queue.config.show_completed;
    let mut next: BTreeMap<JobId, Job> = BTreeMap::new();

    for job in jobs {
        if next.len() >= cap {
            break;
        }
        // A cancel is in flight for this row; do not resurrect it.
        if state.job_queue.pending_cancels.contains_key(&job.job_id) {
            continue;
        }
        if state.is_terminal_job(&job.job_id) && !job.status.is_terminal() {
            log::warn!(
                "job {} reported {} after a terminal status was observed; keeping terminal",
                job.job_id,
                job.status
            );
            continue;
        }
        if job.status.is_terminal() {
            state.record_terminal(&job.job_id);
            if !show_completed {
                continue;
            }
        }
        next.insert(job.job_id.clone(), job);
    }

    state.job_queue.jobs = next;
}

/// Stream snapshot handling, including the one-shot terminal hand-off.
fn apply_progress(state: &mut AppState, job_id: JobId, update: ProgressUpdate) -> Vec<Effect> {
    // Once terminal, always terminal: late or duplicate events are dropped
    // so the finish hand-off cannot fire twice.
    if state.is_terminal_job(&job_id) {
        return Vec::new();
    }

    let terminal_status = update.status.filter(|status| status.is_terminal());
    state
        .job_queue
        .progress
        .insert(job_id.clone(), update.clone());
    state.mark_dirty();

    let Some(status) = terminal_status else {
        return Vec::new();
    };

    state.record_terminal(&job_id);
    state.job_queue.streams.remove(&job_id);

    let outcome = match status {
        JobStatus::Failed => JobOutcome::Failed {
            error: update
                .error
                .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
        },
        _ => JobOutcome::Completed {
            result: state
                .job_queue
                .jobs
                .get(&job_id)
                .and_then(|job| job.result.clone()),
        },
    };

    if state.job_queue.config.show_completed {
        if let Some(job) = state.job_queue.jobs.get_mut(&job_id) {
            job.status = status;
        }
    } else {
        state.job_queue.jobs.remove(&job_id);
        state.job_queue.progress.remove(&job_id);
    }

    let mut effects = vec![
        Effect::CloseProgressStream {
            job_id: job_id.clone(),
        },
        Effect::NotifyJobFinished { job_id, outcome },
    ];
    sync_job_polling(state, &mut effects);
    effects
}

fn apply_history_fetched(state: &mut AppState, jobs: Vec<Job>, total: usize) {
    let mut rows = Vec::with_capacity(jobs.len());
    for job in jobs {
        if state.history.pending_deletes.contains_key(&job.job_id) {
            continue;
        }
        if !job.status.is_terminal() {
            // History is a terminal-only listing; an active job here is a
            // data-quality problem, not a crash.
            log::warn!(
                "history listing returned non-terminal job {} ({})",
                job.job_id,
                job.status
            );
            continue;
        }
        state.record_terminal(&job.job_id);
        rows.push(job);
    }
    state.history.rows = rows;
    state.history.total = total;
}

fn apply_notifications_fetched(state: &mut AppState, notifications: Vec<Notification>) {
    let mut items: Vec<Notification> = notifications
        .into_iter()
        .filter(|item| !state.notifications.pending_deletes.contains_key(&item.id))
        .collect();
    // Overlay in-flight optimistic reads so a racing fetch cannot flip a
    // flag back before the server confirms.
    for item in &mut items {
        if state.notifications.pending_reads.contains_key(&item.id) {
            item.read = true;
        }
    }
    state.notifications.items = items;
}

/// Drives the `{Idle, Polling}` machine from the current job set, pushing
/// the edge-triggered start/stop effects.
fn sync_job_polling(state: &mut AppState, effects: &mut Vec<Effect>) {
    let should_poll = state.job_queue.open && state.job_queue.has_active();
    match (state.job_queue.poll, should_poll) {
        (PollState::Idle, true) => {
            state.job_queue.poll = PollState::Polling;
            effects.push(Effect::StartJobPolling {
                interval: state.job_queue.config.poll_interval,
            });
        }
        (PollState::Polling, false) => {
            state.job_queue.poll = PollState::Idle;
            effects.push(Effect::StopJobPolling);
        }
        _ => {}
    }
}
