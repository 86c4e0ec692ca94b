//! Effect execution: translates core effects into API calls, poll timers,
//! and progress-stream tasks, feeding resulting messages back to the shell.

use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use client_logging::{client_debug, client_info, client_warn};
use tokio::runtime::Runtime;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use consultant_core::{
    Effect, Job, JobId, JobOutcome, JobStatus, Msg, Navigate, ProgressUpdate,
};

use crate::api::{BackendApi, CommentBackend, ReqwestApi};
use crate::progress::{ProgressSink, ProgressSource};
use crate::settings::ApiSettings;
use crate::types::AnalysisRequest;

pub type JobFinishedHook = Arc<dyn Fn(&JobId, &JobOutcome) + Send + Sync>;
pub type ResultHook = Arc<dyn Fn(&JobId, &str) + Send + Sync>;
pub type NavigateHook = Arc<dyn Fn(&Navigate) + Send + Sync>;

/// Outward-facing callbacks into the embedding shell. All optional; absent
/// hooks reduce to a log line.
#[derive(Clone, Default)]
pub struct ShellHooks {
    /// Fired once per job on the terminal hand-off.
    pub on_job_finished: Option<JobFinishedHook>,
    /// Receives the opaque result payload for a download action.
    pub on_result: Option<ResultHook>,
    /// Receives validated navigation targets.
    pub on_navigate: Option<NavigateHook>,
}

enum Command {
    Run(Effect),
    Submit(AnalysisRequest),
}

/// Handle to the effect runner. Commands go in over a channel; `Msg`s come
/// back out for the shell's update loop. A dedicated thread owns the tokio
/// runtime, mirroring a single-owner event loop.
pub struct SyncHandle {
    cmd_tx: mpsc::Sender<Command>,
    msg_rx: mpsc::Receiver<Msg>,
}

impl SyncHandle {
    pub fn new(
        api: Arc<dyn BackendApi>,
        progress: Arc<dyn ProgressSource>,
        comments: Arc<dyn CommentBackend>,
        hooks: ShellHooks,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (msg_tx, msg_rx) = mpsc::channel::<Msg>();

        thread::spawn(move || {
            let runtime = Runtime::new().expect("tokio runtime");
            let ctx = Arc::new(RunnerContext {
                api,
                progress,
                comments,
                hooks,
                msg_tx,
                timers: Mutex::new(Timers::default()),
            });
            // Timer bookkeeping happens synchronously here so start/stop
            // ordering is preserved; only IO gets spawned.
            while let Ok(command) = cmd_rx.recv() {
                dispatch(&runtime, &ctx, command);
            }
        });

        Self { cmd_tx, msg_rx }
    }

    /// Convenience constructor wiring the reqwest implementation for both
    /// REST and streaming.
    pub fn from_settings(
        settings: ApiSettings,
        comments: Arc<dyn CommentBackend>,
        hooks: ShellHooks,
    ) -> Result<Self, crate::ApiError> {
        let api = Arc::new(ReqwestApi::new(settings)?);
        Ok(Self::new(api.clone(), api, comments, hooks))
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            let _ = self.cmd_tx.send(Command::Run(effect));
        }
    }

    /// Submits an analysis asynchronously; the accepted job surfaces as
    /// `Msg::AnalysisSubmitted` with a pending row.
    pub fn submit(&self, request: AnalysisRequest) {
        let _ = self.cmd_tx.send(Command::Submit(request));
    }

    pub fn try_recv(&self) -> Option<Msg> {
        self.msg_rx.try_recv().ok()
    }
}

#[derive(Default)]
struct Timers {
    job_poll: Option<CancellationToken>,
    notification_poll: Option<CancellationToken>,
    streams: HashMap<JobId, CancellationToken>,
}

struct RunnerContext {
    api: Arc<dyn BackendApi>,
    progress: Arc<dyn ProgressSource>,
    comments: Arc<dyn CommentBackend>,
    hooks: ShellHooks,
    msg_tx: mpsc::Sender<Msg>,
    timers: Mutex<Timers>,
}

impl RunnerContext {
    fn send(&self, msg: Msg) {
        let _ = self.msg_tx.send(msg);
    }

    fn timers(&self) -> std::sync::MutexGuard<'_, Timers> {
        self.timers.lock().expect("lock runner timers")
    }
}

#[derive(Clone, Copy)]
enum PollKind {
    Jobs,
    Notifications,
}

fn dispatch(runtime: &Runtime, ctx: &Arc<RunnerContext>, command: Command) {
    let effect = match command {
        Command::Submit(request) => {
            let ctx = ctx.clone();
            runtime.spawn(async move { submit_analysis(ctx, request).await });
            return;
        }
        Command::Run(effect) => effect,
    };

    match effect {
        Effect::StartJobPolling { interval } => {
            let mut timers = ctx.timers();
            if let Some(previous) = timers.job_poll.take() {
                previous.cancel();
            }
            let token = CancellationToken::new();
            timers.job_poll = Some(token.clone());
            let ctx = ctx.clone();
            runtime.spawn(async move { poll_loop(ctx, interval, token, PollKind::Jobs).await });
        }
        Effect::StopJobPolling => {
            if let Some(token) = ctx.timers().job_poll.take() {
                token.cancel();
            }
        }
        Effect::StartNotificationPolling { interval, .. } => {
            let mut timers = ctx.timers();
            if let Some(previous) = timers.notification_poll.take() {
                previous.cancel();
            }
            let token = CancellationToken::new();
            timers.notification_poll = Some(token.clone());
            let ctx = ctx.clone();
            runtime
                .spawn(async move { poll_loop(ctx, interval, token, PollKind::Notifications).await });
        }
        Effect::StopNotificationPolling => {
            if let Some(token) = ctx.timers().notification_poll.take() {
                token.cancel();
            }
        }
        Effect::OpenProgressStream { job_id } => {
            let mut timers = ctx.timers();
            if timers.streams.contains_key(&job_id) {
                client_debug!("progress stream for job {job_id} already open");
                return;
            }
            let token = CancellationToken::new();
            timers.streams.insert(job_id.clone(), token.clone());
            let ctx = ctx.clone();
            runtime.spawn(async move { run_stream(ctx, job_id, token).await });
        }
        Effect::CloseProgressStream { job_id } => {
            if let Some(token) = ctx.timers().streams.remove(&job_id) {
                token.cancel();
            }
        }
        Effect::NotifyJobFinished { job_id, outcome } => {
            client_info!("job {job_id} finished: {outcome:?}");
            if let Some(hook) = &ctx.hooks.on_job_finished {
                hook(&job_id, &outcome);
            }
        }
        Effect::DeliverResult { job_id, payload } => {
            if let Some(hook) = &ctx.hooks.on_result {
                hook(&job_id, &payload);
            } else {
                client_warn!("result for job {job_id} dropped: no result hook installed");
            }
        }
        Effect::Navigate(target) => {
            client_info!("navigation requested: {target:?}");
            if let Some(hook) = &ctx.hooks.on_navigate {
                hook(&target);
            }
        }
        other => {
            let ctx = ctx.clone();
            runtime.spawn(async move { run_api_call(ctx, other).await });
        }
    }
}

async fn poll_loop(
    ctx: Arc<RunnerContext>,
    interval: Duration,
    cancel: CancellationToken,
    kind: PollKind,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The mount fetch already happened; consume the immediate first tick.
    ticker.tick().await;
    let mut cycle: u64 = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                cycle += 1;
                client_logging::set_poll_cycle(cycle);
                let msg = match kind {
                    PollKind::Jobs => Msg::JobPollTick,
                    PollKind::Notifications => Msg::NotificationPollTick,
                };
                if ctx.msg_tx.send(msg).is_err() {
                    return;
                }
            }
        }
    }
}

struct ChannelSink {
    msg_tx: mpsc::Sender<Msg>,
}

impl ProgressSink for ChannelSink {
    fn deliver(&self, job_id: &JobId, update: ProgressUpdate) {
        let _ = self.msg_tx.send(Msg::ProgressReceived {
            job_id: job_id.clone(),
            update,
        });
    }
}

async fn run_stream(ctx: Arc<RunnerContext>, job_id: JobId, cancel: CancellationToken) {
    let sink = ChannelSink {
        msg_tx: ctx.msg_tx.clone(),
    };
    ctx.progress.subscribe(&job_id, &sink, &cancel).await;
    ctx.timers().streams.remove(&job_id);
}

async fn submit_analysis(ctx: Arc<RunnerContext>, request: AnalysisRequest) {
    match ctx.api.submit_analysis_async(&request).await {
        Ok(job_id) => {
            client_info!("analysis accepted for {}: job {job_id}", request.company);
            let now = Utc::now();
            ctx.send(Msg::AnalysisSubmitted {
                job: Job {
                    job_id,
                    status: JobStatus::Pending,
                    company: request.company,
                    result: None,
                    created_at: now,
                    updated_at: now,
                },
            });
        }
        Err(err) => ctx.send(Msg::AnalysisSubmitFailed {
            error: err.to_string(),
        }),
    }
}

async fn run_api_call(ctx: Arc<RunnerContext>, effect: Effect) {
    match effect {
        Effect::FetchJobs {
            statuses,
            limit,
            offset,
        } => {
            let msg = match ctx.api.list_jobs(&statuses, limit, offset).await {
                Ok(page) => Msg::JobsFetched { jobs: page.jobs },
                Err(err) => Msg::JobsFetchFailed {
                    error: err.to_string(),
                },
            };
            ctx.send(msg);
        }
        Effect::CancelJob { job_id } => {
            let msg = match ctx.api.delete_job(&job_id).await {
                Ok(()) => Msg::JobCancelConfirmed { job_id },
                Err(err) => Msg::JobCancelFailed {
                    job_id,
                    error: err.to_string(),
                },
            };
            ctx.send(msg);
        }
        Effect::FetchHistory { limit, offset } => {
            let statuses = [JobStatus::Completed, JobStatus::Failed];
            let msg = match ctx.api.list_jobs(&statuses, limit, offset).await {
                Ok(page) => Msg::HistoryFetched {
                    jobs: page.jobs,
                    total: page.total,
                },
                Err(err) => Msg::HistoryFetchFailed {
                    error: err.to_string(),
                },
            };
            ctx.send(msg);
        }
        Effect::DeleteJob { job_id } => {
            let msg = match ctx.api.delete_job(&job_id).await {
                Ok(()) => Msg::JobDeleteConfirmed { job_id },
                Err(err) => Msg::JobDeleteFailed {
                    job_id,
                    error: err.to_string(),
                },
            };
            ctx.send(msg);
        }
        Effect::FetchNotifications { user_id } => {
            let msg = match ctx.api.list_notifications(&user_id).await {
                Ok(notifications) => Msg::NotificationsFetched { notifications },
                Err(err) => Msg::NotificationsFetchFailed {
                    error: err.to_string(),
                },
            };
            ctx.send(msg);
        }
        Effect::MarkNotificationRead { id } => {
            let msg = match ctx.api.mark_notification_read(&id).await {
                Ok(()) => Msg::MarkReadConfirmed { id },
                Err(err) => Msg::MarkReadFailed {
                    id,
                    error: err.to_string(),
                },
            };
            ctx.send(msg);
        }
        Effect::MarkAllNotificationsRead => {
            let msg = match ctx.api.mark_all_notifications_read().await {
                Ok(()) => Msg::MarkAllReadConfirmed,
                Err(err) => Msg::MarkAllReadFailed {
                    error: err.to_string(),
                },
            };
            ctx.send(msg);
        }
        Effect::DeleteNotification { id } => {
            let msg = match ctx.api.delete_notification(&id).await {
                Ok(()) => Msg::DeleteNotificationConfirmed { id },
                Err(err) => Msg::DeleteNotificationFailed {
                    id,
                    error: err.to_string(),
                },
            };
            ctx.send(msg);
        }
        Effect::ClearAllNotifications => {
            let msg = match ctx.api.clear_all_notifications().await {
                Ok(()) => Msg::ClearAllConfirmed,
                Err(err) => Msg::ClearAllFailed {
                    error: err.to_string(),
                },
            };
            ctx.send(msg);
        }
        Effect::SubmitReply { parent_id, text } => {
            run_comment_mutation(&ctx, ctx.comments.create_reply(&parent_id, &text).await).await;
        }
        Effect::SubmitEdit { id, text } => {
            run_comment_mutation(&ctx, ctx.comments.update(&id, &text).await).await;
        }
        Effect::DeleteComment { id } => {
            run_comment_mutation(&ctx, ctx.comments.delete(&id).await).await;
        }
        // Timer and hook effects are handled synchronously in dispatch.
        other => client_warn!("unexpected effect reached the io path: {other:?}"),
    }
}

/// After a successful mutation the flat source collection is re-fetched;
/// the thread never splices optimistically.
async fn run_comment_mutation(ctx: &Arc<RunnerContext>, outcome: Result<(), crate::ApiError>) {
    let msg = match outcome {
        Ok(()) => match ctx.comments.list().await {
            Ok(comments) => Msg::CommentsFetched { comments },
            Err(err) => Msg::CommentMutationFailed {
                error: err.to_string(),
            },
        },
        Err(err) => Msg::CommentMutationFailed {
            error: err.to_string(),
        },
    };
    ctx.send(msg);
}
