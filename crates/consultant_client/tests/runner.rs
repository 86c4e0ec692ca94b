use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use consultant_client::{
    AnalysisRequest, ApiError, BackendApi, CommentBackend, JobPage, ProgressSink, ProgressSource,
    ShellHooks, SyncHandle,
};
use consultant_core::{
    Comment, Effect, Job, JobId, JobOutcome, JobStatus, Msg, Notification, ProgressUpdate,
};

fn job(id: &str, status: JobStatus) -> Job {
    let now = Utc::now();
    Job {
        job_id: JobId::from(id),
        status,
        company: format!("{id} corp"),
        result: None,
        created_at: now,
        updated_at: now,
    }
}

/// Canned backend that answers from fixed data and counts calls.
#[derive(Default)]
struct StubApi {
    jobs: Mutex<Vec<Job>>,
    fail_deletes: bool,
}

#[async_trait]
impl BackendApi for StubApi {
    async fn list_jobs(
        &self,
        _statuses: &[JobStatus],
        _limit: usize,
        _offset: usize,
    ) -> Result<JobPage, ApiError> {
        let jobs = self.jobs.lock().unwrap().clone();
        let total = jobs.len();
        Ok(JobPage { jobs, total })
    }

    async fn delete_job(&self, _job_id: &JobId) -> Result<(), ApiError> {
        if self.fail_deletes {
            Err(ApiError::Status(409))
        } else {
            Ok(())
        }
    }

    async fn list_notifications(&self, _user_id: &str) -> Result<Vec<Notification>, ApiError> {
        Ok(Vec::new())
    }

    async fn mark_notification_read(&self, _id: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        Ok(())
    }

    async fn delete_notification(&self, _id: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn clear_all_notifications(&self) -> Result<(), ApiError> {
        Ok(())
    }

    async fn submit_analysis(
        &self,
        _request: &AnalysisRequest,
    ) -> Result<serde_json::Value, ApiError> {
        Ok(serde_json::json!({}))
    }

    async fn submit_analysis_async(&self, _request: &AnalysisRequest) -> Result<JobId, ApiError> {
        Ok(JobId::from("abc123"))
    }
}

/// Progress source that emits a fixed script of snapshots.
struct StubProgress {
    script: Vec<ProgressUpdate>,
}

#[async_trait]
impl ProgressSource for StubProgress {
    async fn subscribe(
        &self,
        job_id: &JobId,
        sink: &dyn ProgressSink,
        _cancel: &tokio_util::sync::CancellationToken,
    ) {
        for update in &self.script {
            sink.deliver(job_id, update.clone());
        }
    }
}

#[derive(Default)]
struct StubComments {
    comments: Mutex<Vec<Comment>>,
}

#[async_trait]
impl CommentBackend for StubComments {
    async fn list(&self) -> Result<Vec<Comment>, ApiError> {
        Ok(self.comments.lock().unwrap().clone())
    }

    async fn create_reply(&self, parent_id: &str, text: &str) -> Result<(), ApiError> {
        let mut comments = self.comments.lock().unwrap();
        let id = format!("r-{}", comments.len());
        comments.push(Comment {
            id,
            user_id: "u1".to_string(),
            user_name: "User".to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
            updated_at: None,
            parent_id: Some(parent_id.to_string()),
        });
        Ok(())
    }

    async fn update(&self, _id: &str, _text: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn delete(&self, _id: &str) -> Result<(), ApiError> {
        Err(ApiError::Status(403))
    }
}

fn handle_with(api: Arc<StubApi>, progress: StubProgress, hooks: ShellHooks) -> SyncHandle {
    SyncHandle::new(
        api,
        Arc::new(progress),
        Arc::new(StubComments::default()),
        hooks,
    )
}

fn recv_msg(handle: &SyncHandle) -> Msg {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Some(msg) = handle.try_recv() {
            return msg;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("no message arrived within the deadline");
}

#[test]
fn fetch_effect_round_trips_into_a_jobs_message() {
    let api = Arc::new(StubApi {
        jobs: Mutex::new(vec![job("a", JobStatus::Running)]),
        ..StubApi::default()
    });
    let handle = handle_with(api, StubProgress { script: vec![] }, ShellHooks::default());
    handle.enqueue(vec![Effect::FetchJobs {
        statuses: vec![JobStatus::Pending, JobStatus::Running],
        limit: 50,
        offset: 0,
    }]);
    match recv_msg(&handle) {
        Msg::JobsFetched { jobs } => {
            assert_eq!(jobs.len(), 1);
            assert_eq!(jobs[0].job_id, JobId::from("a"));
        }
        other => panic!("expected JobsFetched, got {other:?}"),
    }
}

#[test]
fn failed_delete_answers_with_the_failure_message() {
    let api = Arc::new(StubApi {
        fail_deletes: true,
        ..StubApi::default()
    });
    let handle = handle_with(api, StubProgress { script: vec![] }, ShellHooks::default());
    handle.enqueue(vec![Effect::DeleteJob {
        job_id: JobId::from("a"),
    }]);
    match recv_msg(&handle) {
        Msg::JobDeleteFailed { job_id, error } => {
            assert_eq!(job_id, JobId::from("a"));
            assert!(error.contains("409"));
        }
        other => panic!("expected JobDeleteFailed, got {other:?}"),
    }
}

#[test]
fn open_stream_feeds_progress_messages_back() {
    let script = vec![
        ProgressUpdate {
            status: Some(JobStatus::Running),
            progress: 50,
            ..ProgressUpdate::default()
        },
        ProgressUpdate {
            status: Some(JobStatus::Completed),
            progress: 100,
            ..ProgressUpdate::default()
        },
    ];
    let handle = handle_with(
        Arc::new(StubApi::default()),
        StubProgress { script },
        ShellHooks::default(),
    );
    handle.enqueue(vec![Effect::OpenProgressStream {
        job_id: JobId::from("abc123"),
    }]);
    match recv_msg(&handle) {
        Msg::ProgressReceived { job_id, update } => {
            assert_eq!(job_id, JobId::from("abc123"));
            assert_eq!(update.progress, 50);
        }
        other => panic!("expected ProgressReceived, got {other:?}"),
    }
    match recv_msg(&handle) {
        Msg::ProgressReceived { update, .. } => assert!(update.is_terminal()),
        other => panic!("expected ProgressReceived, got {other:?}"),
    }
}

#[test]
fn finish_effect_invokes_the_shell_hook() {
    let finished: Arc<Mutex<Vec<JobId>>> = Arc::default();
    let seen = finished.clone();
    let hooks = ShellHooks {
        on_job_finished: Some(Arc::new(move |job_id, _outcome| {
            seen.lock().unwrap().push(job_id.clone());
        })),
        ..ShellHooks::default()
    };
    let handle = handle_with(
        Arc::new(StubApi::default()),
        StubProgress { script: vec![] },
        hooks,
    );
    handle.enqueue(vec![Effect::NotifyJobFinished {
        job_id: JobId::from("abc123"),
        outcome: JobOutcome::Completed { result: None },
    }]);

    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if !finished.lock().unwrap().is_empty() {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(finished.lock().unwrap().as_slice(), &[JobId::from("abc123")]);
    // The hook consumed the effect; nothing is echoed back as a message.
    assert!(handle.try_recv().is_none());
}

#[test]
fn submission_answers_with_a_pending_job_row() {
    let handle = handle_with(
        Arc::new(StubApi::default()),
        StubProgress { script: vec![] },
        ShellHooks::default(),
    );
    handle.submit(AnalysisRequest::new("Acme GmbH"));
    match recv_msg(&handle) {
        Msg::AnalysisSubmitted { job } => {
            assert_eq!(job.job_id, JobId::from("abc123"));
            assert_eq!(job.status, JobStatus::Pending);
            assert_eq!(job.company, "Acme GmbH");
        }
        other => panic!("expected AnalysisSubmitted, got {other:?}"),
    }
}

#[test]
fn comment_mutations_refetch_on_success_and_report_failures() {
    let handle = handle_with(
        Arc::new(StubApi::default()),
        StubProgress { script: vec![] },
        ShellHooks::default(),
    );
    handle.enqueue(vec![Effect::SubmitReply {
        parent_id: "c1".to_string(),
        text: "agreed".to_string(),
    }]);
    match recv_msg(&handle) {
        Msg::CommentsFetched { comments } => {
            assert_eq!(comments.len(), 1);
            assert_eq!(comments[0].text, "agreed");
            assert_eq!(comments[0].parent_id.as_deref(), Some("c1"));
        }
        other => panic!("expected CommentsFetched, got {other:?}"),
    }

    handle.enqueue(vec![Effect::DeleteComment {
        id: "c1".to_string(),
    }]);
    match recv_msg(&handle) {
        Msg::CommentMutationFailed { error } => assert!(error.contains("403")),
        other => panic!("expected CommentMutationFailed, got {other:?}"),
    }
}

#[test]
fn job_poll_timer_ticks_until_stopped() {
    let handle = handle_with(
        Arc::new(StubApi::default()),
        StubProgress { script: vec![] },
        ShellHooks::default(),
    );
    handle.enqueue(vec![Effect::StartJobPolling {
        interval: Duration::from_millis(30),
    }]);
    match recv_msg(&handle) {
        Msg::JobPollTick => {}
        other => panic!("expected JobPollTick, got {other:?}"),
    }
    handle.enqueue(vec![Effect::StopJobPolling]);
    // Drain anything emitted before the stop landed, then expect silence.
    std::thread::sleep(Duration::from_millis(120));
    while handle.try_recv().is_some() {}
    std::thread::sleep(Duration::from_millis(120));
    assert!(handle.try_recv().is_none());
}
