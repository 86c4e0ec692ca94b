//! IO layer for the ConsultantOS sync widgets: backend REST client, progress
//! event streams, and the effect runner that drives them from core effects.
mod api;
mod error;
mod progress;
mod runner;
mod settings;
mod types;

pub use api::{BackendApi, CommentBackend, ReqwestApi};
pub use error::ApiError;
pub use progress::{ProgressSink, ProgressSource, SseDecoder};
pub use runner::{JobFinishedHook, NavigateHook, ResultHook, ShellHooks, SyncHandle};
pub use settings::{ApiSettings, API_KEY_ENV, API_URL_ENV};
pub use types::{
    AnalysisRequest, JobListResponse, JobPage, JobRecord, NotificationListResponse,
    NotificationRecord, ProgressRecord,
};
