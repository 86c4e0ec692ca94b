//! Server-sent-events consumption for per-job progress streams.

use client_logging::client_warn;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use consultant_core::{JobId, ProgressUpdate};

use crate::api::ReqwestApi;
use crate::types::ProgressRecord;

/// Receives decoded snapshots from a subscription.
pub trait ProgressSink: Send + Sync {
    fn deliver(&self, job_id: &JobId, update: ProgressUpdate);
}

/// One-way push source for a single job's fine-grained progress.
#[async_trait::async_trait]
pub trait ProgressSource: Send + Sync {
    /// Consumes the job's event stream until a terminal snapshot has been
    /// delivered or `cancel` fires. Transport interruptions reopen the
    /// connection; only an application-level terminal status ends the
    /// subscription on its own.
    async fn subscribe(&self, job_id: &JobId, sink: &dyn ProgressSink, cancel: &CancellationToken);
}

/// Incremental decoder for the `text/event-stream` wire format.
///
/// Feed transport chunks in any fragmentation; completed event payloads come
/// back out. Multiple `data:` lines per event join with a newline, comment
/// lines are ignored, CRLF line endings are tolerated.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line).into_owned();
            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
            } else if line.starts_with(':') {
                // Comment/keep-alive line.
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
            // Other fields (event:, id:, retry:) carry nothing we need.
        }
        events
    }
}

enum StreamEnd {
    Terminal,
    Cancelled,
    Transport(String),
}

#[async_trait::async_trait]
impl ProgressSource for ReqwestApi {
    async fn subscribe(&self, job_id: &JobId, sink: &dyn ProgressSink, cancel: &CancellationToken) {
        loop {
            match self.consume_stream(job_id, sink, cancel).await {
                StreamEnd::Terminal | StreamEnd::Cancelled => return,
                StreamEnd::Transport(reason) => {
                    client_warn!(
                        "progress stream for job {job_id} interrupted: {reason}; reconnecting"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(self.settings.stream_reconnect_delay) => {}
                    }
                }
            }
        }
    }
}

impl ReqwestApi {
    async fn consume_stream(
        &self,
        job_id: &JobId,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> StreamEnd {
        let url = self.url(&format!("/analyze/{job_id}/progress"));
        let request = self.stream_client.get(&url).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return StreamEnd::Cancelled,
            response = request => match response {
                Ok(response) => response,
                Err(err) => return StreamEnd::Transport(err.to_string()),
            },
        };
        let status = response.status();
        if !status.is_success() {
            return StreamEnd::Transport(format!("http status {status}"));
        }

        let mut decoder = SseDecoder::new();
        let mut stream = response.bytes_stream();
        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return StreamEnd::Cancelled,
                chunk = stream.next() => chunk,
            };
            match chunk {
                Some(Ok(chunk)) => {
                    for payload in decoder.push(&chunk) {
                        let update = serde_json::from_str::<ProgressRecord>(&payload)
                            .map_err(|err| err.to_string())
                            .and_then(|record| {
                                record.into_update().map_err(|err| err.to_string())
                            });
                        let update = match update {
                            Ok(update) => update,
                            Err(reason) => {
                                // Malformed payloads never crash the
                                // subscription or disturb the last good
                                // snapshot.
                                client_warn!(
                                    "skipping malformed progress event for job {job_id}: {reason}"
                                );
                                continue;
                            }
                        };
                        let terminal = update.is_terminal();
                        sink.deliver(job_id, update);
                        if terminal {
                            return StreamEnd::Terminal;
                        }
                    }
                }
                Some(Err(err)) => return StreamEnd::Transport(err.to_string()),
                None => return StreamEnd::Transport("stream closed by server".to_string()),
            }
        }
    }
}
