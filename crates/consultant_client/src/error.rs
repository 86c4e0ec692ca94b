use thiserror::Error;

/// Failures surfaced by the backend API. Transport problems are recoverable
/// by the next poll tick; decode problems indicate a contract drift.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected http status {0}")]
    Status(u16),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ApiError::Timeout;
        }
        if err.is_decode() {
            return ApiError::Decode(err.to_string());
        }
        ApiError::Network(err.to_string())
    }
}
