use std::time::Duration;

/// Environment variable naming the backend base URL.
pub const API_URL_ENV: &str = "CONSULTANTOS_API_URL";
/// Environment variable carrying the optional submission API key.
pub const API_KEY_ENV: &str = "CONSULTANTOS_API_KEY";

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    /// Sent as `X-API-Key` on analysis submissions when present.
    pub api_key: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Pause before reopening a progress stream after a transport error.
    pub stream_reconnect_delay: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            stream_reconnect_delay: Duration::from_secs(2),
        }
    }
}

impl ApiSettings {
    /// Reads base URL and API key from the environment, falling back to the
    /// local development defaults.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(base_url) = std::env::var(API_URL_ENV) {
            let trimmed = base_url.trim().trim_end_matches('/');
            if !trimmed.is_empty() {
                settings.base_url = trimmed.to_string();
            }
        }
        settings.api_key = std::env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty());
        settings
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}
