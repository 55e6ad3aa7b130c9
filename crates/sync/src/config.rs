//! Sync engine configuration structures and loaders.
use std::env;
use std::time::Duration;

/// Default server address used when `MATCH_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Configuration shared by the stream connection, the HTTP adapter and the
/// engine worker.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Base URL of the match server, without a trailing slash.
    pub api_url: String,
    /// Delay between a stream failure and the next connection attempt.
    pub reconnect_delay: Duration,
    /// Capacity of the stream-to-engine channel.
    pub event_buffer: usize,
    /// Capacity of the handle-to-engine command channel.
    pub command_buffer: usize,
    /// Timeout applied to request/response calls (not to the stream).
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            reconnect_delay: Duration::from_secs(5),
            event_buffer: 64,
            command_buffer: 16,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl SyncConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `MATCH_API_URL` - Match server base URL (default: http://localhost:3000)
    /// - `MATCH_RECONNECT_DELAY_MS` - Stream reconnect delay (default: 5000)
    /// - `MATCH_EVENT_BUFFER` - Stream event channel capacity (default: 64)
    /// - `MATCH_COMMAND_BUFFER` - Engine command channel capacity (default: 16)
    /// - `MATCH_REQUEST_TIMEOUT_MS` - HTTP request timeout (default: 10000)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("MATCH_API_URL") {
            config = config.with_api_url(url);
        }

        if let Some(ms) = read_env::<u64>("MATCH_RECONNECT_DELAY_MS") {
            config.reconnect_delay = Duration::from_millis(ms);
        }

        if let Some(capacity) = read_env::<usize>("MATCH_EVENT_BUFFER") {
            config.event_buffer = capacity.max(1);
        }

        if let Some(capacity) = read_env::<usize>("MATCH_COMMAND_BUFFER") {
            config.command_buffer = capacity.max(1);
        }

        if let Some(ms) = read_env::<u64>("MATCH_REQUEST_TIMEOUT_MS") {
            config.request_timeout = Duration::from_millis(ms);
        }

        config
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_delay_is_five_seconds() {
        assert_eq!(SyncConfig::default().reconnect_delay, Duration::from_secs(5));
    }

    #[test]
    fn api_url_drops_trailing_slash() {
        let config = SyncConfig::default().with_api_url("https://rps.example/api/");
        assert_eq!(config.api_url, "https://rps.example/api");
    }
}
