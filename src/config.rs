use std::time::Duration;

use serde::Deserialize;

/// Base URL used when neither configuration nor environment provides one.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Environment variable overriding the transcoder base URL.
pub const API_BASE_URL_ENV: &str = "VIEWER_API_BASE_URL";

/// Path of the transcoder's "begin session" endpoint.
pub const START_SESSION_PATH: &str = "/start_hls/";

/// Path prefix of the transcoder's "stop session" endpoint.
pub const STOP_SESSION_PATH: &str = "/stop_hls/";

/// Path prefix under which per-session manifests and segments are served.
pub const MANIFEST_PATH_PREFIX: &str = "/media/hls_media/";

/// Manifest file name inside a session directory.
pub const MANIFEST_FILE_NAME: &str = "stream.m3u8";

/// Maximum number of characters of a raw error body kept in an error message.
pub const MAX_ERROR_BODY_CHARS: usize = 256;

/// Fragments that must load without a media error before another in-place
/// media recovery is allowed.
pub const MEDIA_RECOVERY_REARM_FRAGMENTS: u32 = 3;

/// Top-level configuration for the viewer engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Base URL of the remote transcoder.
    pub api_base_url: String,
    /// Optional timeout for the begin-session call, in seconds.
    pub begin_timeout_secs: Option<u64>,
    /// Ask the transcoder to stop a session once its entry is removed.
    pub stop_on_remove: bool,
    /// Capacity of the registry event channel.
    pub event_capacity: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            begin_timeout_secs: None,
            stop_on_remove: false,
            event_capacity: 64,
        }
    }
}

impl ViewerConfig {
    /// Default configuration with the base URL taken from the environment when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(API_BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.api_base_url = url;
            }
        }
        config
    }

    /// Base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim().trim_end_matches('/')
    }

    pub fn begin_timeout(&self) -> Option<Duration> {
        self.begin_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let config = ViewerConfig {
            api_base_url: "http://backend:8000//".to_string(),
            ..ViewerConfig::default()
        };
        assert_eq!(config.base_url(), "http://backend:8000");
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: ViewerConfig =
            serde_json::from_str(r#"{"api_base_url": "http://tc:9000", "begin_timeout_secs": 5}"#)
                .unwrap();
        assert_eq!(config.base_url(), "http://tc:9000");
        assert_eq!(config.begin_timeout(), Some(Duration::from_secs(5)));
        assert!(!config.stop_on_remove);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_default_has_no_timeout() {
        let config = ViewerConfig::default();
        assert_eq!(config.base_url(), DEFAULT_API_BASE_URL);
        assert!(config.begin_timeout().is_none());
    }
}
