use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::traits::{BeginRequest, SessionId, SessionInitiator};
use crate::config::{
    ViewerConfig, MANIFEST_FILE_NAME, MANIFEST_PATH_PREFIX, MAX_ERROR_BODY_CHARS,
    START_SESSION_PATH, STOP_SESSION_PATH,
};
use crate::error::InitiationError;

/// HTTP client for the remote HLS transcoder.
pub struct TranscoderClient {
    client: Client,
    base_url: String,
    timeout: Option<Duration>,
}

#[derive(Deserialize)]
struct BeginResponse {
    stream_id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl TranscoderClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    /// Client whose begin/stop calls fail with `InitiationError::Timeout` after `timeout`.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Some(timeout),
        })
    }

    pub fn from_config(config: &ViewerConfig) -> Result<Self> {
        match config.begin_timeout() {
            Some(timeout) => Self::with_timeout(config.base_url(), timeout),
            None => Ok(Self::new(config.base_url())),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> InitiationError {
        match self.timeout {
            Some(timeout) if e.is_timeout() => InitiationError::Timeout(timeout),
            _ => InitiationError::Network(e.to_string()),
        }
    }

    /// Turn a non-success response into `InitiationError::Status`, preferring
    /// the transcoder's `{"error": ...}` message over the raw body.
    async fn status_error(resp: Response) -> InitiationError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => parsed.error,
            Err(_) => body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        };
        InitiationError::Status { status, message }
    }
}

/// The transcoder serves session directories matching the Unicode-aware
/// `[\w-]+`: letters, digits, `_` and `-`.
fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

#[async_trait]
impl SessionInitiator for TranscoderClient {
    async fn begin(&self, request: &BeginRequest) -> Result<SessionId, InitiationError> {
        let url = format!("{}{}", self.base_url, START_SESSION_PATH);
        debug!(
            "begin session url={} source={} with_credentials={}",
            url,
            request.url,
            request.username.is_some()
        );

        let resp = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            warn!("begin session failed status={}", status.as_u16());
            return Err(Self::status_error(resp).await);
        }

        let body = resp.text().await.map_err(|e| self.map_send_error(e))?;
        let parsed: BeginResponse = serde_json::from_str(&body)
            .map_err(|e| InitiationError::MalformedResponse(e.to_string()))?;
        let stream_id = parsed
            .stream_id
            .ok_or_else(|| InitiationError::MalformedResponse("missing stream_id".to_string()))?;
        if !is_valid_session_id(&stream_id) {
            return Err(InitiationError::MalformedResponse(format!(
                "invalid stream_id {:?}",
                stream_id
            )));
        }

        info!("transcoder session {} started for {}", stream_id, request.url);
        Ok(SessionId::new(stream_id))
    }

    fn manifest_url(&self, session: &SessionId) -> String {
        format!(
            "{}{}{}/{}",
            self.base_url,
            MANIFEST_PATH_PREFIX,
            session.as_str(),
            MANIFEST_FILE_NAME
        )
    }

    async fn stop(&self, session: &SessionId) -> Result<(), InitiationError> {
        let url = format!("{}{}{}/", self.base_url, STOP_SESSION_PATH, session.as_str());
        let resp = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        if !resp.status().is_success() {
            warn!(
                "stop session {} failed status={}",
                session,
                resp.status().as_u16()
            );
            return Err(Self::status_error(resp).await);
        }
        debug!("transcoder session {} stopped", session);
        Ok(())
    }
}
