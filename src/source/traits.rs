use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::InitiationError;

/// Opaque session identifier handed out by the transcoder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optional RTSP credentials, passed through to the transcoder untouched.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Build credentials from form values; empty strings count as absent.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
        Self {
            username: non_empty(username.into()),
            password: non_empty(password.into()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Body of the begin-session request.
#[derive(Debug, Clone, Serialize)]
pub struct BeginRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl BeginRequest {
    pub fn new(url: impl Into<String>, credentials: &Credentials) -> Self {
        Self {
            url: url.into(),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        }
    }
}

/// The remote transcoder as seen by the registry.
#[async_trait]
pub trait SessionInitiator: Send + Sync {
    /// Negotiate a new session. Exactly one request, no retry.
    async fn begin(&self, request: &BeginRequest) -> Result<SessionId, InitiationError>;

    /// Manifest URL for a resolved session.
    fn manifest_url(&self, session: &SessionId) -> String;

    /// Release a session on the transcoder side.
    async fn stop(&self, _session: &SessionId) -> Result<(), InitiationError> {
        Ok(())
    }
}
