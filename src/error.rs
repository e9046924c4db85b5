// Error taxonomy shared by the registry, the initiation client and the attachment engine.

use std::time::Duration;

use thiserror::Error;

use crate::registry::EntryId;

/// Errors returned across the public boundary. These indicate bad input or
/// caller bugs; steady-state playback problems are reported as entry state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown entry {0}")]
    UnknownEntry(EntryId),
    #[error("entry {0} already owns a playback surface")]
    SurfaceAlreadyMounted(EntryId),
    #[error("entry {0} has been torn down")]
    EntryTornDown(EntryId),
    #[error("registry has been shut down")]
    ShutDown,
}

/// Failure of the begin-session call. Stored on the entry, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitiationError {
    #[error("transcoder request failed: {0}")]
    Network(String),
    #[error("transcoder returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed begin-session response: {0}")]
    MalformedResponse(String),
    #[error("begin-session call timed out after {0:?}")]
    Timeout(Duration),
    #[error("no async runtime available to run the begin-session call")]
    NoRuntime,
}

/// Why an entry was torn down by the attachment engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalCause {
    #[error("unrecoverable playback error: {0}")]
    Unknown(String),
    #[error("media error persisted after recovery: {0}")]
    MediaRecoveryExhausted(String),
    #[error("no adaptive-streaming support and no native playback on surface")]
    Unsupported,
}

/// Protocol error classes as seen by the attachment engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentError {
    #[error("network error: {0}")]
    Network(String),
    #[error("media error: {0}")]
    Media(String),
    #[error("fatal: {0}")]
    Fatal(FatalCause),
}

impl AttachmentError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, AttachmentError::Fatal(_))
    }
}

/// Terminal fault visible on an entry tile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryFault {
    #[error(transparent)]
    Initiation(#[from] InitiationError),
    #[error(transparent)]
    Attachment(#[from] FatalCause),
}
