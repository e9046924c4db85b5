//! Stream entry and snapshot types
//!
//! One `StreamEntry` per registered source. The registry owns entries; callers
//! only ever see `EntrySnapshot` copies.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::engine::attachment::{AttachState, Attachment};
use crate::engine::host::EntryHost;
use crate::engine::stats::PlaybackStatsSnapshot;
use crate::engine::surface::PlayRejected;
use crate::error::{AttachmentError, EntryFault, InitiationError};
use crate::source::traits::{Credentials, SessionId};

/// Registry-local entry identifier. Never reused within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Backend session negotiation state of an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Begin-session call in flight
    Pending,
    /// Session negotiated; set once
    Active(SessionId),
    /// Begin-session call failed; the user has to register again
    Failed(InitiationError),
}

/// Entry for a single registered source
pub struct StreamEntry {
    pub(super) id: EntryId,
    pub(super) source_url: String,
    pub(super) credentials: Credentials,
    pub(super) session: SessionState,
    pub(super) expanded: bool,
    pub(super) attachment: Attachment,
    /// Surface and session, driven outside the registry lock.
    pub(super) host: Arc<EntryHost>,
    pub(super) registered_at: Instant,
}

impl StreamEntry {
    pub(super) fn new(id: EntryId, source_url: String, credentials: Credentials) -> Self {
        Self {
            id,
            source_url,
            credentials,
            session: SessionState::Pending,
            expanded: false,
            attachment: Attachment::new(id),
            host: Arc::new(EntryHost::new(id)),
            registered_at: Instant::now(),
        }
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        match &self.session {
            SessionState::Active(session) => Some(session),
            _ => None,
        }
    }

    /// Move the attachment's pending host calls onto the executor queue and
    /// return the executor to drain once the registry lock is released.
    pub(super) fn queue_calls(&mut self) -> Arc<EntryHost> {
        self.host.enqueue(self.attachment.take_calls());
        Arc::clone(&self.host)
    }

    pub fn snapshot(&self) -> EntrySnapshot {
        let fault = match (&self.session, self.attachment.fault()) {
            (SessionState::Failed(error), _) => Some(EntryFault::Initiation(error.clone())),
            (_, Some(cause)) => Some(EntryFault::Attachment(cause.clone())),
            _ => None,
        };

        EntrySnapshot {
            id: self.id,
            source_url: self.source_url.clone(),
            username: self.credentials.username.clone(),
            session: self.session.clone(),
            attach_state: self.attachment.state(),
            attached: self.attachment.is_attached(),
            expanded: self.expanded,
            has_surface: self.attachment.has_surface(),
            fault,
            last_error: self.attachment.last_error().cloned(),
            warning: self.attachment.warning().cloned(),
            stats: self.attachment.stats(),
            age: self.registered_at.elapsed(),
        }
    }
}

/// Read-only copy of an entry, as rendered by the presentation layer.
/// The password never leaves the registry.
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
    pub id: EntryId,
    pub source_url: String,
    pub username: Option<String>,
    pub session: SessionState,
    pub attach_state: AttachState,
    pub attached: bool,
    pub expanded: bool,
    pub has_surface: bool,
    pub fault: Option<EntryFault>,
    /// Most recent classified playback error, cleared on recovery.
    pub last_error: Option<AttachmentError>,
    pub warning: Option<PlayRejected>,
    pub stats: PlaybackStatsSnapshot,
    pub age: std::time::Duration,
}

impl EntrySnapshot {
    pub fn session_id(&self) -> Option<&SessionId> {
        match &self.session {
            SessionState::Active(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.session == SessionState::Pending
    }

    /// Failed or torn-down tiles are shown as removable errors.
    pub fn is_failed(&self) -> bool {
        self.fault.is_some()
    }

    /// Transient buffering indicator.
    pub fn is_buffering(&self) -> bool {
        self.attach_state == AttachState::Recovering
    }
}
