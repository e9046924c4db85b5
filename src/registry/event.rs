//! Registry events
//!
//! Broadcast to every subscriber so the presentation layer can re-render
//! without polling. Lagging subscribers lose old events, never state: the
//! authoritative view is always `StreamRegistry::list`.

use crate::engine::surface::PlayRejected;
use crate::error::{AttachmentError, FatalCause, InitiationError};
use crate::source::traits::SessionId;

use super::entry::EntryId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    Registered(EntryId),
    SessionResolved { id: EntryId, session: SessionId },
    InitiationFailed { id: EntryId, error: InitiationError },
    Attaching(EntryId),
    Playing(EntryId),
    /// `play()` refused; playback waits for a user gesture.
    PlaybackBlocked { id: EntryId, reason: PlayRejected },
    Recovering { id: EntryId, error: AttachmentError },
    Recovered(EntryId),
    /// `cause` is `None` for explicit teardown.
    TornDown { id: EntryId, cause: Option<FatalCause> },
    Removed(EntryId),
    ExpandedChanged(Option<EntryId>),
}

impl ViewerEvent {
    pub fn entry(&self) -> Option<EntryId> {
        match self {
            ViewerEvent::Registered(id)
            | ViewerEvent::Attaching(id)
            | ViewerEvent::Playing(id)
            | ViewerEvent::Recovered(id)
            | ViewerEvent::Removed(id) => Some(*id),
            ViewerEvent::SessionResolved { id, .. }
            | ViewerEvent::InitiationFailed { id, .. }
            | ViewerEvent::PlaybackBlocked { id, .. }
            | ViewerEvent::Recovering { id, .. }
            | ViewerEvent::TornDown { id, .. } => Some(*id),
            ViewerEvent::ExpandedChanged(id) => *id,
        }
    }
}
