//! Session registry implementation
//!
//! Owns every registered entry in registration order, runs the begin-session
//! call for each one and feeds surface mounts and playback events into the
//! per-entry attachment engine.
//!
//! All mutations happen under one `parking_lot::Mutex` that is never held
//! across an `.await`, so each operation is a single indivisible turn.

use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Url;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::entry::{EntryId, EntrySnapshot, SessionState, StreamEntry};
use super::event::ViewerEvent;
use crate::config::ViewerConfig;
use crate::engine::attachment::Transition;
use crate::engine::host::EntryHost;
use crate::engine::surface::{PlayRejected, PlaybackEvent, PlaybackSurface, PlayerBackend};
use crate::error::{InitiationError, ViewerError};
use crate::layout::{arrange, Layout};
use crate::source::traits::{BeginRequest, Credentials, SessionId, SessionInitiator};

struct Inner {
    entries: Vec<StreamEntry>,
    next_id: u64,
}

impl Inner {
    fn position(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    fn find_mut(&mut self, id: EntryId) -> Option<&mut StreamEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }
}

struct Shared {
    inner: Mutex<Inner>,
    initiator: Arc<dyn SessionInitiator>,
    player: Arc<dyn PlayerBackend>,
    /// `player.is_supported()`, asked once at construction.
    adaptive_supported: bool,
    /// Runtime the registry was built on, for callers outside any runtime.
    runtime: Option<Handle>,
    events: broadcast::Sender<ViewerEvent>,
    shutdown: CancellationToken,
    stop_on_remove: bool,
}

/// Registry of stream entries. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct StreamRegistry {
    shared: Arc<Shared>,
}

impl StreamRegistry {
    /// Create a registry with default configuration
    pub fn new(initiator: Arc<dyn SessionInitiator>, player: Arc<dyn PlayerBackend>) -> Self {
        Self::with_config(initiator, player, &ViewerConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(
        initiator: Arc<dyn SessionInitiator>,
        player: Arc<dyn PlayerBackend>,
        config: &ViewerConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let adaptive_supported = player.is_supported();
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    entries: Vec::new(),
                    next_id: 0,
                }),
                initiator,
                player,
                adaptive_supported,
                runtime: Handle::try_current().ok(),
                events,
                shutdown: CancellationToken::new(),
                stop_on_remove: config.stop_on_remove,
            }),
        }
    }

    /// Subscribe to registry events
    pub fn subscribe(&self) -> broadcast::Receiver<ViewerEvent> {
        self.shared.events.subscribe()
    }

    /// Register a new source and start negotiating its session.
    ///
    /// The entry is listed immediately in the pending state; the begin-session
    /// call runs on a spawned task. Without any runtime to spawn on, the entry
    /// fails with `InitiationError::NoRuntime`.
    pub fn register(
        &self,
        source_url: &str,
        credentials: Credentials,
    ) -> Result<EntryId, ViewerError> {
        if self.shared.shutdown.is_cancelled() {
            return Err(ViewerError::ShutDown);
        }
        let source_url = validate_source_url(source_url)?;
        let request = BeginRequest::new(source_url.as_str(), &credentials);

        let id = {
            let mut inner = self.shared.inner.lock();
            inner.next_id += 1;
            let id = EntryId::from_raw(inner.next_id);
            inner
                .entries
                .push(StreamEntry::new(id, source_url, credentials));
            id
        };

        info!("entry {} registered for {}", id, request.url);
        self.shared.emit(ViewerEvent::Registered(id));

        match self.shared.runtime_handle() {
            Some(handle) => {
                let shared = Arc::clone(&self.shared);
                handle.spawn(async move {
                    shared.run_initiation(id, request).await;
                });
            }
            None => {
                warn!("entry {} registered outside any runtime", id);
                self.shared.settle(id, Err(InitiationError::NoRuntime));
            }
        }

        Ok(id)
    }

    /// Tear an entry down and drop it. Unknown ids are ignored.
    pub fn remove(&self, id: EntryId) {
        let (entry, host, torn_down, was_expanded) = {
            let mut inner = self.shared.inner.lock();
            let pos = match inner.position(id) {
                Some(pos) => pos,
                None => {
                    debug!("remove: entry {} not present", id);
                    return;
                }
            };
            let mut entry = inner.entries.remove(pos);
            let torn_down = entry.attachment.teardown();
            let host = entry.queue_calls();
            let was_expanded = entry.expanded;
            (entry, host, torn_down, was_expanded)
        };

        if torn_down {
            self.shared.emit(ViewerEvent::TornDown { id, cause: None });
        }
        self.shared.emit(ViewerEvent::Removed(id));
        if was_expanded {
            self.shared.emit(ViewerEvent::ExpandedChanged(None));
        }
        self.shared.flush(id, &host);
        info!("entry {} removed", id);

        if let Some(session) = entry.session_id().cloned() {
            self.shared.stop_in_background(session);
        }
    }

    /// Focus an entry; focusing the focused entry again returns to the grid.
    /// Unknown ids are ignored.
    pub fn set_expanded(&self, id: EntryId) {
        let focused = {
            let mut inner = self.shared.inner.lock();
            let was_expanded = match inner.entries.iter().find(|e| e.id == id) {
                Some(entry) => entry.expanded,
                None => {
                    debug!("set_expanded: entry {} not present", id);
                    return;
                }
            };
            for entry in inner.entries.iter_mut() {
                entry.expanded = !was_expanded && entry.id == id;
            }
            if was_expanded {
                None
            } else {
                Some(id)
            }
        };

        debug!("expanded entry now {:?}", focused);
        self.shared.emit(ViewerEvent::ExpandedChanged(focused));
    }

    /// Entries in registration order
    pub fn list(&self) -> Vec<EntrySnapshot> {
        let inner = self.shared.inner.lock();
        inner.entries.iter().map(StreamEntry::snapshot).collect()
    }

    pub fn get(&self, id: EntryId) -> Option<EntrySnapshot> {
        let inner = self.shared.inner.lock();
        inner
            .entries
            .iter()
            .find(|e| e.id == id)
            .map(StreamEntry::snapshot)
    }

    pub fn len(&self) -> usize {
        self.shared.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current visible set and arrangement
    pub fn layout(&self) -> Layout {
        arrange(&self.list())
    }

    /// Hand the entry its rendered surface. Attaches right away when the
    /// session is already known.
    pub fn mount_surface(
        &self,
        id: EntryId,
        surface: Box<dyn PlaybackSurface>,
    ) -> Result<(), ViewerError> {
        let native_hls = surface.can_play_native_hls();
        let host = {
            let mut inner = self.shared.inner.lock();
            let entry = inner.find_mut(id).ok_or(ViewerError::UnknownEntry(id))?;
            entry.attachment.mount(native_hls)?;
            entry.host.enqueue_mount(surface);
            self.shared.try_attach(entry)
        };
        self.shared.flush(id, &host);
        Ok(())
    }

    /// Forward an adaptive-session or surface event to the entry's engine.
    /// Events for entries that no longer exist are dropped.
    pub fn dispatch(&self, id: EntryId, event: PlaybackEvent) {
        let host = {
            let mut inner = self.shared.inner.lock();
            match inner.find_mut(id) {
                Some(entry) => {
                    let transition = entry.attachment.handle_event(event);
                    self.shared.announce(id, transition);
                    entry.queue_calls()
                }
                None => {
                    debug!("dropping {:?} for removed entry {}", event, id);
                    return;
                }
            }
        };
        self.shared.flush(id, &host);
    }

    /// Level-triggered scan attaching every eligible entry. Returns how many
    /// entries were attached by this call.
    pub fn reconcile(&self) -> usize {
        let attached: Vec<(EntryId, Arc<EntryHost>)> = {
            let mut inner = self.shared.inner.lock();
            let mut attached = Vec::new();
            for entry in inner.entries.iter_mut() {
                if entry.attachment.is_ready() && entry.session_id().is_some() {
                    let host = self.shared.try_attach(entry);
                    attached.push((entry.id, host));
                }
            }
            attached
        };
        for (id, host) in &attached {
            self.shared.flush(*id, host);
        }
        attached.len()
    }

    /// Release an entry's session and surface while keeping it listed.
    pub fn teardown(&self, id: EntryId) -> Result<(), ViewerError> {
        let host = {
            let mut inner = self.shared.inner.lock();
            let entry = inner.find_mut(id).ok_or(ViewerError::UnknownEntry(id))?;
            if entry.attachment.teardown() {
                info!("entry {} torn down on request", id);
                self.shared.emit(ViewerEvent::TornDown { id, cause: None });
            }
            entry.queue_calls()
        };
        self.shared.flush(id, &host);
        Ok(())
    }

    /// Retry `play()` after a user gesture.
    pub fn resume_playback(&self, id: EntryId) -> Result<(), ViewerError> {
        let host = {
            let mut inner = self.shared.inner.lock();
            let entry = inner.find_mut(id).ok_or(ViewerError::UnknownEntry(id))?;
            let transition = entry.attachment.resume();
            self.shared.announce(id, transition);
            entry.queue_calls()
        };
        self.shared.flush(id, &host);
        Ok(())
    }

    /// Cancel pending negotiations and tear every entry down. Later
    /// registrations are rejected.
    pub fn shutdown(&self) {
        self.shared.shutdown.cancel();
        let entries = {
            let mut inner = self.shared.inner.lock();
            std::mem::take(&mut inner.entries)
        };
        for mut entry in entries {
            entry.attachment.teardown();
            let host = entry.queue_calls();
            self.shared.flush(entry.id, &host);
            self.shared.emit(ViewerEvent::Removed(entry.id));
        }
        info!("registry shut down");
    }
}

impl Shared {
    fn emit(&self, event: ViewerEvent) {
        // Err only means nobody is listening.
        let _ = self.events.send(event);
    }

    fn runtime_handle(&self) -> Option<Handle> {
        Handle::try_current().ok().or_else(|| self.runtime.clone())
    }

    async fn run_initiation(self: Arc<Self>, id: EntryId, request: BeginRequest) {
        let result = tokio::select! {
            _ = self.shutdown.cancelled() => {
                debug!("initiation for entry {} cancelled by shutdown", id);
                return;
            }
            result = self.initiator.begin(&request) => result,
        };

        if let Some(orphan) = self.settle(id, result) {
            self.stop_session(orphan).await;
        }
    }

    /// Apply a begin-session outcome and run any attach it triggered.
    /// Returns a session to release when its entry is already gone.
    fn settle(&self, id: EntryId, result: Result<SessionId, InitiationError>) -> Option<SessionId> {
        let (orphan, host) = self.resolve_session(id, result);
        if let Some(host) = host {
            self.flush(id, &host);
        }
        orphan
    }

    /// Store the begin-session outcome on the entry. Returns the session when
    /// the entry was removed meanwhile and the session should be released.
    fn resolve_session(
        &self,
        id: EntryId,
        result: Result<SessionId, InitiationError>,
    ) -> (Option<SessionId>, Option<Arc<EntryHost>>) {
        let mut inner = self.inner.lock();
        let entry = match inner.find_mut(id) {
            Some(entry) => entry,
            None => {
                debug!("entry {} removed before its session resolved", id);
                let orphan = match result {
                    Ok(session) if self.stop_on_remove => Some(session),
                    _ => None,
                };
                return (orphan, None);
            }
        };

        if entry.session != SessionState::Pending {
            warn!("entry {} session already settled, ignoring result", id);
            return (None, None);
        }

        match result {
            Ok(session) => {
                info!("entry {} session {} resolved", id, session);
                entry.session = SessionState::Active(session.clone());
                self.emit(ViewerEvent::SessionResolved { id, session });
                (None, Some(self.try_attach(entry)))
            }
            Err(error) => {
                warn!("entry {} session negotiation failed: {}", id, error);
                entry.session = SessionState::Failed(error.clone());
                self.emit(ViewerEvent::InitiationFailed { id, error });
                (None, None)
            }
        }
    }

    /// Attach when the entry has a session and a surface and was never
    /// attached. Returns the executor holding the queued host calls.
    fn try_attach(&self, entry: &mut StreamEntry) -> Arc<EntryHost> {
        let manifest_url = match &entry.session {
            SessionState::Active(session) if entry.attachment.is_ready() => {
                Some(self.initiator.manifest_url(session))
            }
            _ => None,
        };
        if let Some(manifest_url) = manifest_url {
            let transition = entry
                .attachment
                .attach(&manifest_url, self.adaptive_supported);
            self.announce(entry.id, transition);
        }
        entry.queue_calls()
    }

    /// Run an entry's queued host calls. Must not be called with `inner` locked.
    fn flush(&self, id: EntryId, host: &EntryHost) {
        host.drain(self.player.as_ref(), |outcome| self.record_play(id, outcome));
    }

    fn record_play(&self, id: EntryId, outcome: Result<(), PlayRejected>) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.find_mut(id) {
            let transition = entry.attachment.record_play(outcome);
            self.announce(id, transition);
        }
    }

    fn announce(&self, id: EntryId, transition: Transition) {
        match transition {
            Transition::None => {}
            Transition::Attaching => self.emit(ViewerEvent::Attaching(id)),
            Transition::Playing => self.emit(ViewerEvent::Playing(id)),
            Transition::Blocked(reason) => self.emit(ViewerEvent::PlaybackBlocked { id, reason }),
            Transition::Recovering(error) => self.emit(ViewerEvent::Recovering { id, error }),
            Transition::Recovered => self.emit(ViewerEvent::Recovered(id)),
            Transition::TornDown(cause) => self.emit(ViewerEvent::TornDown {
                id,
                cause: Some(cause),
            }),
        }
    }

    fn stop_in_background(self: &Arc<Self>, session: SessionId) {
        if !self.stop_on_remove {
            return;
        }
        match self.runtime_handle() {
            Some(handle) => {
                let shared = Arc::clone(self);
                handle.spawn(async move {
                    shared.stop_session(session).await;
                });
            }
            None => warn!("no runtime to stop session {}, leaving it to expire", session),
        }
    }

    async fn stop_session(&self, session: SessionId) {
        if let Err(e) = self.initiator.stop(&session).await {
            warn!("failed to stop session {}: {}", session, e);
        }
    }
}

/// Reject empty or unparsable sources before any network call.
fn validate_source_url(raw: &str) -> Result<String, ViewerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ViewerError::InvalidInput("source URL is required".to_string()));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|e| ViewerError::InvalidInput(format!("malformed source URL: {}", e)))?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(trimmed.to_string()),
        _ => Err(ViewerError::InvalidInput(
            "source URL has no host".to_string(),
        )),
    }
}
