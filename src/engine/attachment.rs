// Attachment state machine: binds one resolved session to one mounted surface.
// Pure state; the surface and session calls it decides on are queued as
// `HostCall`s and executed by the entry's `EntryHost`.

use tracing::{debug, error, info, warn};

use super::host::HostCall;
use super::stats::{PlaybackStats, PlaybackStatsSnapshot};
use super::surface::{ErrorClass, PlayRejected, PlaybackEvent, ProtocolError};
use crate::config::MEDIA_RECOVERY_REARM_FRAGMENTS;
use crate::error::{AttachmentError, FatalCause, ViewerError};
use crate::registry::EntryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    Unbound,
    Attaching,
    Playing,
    Recovering,
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachMode {
    /// Playback through an adaptive-streaming session.
    Adaptive,
    /// Manifest handed to the surface directly.
    Native,
}

/// What an operation changed, for the registry to announce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    None,
    Attaching,
    Playing,
    Blocked(PlayRejected),
    Recovering(AttachmentError),
    Recovered,
    TornDown(FatalCause),
}

pub struct Attachment {
    entry: EntryId,
    state: AttachState,
    /// Set once, on the first attach. Never cleared.
    attached: bool,
    mode: Option<AttachMode>,
    surface_mounted: bool,
    surface_native: bool,
    manifest_parsed: bool,
    /// A media recovery was issued and the budget is not re-armed yet.
    media_recovery_pending: bool,
    /// Fragments loaded since the last media recovery.
    clean_fragments: u32,
    last_error: Option<AttachmentError>,
    fault: Option<FatalCause>,
    warning: Option<PlayRejected>,
    stats: PlaybackStats,
    outbox: Vec<HostCall>,
}

impl Attachment {
    pub fn new(entry: EntryId) -> Self {
        Self {
            entry,
            state: AttachState::Unbound,
            attached: false,
            mode: None,
            surface_mounted: false,
            surface_native: false,
            manifest_parsed: false,
            media_recovery_pending: false,
            clean_fragments: 0,
            last_error: None,
            fault: None,
            warning: None,
            stats: PlaybackStats::new(),
            outbox: Vec::new(),
        }
    }

    /// Record that the entry's surface is mounted. `native_hls` is the
    /// surface's own capability, queried before the registry lock is taken.
    pub fn mount(&mut self, native_hls: bool) -> Result<(), ViewerError> {
        if self.state == AttachState::TornDown {
            return Err(ViewerError::EntryTornDown(self.entry));
        }
        if self.surface_mounted {
            return Err(ViewerError::SurfaceAlreadyMounted(self.entry));
        }
        debug!("entry {} surface mounted native_hls={}", self.entry, native_hls);
        self.surface_mounted = true;
        self.surface_native = native_hls;
        Ok(())
    }

    /// Whether `attach` would act given a resolved session.
    pub fn is_ready(&self) -> bool {
        !self.attached && self.state == AttachState::Unbound && self.surface_mounted
    }

    /// UNBOUND -> ATTACHING. A no-op unless the surface is mounted and the
    /// entry has never been attached.
    pub fn attach(&mut self, manifest_url: &str, adaptive_supported: bool) -> Transition {
        if !self.is_ready() {
            return Transition::None;
        }

        self.attached = true;
        self.stats.record_attach();

        let manifest_url = manifest_url.to_string();
        if adaptive_supported {
            self.mode = Some(AttachMode::Adaptive);
            self.outbox.push(HostCall::OpenSession {
                manifest_url: manifest_url.clone(),
            });
        } else if self.surface_native {
            self.mode = Some(AttachMode::Native);
            self.outbox.push(HostCall::SetNativeSource {
                manifest_url: manifest_url.clone(),
            });
        } else {
            warn!("entry {} has no playback path for {}", self.entry, manifest_url);
            return self.fail(FatalCause::Unsupported);
        }

        self.state = AttachState::Attaching;
        info!(
            "entry {} attaching mode={:?} manifest={}",
            self.entry, self.mode, manifest_url
        );
        Transition::Attaching
    }

    pub fn handle_event(&mut self, event: PlaybackEvent) -> Transition {
        if matches!(self.state, AttachState::Unbound | AttachState::TornDown) {
            debug!(
                "entry {} ignoring {:?} in state {:?}",
                self.entry, event, self.state
            );
            return Transition::None;
        }

        match event {
            PlaybackEvent::ManifestParsed => {
                self.manifest_parsed = true;
                self.stats.record_manifest_parsed();
                if self.state == AttachState::Playing {
                    return Transition::None;
                }
                self.state = AttachState::Playing;
                self.last_error = None;
                info!("entry {} manifest parsed, starting playback", self.entry);
                self.outbox.push(HostCall::Play);
                Transition::Playing
            }
            PlaybackEvent::FragmentLoaded => {
                self.stats.record_fragment();
                if self.media_recovery_pending {
                    self.clean_fragments += 1;
                    if self.clean_fragments >= MEDIA_RECOVERY_REARM_FRAGMENTS {
                        debug!("entry {} media recovery re-armed", self.entry);
                        self.media_recovery_pending = false;
                    }
                }
                if self.state != AttachState::Recovering {
                    return Transition::None;
                }
                self.last_error = None;
                self.state = if self.manifest_parsed {
                    AttachState::Playing
                } else {
                    AttachState::Attaching
                };
                info!("entry {} recovered, now {:?}", self.entry, self.state);
                Transition::Recovered
            }
            PlaybackEvent::Error(err) => self.handle_error(err),
        }
    }

    fn handle_error(&mut self, err: ProtocolError) -> Transition {
        if !err.fatal {
            self.stats.record_non_fatal();
            debug!(
                "entry {} non-fatal {:?} error: {}",
                self.entry, err.class, err.details
            );
            return Transition::None;
        }

        match err.class {
            ErrorClass::Network => {
                self.stats.record_network_error();
                warn!("entry {} network error: {}", self.entry, err.details);
                if self.mode == Some(AttachMode::Adaptive) {
                    self.outbox.push(HostCall::StartLoad);
                }
                let error = AttachmentError::Network(err.details);
                self.state = AttachState::Recovering;
                self.last_error = Some(error.clone());
                Transition::Recovering(error)
            }
            ErrorClass::Media => {
                if self.media_recovery_pending || self.mode != Some(AttachMode::Adaptive) {
                    return self.fail(FatalCause::MediaRecoveryExhausted(err.details));
                }
                warn!(
                    "entry {} media error, attempting recovery: {}",
                    self.entry, err.details
                );
                self.outbox.push(HostCall::RecoverMedia);
                self.stats.record_media_recovery();
                self.media_recovery_pending = true;
                self.clean_fragments = 0;
                let error = AttachmentError::Media(err.details);
                self.state = AttachState::Recovering;
                self.last_error = Some(error.clone());
                Transition::Recovering(error)
            }
            ErrorClass::Other => self.fail(FatalCause::Unknown(err.details)),
        }
    }

    /// Re-issue `play()` after a user gesture.
    pub fn resume(&mut self) -> Transition {
        if self.state == AttachState::Playing && self.surface_mounted {
            self.outbox.push(HostCall::Play);
        }
        Transition::None
    }

    /// Feed back the outcome of a queued `play()`.
    pub fn record_play(&mut self, outcome: Result<(), PlayRejected>) -> Transition {
        if self.state == AttachState::TornDown {
            return Transition::None;
        }
        match outcome {
            Ok(()) => {
                self.warning = None;
                Transition::None
            }
            Err(rejected) => {
                warn!("entry {} {}, waiting for user interaction", self.entry, rejected);
                self.warning = Some(rejected.clone());
                Transition::Blocked(rejected)
            }
        }
    }

    fn fail(&mut self, cause: FatalCause) -> Transition {
        error!("entry {} fatal playback fault: {}", self.entry, cause);
        self.last_error = Some(AttachmentError::Fatal(cause.clone()));
        self.fault = Some(cause.clone());
        self.teardown();
        Transition::TornDown(cause)
    }

    /// Queue release of the session and surface. Returns false when the
    /// attachment was already torn down.
    pub fn teardown(&mut self) -> bool {
        if self.state == AttachState::TornDown {
            return false;
        }
        self.outbox.push(HostCall::Release);
        self.surface_mounted = false;
        debug!("entry {} torn down from {:?}", self.entry, self.state);
        self.state = AttachState::TornDown;
        true
    }

    /// Host calls decided since the last take, in order.
    pub fn take_calls(&mut self) -> Vec<HostCall> {
        std::mem::take(&mut self.outbox)
    }

    pub fn state(&self) -> AttachState {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn mode(&self) -> Option<AttachMode> {
        self.mode
    }

    pub fn has_surface(&self) -> bool {
        self.surface_mounted
    }

    pub fn fault(&self) -> Option<&FatalCause> {
        self.fault.as_ref()
    }

    pub fn last_error(&self) -> Option<&AttachmentError> {
        self.last_error.as_ref()
    }

    pub fn warning(&self) -> Option<&PlayRejected> {
        self.warning.as_ref()
    }

    pub fn stats(&self) -> PlaybackStatsSnapshot {
        self.stats.snapshot()
    }
}
