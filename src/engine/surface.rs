// Host-provided playback seams: the rendering surface and the adaptive-streaming library.

use std::fmt;

use crate::registry::EntryId;

/// `play()` was refused by the host, typically by an autoplay policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRejected(pub String);

impl fmt::Display for PlayRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "play rejected: {}", self.0)
    }
}

/// A mounted media sink. Owned by exactly one entry.
///
/// Methods are never called with the registry locked; implementations may
/// call back into the registry (`list`, `dispatch`, `remove`).
pub trait PlaybackSurface: Send {
    fn play(&mut self) -> Result<(), PlayRejected>;

    fn pause(&mut self);

    /// Whether the surface can play an HLS manifest without an adaptive session.
    fn can_play_native_hls(&self) -> bool {
        false
    }

    /// Point the surface directly at a manifest (native playback).
    fn set_source(&mut self, url: &str);

    /// Detach any media and free the sink. Called once, at teardown.
    fn release(&mut self);
}

/// One adaptive-streaming playback session (an hls.js-like instance).
/// May dispatch events synchronously from any of its methods.
pub trait AdaptiveSession: Send {
    fn load_source(&mut self, manifest_url: &str);

    fn attach_media(&mut self, surface: &mut dyn PlaybackSurface);

    /// Resume fetching after a network failure.
    fn start_load(&mut self);

    /// Reinitialise the decode pipeline in place.
    fn recover_media_error(&mut self);

    fn destroy(&mut self);
}

/// Factory for adaptive sessions.
pub trait PlayerBackend: Send + Sync {
    fn is_supported(&self) -> bool {
        true
    }

    fn create_session(&self, entry: EntryId) -> Box<dyn AdaptiveSession>;
}

/// Coarse protocol error class reported by the adaptive-streaming layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Network,
    Media,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    pub class: ErrorClass,
    /// The library could not recover on its own.
    pub fatal: bool,
    pub details: String,
}

impl ProtocolError {
    pub fn fatal(class: ErrorClass, details: impl Into<String>) -> Self {
        Self {
            class,
            fatal: true,
            details: details.into(),
        }
    }

    pub fn non_fatal(class: ErrorClass, details: impl Into<String>) -> Self {
        Self {
            class,
            fatal: false,
            details: details.into(),
        }
    }
}

/// Events the host forwards from the adaptive session or surface to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Manifest parsed (or `loadedmetadata` for native playback).
    ManifestParsed,
    /// A segment or manifest fetch succeeded.
    FragmentLoaded,
    Error(ProtocolError),
}
