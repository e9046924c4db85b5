//! Multi-session HLS playback manager.
//!
//! Registers live sources with a remote transcoder, binds every negotiated
//! session to exactly one playback surface, recovers from protocol errors
//! per entry and derives the grid/focus layout from registry state.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod layout;
pub mod registry;
pub mod source;

pub use config::ViewerConfig;
pub use error::{AttachmentError, EntryFault, FatalCause, InitiationError, ViewerError};
pub use registry::{EntryId, EntrySnapshot, SessionState, StreamRegistry, ViewerEvent};
