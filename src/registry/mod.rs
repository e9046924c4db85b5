//! Session registry
//!
//! The authoritative, ordered collection of registered streams. Each entry
//! moves through backend negotiation (`SessionState`) and playback
//! attachment (`AttachState`) independently of its siblings.
//!
//! ```text
//!   register(url) ──► StreamEntry{Pending} ──spawn──► SessionInitiator::begin
//!                                                        │
//!   mount_surface(id, surface) ─┐        SessionResolved ◄┘
//!                               ▼               │
//!                     Attachment::attach ◄──────┘   (whichever comes last)
//!                               │
//!   dispatch(id, event) ──► Attachment::handle_event ──► ViewerEvent broadcast
//! ```

pub mod entry;
pub mod event;
pub mod store;

pub use entry::{EntryId, EntrySnapshot, SessionState, StreamEntry};
pub use event::ViewerEvent;
pub use store::StreamRegistry;
