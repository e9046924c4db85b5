// Attachment engine: per-entry playback state machine, host call executor,
// host playback seams and statistics.

pub mod attachment;
pub mod host;
pub mod stats;
pub mod surface;
