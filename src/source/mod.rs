// Transcoder access: the begin-session seam and its HTTP implementation.

pub mod transcoder;
pub mod traits;
