// Per-entry playback statistics: fetch progress, error counts, startup latency.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackStatsSnapshot {
    pub fragments_loaded: u64,
    pub network_errors: u32,
    pub media_recoveries: u32,
    pub non_fatal_errors: u32,
    /// Time from attach to manifest parsed, once known.
    pub startup_latency: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct PlaybackStats {
    fragments_loaded: u64,
    network_errors: u32,
    media_recoveries: u32,
    non_fatal_errors: u32,
    attached_at: Option<Instant>,
    startup_latency: Option<Duration>,
}

impl PlaybackStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attach(&mut self) {
        self.attached_at = Some(Instant::now());
    }

    /// Only the first manifest after attach counts towards startup latency.
    pub fn record_manifest_parsed(&mut self) {
        if self.startup_latency.is_none() {
            self.startup_latency = self.attached_at.map(|at| at.elapsed());
        }
    }

    pub fn record_fragment(&mut self) {
        self.fragments_loaded += 1;
    }

    pub fn record_network_error(&mut self) {
        self.network_errors += 1;
    }

    pub fn record_media_recovery(&mut self) {
        self.media_recoveries += 1;
    }

    pub fn record_non_fatal(&mut self) {
        self.non_fatal_errors += 1;
    }

    pub fn snapshot(&self) -> PlaybackStatsSnapshot {
        PlaybackStatsSnapshot {
            fragments_loaded: self.fragments_loaded,
            network_errors: self.network_errors,
            media_recoveries: self.media_recoveries,
            non_fatal_errors: self.non_fatal_errors,
            startup_latency: self.startup_latency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_basic() {
        let mut stats = PlaybackStats::new();
        stats.record_attach();
        stats.record_manifest_parsed();
        let first = stats.snapshot().startup_latency;
        assert!(first.is_some());

        stats.record_fragment();
        stats.record_fragment();
        stats.record_network_error();
        stats.record_media_recovery();
        stats.record_non_fatal();
        stats.record_manifest_parsed();

        let snap = stats.snapshot();
        assert_eq!(snap.fragments_loaded, 2);
        assert_eq!(snap.network_errors, 1);
        assert_eq!(snap.media_recoveries, 1);
        assert_eq!(snap.non_fatal_errors, 1);
        assert_eq!(snap.startup_latency, first);
    }

    #[test]
    fn test_no_latency_without_attach() {
        let mut stats = PlaybackStats::new();
        stats.record_manifest_parsed();
        assert!(stats.snapshot().startup_latency.is_none());
    }
}
