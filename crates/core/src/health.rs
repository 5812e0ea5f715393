//! Per-detector heartbeat bookkeeping.

use crate::detector::DetectorKind;
use chrono::{DateTime, Utc};
use standby_types::elapsed;
use std::collections::BTreeMap;
use std::time::Duration;

/// Last heartbeat seen from each detector.
///
/// A detector is tracked from its first heartbeat onward. Detectors that
/// are still waiting for input before starting are not expected to report.
#[derive(Debug, Default, Clone)]
pub struct HealthRegistry {
    last_seen: BTreeMap<DetectorKind, DateTime<Utc>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a heartbeat.
    pub fn record(&mut self, detector: DetectorKind, at: DateTime<Utc>) {
        self.last_seen.insert(detector, at);
    }

    pub fn last_seen(&self, detector: DetectorKind) -> Option<DateTime<Utc>> {
        self.last_seen.get(&detector).copied()
    }

    /// The longest-silent detector whose silence is strictly greater than
    /// `threshold`, if any.
    pub fn stale(
        &self,
        now: DateTime<Utc>,
        threshold: Duration,
    ) -> Option<(DetectorKind, Duration)> {
        self.last_seen
            .iter()
            .map(|(detector, at)| (*detector, elapsed(*at, now)))
            .filter(|(_, silent)| *silent > threshold)
            .max_by_key(|(_, silent)| *silent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_untracked_detectors_are_never_stale() {
        let registry = HealthRegistry::new();
        assert!(registry
            .stale(t0() + chrono::Duration::hours(1), Duration::from_secs(300))
            .is_none());
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let mut registry = HealthRegistry::new();
        registry.record(DetectorKind::LogWatcher, t0());
        let threshold = Duration::from_secs(300);

        assert!(registry
            .stale(t0() + chrono::Duration::seconds(300), threshold)
            .is_none());

        let stale = registry.stale(t0() + chrono::Duration::milliseconds(300_001), threshold);
        assert_eq!(
            stale,
            Some((DetectorKind::LogWatcher, Duration::from_millis(300_001)))
        );
    }

    #[test]
    fn test_reports_longest_silent() {
        let mut registry = HealthRegistry::new();
        registry.record(DetectorKind::BlockUpdates, t0() + chrono::Duration::seconds(10));
        registry.record(DetectorKind::MissedRounds, t0());
        registry.record(DetectorKind::MissedBlocks, t0() + chrono::Duration::seconds(500));

        let now = t0() + chrono::Duration::seconds(600);
        let (detector, silent) = registry.stale(now, Duration::from_secs(300)).unwrap();
        assert_eq!(detector, DetectorKind::MissedRounds);
        assert_eq!(silent, Duration::from_secs(600));
        assert_eq!(
            registry.last_seen(DetectorKind::MissedBlocks),
            Some(t0() + chrono::Duration::seconds(500))
        );
        assert_eq!(registry.last_seen(DetectorKind::LogWatcher), None);
    }
}
