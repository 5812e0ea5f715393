//! Duplicate-signature recognition in node log output.
//!
//! When two nodes sign with the same key, peers reject one of the competing
//! blocks and nodeos logs `Block not applied to head ... signed by <account>`.
//! Seeing that for the protected producer while we are producing means the
//! primary is back.

use chrono::{DateTime, Utc};
use regex::Regex;
use standby_types::{elapsed, ProducerName};
use std::sync::LazyLock;
use std::time::Duration;

static NOT_APPLIED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Block not applied to head.*signed by ([a-z1-5.]{1,12})\b")
        .unwrap_or_else(|e| panic!("invalid duplicate signature pattern: {e}"))
});

/// Matches rejection lines for one producer.
#[derive(Debug, Clone)]
pub struct DuplicateSignatureMatcher {
    protected: ProducerName,
}

impl DuplicateSignatureMatcher {
    pub fn new(protected: ProducerName) -> Self {
        Self { protected }
    }

    /// Account named in a rejection line, if `line` is one.
    pub fn signer(line: &str) -> Option<&str> {
        NOT_APPLIED
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    /// True if `line` reports a rejected block signed by the protected producer.
    pub fn is_duplicate(&self, line: &str) -> bool {
        Self::signer(line).is_some_and(|signer| self.protected == signer)
    }
}

/// Tracks when the log stream last delivered a line.
///
/// A quiet log is not proof the watcher is healthy, so heartbeats are only
/// sent while lines keep arriving.
#[derive(Debug, Clone)]
pub struct LogActivity {
    window: Duration,
    last_line: Option<DateTime<Utc>>,
}

impl LogActivity {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_line: None,
        }
    }

    pub fn line_received(&mut self, at: DateTime<Utc>) {
        self.last_line = Some(self.last_line.map_or(at, |prev| prev.max(at)));
    }

    /// Whether a line arrived strictly within the last `window`.
    pub fn is_alive(&self, now: DateTime<Utc>) -> bool {
        self.last_line
            .is_some_and(|at| elapsed(at, now) < self.window)
    }

    pub fn last_line(&self) -> Option<DateTime<Utc>> {
        self.last_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use standby_test_helpers::producer;

    const REJECTED: &str = "error 2024-05-01T12:00:00.123 nodeos    controller.cpp:2300 \
        push_block ] Block not applied to head 9a3f... #12345 signed by bbbbbbbbbbbb";

    #[test]
    fn test_matches_protected_producer() {
        let matcher = DuplicateSignatureMatcher::new(producer("bbbbbbbbbbbb"));
        assert!(matcher.is_duplicate(REJECTED));
        assert_eq!(
            DuplicateSignatureMatcher::signer(REJECTED),
            Some("bbbbbbbbbbbb")
        );
    }

    #[test]
    fn test_ignores_other_producers_and_lines() {
        let matcher = DuplicateSignatureMatcher::new(producer("cccccccccccc"));
        assert!(!matcher.is_duplicate(REJECTED));
        assert!(!matcher.is_duplicate("info  produced block 1a2b... #12346 @ ..."));
        assert!(!matcher.is_duplicate(""));
    }

    #[test]
    fn test_short_account_names() {
        let line = "Block not applied to head abc #1 signed by eosio";
        assert_eq!(DuplicateSignatureMatcher::signer(line), Some("eosio"));
    }

    #[test]
    fn test_activity_window() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut activity = LogActivity::new(Duration::from_secs(60));
        assert!(!activity.is_alive(t0));

        activity.line_received(t0);
        assert!(activity.is_alive(t0 + chrono::Duration::seconds(59)));
        assert!(!activity.is_alive(t0 + chrono::Duration::seconds(60)));

        // Out-of-order timestamps never move the window backwards.
        activity.line_received(t0 - chrono::Duration::seconds(30));
        assert_eq!(activity.last_line(), Some(t0));
    }
}
