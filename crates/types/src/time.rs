//! Wall-clock helpers.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Time elapsed from `earlier` to `now`, saturating at zero if the clock
/// moved backwards or `earlier` lies in the future.
pub fn elapsed(earlier: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - earlier).to_std().unwrap_or(Duration::ZERO)
}

/// Serde adapter for nodeos timestamps.
///
/// The node reports times as `2024-05-01T12:00:00.500` in UTC without a
/// zone suffix. A trailing `Z` is tolerated.
pub mod nodeos_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), FORMAT).map(|t| t.and_utc())
    }

    pub fn serialize<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_nodeos_time() {
        let t = nodeos_time::parse("2024-05-01T12:00:00.500").unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
            + chrono::Duration::milliseconds(500);
        assert_eq!(t, expected);

        let z = nodeos_time::parse("2024-05-01T12:00:00.500Z").unwrap();
        assert_eq!(z, expected);
    }

    #[test]
    fn test_elapsed_saturates() {
        let a = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let b = a + chrono::Duration::seconds(90);
        assert_eq!(elapsed(a, b), Duration::from_secs(90));
        assert_eq!(elapsed(b, a), Duration::ZERO);
    }
}
