//! UTC second-precision timestamps.
//!
//! Snapshot metadata and provenance carry timestamps in exactly one form:
//! ISO-8601 UTC with `Z` suffix, truncated to seconds. Sub-second digits
//! or offsets would leak into canonical bytes and break cross-language
//! re-derivation of snapshot CIDs.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A UTC timestamp truncated to whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Truncate an arbitrary UTC datetime to seconds.
    pub fn new(dt: DateTime<Utc>) -> Self {
        let secs = dt.timestamp();
        Self(Utc.timestamp_opt(secs, 0).single().unwrap_or(dt))
    }

    /// Current wall-clock time, truncated.
    ///
    /// Snapshot builders take a `Timestamp` as input instead of calling
    /// this, so independent builds of the same input stay byte-identical;
    /// this exists for provenance fields on the read path.
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn from_rfc3339(s: &str) -> Result<Self, chrono::ParseError> {
        Ok(Self::new(
            DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc),
        ))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Timestamp::from_rfc3339(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_to_seconds() {
        let dt = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 45).unwrap()
            + chrono::Duration::milliseconds(750);
        let ts = Timestamp::new(dt);
        assert_eq!(ts.to_string(), "2025-06-01T12:30:45Z");
    }

    #[test]
    fn serde_roundtrip() {
        let ts = Timestamp::from_rfc3339("2025-06-01T12:30:45Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2025-06-01T12:30:45Z\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn offset_input_normalized_to_utc() {
        let ts = Timestamp::from_rfc3339("2025-06-01T07:30:45-05:00").unwrap();
        assert_eq!(ts.to_string(), "2025-06-01T12:30:45Z");
    }
}
