//! Time-prefixed identifiers.

use crate::CanonicalUuid;
use chrono::{DateTime, Duration, DurationRound, Utc};
use std::fmt;

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.3f";

/// A time-prefixed identifier.
///
/// Format: `YYYYMMDDTHHMMSS.mmmZ-<canonical_uuid>`
///
/// Example: `20260111T143522.045Z-550e8400e29b41d4a716446655440000`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TimestampId {
    timestamp: DateTime<Utc>,
    uuid: CanonicalUuid,
}

impl TimestampId {
    /// Generates a new identifier.
    ///
    /// If `previous` is given, the timestamp is strictly greater than the previous one (by at
    /// least one millisecond).
    pub fn generate(previous: Option<&TimestampId>) -> Self {
        let now = truncate_to_millis(Utc::now());

        let timestamp = match previous {
            Some(prev) if now <= prev.timestamp => prev.timestamp + Duration::milliseconds(1),
            _ => now,
        };

        Self {
            timestamp,
            uuid: CanonicalUuid::new(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(Duration::milliseconds(1)).unwrap_or(ts)
}

impl fmt::Display for TimestampId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Z-{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.uuid
        )
    }
}

/// Hands out [`TimestampId`]s that are strictly increasing for the lifetime of the generator.
#[derive(Debug, Default)]
pub struct TimestampIdGenerator {
    last: Option<TimestampId>,
}

impl TimestampIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next identifier.
    pub fn next_id(&mut self) -> TimestampId {
        let id = TimestampId::generate(self.last.as_ref());
        self.last = Some(id.clone());
        id
    }

    /// Returns the next identifier rendered with a kind prefix, e.g. `PAT-2026...`.
    pub fn next_prefixed(&mut self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_is_strictly_increasing_without_sleep() {
        let first = TimestampId::generate(None);
        let second = TimestampId::generate(Some(&first));
        assert!(second.timestamp() > first.timestamp());
    }

    #[test]
    fn generator_never_repeats() {
        let mut generator = TimestampIdGenerator::new();
        let ids: Vec<String> = (0..200).map(|_| generator.next_prefixed("TRE")).collect();

        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
        assert_eq!(sorted, ids, "ids should sort in creation order");
    }

    #[test]
    fn display_matches_layout() {
        let id = TimestampIdGenerator::new().next_prefixed("BILL");
        let (prefix, rest) = id.split_once('-').unwrap();
        let (stamp, uuid) = rest.split_once('-').unwrap();

        assert_eq!(prefix, "BILL");
        assert_eq!(stamp.len(), "20260111T143522.045Z".len());
        assert!(stamp.ends_with('Z'));
        assert_eq!(&stamp[8..9], "T");
        assert_eq!(uuid.len(), 32);
    }
}
