//! Forgetting-curve retention score for a single memory.

use crate::model::Memory;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Strength returned when a memory carries no usable timestamp.
pub const DEFAULT_STRENGTH: f64 = 0.5;

/// Days of retention per unit of base strength.
const DECAY_BASE_DAYS: f64 = 30.0;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses RFC 3339, naive ISO-8601 (read as UTC) or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Retention in `[0, 1]` at `now`.
///
/// `base = ln(access_count + 1) + 1`, `retention = exp(-elapsed_days / (base * 30))`.
/// Missing or unparseable timestamps yield [`DEFAULT_STRENGTH`]; a missing access
/// count is treated as one access. Timestamps in the future cap at 1.0.
pub fn strength(memory: &Memory, now: DateTime<Utc>) -> f64 {
    let Some(ts) = memory.content.timestamp.as_deref().and_then(parse_timestamp) else {
        return DEFAULT_STRENGTH;
    };
    let access_count = memory.metadata.access_count.unwrap_or(1);
    retention(access_count, now - ts)
}

/// Retention for a given access count and elapsed duration.
pub fn retention(access_count: u32, elapsed: chrono::Duration) -> f64 {
    let base = (f64::from(access_count) + 1.0).ln() + 1.0;
    let elapsed_days = elapsed.num_milliseconds() as f64 / 86_400_000.0;
    let value = (-elapsed_days / (base * DECAY_BASE_DAYS)).exp();
    if value.is_nan() {
        return DEFAULT_STRENGTH;
    }
    value.clamp(0.0, 1.0)
}

/// Discrete mastery label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mastery {
    Novice,
    Familiar,
    Proficient,
    Expert,
}

impl Mastery {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mastery::Novice => "novice",
            Mastery::Familiar => "familiar",
            Mastery::Proficient => "proficient",
            Mastery::Expert => "expert",
        }
    }
}

/// Mastery implied by a strength value (strict thresholds 0.8 / 0.6 / 0.4).
pub fn mastery_from_strength(strength: f64) -> Mastery {
    if strength > 0.8 {
        Mastery::Expert
    } else if strength > 0.6 {
        Mastery::Proficient
    } else if strength > 0.4 {
        Mastery::Familiar
    } else {
        Mastery::Novice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemoryContent, MemoryKind, MemoryMetadata, MemoryType, NewMemory};
    use chrono::Duration;

    fn memory_at(timestamp: Option<String>, access_count: Option<u32>) -> Memory {
        let mut content = MemoryContent::now(MemoryKind::PaperReading);
        content.timestamp = timestamp;
        Memory::new(
            "m1",
            "r1",
            NewMemory {
                memory_type: MemoryType::Personal,
                content,
                metadata: MemoryMetadata {
                    access_count,
                    source: "test".into(),
                },
            },
        )
    }

    #[test]
    fn thirty_days_single_access() {
        let now = Utc::now();
        let m = memory_at(Some((now - Duration::days(30)).to_rfc3339()), Some(1));
        let s = strength(&m, now);
        assert!((s - 0.554).abs() < 0.001, "got {s}");
    }

    #[test]
    fn missing_access_count_counts_as_one() {
        let now = Utc::now();
        let ts = Some((now - Duration::days(30)).to_rfc3339());
        assert_eq!(
            strength(&memory_at(ts.clone(), None), now),
            strength(&memory_at(ts, Some(1)), now)
        );
    }

    #[test]
    fn strictly_decreasing_in_elapsed_time() {
        let mut last = f64::INFINITY;
        for days in [0, 1, 7, 30, 90, 365] {
            let s = retention(3, Duration::days(days) + Duration::hours(1));
            assert!(s < last, "day {days}: {s} !< {last}");
            last = s;
        }
    }

    #[test]
    fn non_decreasing_in_access_count() {
        let elapsed = Duration::days(45);
        let mut last = 0.0;
        for count in [0, 1, 2, 5, 20, 1000] {
            let s = retention(count, elapsed);
            assert!(s >= last);
            last = s;
        }
    }

    #[test]
    fn malformed_or_missing_timestamp_defaults() {
        let now = Utc::now();
        for raw in ["", "yesterday", "2024-13-45T99:00:00", "NaN"] {
            assert_eq!(strength(&memory_at(Some(raw.into()), Some(4)), now), DEFAULT_STRENGTH);
        }
        assert_eq!(strength(&memory_at(None, None), now), DEFAULT_STRENGTH);
    }

    #[test]
    fn bounded_for_future_and_ancient_timestamps() {
        let now = Utc::now();
        let future = memory_at(Some((now + Duration::days(10)).to_rfc3339()), Some(1));
        assert_eq!(strength(&future, now), 1.0);
        let ancient = memory_at(Some("1900-01-01T00:00:00".into()), Some(1));
        let s = strength(&ancient, now);
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn parses_naive_and_date_only() {
        assert!(parse_timestamp("2025-12-17T16:00:00.123456").is_some());
        assert!(parse_timestamp("2025-12-17T16:00:00Z").is_some());
        assert!(parse_timestamp("2025-12-17").is_some());
    }

    #[test]
    fn mastery_thresholds_are_strict() {
        assert_eq!(mastery_from_strength(0.81), Mastery::Expert);
        assert_eq!(mastery_from_strength(0.8), Mastery::Proficient);
        assert_eq!(mastery_from_strength(0.5), Mastery::Familiar);
        assert_eq!(mastery_from_strength(0.4), Mastery::Novice);
    }
}
