/// Gauge reading freshness.
///
/// Readings are refreshed out-of-band by an ingestion job. A reading older
/// than the configured limit still shows its values but is no longer
/// trusted for a condition call. The reference time is supplied by the
/// caller so the same snapshot always produces the same answer.

use chrono::{DateTime, Duration, Utc};

use crate::model::GaugeReading;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Freshness {
    Fresh,
    /// Older than the limit; carries the age.
    Stale(Duration),
    /// Reading has no timestamp, so its age can't be judged.
    Undated,
}

/// Age of a reading relative to `as_of`. Readings timestamped in the
/// future count as zero age.
pub fn reading_age(reading: &GaugeReading, as_of: DateTime<Utc>) -> Option<Duration> {
    reading
        .timestamp
        .map(|ts| (as_of - ts).max(Duration::zero()))
}

pub fn check(reading: &GaugeReading, as_of: DateTime<Utc>, stale_after: Duration) -> Freshness {
    match reading_age(reading, as_of) {
        None => Freshness::Undated,
        Some(age) if age > stale_after => Freshness::Stale(age),
        Some(_) => Freshness::Fresh,
    }
}

/// Human-readable age, e.g. `"3 hours"`, `"2 days"`, `"45 minutes"`.
pub fn describe_age(age: Duration) -> String {
    let days = age.num_days();
    let hours = age.num_hours();
    if days >= 2 {
        format!("{} days", days)
    } else if hours >= 1 {
        format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
    } else {
        format!("{} minutes", age.num_minutes())
    }
}
