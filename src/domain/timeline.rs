//! Typed timeline entries recorded against a trial.
//!
//! Lifecycle events are kept as an ordered list of entries instead of being
//! encoded as prefixes inside the free-text notes column.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What a timeline entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    Created,
    Started,
    Ended,
    Outcome,
    CustomerCode,
    Reopened,
    Note,
}

/// One dated entry on a trial's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub kind: TimelineKind,
    pub date: NaiveDate,
    pub text: String,
}

impl TimelineEntry {
    /// Create a new entry.
    pub fn new(kind: TimelineKind, date: NaiveDate, text: impl Into<String>) -> Self {
        Self {
            kind,
            date,
            text: text.into(),
        }
    }
}

/// Return `timeline` with `entry` appended, keeping entries ordered by date.
///
/// Entries with the same date keep their insertion order.
#[must_use]
pub fn appended(timeline: &[TimelineEntry], entry: TimelineEntry) -> Vec<TimelineEntry> {
    let mut entries = timeline.to_vec();
    let at = entries.partition_point(|e| e.date <= entry.date);
    entries.insert(at, entry);
    entries
}
