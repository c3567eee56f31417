//! Trial records and the closed set of trial statuses.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::DomainError;
use super::id::{ProductId, ReasonId, RepId, TrialId, VenueId};
use super::money::{Litres, Price};
use super::field::Record;
use super::timeline::{TimelineEntry, TimelineKind};

/// Status of a trial.
///
/// Serialized with the same lowercase, hyphenated names the store uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrialStatus {
    /// In the sales pipeline; no start date yet.
    Pending,
    /// Running; readings expected.
    InProgress,
    /// Ended, awaiting a won/lost decision.
    Completed,
    /// Won, but a permanent customer code is still owed.
    Accepted,
    /// Won with a customer code.
    Won,
    /// Lost.
    Lost,
}

impl TrialStatus {
    /// Every status, in pipeline order.
    pub const ALL: [TrialStatus; 6] = [
        TrialStatus::Pending,
        TrialStatus::InProgress,
        TrialStatus::Completed,
        TrialStatus::Accepted,
        TrialStatus::Won,
        TrialStatus::Lost,
    ];

    /// Store representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Accepted => "accepted",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    /// Returns true once a won/lost decision has been recorded.
    #[must_use]
    pub const fn is_decided(self) -> bool {
        matches!(self, Self::Accepted | Self::Won | Self::Lost)
    }

    /// Returns true for trials still moving through the pipeline.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress | Self::Completed)
    }
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrialStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::UnknownStatus(s.to_string()))
    }
}

/// A time-bounded evaluation of a trial product at one venue.
///
/// Field names match the columns of the `trials` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub id: TrialId,
    pub venue_id: VenueId,
    #[serde(default)]
    pub rep_id: Option<RepId>,
    pub status: TrialStatus,
    #[serde(default)]
    pub trial_product_id: Option<ProductId>,
    /// Price per litre of the venue's current product.
    #[serde(default)]
    pub baseline_price_per_litre: Option<Price>,
    #[serde(default)]
    pub offered_price_per_litre: Option<Price>,
    /// Set only on a won outcome.
    #[serde(default)]
    pub sold_price_per_litre: Option<Price>,
    /// Weekly usage before the trial started.
    #[serde(default)]
    pub baseline_weekly_litres: Option<Litres>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub outcome_date: Option<NaiveDate>,
    #[serde(default)]
    pub outcome_reason_id: Option<ReasonId>,
    /// Legacy free-text notes, left untouched by lifecycle transitions.
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Trial {
    /// Create a pending trial with no dates and no decision.
    pub fn pending(id: impl Into<TrialId>, venue_id: impl Into<VenueId>) -> Self {
        Self {
            id: id.into(),
            venue_id: venue_id.into(),
            rep_id: None,
            status: TrialStatus::Pending,
            trial_product_id: None,
            baseline_price_per_litre: None,
            offered_price_per_litre: None,
            sold_price_per_litre: None,
            baseline_weekly_litres: None,
            start_date: None,
            end_date: None,
            outcome_date: None,
            outcome_reason_id: None,
            notes: None,
            timeline: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Check the record-level invariants for the trial's status.
    ///
    /// A pending trial may still carry the start date of an earlier run after
    /// being pushed back, so only new trials are required to have none.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), DomainError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(DomainError::EndBeforeStart { start, end });
            }
        }

        let missing = |field| DomainError::MissingDecisionField {
            status: self.status,
            field,
        };

        match self.status {
            TrialStatus::Won | TrialStatus::Accepted => {
                if self.sold_price_per_litre.is_none() {
                    return Err(missing("sold_price_per_litre"));
                }
                if self.outcome_date.is_none() {
                    return Err(missing("outcome_date"));
                }
                if self.outcome_reason_id.is_none() {
                    return Err(missing("outcome_reason_id"));
                }
            }
            TrialStatus::Lost => {
                if self.outcome_date.is_none() {
                    return Err(missing("outcome_date"));
                }
                if self.outcome_reason_id.is_none() {
                    return Err(missing("outcome_reason_id"));
                }
            }
            TrialStatus::Pending | TrialStatus::InProgress | TrialStatus::Completed => {}
        }

        Ok(())
    }

    /// Whole days from start to outcome, when both are recorded.
    #[must_use]
    pub fn days_to_decision(&self) -> Option<i64> {
        Some((self.outcome_date? - self.start_date?).num_days())
    }
}

/// Request to create a trial for a venue.
///
/// New trials always start out pending, with no dates and no decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTrial {
    pub venue_id: VenueId,
    pub rep_id: Option<RepId>,
    pub trial_product_id: Option<ProductId>,
    pub baseline_price_per_litre: Option<Price>,
    pub offered_price_per_litre: Option<Price>,
    pub baseline_weekly_litres: Option<Litres>,
    pub notes: Option<String>,
}

impl NewTrial {
    pub fn new(venue_id: impl Into<VenueId>) -> Self {
        Self {
            venue_id: venue_id.into(),
            rep_id: None,
            trial_product_id: None,
            baseline_price_per_litre: None,
            offered_price_per_litre: None,
            baseline_weekly_litres: None,
            notes: None,
        }
    }

    /// Build the `trials` row to insert, stamped with a creation entry.
    ///
    /// # Errors
    ///
    /// Returns an error if a field fails to serialize.
    pub fn into_record(self, created_on: NaiveDate) -> Result<Record, serde_json::Error> {
        let mut record = match serde_json::to_value(&self)? {
            Value::Object(map) => map,
            _ => Record::new(),
        };
        let created = TimelineEntry::new(TimelineKind::Created, created_on, "Trial created");
        record.insert("status".to_string(), serde_json::to_value(TrialStatus::Pending)?);
        record.insert("timeline".to_string(), serde_json::to_value(vec![created])?);
        Ok(record)
    }
}
