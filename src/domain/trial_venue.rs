//! The merged venue/trial view.
//!
//! A [`TrialVenue`] is built on every read by overlaying a venue's trial (if
//! any) onto the venue, and is never persisted. Writes go back out through
//! [`split`](super::field::split).

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::field::{split, Record, SplitError, UpdateMap};
use super::id::{RepId, TrialId, VenueId};
use super::money::Price;
use super::trial::{Trial, TrialStatus};
use super::venue::Venue;

/// Status of the merged view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergedStatus {
    /// The venue has no trial. Distinct from [`TrialStatus::Pending`].
    NoTrial,
    /// The venue's trial is in this status.
    Trial(TrialStatus),
    /// The venue row carries a trial status but no trial row exists.
    Orphaned(TrialStatus),
}

impl MergedStatus {
    /// The trial status, if a trial row backs this view.
    #[must_use]
    pub const fn trial_status(self) -> Option<TrialStatus> {
        match self {
            Self::Trial(status) => Some(status),
            Self::NoTrial | Self::Orphaned(_) => None,
        }
    }
}

/// A data-integrity problem found while merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    pub venue_id: VenueId,
    pub status: TrialStatus,
}

/// A venue with its trial overlaid.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialVenue {
    venue: Venue,
    trial: Option<Trial>,
    status: MergedStatus,
}

/// Merge a venue with its trial.
///
/// When `trial` is `None` and the venue still carries a trial status, the view
/// is marked [`MergedStatus::Orphaned`] so the caller can report it.
#[must_use]
pub fn merge(venue: Venue, trial: Option<Trial>) -> TrialVenue {
    let status = match (&trial, venue.trial_status) {
        (Some(trial), _) => MergedStatus::Trial(trial.status),
        (None, Some(status)) => MergedStatus::Orphaned(status),
        (None, None) => MergedStatus::NoTrial,
    };
    TrialVenue {
        venue,
        trial,
        status,
    }
}

/// Errors raised while applying an update map to a merged view.
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error(transparent)]
    Split(#[from] SplitError),

    /// Trial columns were updated on a venue without a trial.
    #[error("venue {0} has no trial to update")]
    NoTrial(VenueId),

    #[error("update does not fit the record: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TrialVenue {
    #[must_use]
    pub fn venue(&self) -> &Venue {
        &self.venue
    }

    #[must_use]
    pub fn trial(&self) -> Option<&Trial> {
        self.trial.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> MergedStatus {
        self.status
    }

    /// Status of the backing trial row, if there is one.
    #[must_use]
    pub fn trial_status(&self) -> Option<TrialStatus> {
        self.status.trial_status()
    }

    #[must_use]
    pub fn venue_id(&self) -> &VenueId {
        &self.venue.id
    }

    #[must_use]
    pub fn trial_id(&self) -> Option<&TrialId> {
        self.trial.as_ref().map(|t| &t.id)
    }

    #[must_use]
    pub fn rep_id(&self) -> Option<&RepId> {
        self.trial.as_ref().and_then(|t| t.rep_id.as_ref())
    }

    #[must_use]
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.trial.as_ref().and_then(|t| t.start_date)
    }

    #[must_use]
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.trial.as_ref().and_then(|t| t.end_date)
    }

    #[must_use]
    pub fn outcome_date(&self) -> Option<NaiveDate> {
        self.trial.as_ref().and_then(|t| t.outcome_date)
    }

    #[must_use]
    pub fn sold_price(&self) -> Option<Price> {
        self.trial.as_ref().and_then(|t| t.sold_price_per_litre)
    }

    /// The integrity anomaly this view represents, if any.
    #[must_use]
    pub fn anomaly(&self) -> Option<Anomaly> {
        match self.status {
            MergedStatus::Orphaned(status) => Some(Anomaly {
                venue_id: self.venue.id.clone(),
                status,
            }),
            _ => None,
        }
    }

    /// Flatten into one record: venue columns, then trial columns on top.
    ///
    /// The trial's own id is exposed as `trial_id`; any other column present on
    /// both sides takes the trial's value.
    ///
    /// # Errors
    ///
    /// Returns an error if either record fails to serialize.
    pub fn to_record(&self) -> Result<Record, serde_json::Error> {
        let mut record = to_record(&self.venue)?;
        if let Some(trial) = &self.trial {
            for (key, value) in to_record(trial)? {
                match key.as_str() {
                    "id" => {
                        record.insert("trial_id".to_string(), value);
                    }
                    "venue_id" => {}
                    _ => {
                        record.insert(key, value);
                    }
                }
            }
        }
        Ok(record)
    }

    /// Apply an update map to this view.
    ///
    /// The view is left unchanged if any part of the update fails.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] when the map cannot be routed, targets a trial
    /// that does not exist, or produces a record that no longer decodes.
    pub fn apply(&mut self, updates: &UpdateMap) -> Result<(), ApplyError> {
        let partition = split(updates)?;

        let venue = overlay(&self.venue, partition.venue)?;
        let trial = match (&self.trial, partition.trial.is_empty()) {
            (Some(trial), _) => Some(overlay(trial, partition.trial)?),
            (None, true) => None,
            (None, false) => return Err(ApplyError::NoTrial(self.venue.id.clone())),
        };

        *self = merge(venue, trial);
        Ok(())
    }
}

fn to_record<T: Serialize>(value: &T) -> Result<Record, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Record::new()),
    }
}

fn overlay<T: Serialize + DeserializeOwned>(base: &T, fields: Record) -> Result<T, serde_json::Error> {
    let mut record = to_record(base)?;
    record.extend(fields);
    serde_json::from_value(Value::Object(record))
}
