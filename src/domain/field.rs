//! Field routing between the `venues` and `trials` tables.
//!
//! An [`UpdateMap`] is a flat set of column-name to value pairs describing a
//! requested change to a merged trial-venue. [`split`] partitions it into the
//! columns owned by each table using the static membership lists below. These
//! lists are the single source of truth for routing writes.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

/// A store record: column name to JSON value.
pub type Record = Map<String, Value>;

/// Columns of the `venues` table that may be updated.
pub const VENUE_FIELDS: &[&str] = &[
    "name",
    "fryer_count",
    "default_product_id",
    "state",
    "customer_code",
    "last_measured_on",
    "volume_bracket",
    "trial_status",
];

/// Columns of the `trials` table that may be updated.
pub const TRIAL_FIELDS: &[&str] = &[
    "rep_id",
    "status",
    "trial_product_id",
    "baseline_price_per_litre",
    "offered_price_per_litre",
    "sold_price_per_litre",
    "baseline_weekly_litres",
    "start_date",
    "end_date",
    "outcome_date",
    "outcome_reason_id",
    "notes",
    "timeline",
];

/// Updatable fields of a merged trial-venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    FryerCount,
    DefaultProductId,
    State,
    CustomerCode,
    LastMeasuredOn,
    VolumeBracket,
    TrialStatus,
    RepId,
    Status,
    TrialProductId,
    BaselinePricePerLitre,
    OfferedPricePerLitre,
    SoldPricePerLitre,
    BaselineWeeklyLitres,
    StartDate,
    EndDate,
    OutcomeDate,
    OutcomeReasonId,
    Notes,
    Timeline,
}

impl Field {
    /// Every field.
    pub const ALL: [Field; 21] = [
        Field::Name,
        Field::FryerCount,
        Field::DefaultProductId,
        Field::State,
        Field::CustomerCode,
        Field::LastMeasuredOn,
        Field::VolumeBracket,
        Field::TrialStatus,
        Field::RepId,
        Field::Status,
        Field::TrialProductId,
        Field::BaselinePricePerLitre,
        Field::OfferedPricePerLitre,
        Field::SoldPricePerLitre,
        Field::BaselineWeeklyLitres,
        Field::StartDate,
        Field::EndDate,
        Field::OutcomeDate,
        Field::OutcomeReasonId,
        Field::Notes,
        Field::Timeline,
    ];

    /// Column name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::FryerCount => "fryer_count",
            Self::DefaultProductId => "default_product_id",
            Self::State => "state",
            Self::CustomerCode => "customer_code",
            Self::LastMeasuredOn => "last_measured_on",
            Self::VolumeBracket => "volume_bracket",
            Self::TrialStatus => "trial_status",
            Self::RepId => "rep_id",
            Self::Status => "status",
            Self::TrialProductId => "trial_product_id",
            Self::BaselinePricePerLitre => "baseline_price_per_litre",
            Self::OfferedPricePerLitre => "offered_price_per_litre",
            Self::SoldPricePerLitre => "sold_price_per_litre",
            Self::BaselineWeeklyLitres => "baseline_weekly_litres",
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
            Self::OutcomeDate => "outcome_date",
            Self::OutcomeReasonId => "outcome_reason_id",
            Self::Notes => "notes",
            Self::Timeline => "timeline",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table that owns a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Venue,
    Trial,
}

/// Look up which table owns the column `name`.
#[must_use]
pub fn owner_of(name: &str) -> Option<Owner> {
    if TRIAL_FIELDS.contains(&name) {
        Some(Owner::Trial)
    } else if VENUE_FIELDS.contains(&name) {
        Some(Owner::Venue)
    } else {
        None
    }
}

/// A requested update, keyed by column name.
///
/// Keys are kept sorted so identical maps always partition and serialize the
/// same way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateMap(BTreeMap<String, Value>);

impl UpdateMap {
    /// Create an empty update map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a known field.
    pub fn set(&mut self, field: Field, value: Value) -> &mut Self {
        self.0.insert(field.as_str().to_string(), value);
        self
    }

    /// Clear a known field (set it to null).
    pub fn clear(&mut self, field: Field) -> &mut Self {
        self.set(field, Value::Null)
    }

    /// Set a field by raw column name, as supplied by a caller.
    ///
    /// The name is not checked here; [`split`] rejects unknown names.
    pub fn set_raw(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.0.insert(name.into(), value);
        self
    }

    /// Get the value for a known field.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&Value> {
        self.0.get(field.as_str())
    }

    /// Iterate over column names and values in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for UpdateMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An update routed to its owning tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub venue: Record,
    pub trial: Record,
}

impl Partition {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.venue.is_empty() && self.trial.is_empty()
    }
}

/// Errors raised while routing an update map.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    /// The column is not owned by either table.
    #[error("field '{0}' is not a venue or trial column")]
    UnroutedField(String),
}

/// Partition an update map into venue columns and trial columns.
///
/// # Errors
///
/// Returns [`SplitError::UnroutedField`] for the first key that belongs to
/// neither table. Nothing is partially routed.
pub fn split(updates: &UpdateMap) -> Result<Partition, SplitError> {
    let mut partition = Partition::default();
    for (name, value) in updates.iter() {
        let target = match owner_of(name) {
            Some(Owner::Trial) => &mut partition.trial,
            Some(Owner::Venue) => &mut partition.venue,
            None => return Err(SplitError::UnroutedField(name.to_string())),
        };
        target.insert(name.to_string(), value.clone());
    }
    Ok(partition)
}
