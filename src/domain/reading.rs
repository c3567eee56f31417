//! Per-fryer readings recorded during a trial.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{TrialId, VenueId};
use super::money::Litres;
use super::venue::Venue;

/// Columns forming the natural key of a reading, used as the upsert conflict key.
pub const READING_CONFLICT_KEY: [&str; 4] = ["venue_id", "fryer_number", "reading_date", "sequence"];

/// One measurement for one fryer at one venue on one calendar date.
///
/// Field names match the columns of the `readings` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub venue_id: VenueId,
    #[serde(default)]
    pub trial_id: Option<TrialId>,
    pub fryer_number: u32,
    pub reading_date: NaiveDate,
    /// 1 for the first value of the day; higher for same-day oil changes.
    #[serde(default = "default_sequence")]
    pub sequence: u32,
    /// Days since the last full fill; 1 means the fryer was filled fresh.
    pub oil_age: u32,
    #[serde(default)]
    pub litres_added: Litres,
    /// Measured oil quality, e.g. total polar material percentage.
    #[serde(default)]
    pub quality: Option<Decimal>,
    #[serde(default)]
    pub set_temperature: Option<Decimal>,
    #[serde(default)]
    pub actual_temperature: Option<Decimal>,
    /// Whether the fryer was filtered that day; `None` when unknown.
    #[serde(default)]
    pub filtered: Option<bool>,
    #[serde(default)]
    pub food_category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub out_of_service: bool,
    #[serde(default)]
    pub out_of_service_reason: Option<String>,
}

const fn default_sequence() -> u32 {
    1
}

/// Natural key of a reading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReadingKey {
    pub venue_id: VenueId,
    pub fryer_number: u32,
    pub reading_date: NaiveDate,
    pub sequence: u32,
}

impl Reading {
    /// Create a first-of-day reading with no optional measurements.
    pub fn new(
        venue_id: impl Into<VenueId>,
        fryer_number: u32,
        reading_date: NaiveDate,
        oil_age: u32,
        litres_added: Litres,
    ) -> Self {
        Self {
            venue_id: venue_id.into(),
            trial_id: None,
            fryer_number,
            reading_date,
            sequence: 1,
            oil_age,
            litres_added,
            quality: None,
            set_temperature: None,
            actual_temperature: None,
            filtered: None,
            food_category: None,
            notes: None,
            out_of_service: false,
            out_of_service_reason: None,
        }
    }

    /// Natural key of this reading.
    #[must_use]
    pub fn key(&self) -> ReadingKey {
        ReadingKey {
            venue_id: self.venue_id.clone(),
            fryer_number: self.fryer_number,
            reading_date: self.reading_date,
            sequence: self.sequence,
        }
    }

    /// A full-capacity refill: oil age 1 with litres added.
    #[must_use]
    pub fn is_fresh_fill(&self) -> bool {
        self.oil_age == 1 && self.litres_added > Decimal::ZERO
    }

    /// A partial replenishment: oil older than a day with litres added.
    #[must_use]
    pub fn is_top_up(&self) -> bool {
        self.oil_age > 1 && self.litres_added > Decimal::ZERO
    }

    /// Check the reading against the venue it is recorded for.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] describing the first invalid field.
    pub fn validate_for(&self, venue: &Venue) -> Result<(), DomainError> {
        if !venue.has_fryer(self.fryer_number) {
            return Err(DomainError::FryerOutOfRange {
                fryer: self.fryer_number,
                fryer_count: venue.fryer_count,
            });
        }
        if self.sequence == 0 {
            return Err(DomainError::ZeroSequence);
        }
        if self.oil_age == 0 {
            return Err(DomainError::ZeroOilAge);
        }
        if self.litres_added < Decimal::ZERO {
            return Err(DomainError::NegativeLitres {
                litres: self.litres_added,
            });
        }
        Ok(())
    }
}

/// Sequence number for another event on `fryer` at `venue` on `date`.
///
/// Returns 1 when nothing has been recorded for that fryer and day yet.
#[must_use]
pub fn next_sequence(readings: &[Reading], venue: &VenueId, fryer: u32, date: NaiveDate) -> u32 {
    readings
        .iter()
        .filter(|r| &r.venue_id == venue && r.fryer_number == fryer && r.reading_date == date)
        .map(|r| r.sequence)
        .max()
        .map_or(1, |seq| seq + 1)
}
