//! Venue records: the physical sites a trial runs at.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::id::{ProductId, VenueId};
use super::trial::TrialStatus;
use super::usage::VolumeBracket;

/// A physical site undergoing or eligible for a trial.
///
/// Field names match the columns of the `venues` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub id: VenueId,
    pub name: String,
    #[serde(default = "default_fryer_count")]
    pub fryer_count: u32,
    /// The product the venue currently uses.
    #[serde(default)]
    pub default_product_id: Option<ProductId>,
    /// State or region code.
    #[serde(default)]
    pub state: Option<String>,
    /// Prospect code, or the permanent code once a won trial is finalized.
    #[serde(default)]
    pub customer_code: Option<String>,
    #[serde(default)]
    pub last_measured_on: Option<NaiveDate>,
    /// Stored classification of the venue's weekly usage.
    #[serde(default)]
    pub volume_bracket: Option<VolumeBracket>,
    /// Mirror of the trial's status kept on the venue row.
    #[serde(default)]
    pub trial_status: Option<TrialStatus>,
}

const fn default_fryer_count() -> u32 {
    1
}

impl Venue {
    /// Create a venue with only the required fields set.
    pub fn new(id: impl Into<VenueId>, name: impl Into<String>, fryer_count: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fryer_count,
            default_product_id: None,
            state: None,
            customer_code: None,
            last_measured_on: None,
            volume_bracket: None,
            trial_status: None,
        }
    }

    /// True when `fryer` is a valid fryer number for this venue.
    #[must_use]
    pub fn has_fryer(&self, fryer: u32) -> bool {
        (1..=self.fryer_count).contains(&fryer)
    }
}
