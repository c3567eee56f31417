//! Domain validation errors for core domain types.
//!
//! [`DomainError`] is returned when a record read from the store, or a reading
//! about to be written, violates a domain invariant. [`TransitionError`] is
//! returned when a lifecycle transition fails its guard.

use chrono::NaiveDate;
use thiserror::Error;

use super::id::VenueId;
use super::reference::ReasonCategory;
use super::trial::TrialStatus;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// A decided trial is missing a field its status requires.
    #[error("trial with status {status} is missing {field}")]
    MissingDecisionField {
        /// Status of the trial.
        status: TrialStatus,
        /// The absent field.
        field: &'static str,
    },

    /// End date precedes start date.
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart {
        /// Trial start date.
        start: NaiveDate,
        /// Trial end date.
        end: NaiveDate,
    },

    /// Fryer number is outside `1..=fryer_count`.
    #[error("fryer {fryer} is out of range for a venue with {fryer_count} fryers")]
    FryerOutOfRange {
        /// Requested fryer number.
        fryer: u32,
        /// Fryers at the venue.
        fryer_count: u32,
    },

    /// Sequence numbers start at 1.
    #[error("reading sequence must be at least 1")]
    ZeroSequence,

    /// Litres added cannot be negative.
    #[error("litres added must not be negative, got {litres}")]
    NegativeLitres {
        /// The invalid litres value.
        litres: rust_decimal::Decimal,
    },

    /// Oil age starts at 1 (the day of a fresh fill).
    #[error("oil age must be at least 1 day")]
    ZeroOilAge,

    /// A status string did not name any known trial status.
    #[error("unknown trial status '{0}'")]
    UnknownStatus(String),
}

/// A requested lifecycle transition was rejected by its guard.
///
/// Returned before any write is attempted, with enough detail to tell the user
/// which rule was broken.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    /// The venue has no trial row to transition.
    #[error("venue {venue_id} has no trial")]
    NoTrial {
        /// The venue the transition was requested for.
        venue_id: VenueId,
    },

    /// The event is not allowed from the trial's current status.
    #[error("cannot {event} a trial that is {from}")]
    IllegalTransition {
        /// Name of the requested event.
        event: &'static str,
        /// Current status.
        from: TrialStatus,
    },

    /// Push back is only allowed one step back in the lifecycle.
    #[error("cannot push a {from} trial back to {to}")]
    IllegalPushBack {
        /// Current status.
        from: TrialStatus,
        /// Requested status.
        to: TrialStatus,
    },

    /// A win was recorded without a sold price.
    #[error("a won trial needs a sold price per litre")]
    MissingSoldPrice,

    /// The sold price must be positive.
    #[error("sold price must be greater than 0, got {price}")]
    NonPositiveSoldPrice {
        /// The rejected price.
        price: rust_decimal::Decimal,
    },

    /// The outcome reason belongs to the other category.
    #[error("outcome reason '{reason}' is {found}, expected a {expected} reason")]
    WrongReasonCategory {
        /// Label of the supplied reason.
        reason: String,
        /// Category the outcome requires.
        expected: ReasonCategory,
        /// Category of the supplied reason.
        found: ReasonCategory,
    },

    /// The customer code was blank.
    #[error("customer code must not be empty")]
    EmptyCustomerCode,

    /// Ending today would put the end date before the start date.
    #[error("cannot end on {end}, before the trial started on {start}")]
    EndBeforeStart {
        /// Trial start date.
        start: NaiveDate,
        /// Requested end date.
        end: NaiveDate,
    },

    /// The outcome date falls before the trial started.
    #[error("outcome date {outcome} is before the trial started on {start}")]
    OutcomeBeforeStart {
        /// Trial start date.
        start: NaiveDate,
        /// Requested outcome date.
        outcome: NaiveDate,
    },
}
