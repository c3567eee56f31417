//! Storage-agnostic trial domain: records, the merged view, the lifecycle
//! state machine, reading aggregation and KPIs.

pub mod error;
pub mod field;
pub mod id;
pub mod kpi;
pub mod lifecycle;
pub mod money;
pub mod reading;
pub mod reference;
pub mod timeline;
pub mod trial;
pub mod trial_venue;
pub mod usage;
pub mod venue;

pub use error::{DomainError, TransitionError};
pub use field::{split, Field, Partition, Record, SplitError, UpdateMap};
pub use id::{ProductId, ReasonId, RepId, TrialId, VenueId};
pub use lifecycle::{CloseRequest, Outcome, Transition, TrialEvent};
pub use money::{Litres, Price};
pub use reading::{Reading, ReadingKey};
pub use reference::{OutcomeReason, Product, ReasonCategory};
pub use timeline::{TimelineEntry, TimelineKind};
pub use trial::{NewTrial, Trial, TrialStatus};
pub use trial_venue::{merge, MergedStatus, TrialVenue};
pub use usage::VolumeBracket;
pub use venue::Venue;
