//! Application layer: orchestrates the store port and the trial domain.

pub mod dashboard;
pub mod optimistic;
pub mod service;

pub use dashboard::{Dashboard, TrialSummary};
pub use optimistic::Optimistic;
pub use service::TrialService;
