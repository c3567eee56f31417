//! Trialdesk - field trial lifecycle and metrics engine.
//!
//! Tracks trials in which a venue tests a substitute frying-oil product
//! against its current one: per-fryer readings, a status state machine from
//! pending to won or lost, and rolling KPIs over the trial collection.
//!
//! # Architecture
//!
//! The crate is laid out hexagonally:
//!
//! - **`domain`** - Pure, storage-agnostic logic
//!   - `usage` - Weekly usage, volume brackets and savings from readings
//!   - `trial_venue` / `field` - Merged venue+trial view and update routing
//!   - `lifecycle` - Trial status state machine
//!   - `kpi` - Win rate, time to decision, sold price and velocity with trends
//!
//! - **`port`** - The collaborator store contract
//! - **`application`** - `TrialService` orchestration over a store
//! - **`adapter`** - The in-memory store and the `trialdesk` CLI
//!
//! # Modules
//!
//! - [`adapter`] - Inbound CLI and outbound store implementations
//! - [`application`] - Loading, transitions, persistence and the dashboard
//! - [`domain`] - Records, merge/split, state machine, aggregation and KPIs
//! - [`error`] - Error types for the crate
//! - [`infrastructure`] - Configuration loading and logging setup
//! - [`port`] - Store trait and table names
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chrono::NaiveDate;
//! use trialdesk::adapter::outbound::memory::MemoryStore;
//! use trialdesk::application::TrialService;
//!
//! # async fn demo() -> trialdesk::error::Result<()> {
//! let store = Arc::new(MemoryStore::from_export(r#"{ "venues": [] }"#)?);
//! let service = TrialService::new(store);
//! let as_of = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap_or_default();
//! let dashboard = service.dashboard(None, as_of).await?;
//! println!("{} trials in the pipeline", dashboard.trials.len());
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;
