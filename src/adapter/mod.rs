//! Adapters connecting the application to the outside world.
//!
//! - [`inbound`] - The `trialdesk` command line
//! - [`outbound`] - Store implementations

pub mod inbound;
pub mod outbound;
