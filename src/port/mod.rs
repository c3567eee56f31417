//! Ports: the interfaces the trial engine needs from the outside world.

pub mod store;

pub use store::{Filter, Store, Table};
