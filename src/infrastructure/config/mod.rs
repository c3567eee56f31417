//! Infrastructure configuration modules.

pub mod kpi;
pub mod logging;
pub mod settings;
