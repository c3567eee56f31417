use thiserror::Error;

use crate::domain::error::{DomainError, TransitionError};
use crate::domain::field::SplitError;
use crate::domain::trial_venue::ApplyError;
use crate::port::store::Table;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// A store call failed before anything was written.
    #[error("store error on {table}: {message}")]
    Store { table: Table, message: String },

    /// The venue write succeeded but the trial write did not.
    ///
    /// The two tables are now out of step; the caller decides whether to retry
    /// the failed half or roll back.
    #[error("partial write: {written} updated but {failed} failed: {source}")]
    PartialWrite {
        written: Table,
        failed: Table,
        #[source]
        source: Box<Error>,
    },

    #[error("{table} row {id} not found")]
    NotFound { table: Table, id: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Build a store error for `table`.
    pub fn store(table: Table, message: impl Into<String>) -> Self {
        Self::Store {
            table,
            message: message.into(),
        }
    }

    /// True when the request was rejected before any write was attempted.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Domain(_) | Self::Transition(_) | Self::Split(_) | Self::Apply(_)
        )
    }

    /// True when one table was written and the other was not.
    #[must_use]
    pub fn is_partial_write(&self) -> bool {
        matches!(self, Self::PartialWrite { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
