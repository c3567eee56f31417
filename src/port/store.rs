//! Persistence port for the collaborator store.
//!
//! The store is a remote structured data store reached through simple
//! select/insert/update/upsert calls keyed by table and filter. Records are
//! JSON objects whose keys are column names.

use std::fmt;
use std::future::Future;

use serde_json::Value;

use crate::domain::field::Record;
use crate::error::Result;

/// Tables the trial engine reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Venues,
    Trials,
    Readings,
    ProductTypes,
    CompetitorProducts,
    OutcomeReasons,
    SystemSettings,
}

impl Table {
    /// Every table.
    pub const ALL: [Table; 7] = [
        Table::Venues,
        Table::Trials,
        Table::Readings,
        Table::ProductTypes,
        Table::CompetitorProducts,
        Table::OutcomeReasons,
        Table::SystemSettings,
    ];

    /// Table name in the store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Venues => "venues",
            Self::Trials => "trials",
            Self::Readings => "readings",
            Self::ProductTypes => "product-types",
            Self::CompetitorProducts => "competitor-products",
            Self::OutcomeReasons => "outcome-reasons",
            Self::SystemSettings => "system-settings",
        }
    }

    /// Look up a table by its store name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One predicate on a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Condition {
    fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Eq(column, value) => record.get(column).unwrap_or(&Value::Null) == value,
            Self::In(column, values) => record.get(column).is_some_and(|v| values.contains(v)),
        }
    }
}

/// A conjunction of column predicates. The empty filter selects every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Select every row.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Require `column == value`.
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(column.into(), value.into()));
        self
    }

    /// Require `column` to be one of `values`.
    #[must_use]
    pub fn is_in<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push(Condition::In(column.into(), values));
        self
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Evaluate the filter against a record.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

/// Operations of the collaborator store.
pub trait Store: Send + Sync {
    /// Rows of `table` matching `filter`.
    fn select(&self, table: Table, filter: &Filter) -> impl Future<Output = Result<Vec<Record>>> + Send;

    /// Insert a row and return it as stored (with its assigned `id`).
    fn insert(&self, table: Table, record: Record) -> impl Future<Output = Result<Record>> + Send;

    /// Update columns of the row with `id`.
    fn update(&self, table: Table, id: &str, fields: Record) -> impl Future<Output = Result<()>> + Send;

    /// Insert rows, replacing any row that matches on every `conflict_key` column.
    fn upsert(
        &self,
        table: Table,
        records: Vec<Record>,
        conflict_key: &[&str],
    ) -> impl Future<Output = Result<()>> + Send;
}
