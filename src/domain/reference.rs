//! Reference data: outcome reasons and products.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::{ProductId, ReasonId};
use super::money::Price;

/// Which kind of outcome a reason may justify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonCategory {
    Successful,
    Unsuccessful,
}

impl fmt::Display for ReasonCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Successful => f.write_str("successful"),
            Self::Unsuccessful => f.write_str("unsuccessful"),
        }
    }
}

/// A categorized justification for closing a trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeReason {
    pub id: ReasonId,
    pub label: String,
    pub category: ReasonCategory,
}

impl OutcomeReason {
    pub fn new(id: impl Into<ReasonId>, label: impl Into<String>, category: ReasonCategory) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            category,
        }
    }
}

/// A product row from `product-types` or `competitor-products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub price_per_litre: Option<Price>,
}
