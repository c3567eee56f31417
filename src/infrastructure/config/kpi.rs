//! KPI window and target configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::kpi::{KpiTargets, KpiWindows};
use crate::error::ConfigError;

/// Rolling window lengths in days.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KpiConfig {
    /// Window for headline values (default: 90).
    #[serde(default = "default_headline_window_days")]
    pub headline_window_days: u32,
    /// Window compared against the one before it for trends (default: 30).
    #[serde(default = "default_comparison_window_days")]
    pub comparison_window_days: u32,
}

const fn default_headline_window_days() -> u32 {
    90
}

const fn default_comparison_window_days() -> u32 {
    30
}

impl Default for KpiConfig {
    fn default() -> Self {
        Self {
            headline_window_days: default_headline_window_days(),
            comparison_window_days: default_comparison_window_days(),
        }
    }
}

impl KpiConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.headline_window_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "headline_window_days",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.comparison_window_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "comparison_window_days",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

impl From<KpiConfig> for KpiWindows {
    fn from(config: KpiConfig) -> Self {
        Self {
            headline_days: config.headline_window_days,
            comparison_days: config.comparison_window_days,
        }
    }
}

/// Targets the dashboard compares each metric against. All optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TargetsConfig {
    /// Win rate in percent, 0 to 100.
    #[serde(default)]
    pub win_rate: Option<Decimal>,
    #[serde(default)]
    pub time_to_decision_days: Option<Decimal>,
    /// Average sold price per litre.
    #[serde(default)]
    pub avg_sold_price: Option<Decimal>,
    #[serde(default)]
    pub trials_per_month: Option<Decimal>,
}

impl TargetsConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(rate) = self.win_rate {
            if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
                return Err(ConfigError::InvalidValue {
                    field: "win_rate",
                    reason: "must be between 0 and 100".to_string(),
                });
            }
        }
        let positive = [
            ("time_to_decision_days", self.time_to_decision_days),
            ("avg_sold_price", self.avg_sold_price),
            ("trials_per_month", self.trials_per_month),
        ];
        for (field, value) in positive {
            if value.is_some_and(|v| v <= Decimal::ZERO) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than 0".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl From<TargetsConfig> for KpiTargets {
    fn from(config: TargetsConfig) -> Self {
        Self {
            win_rate: config.win_rate,
            time_to_decision_days: config.time_to_decision_days,
            avg_sold_price: config.avg_sold_price,
            trials_per_month: config.trials_per_month,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn windows_convert() {
        let windows = KpiWindows::from(KpiConfig {
            headline_window_days: 60,
            comparison_window_days: 14,
        });
        assert_eq!(windows.headline_days, 60);
        assert_eq!(windows.comparison_days, 14);
    }

    #[test]
    fn zero_window_is_rejected() {
        let config = KpiConfig {
            comparison_window_days: 0,
            ..KpiConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "comparison_window_days",
                ..
            })
        ));
    }

    #[test]
    fn win_rate_target_must_be_a_percentage() {
        let config = TargetsConfig {
            win_rate: Some(dec!(120)),
            ..TargetsConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TargetsConfig {
            win_rate: Some(dec!(60)),
            ..TargetsConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_positive_targets_are_rejected() {
        let config = TargetsConfig {
            avg_sold_price: Some(dec!(0)),
            ..TargetsConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "avg_sold_price",
                ..
            })
        ));
    }
}
