//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings. It is
//! loaded from a TOML file; every section is optional and falls back to its
//! defaults.
//!
//! # Example
//!
//! ```no_run
//! use trialdesk::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("trialdesk.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::kpi::{KpiConfig, TargetsConfig};
use super::logging::LoggingConfig;
use crate::domain::kpi::{KpiTargets, KpiWindows};
use crate::error::{ConfigError, Result};

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "trialdesk.toml";

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Rolling window lengths for KPIs.
    #[serde(default)]
    pub kpi: KpiConfig,

    /// Metric targets. Overridden per key by the `system-settings` table.
    #[serde(default)]
    pub targets: TargetsConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load `path` if it exists, otherwise use defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Check every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first value out of range.
    pub fn validate(&self) -> Result<()> {
        self.logging.validate()?;
        self.kpi.validate()?;
        self.targets.validate()?;
        Ok(())
    }

    /// Initialize logging from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    #[must_use]
    pub fn windows(&self) -> KpiWindows {
        self.kpi.clone().into()
    }

    #[must_use]
    pub fn targets(&self) -> KpiTargets {
        self.targets.clone().into()
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be represented in TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::InvalidValue {
                field: "config",
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.windows(), KpiWindows::default());
        assert_eq!(config.targets(), KpiTargets::default());
    }

    #[test]
    fn sections_are_parsed() {
        let config = Config::parse_toml(
            r#"
[logging]
level = "debug"
format = "json"

[kpi]
headline_window_days = 60

[targets]
win_rate = 55
avg_sold_price = 2.45
"#,
        )
        .unwrap();

        assert_eq!(config.logging.format, "json");
        assert_eq!(config.windows().headline_days, 60);
        assert_eq!(config.windows().comparison_days, 30);
        assert_eq!(config.targets().win_rate, Some(dec!(55)));
        assert_eq!(config.targets().avg_sold_price, Some(dec!(2.45)));
        assert_eq!(config.targets().trials_per_month, None);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            Config::parse_toml("[kpi\n"),
            Err(Error::Config(ConfigError::Parse(_)))
        ));
    }

    #[test]
    fn shown_config_parses_back() {
        let config = Config::parse_toml("[targets]\nwin_rate = 40\n").unwrap();
        let rendered = config.to_toml().unwrap();
        assert_eq!(Config::parse_toml(&rendered).unwrap(), config);
    }
}
