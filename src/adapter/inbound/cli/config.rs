//! Handler for the `config` command group.

use std::path::Path;

use serde_json::json;

use super::output;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

/// Execute `config validate`.
pub fn execute_validate(path: &Path) -> Result<()> {
    let config = Config::load(path)?;

    if output::is_json() {
        output::json_output(json!({
            "command": "config.validate",
            "path": path.display().to_string(),
            "valid": true,
        }));
        return Ok(());
    }

    output::success(&format!("{} is valid", path.display()));
    let targets = config.targets();
    let set = [
        targets.win_rate,
        targets.time_to_decision_days,
        targets.avg_sold_price,
        targets.trials_per_month,
    ]
    .iter()
    .filter(|t| t.is_some())
    .count();
    if set == 0 {
        output::hint("no [targets] set; dashboard target checks will be skipped");
    }
    Ok(())
}

/// Execute `config show`.
///
/// A missing file is not an error here: the defaults are shown instead.
pub fn execute_show(path: &Path) -> Result<()> {
    let exists = path.exists();
    let config = Config::load_or_default(path)?;

    if output::is_json() {
        output::json_output(json!({
            "command": "config.show",
            "path": path.display().to_string(),
            "loaded": exists,
            "config": serde_json::to_value(&config)?,
        }));
        return Ok(());
    }

    output::section("Effective Configuration");
    output::field("Path", path.display());
    if !exists {
        output::note("file not found; showing defaults");
    }

    output::section("Logging");
    output::field("Level", &config.logging.level);
    output::field("Format", &config.logging.format);

    output::section("KPI windows");
    output::field("Headline", format!("{} days", config.kpi.headline_window_days));
    output::field("Comparison", format!("{} days", config.kpi.comparison_window_days));

    output::section("Targets");
    let targets = [
        ("Win rate", config.targets.win_rate),
        ("Time to decision", config.targets.time_to_decision_days),
        ("Avg sold price", config.targets.avg_sold_price),
        ("Trials per month", config.targets.trials_per_month),
    ];
    for (label, value) in targets {
        match value {
            Some(value) => output::field(label, value),
            None => output::field(label, output::muted("unset")),
        }
    }
    output::hint("system-settings rows override these targets at dashboard time");
    Ok(())
}
