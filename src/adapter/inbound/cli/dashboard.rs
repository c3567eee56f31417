//! Handler for `trialdesk dashboard`.

use std::path::Path;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde_json::json;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::command::DashboardArgs;
use super::output;
use crate::adapter::outbound::memory::MemoryStore;
use crate::application::dashboard::{Dashboard, TrialSummary};
use crate::application::service::TrialService;
use crate::domain::id::RepId;
use crate::domain::kpi::{Delta, Metric, MetricReport, Trend};
use crate::domain::trial::TrialStatus;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "30d change")]
    change: String,
    #[tabled(rename = "Target")]
    target: String,
}

#[derive(Tabled)]
struct TrialRow {
    #[tabled(rename = "Venue")]
    venue: String,
    #[tabled(rename = "Status")]
    status: TrialStatus,
    #[tabled(rename = "Started")]
    started: String,
    #[tabled(rename = "Days")]
    days: String,
    #[tabled(rename = "L/week")]
    weekly: String,
    #[tabled(rename = "Bracket")]
    bracket: String,
    #[tabled(rename = "Saving/week")]
    saving: String,
}

/// Execute `dashboard`.
pub async fn execute(args: &DashboardArgs) -> Result<()> {
    let config = Config::load_or_default(&args.config)?;
    config.init_logging();

    let store = Arc::new(load_export(&args.data)?);
    let service = TrialService::new(store).with_kpi(config.windows(), config.targets());

    let rep = args.rep.as_deref().map(RepId::from);
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let dashboard = service.dashboard(rep.as_ref(), as_of).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "dashboard",
            "rep": rep,
            "dashboard": serde_json::to_value(&dashboard)?,
        }));
        return Ok(());
    }
    if output::is_quiet() {
        report_anomalies(&dashboard);
        return Ok(());
    }

    print(&dashboard, rep.as_ref());
    Ok(())
}

fn load_export(path: &Path) -> Result<MemoryStore> {
    let content = std::fs::read_to_string(path)?;
    MemoryStore::from_export(&content)
}

fn print(dashboard: &Dashboard, rep: Option<&RepId>) {
    let snapshot = &dashboard.snapshot;

    output::header(env!("CARGO_PKG_VERSION"));
    output::section("Dashboard");
    output::field(
        "Representative",
        rep.map_or_else(|| "all".to_string(), output::highlight),
    );
    output::field("As of", snapshot.as_of);
    output::field("Headline", window(snapshot.headline.start, snapshot.headline.end));
    output::field("Comparison", window(snapshot.comparison.start, snapshot.comparison.end));

    output::section("KPIs");
    let rows: Vec<MetricRow> = snapshot.metrics.iter().map(metric_row).collect();
    output::lines(&Table::new(rows).with(Style::rounded()).to_string());

    output::section("Targets");
    for report in &snapshot.metrics {
        let (Some(value), Some(target), Some(met)) = (report.value, report.target, report.meets_target) else {
            continue;
        };
        let value = format_value(report.metric, value);
        let value = if met {
            output::positive(value)
        } else {
            output::negative(value)
        };
        output::field(
            report.metric.label(),
            format!("{value} (target {})", format_value(report.metric, target)),
        );
    }

    output::section("Pipeline");
    for status in TrialStatus::ALL {
        let count = snapshot.pipeline.get(&status).copied().unwrap_or(0);
        output::field(status.as_str(), count);
    }
    output::field("Awaiting reading", snapshot.awaiting_reading);
    report_anomalies(dashboard);

    output::section("Trials");
    if dashboard.trials.is_empty() {
        output::note("No trials in the pipeline.");
    } else {
        let rows: Vec<TrialRow> = dashboard.trials.iter().map(trial_row).collect();
        output::lines(&Table::new(rows).with(Style::rounded()).to_string());
    }
}

fn report_anomalies(dashboard: &Dashboard) {
    if dashboard.snapshot.orphaned > 0 {
        output::warning(&format!(
            "{} venue(s) carry a trial status with no trial record",
            dashboard.snapshot.orphaned
        ));
    }
}

fn window(start: NaiveDate, end: NaiveDate) -> String {
    format!("{start} to {end}")
}

fn metric_row(report: &MetricReport) -> MetricRow {
    MetricRow {
        metric: report.metric.label(),
        value: report
            .value
            .map_or_else(|| "-".to_string(), |v| format_value(report.metric, v)),
        change: report.delta.map_or_else(|| "-".to_string(), format_delta),
        target: report
            .target
            .map_or_else(|| "-".to_string(), |t| format_value(report.metric, t)),
    }
}

fn format_value(metric: Metric, value: Decimal) -> String {
    match metric {
        Metric::WinRate => format!("{value}%"),
        Metric::TimeToDecision => format!("{value} days"),
        Metric::AvgSoldPrice => format!("{value}/L"),
        Metric::Velocity => format!("{value}/month"),
    }
}

fn format_delta(delta: Delta) -> String {
    let sign = if delta.change > Decimal::ZERO { "+" } else { "" };
    let arrow = match delta.trend {
        Trend::Improving => "▲",
        Trend::Regressing => "▼",
        Trend::Unchanged => "=",
    };
    format!("{sign}{} {arrow}", delta.change)
}

fn trial_row(summary: &TrialSummary) -> TrialRow {
    let dash = || "-".to_string();
    TrialRow {
        venue: summary.venue_name.clone(),
        status: summary.status,
        started: summary.start_date.map_or_else(dash, |d| d.to_string()),
        days: summary.days_elapsed.map_or_else(dash, |d| d.to_string()),
        weekly: summary.weekly_average.map_or_else(dash, |l| l.to_string()),
        bracket: summary.bracket.map_or_else(dash, |b| b.to_string()),
        saving: summary
            .savings
            .as_ref()
            .map_or_else(dash, |s| format!("{} L / {}", s.weekly_litres, s.weekly_spend)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::kpi::Polarity;
    use rust_decimal_macros::dec;

    #[test]
    fn values_carry_units() {
        assert_eq!(format_value(Metric::WinRate, dec!(60)), "60%");
        assert_eq!(format_value(Metric::TimeToDecision, dec!(21)), "21 days");
        assert_eq!(format_value(Metric::Velocity, dec!(4)), "4/month");
    }

    #[test]
    fn deltas_show_sign_and_direction() {
        assert_eq!(
            format_delta(Delta::new(dec!(25), Polarity::HigherIsBetter)),
            "+25 ▲"
        );
        assert_eq!(
            format_delta(Delta::new(dec!(3), Polarity::LowerIsBetter)),
            "+3 ▼"
        );
        assert_eq!(
            format_delta(Delta::new(dec!(-2), Polarity::LowerIsBetter)),
            "-2 ▲"
        );
        assert_eq!(format_delta(Delta::new(dec!(0), Polarity::HigherIsBetter)), "0 =");
    }
}
