//! Rolling-window KPIs and period-over-period trends.
//!
//! Headline values cover a trailing window (90 days by default). Deltas
//! compare the most recent comparison window (30 days) with the one before
//! it. Decided-trial metrics place a trial by its outcome date; velocity
//! places it by its start date.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use super::money::{round_cents, round_whole};
use super::reading::Reading;
use super::trial::TrialStatus;
use super::trial_venue::{MergedStatus, TrialVenue};
use super::usage::awaiting_reading_today;

const DAYS_PER_MONTH: Decimal = Decimal::from_parts(30, 0, 0, false, 0);
const HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    /// The `days` days ending on `as_of`, inclusive.
    #[must_use]
    pub fn trailing(as_of: NaiveDate, days: u32) -> Self {
        let days = i64::from(days.max(1));
        Self {
            start: as_of - Duration::days(days - 1),
            end: as_of,
        }
    }

    /// The window of the same length immediately before this one.
    #[must_use]
    pub fn previous(&self) -> Self {
        let len = Duration::days(self.days());
        Self {
            start: self.start - len,
            end: self.end - len,
        }
    }

    /// Number of days covered.
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Which direction of change counts as an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

/// Direction of a delta, interpreted through its metric's polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Regressing,
    Unchanged,
}

/// The tracked metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Won as a whole-number percentage of decided trials.
    WinRate,
    /// Mean whole days from start to outcome.
    TimeToDecision,
    /// Mean sold price per litre of won trials.
    AvgSoldPrice,
    /// Trials started per 30 days.
    Velocity,
}

impl Metric {
    #[must_use]
    pub const fn polarity(self) -> Polarity {
        match self {
            Self::TimeToDecision => Polarity::LowerIsBetter,
            Self::WinRate | Self::AvgSoldPrice | Self::Velocity => Polarity::HigherIsBetter,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::WinRate => "Win rate",
            Self::TimeToDecision => "Time to decision",
            Self::AvgSoldPrice => "Avg sold price",
            Self::Velocity => "Trial velocity",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A period-over-period change tagged with how to read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Delta {
    pub change: Decimal,
    pub polarity: Polarity,
    pub trend: Trend,
}

impl Delta {
    #[must_use]
    pub fn new(change: Decimal, polarity: Polarity) -> Self {
        let trend = if change.is_zero() {
            Trend::Unchanged
        } else if (change > Decimal::ZERO) == (polarity == Polarity::HigherIsBetter) {
            Trend::Improving
        } else {
            Trend::Regressing
        };
        Self {
            change,
            polarity,
            trend,
        }
    }
}

/// Compare the current window's value with the previous window's.
///
/// Returns `None` when either window has no value.
#[must_use]
pub fn rolling_delta(metric: Metric, current: Option<Decimal>, previous: Option<Decimal>) -> Option<Delta> {
    Some(Delta::new(current? - previous?, metric.polarity()))
}

/// Whether `value` meets `target` for `metric`.
#[must_use]
pub fn meets_target(metric: Metric, value: Decimal, target: Decimal) -> bool {
    match metric.polarity() {
        Polarity::HigherIsBetter => value >= target,
        Polarity::LowerIsBetter => value <= target,
    }
}

/// Configured targets; each is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KpiTargets {
    pub win_rate: Option<Decimal>,
    pub time_to_decision_days: Option<Decimal>,
    pub avg_sold_price: Option<Decimal>,
    pub trials_per_month: Option<Decimal>,
}

impl KpiTargets {
    #[must_use]
    pub fn for_metric(&self, metric: Metric) -> Option<Decimal> {
        match metric {
            Metric::WinRate => self.win_rate,
            Metric::TimeToDecision => self.time_to_decision_days,
            Metric::AvgSoldPrice => self.avg_sold_price,
            Metric::Velocity => self.trials_per_month,
        }
    }
}

/// Window lengths used by the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KpiWindows {
    pub headline_days: u32,
    pub comparison_days: u32,
}

impl Default for KpiWindows {
    fn default() -> Self {
        Self {
            headline_days: 90,
            comparison_days: 30,
        }
    }
}

fn with_status<'a>(
    trials: impl IntoIterator<Item = &'a TrialVenue>,
    status: TrialStatus,
) -> impl Iterator<Item = &'a TrialVenue> {
    trials
        .into_iter()
        .filter(move |t| t.trial_status() == Some(status))
}

fn mean(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    let (sum, count) = values
        .into_iter()
        .fold((Decimal::ZERO, 0u32), |(sum, n), v| (sum + v, n + 1));
    (count > 0).then(|| sum / Decimal::from(count))
}

/// Percentage of decided trials that were won, rounded to a whole number.
#[must_use]
pub fn win_rate<'a>(trials: impl IntoIterator<Item = &'a TrialVenue>) -> Option<Decimal> {
    let (won, lost) = trials
        .into_iter()
        .fold((0u32, 0u32), |(won, lost), t| match t.trial_status() {
            Some(TrialStatus::Won) => (won + 1, lost),
            Some(TrialStatus::Lost) => (won, lost + 1),
            _ => (won, lost),
        });
    let decided = won + lost;
    (decided > 0).then(|| round_whole(Decimal::from(won) * HUNDRED / Decimal::from(decided)))
}

/// Mean whole days from start to outcome over won and lost trials.
#[must_use]
pub fn average_time_to_decision<'a>(
    trials: impl IntoIterator<Item = &'a TrialVenue>,
) -> Option<Decimal> {
    let days = trials
        .into_iter()
        .filter(|t| matches!(t.trial_status(), Some(TrialStatus::Won | TrialStatus::Lost)))
        .filter_map(|t| t.trial()?.days_to_decision())
        .map(Decimal::from);
    mean(days).map(round_whole)
}

/// Mean sold price per litre over won trials with a price.
#[must_use]
pub fn average_sold_price<'a>(trials: impl IntoIterator<Item = &'a TrialVenue>) -> Option<Decimal> {
    mean(with_status(trials, TrialStatus::Won).filter_map(TrialVenue::sold_price)).map(round_cents)
}

/// Trials started inside `window`, as a whole-number rate per 30 days.
#[must_use]
pub fn trial_velocity<'a>(
    trials: impl IntoIterator<Item = &'a TrialVenue>,
    window: &Window,
) -> Option<Decimal> {
    let started = trials
        .into_iter()
        .filter(|t| t.start_date().is_some_and(|d| window.contains(d)))
        .count();
    if started == 0 {
        return None;
    }
    let months = Decimal::from(window.days()) / DAYS_PER_MONTH;
    Some(round_whole(Decimal::from(started) / months))
}

/// Compute one metric over the trials that fall in `window`.
#[must_use]
pub fn metric_in_window(metric: Metric, trials: &[TrialVenue], window: &Window) -> Option<Decimal> {
    let decided = || {
        trials
            .iter()
            .filter(|t| t.outcome_date().is_some_and(|d| window.contains(d)))
    };
    match metric {
        Metric::WinRate => win_rate(decided()),
        Metric::TimeToDecision => average_time_to_decision(decided()),
        Metric::AvgSoldPrice => average_sold_price(decided()),
        Metric::Velocity => trial_velocity(trials, window),
    }
}

/// One metric's headline value, trend and target status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricReport {
    pub metric: Metric,
    pub value: Option<Decimal>,
    pub delta: Option<Delta>,
    pub target: Option<Decimal>,
    pub meets_target: Option<bool>,
}

impl MetricReport {
    /// Build the report for `metric` as of the end of `headline`.
    #[must_use]
    pub fn compute(
        metric: Metric,
        trials: &[TrialVenue],
        headline: &Window,
        comparison: &Window,
        targets: &KpiTargets,
    ) -> Self {
        let value = metric_in_window(metric, trials, headline);
        let delta = rolling_delta(
            metric,
            metric_in_window(metric, trials, comparison),
            metric_in_window(metric, trials, &comparison.previous()),
        );
        let target = targets.for_metric(metric);
        let meets_target = value
            .zip(target)
            .map(|(value, target)| meets_target(metric, value, target));
        Self {
            metric,
            value,
            delta,
            target,
            meets_target,
        }
    }
}

/// Dashboard statistics for one representative's trials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KpiSnapshot {
    pub as_of: NaiveDate,
    pub headline: Window,
    pub comparison: Window,
    pub metrics: Vec<MetricReport>,
    /// Trial count per status.
    pub pipeline: BTreeMap<TrialStatus, usize>,
    /// Running trials with no reading dated `as_of`.
    pub awaiting_reading: usize,
    /// Venues whose trial status has no backing trial row.
    pub orphaned: usize,
}

impl KpiSnapshot {
    /// Look up one metric's report.
    #[must_use]
    pub fn metric(&self, metric: Metric) -> Option<&MetricReport> {
        self.metrics.iter().find(|r| r.metric == metric)
    }
}

/// Compute the dashboard snapshot from the caller's current collection.
#[must_use]
pub fn snapshot(
    trials: &[TrialVenue],
    readings: &[Reading],
    targets: &KpiTargets,
    windows: KpiWindows,
    as_of: NaiveDate,
) -> KpiSnapshot {
    let headline = Window::trailing(as_of, windows.headline_days);
    let comparison = Window::trailing(as_of, windows.comparison_days);

    let metrics = [
        Metric::WinRate,
        Metric::TimeToDecision,
        Metric::AvgSoldPrice,
        Metric::Velocity,
    ]
    .into_iter()
    .map(|metric| MetricReport::compute(metric, trials, &headline, &comparison, targets))
    .collect();

    let mut pipeline = BTreeMap::new();
    for status in trials.iter().filter_map(TrialVenue::trial_status) {
        *pipeline.entry(status).or_insert(0) += 1;
    }

    KpiSnapshot {
        as_of,
        headline,
        comparison,
        metrics,
        pipeline,
        awaiting_reading: trials
            .iter()
            .filter(|t| awaiting_reading_today(t, readings, as_of))
            .count(),
        orphaned: trials
            .iter()
            .filter(|t| matches!(t.status(), MergedStatus::Orphaned(_)))
            .count(),
    }
}
