//! Dashboard assembly: the KPI snapshot plus per-trial usage for the pipeline.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::id::VenueId;
use crate::domain::kpi::{snapshot, KpiSnapshot, KpiTargets, KpiWindows};
use crate::domain::money::Litres;
use crate::domain::reading::Reading;
use crate::domain::trial::TrialStatus;
use crate::domain::trial_venue::TrialVenue;
use crate::domain::usage::{
    awaiting_reading_today, classify_volume_bracket, elapsed_days, trial_savings,
    trial_weekly_average, usage_breakdown, SavingsProjection, UsageBreakdown, VolumeBracket,
};

/// Usage and savings for one trial still in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialSummary {
    pub venue_id: VenueId,
    pub venue_name: String,
    pub status: TrialStatus,
    pub start_date: Option<NaiveDate>,
    pub days_elapsed: Option<i64>,
    pub usage: Option<UsageBreakdown>,
    pub weekly_average: Option<Litres>,
    pub bracket: Option<VolumeBracket>,
    pub savings: Option<SavingsProjection>,
    pub awaiting_reading: bool,
}

impl TrialSummary {
    /// Summarize `view`, or `None` when it has no trial in the pipeline.
    #[must_use]
    pub fn build(view: &TrialVenue, readings: &[Reading], today: NaiveDate) -> Option<Self> {
        let trial = view.trial()?;
        if !trial.status.is_active() {
            return None;
        }

        let weekly_average = trial_weekly_average(
            view.venue_id(),
            trial.start_date,
            readings,
            trial.end_date,
            today,
        );

        Some(Self {
            venue_id: view.venue_id().clone(),
            venue_name: view.venue().name.clone(),
            status: trial.status,
            start_date: trial.start_date,
            days_elapsed: trial
                .start_date
                .map(|start| elapsed_days(start, trial.end_date, today)),
            usage: usage_breakdown(view, readings, today),
            weekly_average,
            bracket: weekly_average
                .and_then(classify_volume_bracket)
                .or(view.venue().volume_bracket),
            savings: trial_savings(view, readings, None, today),
            awaiting_reading: awaiting_reading_today(view, readings, today),
        })
    }
}

/// Everything the dashboard shows for one representative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub snapshot: KpiSnapshot,
    pub trials: Vec<TrialSummary>,
}

impl Dashboard {
    #[must_use]
    pub fn build(
        views: &[TrialVenue],
        readings: &[Reading],
        targets: &KpiTargets,
        windows: KpiWindows,
        as_of: NaiveDate,
    ) -> Self {
        let mut trials: Vec<TrialSummary> = views
            .iter()
            .filter_map(|view| TrialSummary::build(view, readings, as_of))
            .collect();
        trials.sort_by(|a, b| {
            a.status
                .cmp(&b.status)
                .then_with(|| a.start_date.cmp(&b.start_date))
                .then_with(|| a.venue_name.cmp(&b.venue_name))
        });

        Self {
            snapshot: snapshot(views, readings, targets, windows, as_of),
            trials,
        }
    }
}
