//! Reading aggregation: weekly usage, volume brackets and savings.
//!
//! Every function here is pure. Readings that belong to another venue are
//! ignored, so a reading whose venue no longer resolves simply drops out of the
//! sums instead of failing the calculation.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::VenueId;
use super::money::{round_cents, round_litres, round_whole, Litres, Price};
use super::reading::Reading;
use super::trial::TrialStatus;
use super::trial_venue::TrialVenue;

const DAYS_PER_WEEK: Decimal = Decimal::from_parts(7, 0, 0, false, 0);
const WEEKS_PER_YEAR: Decimal = Decimal::from_parts(52, 0, 0, false, 0);

/// Coarse classification of a venue's weekly oil usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VolumeBracket {
    #[serde(rename = "<60")]
    Under60,
    #[serde(rename = "60-100")]
    From60To100,
    #[serde(rename = "100-150")]
    From100To150,
    #[serde(rename = "150+")]
    From150,
}

impl VolumeBracket {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Under60 => "<60",
            Self::From60To100 => "60-100",
            Self::From100To150 => "100-150",
            Self::From150 => "150+",
        }
    }
}

impl fmt::Display for VolumeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify weekly litres into a volume bracket.
///
/// Brackets are closed on the low end: exactly 60 is `60-100`. Negative input
/// has no bracket.
#[must_use]
pub fn classify_volume_bracket(litres_per_week: Litres) -> Option<VolumeBracket> {
    if litres_per_week < Decimal::ZERO {
        return None;
    }
    let bracket = if litres_per_week < Decimal::from(60) {
        VolumeBracket::Under60
    } else if litres_per_week < Decimal::from(100) {
        VolumeBracket::From60To100
    } else if litres_per_week < Decimal::from(150) {
        VolumeBracket::From100To150
    } else {
        VolumeBracket::From150
    };
    Some(bracket)
}

/// Classify raw text input, e.g. a value typed into a form.
///
/// Non-numeric text has no bracket.
#[must_use]
pub fn classify_volume_text(input: &str) -> Option<VolumeBracket> {
    input
        .trim()
        .parse::<Decimal>()
        .ok()
        .and_then(classify_volume_bracket)
}

/// Last day counted for a trial: today, or the end date if it ended earlier.
fn window_end(end: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
    end.map_or(today, |end| end.min(today))
}

/// Whole days a trial has been running, never less than one.
#[must_use]
pub fn elapsed_days(start: NaiveDate, end: Option<NaiveDate>, today: NaiveDate) -> i64 {
    (window_end(end, today) - start).num_days().max(1)
}

/// Normalize `litres` used over the trial so far onto a weekly rate.
#[must_use]
pub fn weekly_rate(litres: Litres, start: NaiveDate, end: Option<NaiveDate>, today: NaiveDate) -> Litres {
    let days = Decimal::from(elapsed_days(start, end, today));
    round_litres(litres * DAYS_PER_WEEK / days)
}

/// Average weekly litres used during the trial, from fresh fills.
///
/// Returns `None` without a start date, or when the venue has no fresh-fill
/// readings inside the trial window.
#[must_use]
pub fn trial_weekly_average(
    venue_id: &VenueId,
    start: Option<NaiveDate>,
    readings: &[Reading],
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<Litres> {
    let start = start?;
    let last = window_end(end, today);

    let mut fresh = readings
        .iter()
        .filter(|r| &r.venue_id == venue_id)
        .filter(|r| r.reading_date >= start && r.reading_date <= last)
        .filter(|r| r.is_fresh_fill())
        .peekable();
    fresh.peek()?;

    let litres: Litres = fresh.map(|r| r.litres_added).sum();
    Some(weekly_rate(litres, start, end, today))
}

/// Litres used during a trial, split into fresh fills and top-ups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageBreakdown {
    pub fresh_fill_count: usize,
    pub fresh_litres: Litres,
    pub top_up_count: usize,
    pub top_up_litres: Litres,
    pub total_litres: Litres,
}

impl UsageBreakdown {
    /// Total to use for projections: the operator's adjusted figure when given.
    #[must_use]
    pub fn effective_total(&self, override_total: Option<Litres>) -> Litres {
        override_total.unwrap_or(self.total_litres)
    }
}

/// Break down the litres added at a venue during its trial.
///
/// Uses the same window as [`trial_weekly_average`]: from the start date to
/// the end date, or to `today` while the trial is running. Returns `None`
/// when the trial has not started.
#[must_use]
pub fn usage_breakdown(
    view: &TrialVenue,
    readings: &[Reading],
    today: NaiveDate,
) -> Option<UsageBreakdown> {
    let start = view.start_date()?;
    let last = window_end(view.end_date(), today);
    let mut out = UsageBreakdown::default();

    for reading in readings.iter().filter(|r| {
        &r.venue_id == view.venue_id() && r.reading_date >= start && r.reading_date <= last
    }) {
        if reading.is_fresh_fill() {
            out.fresh_fill_count += 1;
            out.fresh_litres += reading.litres_added;
        } else if reading.is_top_up() {
            out.top_up_count += 1;
            out.top_up_litres += reading.litres_added;
        }
    }

    out.fresh_litres = round_litres(out.fresh_litres);
    out.top_up_litres = round_litres(out.top_up_litres);
    out.total_litres = out.fresh_litres + out.top_up_litres;
    Some(out)
}

/// Projected savings from switching to the trial product.
///
/// Positive figures are savings; negative figures mean the trial product uses
/// or costs more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavingsProjection {
    pub weekly_litres: Litres,
    pub annual_litres: Litres,
    pub weekly_spend: Price,
    pub annual_spend: Price,
    /// Litres saved over the days the trial has run.
    pub to_date_litres: Litres,
    /// Spend saved over the days the trial has run.
    pub to_date_spend: Price,
}

/// Project litres and spend saved per week and per year.
///
/// Returns `None` unless both weekly averages and both prices are known.
#[must_use]
pub fn savings_projection(
    pre_trial_weekly: Option<Litres>,
    trial_weekly: Option<Litres>,
    baseline_price: Option<Price>,
    trial_price: Option<Price>,
    days_elapsed: i64,
) -> Option<SavingsProjection> {
    let pre = pre_trial_weekly?;
    let trial = trial_weekly?;
    let baseline_price = baseline_price?;
    let trial_price = trial_price?;

    let weekly_litres = round_litres(pre - trial);
    let weekly_spend = round_cents(pre * baseline_price - trial * trial_price);
    let weeks = Decimal::from(days_elapsed.max(0)) / DAYS_PER_WEEK;

    Some(SavingsProjection {
        weekly_litres,
        annual_litres: round_whole(weekly_litres * WEEKS_PER_YEAR),
        weekly_spend,
        annual_spend: round_whole(weekly_spend * WEEKS_PER_YEAR),
        to_date_litres: round_litres(weekly_litres * weeks),
        to_date_spend: round_cents(weekly_spend * weeks),
    })
}

/// Price per litre the trial product is (or would be) sold at.
///
/// The sold price once a win is recorded, the offered price before that.
#[must_use]
pub fn trial_price(view: &TrialVenue) -> Option<Price> {
    let trial = view.trial()?;
    match trial.status {
        TrialStatus::Accepted | TrialStatus::Won => trial
            .sold_price_per_litre
            .or(trial.offered_price_per_litre),
        _ => trial.offered_price_per_litre,
    }
}

/// Savings projection for a merged trial-venue.
///
/// The trial's weekly usage is the breakdown total (fresh fills plus top-ups)
/// spread over the days elapsed. `override_total` replaces that total when
/// given. Without an override, a trial with no litres recorded yet has no
/// projection.
#[must_use]
pub fn trial_savings(
    view: &TrialVenue,
    readings: &[Reading],
    override_total: Option<Litres>,
    today: NaiveDate,
) -> Option<SavingsProjection> {
    let trial = view.trial()?;
    let start = trial.start_date?;
    let usage = usage_breakdown(view, readings, today)?;

    let recorded = usage.fresh_fill_count + usage.top_up_count > 0;
    let trial_weekly = (recorded || override_total.is_some())
        .then(|| weekly_rate(usage.effective_total(override_total), start, trial.end_date, today));

    savings_projection(
        trial.baseline_weekly_litres,
        trial_weekly,
        trial.baseline_price_per_litre,
        trial_price(view),
        elapsed_days(start, trial.end_date, today),
    )
}

/// True when a running trial has no reading dated `today`.
#[must_use]
pub fn awaiting_reading_today(view: &TrialVenue, readings: &[Reading], today: NaiveDate) -> bool {
    view.trial_status() == Some(TrialStatus::InProgress)
        && !readings
            .iter()
            .any(|r| &r.venue_id == view.venue_id() && r.reading_date == today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trial::Trial;
    use crate::domain::trial_venue::merge;
    use crate::domain::venue::Venue;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn running_view(start: NaiveDate) -> TrialVenue {
        let mut trial = Trial::pending("t1", "v1");
        trial.status = TrialStatus::InProgress;
        trial.start_date = Some(start);
        merge(Venue::new("v1", "Harbour", 3), Some(trial))
    }

    #[test]
    fn bracket_boundaries_are_closed_low() {
        assert_eq!(classify_volume_bracket(dec!(0)), Some(VolumeBracket::Under60));
        assert_eq!(classify_volume_bracket(dec!(59.9)), Some(VolumeBracket::Under60));
        assert_eq!(classify_volume_bracket(dec!(60)), Some(VolumeBracket::From60To100));
        assert_eq!(classify_volume_bracket(dec!(99.99)), Some(VolumeBracket::From60To100));
        assert_eq!(classify_volume_bracket(dec!(100)), Some(VolumeBracket::From100To150));
        assert_eq!(classify_volume_bracket(dec!(150)), Some(VolumeBracket::From150));
        assert_eq!(classify_volume_bracket(dec!(9000)), Some(VolumeBracket::From150));
    }

    #[test]
    fn negative_and_non_numeric_have_no_bracket() {
        assert_eq!(classify_volume_bracket(dec!(-0.1)), None);
        assert_eq!(classify_volume_text("lots"), None);
        assert_eq!(classify_volume_text(""), None);
        assert_eq!(classify_volume_text("-5"), None);
        assert_eq!(classify_volume_text(" 72.5 "), Some(VolumeBracket::From60To100));
    }

    #[test]
    fn bracket_serializes_as_label() {
        assert_eq!(
            serde_json::to_string(&VolumeBracket::From100To150).unwrap(),
            "\"100-150\""
        );
    }

    #[test]
    fn weekly_average_none_without_start_or_fills() {
        let venue = VenueId::new("v1");
        let readings = vec![Reading::new("v1", 1, day(2), 2, dec!(5))];

        assert_eq!(trial_weekly_average(&venue, None, &readings, None, day(9)), None);
        assert_eq!(
            trial_weekly_average(&venue, Some(day(1)), &readings, None, day(9)),
            None
        );
    }

    #[test]
    fn weekly_average_over_seven_days() {
        let venue = VenueId::new("v1");
        let readings = vec![Reading::new("v1", 1, day(1), 1, dec!(80))];

        let avg = trial_weekly_average(&venue, Some(day(1)), &readings, None, day(8));
        assert_eq!(avg, Some(dec!(80.0)));
    }

    #[test]
    fn weekly_average_same_day_uses_one_day() {
        let venue = VenueId::new("v1");
        let readings = vec![Reading::new("v1", 1, day(1), 1, dec!(10))];

        let avg = trial_weekly_average(&venue, Some(day(1)), &readings, None, day(1));
        assert_eq!(avg, Some(dec!(70.0)));
    }

    #[test]
    fn weekly_average_stops_at_end_date() {
        let venue = VenueId::new("v1");
        let readings = vec![
            Reading::new("v1", 1, day(1), 1, dec!(30)),
            Reading::new("v1", 2, day(8), 1, dec!(30)),
            Reading::new("v1", 1, day(20), 1, dec!(500)),
        ];

        let avg = trial_weekly_average(&venue, Some(day(1)), &readings, Some(day(15)), day(30));
        assert_eq!(avg, Some(dec!(30.0)));
    }

    #[test]
    fn weekly_average_ignores_other_venues() {
        let venue = VenueId::new("v1");
        let readings = vec![
            Reading::new("v1", 1, day(1), 1, dec!(14)),
            Reading::new("deleted-venue", 1, day(1), 1, dec!(1000)),
        ];

        let avg = trial_weekly_average(&venue, Some(day(1)), &readings, None, day(8));
        assert_eq!(avg, Some(dec!(14.0)));
    }

    #[test]
    fn breakdown_splits_fills_and_top_ups() {
        let view = running_view(day(3));
        let readings = vec![
            Reading::new("v1", 1, day(1), 1, dec!(25)),
            Reading::new("v1", 1, day(3), 1, dec!(20)),
            Reading::new("v1", 2, day(3), 1, dec!(20)),
            Reading::new("v1", 1, day(4), 2, dec!(2.5)),
            Reading::new("v1", 2, day(4), 2, dec!(0)),
            Reading::new("v1", 2, day(5), 3, dec!(1.5)),
            Reading::new("v2", 1, day(5), 1, dec!(99)),
        ];

        let breakdown = usage_breakdown(&view, &readings, day(8)).unwrap();

        assert_eq!(breakdown.fresh_fill_count, 2);
        assert_eq!(breakdown.fresh_litres, dec!(40));
        assert_eq!(breakdown.top_up_count, 2);
        assert_eq!(breakdown.top_up_litres, dec!(4.0));
        assert_eq!(breakdown.total_litres, breakdown.fresh_litres + breakdown.top_up_litres);

        let with_litres = readings
            .iter()
            .filter(|r| r.venue_id.as_str() == "v1" && r.reading_date >= day(3))
            .filter(|r| r.litres_added > Decimal::ZERO)
            .count();
        assert_eq!(breakdown.fresh_fill_count + breakdown.top_up_count, with_litres);
    }

    #[test]
    fn breakdown_override_takes_precedence() {
        let view = running_view(day(1));
        let breakdown =
            usage_breakdown(&view, &[Reading::new("v1", 1, day(1), 1, dec!(20))], day(8)).unwrap();

        assert_eq!(breakdown.effective_total(None), dec!(20));
        assert_eq!(breakdown.effective_total(Some(dec!(26.5))), dec!(26.5));
    }

    #[test]
    fn breakdown_none_before_start() {
        let view = merge(Venue::new("v1", "Harbour", 1), Some(Trial::pending("t1", "v1")));
        assert_eq!(usage_breakdown(&view, &[], day(8)), None);
    }

    #[test]
    fn savings_sign_example() {
        let savings =
            savings_projection(Some(dec!(100)), Some(dec!(70)), Some(dec!(2.00)), Some(dec!(2.50)), 14)
                .unwrap();

        assert_eq!(savings.weekly_litres, dec!(30));
        assert_eq!(savings.annual_litres, dec!(1560));
        assert_eq!(savings.weekly_spend, dec!(25.00));
        assert_eq!(savings.annual_spend, dec!(1300));
        assert_eq!(savings.to_date_litres, dec!(60));
        assert_eq!(savings.to_date_spend, dec!(50.00));
    }

    #[test]
    fn savings_can_be_negative() {
        let savings =
            savings_projection(Some(dec!(60)), Some(dec!(65)), Some(dec!(2.00)), Some(dec!(2.10)), 7)
                .unwrap();

        assert_eq!(savings.weekly_litres, dec!(-5));
        assert_eq!(savings.weekly_spend, dec!(-16.50));
        assert!(savings.annual_spend < Decimal::ZERO);
    }

    #[test]
    fn savings_none_when_any_input_missing() {
        let values = [Some(dec!(100)), Some(dec!(70)), Some(dec!(2)), Some(dec!(2.5))];
        for mask in 0u8..16 {
            let pick = |i: usize| if mask & (1 << i) != 0 { values[i] } else { None };
            let result = savings_projection(pick(0), pick(1), pick(2), pick(3), 7);
            assert_eq!(result.is_some(), mask == 0b1111, "mask {mask:04b}");
        }
    }

    #[test]
    fn trial_savings_uses_override_total() {
        let mut trial = Trial::pending("t1", "v1");
        trial.status = TrialStatus::InProgress;
        trial.start_date = Some(day(1));
        trial.baseline_weekly_litres = Some(dec!(100));
        trial.baseline_price_per_litre = Some(dec!(2.00));
        trial.offered_price_per_litre = Some(dec!(2.50));
        let view = merge(Venue::new("v1", "Harbour", 1), Some(trial));
        let readings = vec![Reading::new("v1", 1, day(1), 1, dec!(140))];

        let computed = trial_savings(&view, &readings, None, day(15)).unwrap();
        assert_eq!(computed.weekly_litres, dec!(30));

        let adjusted = trial_savings(&view, &readings, Some(dec!(100)), day(15)).unwrap();
        assert_eq!(adjusted.weekly_litres, dec!(50));
    }

    #[test]
    fn trial_savings_counts_top_ups() {
        let mut trial = Trial::pending("t1", "v1");
        trial.status = TrialStatus::InProgress;
        trial.start_date = Some(day(1));
        trial.baseline_weekly_litres = Some(dec!(100));
        trial.baseline_price_per_litre = Some(dec!(2.00));
        trial.offered_price_per_litre = Some(dec!(2.50));
        let view = merge(Venue::new("v1", "Harbour", 1), Some(trial));
        let readings = vec![
            Reading::new("v1", 1, day(1), 1, dec!(40)),
            Reading::new("v1", 1, day(4), 3, dec!(10)),
        ];
        let breakdown = usage_breakdown(&view, &readings, day(8)).unwrap();

        let computed = trial_savings(&view, &readings, None, day(8)).unwrap();
        let restated =
            trial_savings(&view, &readings, Some(breakdown.effective_total(None)), day(8)).unwrap();

        assert_eq!(computed.weekly_litres, dec!(50.0));
        assert_eq!(restated, computed);
    }

    #[test]
    fn trial_savings_none_without_litres_or_override() {
        let mut trial = Trial::pending("t1", "v1");
        trial.status = TrialStatus::InProgress;
        trial.start_date = Some(day(1));
        trial.baseline_weekly_litres = Some(dec!(100));
        trial.baseline_price_per_litre = Some(dec!(2.00));
        trial.offered_price_per_litre = Some(dec!(2.50));
        let view = merge(Venue::new("v1", "Harbour", 1), Some(trial));

        assert_eq!(trial_savings(&view, &[], None, day(8)), None);
        assert!(trial_savings(&view, &[], Some(dec!(70)), day(8)).is_some());
    }

    #[test]
    fn breakdown_stops_at_end_date() {
        let mut trial = Trial::pending("t1", "v1");
        trial.status = TrialStatus::Completed;
        trial.start_date = Some(day(1));
        trial.end_date = Some(day(8));
        let view = merge(Venue::new("v1", "Harbour", 1), Some(trial));
        let readings = vec![
            Reading::new("v1", 1, day(1), 1, dec!(30)),
            Reading::new("v1", 1, day(5), 4, dec!(3)),
            Reading::new("v1", 1, day(10), 1, dec!(30)),
            Reading::new("v1", 1, day(12), 2, dec!(4)),
        ];

        let breakdown = usage_breakdown(&view, &readings, day(20)).unwrap();

        assert_eq!(breakdown.fresh_fill_count, 1);
        assert_eq!(breakdown.top_up_count, 1);
        assert_eq!(breakdown.total_litres, dec!(33));
        assert_eq!(
            trial_weekly_average(view.venue_id(), view.start_date(), &readings, view.end_date(), day(20)),
            Some(dec!(30.0))
        );
    }

    #[test]
    fn awaiting_reading_only_for_running_trials() {
        let view = running_view(day(1));
        let today = day(1) + Duration::days(4);

        assert!(awaiting_reading_today(&view, &[], today));
        assert!(!awaiting_reading_today(
            &view,
            &[Reading::new("v1", 2, today, 4, dec!(0))],
            today
        ));

        let idle = merge(Venue::new("v1", "Harbour", 1), None);
        assert!(!awaiting_reading_today(&idle, &[], today));
    }
}
