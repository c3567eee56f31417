//! Trial status state machine.
//!
//! Each transition checks its guard against the current merged view and, if
//! it passes, returns the resulting status together with the [`UpdateMap`]
//! that persists it. Nothing here writes anywhere: the caller routes the map
//! through [`split`](super::field::split) and hands both halves to the store.
//!
//! ```text
//!   pending ──start──▶ in-progress ──end──▶ completed ──close(win)──▶ accepted ──code──▶ won
//!      ▲                   │  ▲                 │  ▲
//!      └────push back──────┘  └───push back─────┘  ├──close(loss)──▶ lost
//!                                                  └──push back── won | lost | accepted
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;

use super::error::TransitionError;
use super::field::{Field, UpdateMap};
use super::money::Price;
use super::reference::{OutcomeReason, ReasonCategory};
use super::timeline::{appended, TimelineEntry, TimelineKind};
use super::trial::{Trial, TrialStatus};
use super::trial_venue::TrialVenue;

/// A decided outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
}

/// Everything needed to close a completed trial.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseRequest {
    pub outcome: Outcome,
    pub reason: OutcomeReason,
    pub outcome_date: NaiveDate,
    /// Required for a win.
    pub sold_price: Option<Price>,
    /// Free text appended to the outcome timeline entry.
    pub note: Option<String>,
}

/// A lifecycle event requested for a trial.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialEvent {
    Start,
    End,
    Close(CloseRequest),
    AssignCustomerCode(String),
    PushBack(TrialStatus),
}

impl TrialEvent {
    /// Short name used in errors and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Close(_) => "close",
            Self::AssignCustomerCode(_) => "assign a customer code to",
            Self::PushBack(_) => "push back",
        }
    }
}

/// The result of a legal transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: TrialStatus,
    pub to: TrialStatus,
    pub updates: UpdateMap,
}

impl Transition {
    fn new(from: TrialStatus, to: TrialStatus) -> Self {
        let mut updates = UpdateMap::new();
        updates
            .set(Field::Status, json!(to))
            .set(Field::TrialStatus, json!(to));
        Self { from, to, updates }
    }

    fn with_entry(mut self, trial: &Trial, entry: TimelineEntry) -> Self {
        self.updates
            .set(Field::Timeline, json!(appended(&trial.timeline, entry)));
        self
    }
}

/// Apply any event to a trial-venue.
///
/// # Errors
///
/// Returns a [`TransitionError`] when the event is not legal from the current
/// status or its guard fails.
pub fn apply_event(
    view: &TrialVenue,
    event: TrialEvent,
    today: NaiveDate,
) -> Result<Transition, TransitionError> {
    match event {
        TrialEvent::Start => start_trial(view, today),
        TrialEvent::End => end_trial(view, today),
        TrialEvent::Close(request) => close_trial(view, &request),
        TrialEvent::AssignCustomerCode(code) => assign_customer_code(view, &code, today),
        TrialEvent::PushBack(target) => push_back(view, target),
    }
}

fn current(view: &TrialVenue) -> Result<&Trial, TransitionError> {
    view.trial().ok_or_else(|| TransitionError::NoTrial {
        venue_id: view.venue_id().clone(),
    })
}

fn expect_status(
    trial: &Trial,
    expected: TrialStatus,
    event: &'static str,
) -> Result<(), TransitionError> {
    if trial.status == expected {
        Ok(())
    } else {
        Err(TransitionError::IllegalTransition {
            event,
            from: trial.status,
        })
    }
}

/// `pending -> in-progress`, starting today.
///
/// # Errors
///
/// Fails unless the trial is pending.
pub fn start_trial(view: &TrialVenue, today: NaiveDate) -> Result<Transition, TransitionError> {
    let trial = current(view)?;
    expect_status(trial, TrialStatus::Pending, "start")?;

    let mut transition = Transition::new(trial.status, TrialStatus::InProgress);
    transition.updates.set(Field::StartDate, json!(today));
    Ok(transition.with_entry(
        trial,
        TimelineEntry::new(TimelineKind::Started, today, "Trial started"),
    ))
}

/// `in-progress -> completed`, ending today.
///
/// # Errors
///
/// Fails unless the trial is in progress, or if today is before its start date.
pub fn end_trial(view: &TrialVenue, today: NaiveDate) -> Result<Transition, TransitionError> {
    let trial = current(view)?;
    expect_status(trial, TrialStatus::InProgress, "end")?;
    if let Some(start) = trial.start_date {
        if today < start {
            return Err(TransitionError::EndBeforeStart { start, end: today });
        }
    }

    let mut transition = Transition::new(trial.status, TrialStatus::Completed);
    transition.updates.set(Field::EndDate, json!(today));
    Ok(transition.with_entry(
        trial,
        TimelineEntry::new(TimelineKind::Ended, today, "Trial ended"),
    ))
}

/// `completed -> accepted` on a win, `completed -> lost` on a loss.
///
/// A win needs a positive sold price and a successful reason; it lands in
/// `accepted` until a customer code is assigned. A loss needs an unsuccessful
/// reason.
///
/// # Errors
///
/// Fails unless the trial is completed and the request satisfies the guard for
/// its outcome.
pub fn close_trial(view: &TrialVenue, request: &CloseRequest) -> Result<Transition, TransitionError> {
    let trial = current(view)?;
    expect_status(trial, TrialStatus::Completed, "close")?;

    let (to, expected) = match request.outcome {
        Outcome::Won => (TrialStatus::Accepted, ReasonCategory::Successful),
        Outcome::Lost => (TrialStatus::Lost, ReasonCategory::Unsuccessful),
    };

    if request.outcome == Outcome::Won {
        let price = request.sold_price.ok_or(TransitionError::MissingSoldPrice)?;
        if price <= Decimal::ZERO {
            return Err(TransitionError::NonPositiveSoldPrice { price });
        }
    }
    if request.reason.category != expected {
        return Err(TransitionError::WrongReasonCategory {
            reason: request.reason.label.clone(),
            expected,
            found: request.reason.category,
        });
    }
    if let Some(start) = trial.start_date {
        if request.outcome_date < start {
            return Err(TransitionError::OutcomeBeforeStart {
                start,
                outcome: request.outcome_date,
            });
        }
    }

    let mut transition = Transition::new(trial.status, to);
    transition
        .updates
        .set(Field::OutcomeDate, json!(request.outcome_date))
        .set(Field::OutcomeReasonId, json!(request.reason.id));
    if request.outcome == Outcome::Won {
        transition
            .updates
            .set(Field::SoldPricePerLitre, json!(request.sold_price));
    }

    let label = match request.outcome {
        Outcome::Won => "Won",
        Outcome::Lost => "Lost",
    };
    let text = match &request.note {
        Some(note) if !note.trim().is_empty() => {
            format!("{label}: {} ({})", request.reason.label, note.trim())
        }
        _ => format!("{label}: {}", request.reason.label),
    };
    Ok(transition.with_entry(
        trial,
        TimelineEntry::new(TimelineKind::Outcome, request.outcome_date, text),
    ))
}

/// `accepted -> won`, recording the permanent customer code on the venue.
///
/// # Errors
///
/// Fails unless the trial is accepted and the code is non-blank.
pub fn assign_customer_code(
    view: &TrialVenue,
    code: &str,
    today: NaiveDate,
) -> Result<Transition, TransitionError> {
    let trial = current(view)?;
    expect_status(trial, TrialStatus::Accepted, "assign a customer code to")?;
    let code = code.trim();
    if code.is_empty() {
        return Err(TransitionError::EmptyCustomerCode);
    }

    let mut transition = Transition::new(trial.status, TrialStatus::Won);
    transition.updates.set(Field::CustomerCode, json!(code));
    Ok(transition.with_entry(
        trial,
        TimelineEntry::new(
            TimelineKind::CustomerCode,
            today,
            format!("Customer code {code} assigned"),
        ),
    ))
}

/// Statuses a trial in `from` may be pushed back to.
#[must_use]
pub const fn push_back_target(from: TrialStatus) -> Option<TrialStatus> {
    match from {
        TrialStatus::InProgress => Some(TrialStatus::Pending),
        TrialStatus::Completed => Some(TrialStatus::InProgress),
        TrialStatus::Won | TrialStatus::Lost | TrialStatus::Accepted => {
            Some(TrialStatus::Completed)
        }
        TrialStatus::Pending => None,
    }
}

/// Reopen a trial one step back in its lifecycle.
///
/// Reopening a decided trial to `completed` discards the decision: outcome
/// date, reason, sold price and customer code are cleared. Pushing back to
/// `pending` or `in-progress` changes only the status; recorded dates stay.
///
/// # Errors
///
/// Fails when `target` is not the push-back target of the current status.
pub fn push_back(view: &TrialVenue, target: TrialStatus) -> Result<Transition, TransitionError> {
    let trial = current(view)?;
    if push_back_target(trial.status) != Some(target) {
        return Err(TransitionError::IllegalPushBack {
            from: trial.status,
            to: target,
        });
    }

    let mut transition = Transition::new(trial.status, target);
    if target == TrialStatus::Completed {
        transition
            .updates
            .clear(Field::OutcomeDate)
            .clear(Field::OutcomeReasonId)
            .clear(Field::SoldPricePerLitre)
            .clear(Field::CustomerCode);
    }
    Ok(transition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::field::{split, TRIAL_FIELDS, VENUE_FIELDS};
    use crate::domain::trial_venue::merge;
    use crate::domain::venue::Venue;
    use rust_decimal_macros::dec;
    use serde_json::Value;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, d).unwrap()
    }

    fn view_in(status: TrialStatus) -> TrialVenue {
        let mut trial = Trial::pending("t1", "v1");
        trial.status = status;
        if status != TrialStatus::Pending {
            trial.start_date = Some(day(1));
        }
        if status.is_decided() || status == TrialStatus::Completed {
            trial.end_date = Some(day(10));
        }
        if status.is_decided() {
            trial.outcome_date = Some(day(12));
            trial.outcome_reason_id = Some("r-won".into());
        }
        if matches!(status, TrialStatus::Won | TrialStatus::Accepted) {
            trial.sold_price_per_litre = Some(dec!(2.40));
        }
        let mut venue = Venue::new("v1", "Harbour", 2);
        venue.trial_status = Some(status);
        if status == TrialStatus::Won {
            venue.customer_code = Some("C-77".to_string());
        }
        merge(venue, Some(trial))
    }

    fn successful() -> OutcomeReason {
        OutcomeReason::new("r-won", "Lower usage", ReasonCategory::Successful)
    }

    fn unsuccessful() -> OutcomeReason {
        OutcomeReason::new("r-lost", "Price", ReasonCategory::Unsuccessful)
    }

    fn win(sold_price: Option<Price>) -> CloseRequest {
        CloseRequest {
            outcome: Outcome::Won,
            reason: successful(),
            outcome_date: day(12),
            sold_price,
            note: None,
        }
    }

    #[test]
    fn start_sets_status_and_start_date_only() {
        let transition = start_trial(&view_in(TrialStatus::Pending), day(3)).unwrap();

        assert_eq!(transition.to, TrialStatus::InProgress);
        assert_eq!(transition.updates.get(Field::Status), Some(&json!("in-progress")));
        assert_eq!(transition.updates.get(Field::StartDate), Some(&json!("2024-08-03")));
        assert_eq!(transition.updates.get(Field::EndDate), None);
    }

    #[test]
    fn start_rejected_outside_pending() {
        let err = start_trial(&view_in(TrialStatus::Completed), day(3)).unwrap_err();
        assert_eq!(
            err,
            TransitionError::IllegalTransition {
                event: "start",
                from: TrialStatus::Completed,
            }
        );
    }

    #[test]
    fn end_sets_end_date() {
        let transition = end_trial(&view_in(TrialStatus::InProgress), day(9)).unwrap();
        assert_eq!(transition.to, TrialStatus::Completed);
        assert_eq!(transition.updates.get(Field::EndDate), Some(&json!("2024-08-09")));
    }

    #[test]
    fn end_before_start_rejected() {
        let mut trial = Trial::pending("t1", "v1");
        trial.status = TrialStatus::InProgress;
        trial.start_date = Some(day(20));
        let view = merge(Venue::new("v1", "Harbour", 1), Some(trial));

        assert!(matches!(
            end_trial(&view, day(19)),
            Err(TransitionError::EndBeforeStart { .. })
        ));
    }

    #[test]
    fn win_moves_to_accepted_with_price_and_reason() {
        let transition = close_trial(&view_in(TrialStatus::Completed), &win(Some(dec!(2.45)))).unwrap();

        assert_eq!(transition.to, TrialStatus::Accepted);
        let updates = &transition.updates;
        assert_eq!(updates.get(Field::SoldPricePerLitre), Some(&json!(dec!(2.45))));
        assert_eq!(updates.get(Field::OutcomeDate), Some(&json!("2024-08-12")));
        assert_eq!(updates.get(Field::OutcomeReasonId), Some(&json!("r-won")));

        let timeline = updates.get(Field::Timeline).unwrap().as_array().unwrap();
        let last = timeline.last().unwrap();
        assert_eq!(last["kind"], json!("outcome"));
        assert_eq!(last["text"], json!("Won: Lower usage"));
    }

    #[test]
    fn win_without_sold_price_is_rejected() {
        let result = close_trial(&view_in(TrialStatus::Completed), &win(None));
        assert_eq!(result, Err(TransitionError::MissingSoldPrice));
    }

    #[test]
    fn win_with_zero_price_is_rejected() {
        let result = close_trial(&view_in(TrialStatus::Completed), &win(Some(dec!(0))));
        assert!(matches!(
            result,
            Err(TransitionError::NonPositiveSoldPrice { .. })
        ));
    }

    #[test]
    fn win_with_unsuccessful_reason_is_rejected() {
        let mut request = win(Some(dec!(2.45)));
        request.reason = unsuccessful();

        assert_eq!(
            close_trial(&view_in(TrialStatus::Completed), &request),
            Err(TransitionError::WrongReasonCategory {
                reason: "Price".to_string(),
                expected: ReasonCategory::Successful,
                found: ReasonCategory::Unsuccessful,
            })
        );
    }

    #[test]
    fn loss_goes_straight_to_lost_without_price() {
        let request = CloseRequest {
            outcome: Outcome::Lost,
            reason: unsuccessful(),
            outcome_date: day(12),
            sold_price: None,
            note: Some("went with incumbent".to_string()),
        };

        let transition = close_trial(&view_in(TrialStatus::Completed), &request).unwrap();

        assert_eq!(transition.to, TrialStatus::Lost);
        assert_eq!(transition.updates.get(Field::SoldPricePerLitre), None);
        let timeline = transition.updates.get(Field::Timeline).unwrap();
        assert_eq!(
            timeline.as_array().unwrap().last().unwrap()["text"],
            json!("Lost: Price (went with incumbent)")
        );
    }

    #[test]
    fn loss_with_successful_reason_is_rejected() {
        let request = CloseRequest {
            outcome: Outcome::Lost,
            reason: successful(),
            outcome_date: day(12),
            sold_price: None,
            note: None,
        };
        assert!(matches!(
            close_trial(&view_in(TrialStatus::Completed), &request),
            Err(TransitionError::WrongReasonCategory { .. })
        ));
    }

    #[test]
    fn outcome_before_start_is_rejected() {
        let mut request = win(Some(dec!(2.45)));
        request.outcome_date = NaiveDate::from_ymd_opt(2024, 7, 30).unwrap();
        assert!(matches!(
            close_trial(&view_in(TrialStatus::Completed), &request),
            Err(TransitionError::OutcomeBeforeStart { .. })
        ));
    }

    #[test]
    fn customer_code_completes_win() {
        let transition =
            assign_customer_code(&view_in(TrialStatus::Accepted), "  C-1042 ", day(14)).unwrap();

        assert_eq!(transition.to, TrialStatus::Won);
        assert_eq!(transition.updates.get(Field::CustomerCode), Some(&json!("C-1042")));

        let partition = split(&transition.updates).unwrap();
        assert!(partition.venue.contains_key("customer_code"));
        assert!(partition.trial.contains_key("status"));
    }

    #[test]
    fn blank_customer_code_is_rejected() {
        assert_eq!(
            assign_customer_code(&view_in(TrialStatus::Accepted), "   ", day(14)),
            Err(TransitionError::EmptyCustomerCode)
        );
    }

    #[test]
    fn customer_code_only_from_accepted() {
        assert!(matches!(
            assign_customer_code(&view_in(TrialStatus::Lost), "C-1", day(14)),
            Err(TransitionError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn push_back_from_won_clears_decision() {
        let transition = push_back(&view_in(TrialStatus::Won), TrialStatus::Completed).unwrap();

        let updates = &transition.updates;
        assert_eq!(updates.get(Field::Status), Some(&json!("completed")));
        for field in [
            Field::SoldPricePerLitre,
            Field::CustomerCode,
            Field::OutcomeDate,
            Field::OutcomeReasonId,
        ] {
            assert_eq!(updates.get(field), Some(&Value::Null), "{field} not cleared");
        }
    }

    #[test]
    fn push_back_to_pipeline_changes_only_status() {
        let transition = push_back(&view_in(TrialStatus::InProgress), TrialStatus::Pending).unwrap();

        let keys: Vec<_> = transition.updates.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["status", "trial_status"]);
    }

    #[test]
    fn push_back_targets() {
        let legal = [
            (TrialStatus::InProgress, TrialStatus::Pending),
            (TrialStatus::Completed, TrialStatus::InProgress),
            (TrialStatus::Won, TrialStatus::Completed),
            (TrialStatus::Lost, TrialStatus::Completed),
            (TrialStatus::Accepted, TrialStatus::Completed),
        ];
        for from in TrialStatus::ALL {
            for to in TrialStatus::ALL {
                let allowed = legal.contains(&(from, to));
                assert_eq!(
                    push_back(&view_in(from), to).is_ok(),
                    allowed,
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn transitions_require_a_trial() {
        let view = merge(Venue::new("v1", "Harbour", 1), None);
        assert!(matches!(
            apply_event(&view, TrialEvent::Start, day(1)),
            Err(TransitionError::NoTrial { .. })
        ));
    }

    #[test]
    fn every_emitted_field_is_routed() {
        let cases = vec![
            (TrialStatus::Pending, TrialEvent::Start),
            (TrialStatus::InProgress, TrialEvent::End),
            (TrialStatus::Completed, TrialEvent::Close(win(Some(dec!(2.45))))),
            (
                TrialStatus::Accepted,
                TrialEvent::AssignCustomerCode("C-9".to_string()),
            ),
            (TrialStatus::Won, TrialEvent::PushBack(TrialStatus::Completed)),
            (TrialStatus::Completed, TrialEvent::PushBack(TrialStatus::InProgress)),
        ];

        for (status, event) in cases {
            let transition = apply_event(&view_in(status), event, day(20)).unwrap();
            for (name, _) in transition.updates.iter() {
                assert!(
                    VENUE_FIELDS.contains(&name) ^ TRIAL_FIELDS.contains(&name),
                    "{name} is not routed exactly once"
                );
            }
            assert!(split(&transition.updates).is_ok());
        }
    }
}
