//! Trial service: loads merged trial-venues from the store, runs lifecycle
//! transitions and writes their results back.
//!
//! Writes are not transactional. A transition's venue columns are written
//! first, then its trial columns; if the second write fails after the first
//! succeeded the caller gets [`Error::PartialWrite`] naming both tables.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::dashboard::Dashboard;
use super::optimistic::Optimistic;
use crate::domain::field::{split, Field, Record, UpdateMap};
use crate::domain::id::{RepId, TrialId, VenueId};
use crate::domain::kpi::{KpiTargets, KpiWindows};
use crate::domain::lifecycle::{apply_event, TrialEvent};
use crate::domain::reading::{Reading, READING_CONFLICT_KEY};
use crate::domain::reference::{OutcomeReason, Product, ReasonCategory};
use crate::domain::trial::{NewTrial, Trial, TrialStatus};
use crate::domain::trial_venue::{merge, ApplyError, TrialVenue};
use crate::domain::usage::{classify_volume_bracket, trial_weekly_average, VolumeBracket};
use crate::domain::venue::Venue;
use crate::error::{Error, Result};
use crate::port::store::{Filter, Store, Table};

/// `system-settings` keys that override configured KPI targets.
pub const TARGET_WIN_RATE: &str = "target_win_rate";
pub const TARGET_TIME_TO_DECISION: &str = "target_time_to_decision_days";
pub const TARGET_AVG_SOLD_PRICE: &str = "target_avg_sold_price";
pub const TARGET_TRIALS_PER_MONTH: &str = "target_trials_per_month";

/// Application service over a collaborator store.
pub struct TrialService<S> {
    store: Arc<S>,
    windows: KpiWindows,
    targets: KpiTargets,
}

impl<S: Store> TrialService<S> {
    /// Create a service with default windows and no targets.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            windows: KpiWindows::default(),
            targets: KpiTargets::default(),
        }
    }

    /// Use the given KPI windows and configured targets.
    #[must_use]
    pub fn with_kpi(mut self, windows: KpiWindows, targets: KpiTargets) -> Self {
        self.windows = windows;
        self.targets = targets;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load every merged trial-venue, optionally only those assigned to `rep`.
    ///
    /// Orphaned venues are logged and kept so they can be counted. Rows that do
    /// not decode and trials whose venue is missing are logged and left out. An
    /// outcome reason or product that no longer resolves is logged and cleared
    /// on the trial, which is kept.
    pub async fn load_trial_venues(&self, rep: Option<&RepId>) -> Result<Vec<TrialVenue>> {
        let trial_filter = match rep {
            Some(rep) => Filter::all().eq("rep_id", rep.as_str()),
            None => Filter::all(),
        };
        let trials: Vec<Trial> = decode_rows(Table::Trials, self.store.select(Table::Trials, &trial_filter).await?);

        let venue_filter = match rep {
            Some(_) => Filter::all().is_in("id", trials.iter().map(|t| t.venue_id.as_str())),
            None => Filter::all(),
        };
        let venues: Vec<Venue> = decode_rows(Table::Venues, self.store.select(Table::Venues, &venue_filter).await?);

        let references = self.references().await?;

        let mut by_venue: HashMap<VenueId, Trial> = HashMap::new();
        for mut trial in trials {
            references.resolve(&mut trial);
            let (kept, dropped) = match by_venue.remove(&trial.venue_id) {
                Some(existing) if existing.created_at >= trial.created_at => (existing, Some(trial)),
                Some(existing) => (trial, Some(existing)),
                None => (trial, None),
            };
            if let Some(dropped) = dropped {
                warn!(venue_id = %kept.venue_id, kept = %kept.id, dropped = %dropped.id, "Venue has more than one trial");
            }
            by_venue.insert(kept.venue_id.clone(), kept);
        }

        let mut views = Vec::with_capacity(venues.len());
        for venue in venues {
            let trial = by_venue.remove(&venue.id);
            let view = merge(venue, trial);
            if let Some(anomaly) = view.anomaly() {
                warn!(venue_id = %anomaly.venue_id, status = %anomaly.status, "Venue carries a trial status but has no trial");
            }
            views.push(view);
        }
        for (venue_id, trial) in by_venue {
            warn!(venue_id = %venue_id, trial_id = %trial.id, "Trial references unknown venue");
        }

        debug!(count = views.len(), rep = ?rep.map(RepId::as_str), "Loaded trial venues");
        Ok(views)
    }

    /// Load one merged trial-venue as stored, for a transition to act on.
    ///
    /// References are not resolved here: transitions only write the columns
    /// they change.
    pub async fn load_view(&self, venue_id: &VenueId) -> Result<TrialVenue> {
        let venue: Venue = self.fetch(Table::Venues, venue_id.as_str()).await?;
        let trials = self
            .store
            .select(Table::Trials, &Filter::all().eq("venue_id", venue_id.as_str()))
            .await?;
        let trial = trials
            .into_iter()
            .map(decode::<Trial>)
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .max_by_key(|t| t.created_at);
        let view = merge(venue, trial);
        if let Some(anomaly) = view.anomaly() {
            warn!(venue_id = %anomaly.venue_id, status = %anomaly.status, "Venue carries a trial status but has no trial");
        }
        Ok(view)
    }

    /// Readings for the given venues.
    pub async fn load_readings(&self, venues: &[VenueId]) -> Result<Vec<Reading>> {
        let filter = Filter::all().is_in("venue_id", venues.iter().map(VenueId::as_str));
        Ok(decode_rows(Table::Readings, self.store.select(Table::Readings, &filter).await?))
    }

    /// Outcome reasons, optionally restricted to one category.
    pub async fn outcome_reasons(&self, category: Option<ReasonCategory>) -> Result<Vec<OutcomeReason>> {
        let filter = match category {
            Some(category) => Filter::all().eq("category", category.to_string()),
            None => Filter::all(),
        };
        Ok(decode_rows(
            Table::OutcomeReasons,
            self.store.select(Table::OutcomeReasons, &filter).await?,
        ))
    }

    /// Our products and competitor products together.
    pub async fn products(&self) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = decode_rows(
            Table::ProductTypes,
            self.store.select(Table::ProductTypes, &Filter::all()).await?,
        );
        products.extend(decode_rows::<Product>(
            Table::CompetitorProducts,
            self.store.select(Table::CompetitorProducts, &Filter::all()).await?,
        ));
        Ok(products)
    }

    /// Create a pending trial for an existing venue.
    ///
    /// The trial row is inserted first and the venue's status mirror updated
    /// second.
    pub async fn create_trial(&self, new: NewTrial, today: NaiveDate) -> Result<TrialVenue> {
        let venue: Venue = self.fetch(Table::Venues, new.venue_id.as_str()).await?;
        let venue_id = venue.id.clone();

        let mut record = new.into_record(today)?;
        record.insert("created_at".into(), json!(Utc::now()));
        let stored = self.store.insert(Table::Trials, record).await?;
        let trial: Trial = decode(stored)?;

        let mut mirror = Record::new();
        mirror.insert(Field::TrialStatus.as_str().into(), json!(TrialStatus::Pending));
        if let Err(e) = self.store.update(Table::Venues, venue_id.as_str(), mirror).await {
            return Err(Error::PartialWrite {
                written: Table::Trials,
                failed: Table::Venues,
                source: Box::new(e),
            });
        }

        info!(venue_id = %venue_id, trial_id = %trial.id, "Trial created");
        let mut venue = venue;
        venue.trial_status = Some(TrialStatus::Pending);
        Ok(merge(venue, Some(trial)))
    }

    /// Run a lifecycle event against `view` and persist the result.
    ///
    /// Validation failures are returned before anything is written.
    pub async fn transition(&self, view: &TrialVenue, event: TrialEvent, today: NaiveDate) -> Result<TrialVenue> {
        let name = event.name();
        let transition = apply_event(view, event, today)?;

        let mut next = view.clone();
        next.apply(&transition.updates)?;
        if let Some(trial) = next.trial() {
            trial.validate()?;
        }

        self.persist(view.venue_id(), view.trial_id(), &transition.updates)
            .await?;

        info!(
            venue_id = %view.venue_id(),
            event = name,
            from = %transition.from,
            to = %transition.to,
            "Trial transitioned"
        );
        Ok(next)
    }

    /// Run a lifecycle event against the tentative state of `local`.
    ///
    /// The change is shown locally straight away and committed once the store
    /// accepts it. On a validation or store failure the local state reverts.
    /// On a partial write the local state is reloaded from the store, since one
    /// table did change.
    pub async fn transition_optimistic(
        &self,
        local: &mut Optimistic,
        event: TrialEvent,
        today: NaiveDate,
    ) -> Result<()> {
        let base = local.current().clone();
        let transition = apply_event(&base, event, today)?;
        local.apply(&transition.updates)?;

        match self
            .persist(base.venue_id(), base.trial_id(), &transition.updates)
            .await
        {
            Ok(()) => {
                local.confirm();
                Ok(())
            }
            Err(e) if e.is_partial_write() => {
                match self.load_view(base.venue_id()).await {
                    Ok(authoritative) => local.commit(authoritative),
                    Err(reload) => {
                        warn!(venue_id = %base.venue_id(), error = %reload, "Reload after partial write failed");
                        local.revert();
                    }
                }
                Err(e)
            }
            Err(e) => {
                local.revert();
                Err(e)
            }
        }
    }

    /// Write an update map to its owning tables: venue first, then trial.
    pub async fn persist(&self, venue_id: &VenueId, trial_id: Option<&TrialId>, updates: &UpdateMap) -> Result<()> {
        let partition = split(updates)?;
        let trial_id = match (trial_id, partition.trial.is_empty()) {
            (Some(id), _) => Some(id),
            (None, true) => None,
            (None, false) => return Err(ApplyError::NoTrial(venue_id.clone()).into()),
        };

        let venue_written = !partition.venue.is_empty();
        if venue_written {
            self.store
                .update(Table::Venues, venue_id.as_str(), partition.venue)
                .await?;
        }

        if let (Some(trial_id), false) = (trial_id, partition.trial.is_empty()) {
            let mut fields = partition.trial;
            fields.insert("updated_at".into(), json!(Utc::now()));
            if let Err(e) = self.store.update(Table::Trials, trial_id.as_str(), fields).await {
                if venue_written {
                    warn!(venue_id = %venue_id, trial_id = %trial_id, error = %e, "Trial write failed after venue write");
                    return Err(Error::PartialWrite {
                        written: Table::Venues,
                        failed: Table::Trials,
                        source: Box::new(e),
                    });
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Record a reading, replacing any reading with the same natural key.
    ///
    /// Also moves the venue's last measurement date forward and refreshes its
    /// volume bracket.
    pub async fn record_reading(&self, mut reading: Reading, today: NaiveDate) -> Result<()> {
        let view = self.load_view(&reading.venue_id).await?;
        reading.validate_for(view.venue())?;
        if reading.trial_id.is_none() {
            reading.trial_id = view.trial_id().cloned();
        }

        let record = to_record(&reading)?;
        self.store
            .upsert(Table::Readings, vec![record], &READING_CONFLICT_KEY)
            .await?;
        debug!(
            venue_id = %reading.venue_id,
            fryer = reading.fryer_number,
            date = %reading.reading_date,
            sequence = reading.sequence,
            "Reading recorded"
        );

        if view.venue().last_measured_on.map_or(true, |last| last < reading.reading_date) {
            let mut fields = Record::new();
            fields.insert(Field::LastMeasuredOn.as_str().into(), json!(reading.reading_date));
            self.store
                .update(Table::Venues, reading.venue_id.as_str(), fields)
                .await?;
        }

        self.refresh_volume_bracket(&reading.venue_id, today).await?;
        Ok(())
    }

    /// Recompute a venue's volume bracket and store it if it changed.
    ///
    /// Uses the trial's weekly average when readings allow, otherwise the
    /// pre-trial weekly litres.
    pub async fn refresh_volume_bracket(&self, venue_id: &VenueId, today: NaiveDate) -> Result<Option<VolumeBracket>> {
        let view = self.load_view(venue_id).await?;
        let Some(trial) = view.trial() else {
            return Ok(view.venue().volume_bracket);
        };
        let readings = self.load_readings(std::slice::from_ref(venue_id)).await?;

        let average = trial_weekly_average(venue_id, trial.start_date, &readings, trial.end_date, today)
            .or(trial.baseline_weekly_litres);
        let bracket = average.and_then(classify_volume_bracket);

        if bracket.is_some() && bracket != view.venue().volume_bracket {
            let mut fields = Record::new();
            fields.insert(Field::VolumeBracket.as_str().into(), json!(bracket));
            self.store
                .update(Table::Venues, venue_id.as_str(), fields)
                .await?;
            info!(venue_id = %venue_id, bracket = ?bracket, "Volume bracket updated");
            return Ok(bracket);
        }
        Ok(view.venue().volume_bracket)
    }

    /// Configured targets with any `system-settings` overrides applied.
    pub async fn targets(&self) -> Result<KpiTargets> {
        let mut targets = self.targets.clone();
        let rows = self
            .store
            .select(
                Table::SystemSettings,
                &Filter::all().is_in(
                    "key",
                    [
                        TARGET_WIN_RATE,
                        TARGET_TIME_TO_DECISION,
                        TARGET_AVG_SOLD_PRICE,
                        TARGET_TRIALS_PER_MONTH,
                    ],
                ),
            )
            .await?;

        for row in rows {
            let Some(key) = row.get("key").and_then(Value::as_str) else {
                continue;
            };
            let Some(value) = row.get("value").and_then(setting_decimal) else {
                warn!(key, "Ignoring non-numeric target setting");
                continue;
            };
            let slot = match key {
                TARGET_WIN_RATE => &mut targets.win_rate,
                TARGET_TIME_TO_DECISION => &mut targets.time_to_decision_days,
                TARGET_AVG_SOLD_PRICE => &mut targets.avg_sold_price,
                TARGET_TRIALS_PER_MONTH => &mut targets.trials_per_month,
                _ => continue,
            };
            *slot = Some(value);
        }
        Ok(targets)
    }

    /// Build the dashboard for `rep` (or every rep) as of `as_of`.
    pub async fn dashboard(&self, rep: Option<&RepId>, as_of: NaiveDate) -> Result<Dashboard> {
        let views = self.load_trial_venues(rep).await?;
        let venue_ids: Vec<VenueId> = views.iter().map(|v| v.venue_id().clone()).collect();
        let readings = self.load_readings(&venue_ids).await?;
        let targets = self.targets().await?;

        let dashboard = Dashboard::build(&views, &readings, &targets, self.windows, as_of);
        info!(
            rep = ?rep.map(RepId::as_str),
            as_of = %as_of,
            trials = views.len(),
            orphaned = dashboard.snapshot.orphaned,
            "Dashboard computed"
        );
        Ok(dashboard)
    }

    async fn references(&self) -> Result<References> {
        let reasons = self
            .outcome_reasons(None)
            .await?
            .into_iter()
            .map(|r| r.id.as_str().to_string())
            .collect();
        let products = self
            .products()
            .await?
            .into_iter()
            .map(|p| p.id.as_str().to_string())
            .collect();
        Ok(References { reasons, products })
    }

    async fn fetch<T: DeserializeOwned>(&self, table: Table, id: &str) -> Result<T> {
        let row = self
            .store
            .select(table, &Filter::all().eq("id", id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound {
                table,
                id: id.to_string(),
            })?;
        decode(row)
    }
}

/// Ids of the reference rows trials may point at.
struct References {
    reasons: HashSet<String>,
    products: HashSet<String>,
}

impl References {
    /// Clear any reference on `trial` that no longer resolves.
    fn resolve(&self, trial: &mut Trial) {
        if let Some(reason) = &trial.outcome_reason_id {
            if !self.reasons.contains(reason.as_str()) {
                warn!(trial_id = %trial.id, reason_id = %reason, "Trial references unknown outcome reason");
                trial.outcome_reason_id = None;
            }
        }
        if let Some(product) = &trial.trial_product_id {
            if !self.products.contains(product.as_str()) {
                warn!(trial_id = %trial.id, product_id = %product, "Trial references unknown product");
                trial.trial_product_id = None;
            }
        }
    }
}

fn setting_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

fn decode<T: DeserializeOwned>(row: Record) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<Record>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned().unwrap_or(Value::Null);
            match decode(row) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(table = %table, id = %id, error = %e, "Skipping malformed row");
                    None
                }
            }
        })
        .collect()
}

fn to_record<T: Serialize>(value: &T) -> Result<Record> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::Parse("expected a JSON object".into())),
    }
}
