use chrono::NaiveDate;
use serde_json::{json, Value};

use trialdesk::adapter::outbound::memory::MemoryStore;
use trialdesk::domain::field::Record;
use trialdesk::port::store::Table;

pub const REP: &str = "rep-1";

pub fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).expect("valid date")
}

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub fn venue(id: &str, name: &str, fryers: u32) -> Record {
    record(json!({
        "id": id,
        "name": name,
        "fryer_count": fryers,
        "state": "NSW",
    }))
}

/// Reference tables every scenario needs.
pub fn seed_reference(store: &MemoryStore) {
    store.seed(
        Table::OutcomeReasons,
        [
            record(json!({ "id": "better-life", "label": "Longer oil life", "category": "successful" })),
            record(json!({ "id": "price", "label": "Price too high", "category": "unsuccessful" })),
        ],
    );
    store.seed(
        Table::ProductTypes,
        [record(json!({ "id": "ultra", "name": "Ultra Fry", "price_per_litre": "2.50" }))],
    );
    store.seed(
        Table::CompetitorProducts,
        [record(json!({ "id": "generic", "name": "Generic Canola", "price_per_litre": "2.00" }))],
    );
}

/// A store with reference data and one two-fryer venue without a trial.
pub fn store_with_venue() -> MemoryStore {
    let store = MemoryStore::new();
    seed_reference(&store);
    store.seed(Table::Venues, [venue("v1", "Harbour Fish Bar", 2)]);
    store
}

/// A decided trial row for KPI scenarios.
pub fn decided_trial(id: &str, venue_id: &str, status: &str, start: NaiveDate, outcome: NaiveDate) -> Record {
    let (reason, sold) = match status {
        "won" | "accepted" => ("better-life", json!("2.40")),
        _ => ("price", Value::Null),
    };
    record(json!({
        "id": id,
        "venue_id": venue_id,
        "rep_id": REP,
        "status": status,
        "start_date": start,
        "end_date": outcome,
        "outcome_date": outcome,
        "outcome_reason_id": reason,
        "sold_price_per_litre": sold,
    }))
}
