use std::sync::atomic::{AtomicBool, Ordering};

use trialdesk::adapter::outbound::memory::MemoryStore;
use trialdesk::domain::field::Record;
use trialdesk::error::{Error, Result};
use trialdesk::port::store::{Filter, Store, Table};

/// Wraps a memory store and fails every update to one table while armed.
pub struct FailingStore {
    pub inner: MemoryStore,
    fail_updates_on: Table,
    armed: AtomicBool,
}

impl FailingStore {
    pub fn new(inner: MemoryStore, fail_updates_on: Table) -> Self {
        Self {
            inner,
            fail_updates_on,
            armed: AtomicBool::new(false),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

impl Store for FailingStore {
    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Record>> {
        self.inner.select(table, filter).await
    }

    async fn insert(&self, table: Table, record: Record) -> Result<Record> {
        self.inner.insert(table, record).await
    }

    async fn update(&self, table: Table, id: &str, fields: Record) -> Result<()> {
        if self.armed.load(Ordering::SeqCst) && table == self.fail_updates_on {
            return Err(Error::store(table, "connection reset"));
        }
        self.inner.update(table, id, fields).await
    }

    async fn upsert(&self, table: Table, records: Vec<Record>, conflict_key: &[&str]) -> Result<()> {
        self.inner.upsert(table, records, conflict_key).await
    }
}
