//! In-process backend for the repository traits.
//!
//! Backs `--dry-run` and the pipeline tests. It mirrors the target schema's
//! guarantees: unique signal names, monotonic ids, one fact per
//! `(timestamp, signal_id)`, and all-or-nothing commits.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{Repository, Session};
use crate::{
    models::{FactRow, Signal},
    StoreError,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    signals: BTreeMap<String, i32>,
    last_signal_id: i32,
    facts: BTreeMap<(DateTime<Utc>, i32), f64>,
}

/// Target store held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
    fail_next_upsert: Option<String>,
    fail_next_commit: Option<String>,
    commits: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `upsert_facts` apply its rows and then fail.
    pub fn fail_next_upsert(&mut self, reason: impl Into<String>) {
        self.fail_next_upsert = Some(reason.into());
    }

    /// Make the next `commit` discard its pending writes and fail.
    pub fn fail_next_commit(&mut self, reason: impl Into<String>) {
        self.fail_next_commit = Some(reason.into());
    }

    /// Committed signals ordered by id.
    pub fn signals(&self) -> Vec<Signal> {
        // ---
        let mut signals: Vec<Signal> = self
            .tables
            .signals
            .iter()
            .map(|(name, id)| Signal {
                id: *id,
                name: name.clone(),
            })
            .collect();
        signals.sort_by_key(|s| s.id);
        signals
    }

    pub fn signal_id(&self, name: &str) -> Option<i32> {
        self.tables.signals.get(name).copied()
    }

    /// Committed facts ordered by `(timestamp, signal_id)`.
    pub fn facts(&self) -> Vec<FactRow> {
        self.tables
            .facts
            .iter()
            .map(|(&(timestamp, signal_id), &value)| FactRow {
                timestamp,
                signal_id,
                value,
            })
            .collect()
    }

    pub fn fact(&self, timestamp: DateTime<Utc>, signal_id: i32) -> Option<f64> {
        self.tables.facts.get(&(timestamp, signal_id)).copied()
    }

    /// Number of successful commits so far.
    pub fn commits(&self) -> usize {
        self.commits
    }
}

/// Unit of work over a [`MemoryStore`]; edits a private copy until commit.
pub struct MemoryRepository<'a> {
    store: &'a mut MemoryStore,
    pending: Tables,
}

impl Session for MemoryStore {
    type Repo<'a> = MemoryRepository<'a>;

    async fn ensure_schema(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn begin(&mut self) -> Result<Self::Repo<'_>, StoreError> {
        // ---
        let pending = self.tables.clone();
        Ok(MemoryRepository {
            store: self,
            pending,
        })
    }
}

impl Repository for MemoryRepository<'_> {
    async fn get_or_create_signal(&mut self, name: &str) -> Result<i32, StoreError> {
        // ---
        if let Some(id) = self.pending.signals.get(name) {
            return Ok(*id);
        }
        self.pending.last_signal_id += 1;
        let id = self.pending.last_signal_id;
        self.pending.signals.insert(name.to_string(), id);
        Ok(id)
    }

    async fn upsert_facts(&mut self, rows: &[FactRow]) -> Result<u64, StoreError> {
        // ---
        for row in rows {
            if !self.pending.signals.values().any(|id| *id == row.signal_id) {
                return Err(StoreError::UnknownSignal(format!("id {}", row.signal_id)));
            }
            self.pending
                .facts
                .insert((row.timestamp, row.signal_id), row.value);
        }

        if let Some(reason) = self.store.fail_next_upsert.take() {
            return Err(StoreError::Injected(reason));
        }

        Ok(rows.len() as u64)
    }

    async fn commit(self) -> Result<(), StoreError> {
        // ---
        if let Some(reason) = self.store.fail_next_commit.take() {
            return Err(StoreError::Injected(reason));
        }
        self.store.tables = self.pending;
        self.store.commits += 1;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
