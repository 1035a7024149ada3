//! Repository abstraction over the target store.
//!
//! Load only talks to these two traits. A [`Session`] hands out one unit of
//! work at a time; the [`Repository`] it returns resolves signal names and
//! upserts facts, and nothing it did is visible until [`Repository::commit`].
//! Dropping a repository without committing discards its work.
//!
//! Follows the Explicit Module Boundary Pattern (EMBP): backends live in
//! sibling files and are re-exported here.

use crate::{models::FactRow, StoreError};

mod memory;
mod postgres;

pub use memory::{MemoryRepository, MemoryStore};
pub use postgres::PgRepository;

// ---

/// One transactional unit of work against the target store.
#[allow(async_fn_in_trait)]
pub trait Repository {
    /// Return the id for `name`, inserting a new signal if none exists.
    ///
    /// The store's uniqueness constraint on the name decides races: when a
    /// concurrent writer inserts the same name first, the existing id is
    /// re-read and returned instead of failing.
    async fn get_or_create_signal(&mut self, name: &str) -> Result<i32, StoreError>;

    /// Insert or overwrite facts keyed by `(timestamp, signal_id)`.
    ///
    /// Returns the number of rows written. Rows must not repeat a key.
    async fn upsert_facts(&mut self, rows: &[FactRow]) -> Result<u64, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// A handle that can open units of work, e.g. a database connection.
#[allow(async_fn_in_trait)]
pub trait Session {
    type Repo<'a>: Repository
    where
        Self: 'a;

    /// Make sure the target tables exist. Safe to call on every run.
    async fn ensure_schema(&mut self) -> Result<(), StoreError>;

    async fn begin(&mut self) -> Result<Self::Repo<'_>, StoreError>;
}
