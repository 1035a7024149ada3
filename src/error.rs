//! Error taxonomy for the ETL pipeline.
//!
//! Transport failures never show up here: extract absorbs them and degrades
//! to an empty day. What remains is the caller's fault (bad date), a source
//! that answered with an error, or a persistence problem that aborted the
//! batch.

use thiserror::Error;

use crate::etl::FetchError;

/// Failures raised by a [`Repository`](crate::store::Repository) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("signal `{0}` could not be resolved to an id")]
    UnknownSignal(String),

    #[error("injected store failure: {0}")]
    Injected(String),
}

/// Failures that end a pipeline run for a date.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("invalid date `{0}`: expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("extract failed: {0}")]
    Extract(#[from] FetchError),

    #[error("load failed and was rolled back: {0}")]
    Persistence(#[from] StoreError),

    #[error("failed to ensure target schema: {0}")]
    Schema(#[source] StoreError),

    #[error("failed to acquire target session: {0}")]
    Session(#[source] sqlx::Error),
}

impl EtlError {
    /// True when the failure is the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, EtlError::InvalidDate(_))
    }
}
