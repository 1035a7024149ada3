//! Daily ETL for wind-farm sensor data.
//!
//! Raw high-frequency readings (wind speed, power) are fetched from the raw
//! data source for one calendar day, resampled into 10-minute buckets with
//! mean/min/max/std per measurement, and upserted into a target store made of
//! a `signal` dimension table and a `fact` table keyed by
//! `(timestamp, signal_id)`. Re-running a day overwrites rather than
//! duplicates.
//!
//! This crate follows the Explicit Module Boundary Pattern (EMBP): each
//! concern lives in one module or `mod.rs` gateway, and this file re-exports
//! the public surface.

pub mod config;
pub mod error;
pub mod etl;
pub mod models;
pub mod routes;
pub mod schema;
pub mod store;
pub mod telemetry;

pub use config::{EtlConfig, SourceApiConfig};
pub use error::{EtlError, StoreError};
pub use etl::{parse_run_date, Extractor, LoadReport, Pipeline, RunReport};
pub use models::{BucketedStatistic, FactRow, Measurement, RawObservation, Signal, Statistic};
pub use store::{MemoryStore, Repository, Session};
