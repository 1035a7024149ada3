//! HTTP surface of the raw data source service.
//!
//! Sibling modules each export a subrouter; this gateway merges them and
//! attaches the source database pool as shared state (EMBP).

use axum::Router;
use sqlx::PgPool;

mod data;
mod health;

pub use data::{parse_columns, SELECTABLE_COLUMNS};

// ---

pub fn router(pool: PgPool) -> Router {
    // ---
    Router::new()
        .merge(data::router())
        .merge(health::router())
        .with_state(pool)
}
