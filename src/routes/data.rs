//! `GET /data`: filtered read over the raw observation table.
//!
//! Query parameters:
//! - `start_date`, `end_date` – inclusive bounds, any encoding accepted by
//!   [`parse_timestamp`](crate::models::parse_timestamp)
//! - `columns` – comma-separated projection over [`SELECTABLE_COLUMNS`]
//!
//! Each row is a JSON object holding exactly the requested fields in request
//! order, or every field when no projection is given. Unknown column names
//! and unparseable bounds are rejected with `400` before any query runs.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, error, info};

use crate::models::parse_timestamp;

/// Columns a client may project, in table order.
pub const SELECTABLE_COLUMNS: [&str; 4] = ["timestamp", "wind_speed", "power", "ambient_temperature"];

// ---

/// Query parameters for `/data`.
#[derive(Debug, Deserialize)]
pub struct DataQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    columns: Option<String>,
}

pub fn router() -> Router<PgPool> {
    // ---
    Router::new().route("/data", get(handler))
}

async fn handler(Query(params): Query<DataQuery>, State(pool): State<PgPool>) -> Response {
    // ---
    info!("GET /data {:?}", params);

    let columns = match parse_columns(params.columns.as_deref()) {
        Ok(columns) => columns,
        Err(column) => return client_error(format!("Invalid column: {}", column)),
    };
    let start = match parse_bound("start_date", params.start_date.as_deref()) {
        Ok(start) => start,
        Err(response) => return response,
    };
    let end = match parse_bound("end_date", params.end_date.as_deref()) {
        Ok(end) => end,
        Err(response) => return response,
    };

    match fetch_rows(&pool, &columns, start, end).await {
        Ok(rows) => {
            debug!("GET /data - returning {} rows", rows.len());
            (StatusCode::OK, Json(rows)).into_response()
        }
        Err(e) => {
            error!("Failed to query source data: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": "Failed to query data" })),
            )
                .into_response()
        }
    }
}

/// Resolve a `columns` parameter to known column names.
///
/// Absent or blank means every column. Returns the first unknown name as
/// the error.
pub fn parse_columns(raw: Option<&str>) -> Result<Vec<&'static str>, String> {
    // ---
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(SELECTABLE_COLUMNS.to_vec());
    };

    raw.split(',')
        .map(str::trim)
        .map(|name| {
            SELECTABLE_COLUMNS
                .iter()
                .find(|c| **c == name)
                .copied()
                .ok_or_else(|| name.to_string())
        })
        .collect()
}

fn parse_bound(param: &str, raw: Option<&str>) -> Result<Option<NaiveDateTime>, Response> {
    // ---
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_timestamp(raw)
            .map(|ts| Some(ts.naive_utc()))
            .ok_or_else(|| client_error(format!("Invalid {}: {}", param, raw))),
    }
}

fn client_error(detail: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
}

async fn fetch_rows(
    pool: &PgPool,
    columns: &[&'static str],
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> Result<Vec<Map<String, Value>>, sqlx::Error> {
    // ---
    // Column names come from SELECTABLE_COLUMNS only, never from the request.
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
    qb.push(columns.join(", "));
    qb.push(" FROM data WHERE TRUE");
    if let Some(start) = start {
        qb.push(" AND timestamp >= ").push_bind(start);
    }
    if let Some(end) = end {
        qb.push(" AND timestamp <= ").push_bind(end);
    }
    qb.push(" ORDER BY timestamp");

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(|row| row_to_json(row, columns)).collect()
}

fn row_to_json(row: &PgRow, columns: &[&str]) -> Result<Map<String, Value>, sqlx::Error> {
    // ---
    let mut out = Map::new();
    for (i, column) in columns.iter().enumerate() {
        let value = if *column == "timestamp" {
            let ts: NaiveDateTime = row.try_get(i)?;
            Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        } else {
            let v: Option<f64> = row.try_get(i)?;
            v.map(Value::from).unwrap_or(Value::Null)
        };
        out.insert(column.to_string(), value);
    }
    Ok(out)
}
