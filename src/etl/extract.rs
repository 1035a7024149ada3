//! Extract: one bounded request to the raw data source per calendar day.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::models::{parse_timestamp, RawObservation};

/// Fields requested from the source; everything else is projected away.
pub const EXTRACT_COLUMNS: &str = "timestamp,wind_speed,power";

/// Why a fetch produced no data.
///
/// Only [`FetchError::Status`] and [`FetchError::UnexpectedBody`] escape
/// [`Extractor::extract`]; transport failures degrade to an empty day.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("source answered with status {0}")]
    Status(StatusCode),

    #[error("unexpected response body: {0}")]
    UnexpectedBody(String),
}

/// HTTP client for the raw data source.
#[derive(Debug, Clone)]
pub struct Extractor {
    client: reqwest::Client,
    api_url: String,
}

impl Extractor {
    /// Build an extractor whose single request is bounded by `timeout`.
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        // ---
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    /// Fetch every observation of `date`, sorted by timestamp.
    ///
    /// Transport errors and timeouts are logged and reported as an empty
    /// day. An error status or a body that is not a JSON array means the
    /// source misbehaved, and fails the run so the date can be retried.
    pub async fn extract(&self, date: NaiveDate) -> Result<Vec<RawObservation>, FetchError> {
        // ---
        match self.fetch(date).await {
            Ok(rows) if rows.is_empty() => {
                info!("No data found for {}", date);
                Ok(rows)
            }
            Ok(rows) => {
                info!("Extracted {} rows for {}", rows.len(), date);
                Ok(rows)
            }
            Err(FetchError::Transport(e)) => {
                warn!("Extract for {} failed, treating day as empty: {}", date, e);
                Ok(Vec::new())
            }
            Err(e) => {
                error!("Extract for {} rejected by source: {}", date, e);
                Err(e)
            }
        }
    }

    async fn fetch(&self, date: NaiveDate) -> Result<Vec<RawObservation>, FetchError> {
        // ---
        let (start, end) = day_bounds(date);
        debug!("Fetching {} from {} to {}", self.api_url, start, end);

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("start_date", start.as_str()),
                ("end_date", end.as_str()),
                ("columns", EXTRACT_COLUMNS),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_decode() {
                FetchError::UnexpectedBody(e.to_string())
            } else {
                FetchError::Transport(e)
            }
        })?;
        let items = match body {
            Value::Null => return Ok(Vec::new()),
            Value::Array(items) => items,
            other => {
                return Err(FetchError::UnexpectedBody(format!(
                    "expected an array, got {}",
                    json_kind(&other)
                )))
            }
        };

        let mut rows: Vec<RawObservation> = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                let row = observation_from_json(item);
                if row.is_none() {
                    debug!("Skipping item {} without a usable timestamp: {}", i, item);
                }
                row
            })
            .collect();

        rows.sort_by_key(|r| r.timestamp);
        Ok(rows)
    }
}

/// Closed request range covering `date`: midnight through the last microsecond.
fn day_bounds(date: NaiveDate) -> (String, String) {
    // ---
    let start = date.and_time(NaiveTime::MIN);
    let end = start + TimeDelta::days(1) - TimeDelta::microseconds(1);
    (
        start.format("%Y-%m-%dT%H:%M:%S").to_string(),
        end.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
    )
}

fn observation_from_json(item: &Value) -> Option<RawObservation> {
    // ---
    let timestamp = match item.get("timestamp")? {
        Value::String(s) => parse_timestamp(s)?,
        Value::Number(n) => DateTime::<Utc>::from_timestamp(n.as_i64()?, 0)?,
        _ => return None,
    };

    Some(RawObservation {
        timestamp,
        wind_speed: number_field(item, "wind_speed"),
        power: number_field(item, "power"),
    })
}

/// Numeric field that may be absent, `null`, a number, or a numeric string.
fn number_field(item: &Value, field: &str) -> Option<f64> {
    match item.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
