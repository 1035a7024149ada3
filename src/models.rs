//! Data models for the sensor pipeline.
//!
//! Raw observations come from the source API, bucketed statistics are the
//! in-memory product of the transform step, and [`Signal`] / [`FactRow`] mirror
//! the two tables of the target store.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

// ---

/// Base measurements that the transform step aggregates.
///
/// `ambient_temperature` exists in the source but is deliberately not tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Measurement {
    WindSpeed,
    Power,
}

impl Measurement {
    /// Tracked measurements in output order.
    pub const TRACKED: [Measurement; 2] = [Measurement::WindSpeed, Measurement::Power];

    pub fn as_str(self) -> &'static str {
        match self {
            Measurement::WindSpeed => "wind_speed",
            Measurement::Power => "power",
        }
    }
}

/// Statistic kinds computed per bucket and measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Statistic {
    Mean,
    Min,
    Max,
    Std,
}

impl Statistic {
    /// All statistics in output order.
    pub const ALL: [Statistic; 4] = [Statistic::Mean, Statistic::Min, Statistic::Max, Statistic::Std];

    pub fn as_str(self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Std => "std",
        }
    }

    /// Minimum number of samples for the statistic to be defined.
    pub fn min_samples(self) -> usize {
        match self {
            Statistic::Std => 2,
            _ => 1,
        }
    }
}

/// Name of the derived signal for a measurement/statistic pair, e.g. `power_std`.
pub fn derived_signal_name(measurement: Measurement, statistic: Statistic) -> String {
    format!("{}_{}", measurement.as_str(), statistic.as_str())
}

/// One raw sample returned by the source API.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    // ---
    pub timestamp: DateTime<Utc>,
    pub wind_speed: Option<f64>,
    pub power: Option<f64>,
}

impl RawObservation {
    /// Value of a tracked measurement; non-finite values count as missing.
    pub fn value(&self, measurement: Measurement) -> Option<f64> {
        // ---
        let value = match measurement {
            Measurement::WindSpeed => self.wind_speed,
            Measurement::Power => self.power,
        };
        value.filter(|v| v.is_finite())
    }
}

/// One statistic over one bucket, ready to be loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketedStatistic {
    // ---
    pub bucket_start: DateTime<Utc>,
    pub signal_name: String,
    pub value: f64,
}

/// Row of the `signal` dimension table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Signal {
    pub id: i32,
    pub name: String,
}

/// Row of the `fact` table, keyed by `(timestamp, signal_id)`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct FactRow {
    // ---
    pub timestamp: DateTime<Utc>,
    pub signal_id: i32,
    pub value: f64,
}

// ---

/// Parse a timestamp in any of the textual encodings the source may emit.
///
/// Accepts RFC 3339 with an offset, naive ISO-8601 with `T` or space
/// separator (optionally fractional seconds), and integer epoch seconds.
/// Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    // ---
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}
