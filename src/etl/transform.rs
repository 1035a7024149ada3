//! Transform: resample raw observations into fixed 10-minute buckets.
//!
//! Buckets are aligned to the Unix epoch, so every bucket start falls on a
//! wall-clock multiple of ten minutes in UTC regardless of where the first
//! sample lands. Each tracked measurement gets mean, min, max and sample
//! standard deviation per bucket. A statistic without enough samples is left
//! out rather than emitted as null or zero.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::models::{derived_signal_name, BucketedStatistic, Measurement, RawObservation, Statistic};

/// Width of one bucket in seconds.
pub const BUCKET_WIDTH_SECS: i64 = 600;

/// Left edge of the bucket containing `ts`.
pub fn bucket_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    // ---
    let rem = ts.timestamp().rem_euclid(BUCKET_WIDTH_SECS);
    ts - TimeDelta::seconds(rem) - TimeDelta::nanoseconds(i64::from(ts.timestamp_subsec_nanos()))
}

/// Non-missing values per tracked measurement, in `Measurement::TRACKED` order.
type BucketValues = [Vec<f64>; Measurement::TRACKED.len()];

/// Resample `rows` into bucketed statistics.
///
/// Output is ordered by bucket, then measurement, then statistic.
pub fn transform(rows: &[RawObservation]) -> Vec<BucketedStatistic> {
    // ---
    if rows.is_empty() {
        return Vec::new();
    }

    let mut buckets: BTreeMap<DateTime<Utc>, BucketValues> = BTreeMap::new();
    for row in rows {
        let values = buckets.entry(bucket_start(row.timestamp)).or_default();
        for (slot, measurement) in Measurement::TRACKED.iter().enumerate() {
            if let Some(v) = row.value(*measurement) {
                values[slot].push(v);
            }
        }
    }

    let mut out = Vec::new();
    for (start, values) in &buckets {
        for (slot, measurement) in Measurement::TRACKED.iter().enumerate() {
            for statistic in Statistic::ALL {
                if let Some(value) = compute(statistic, &values[slot]) {
                    out.push(BucketedStatistic {
                        bucket_start: *start,
                        signal_name: derived_signal_name(*measurement, statistic),
                        value,
                    });
                }
            }
        }
    }

    debug!(
        "Transformed {} rows into {} statistics over {} buckets",
        rows.len(),
        out.len(),
        buckets.len()
    );
    out
}

/// Evaluate one statistic, or `None` when too few samples define it.
pub fn compute(statistic: Statistic, values: &[f64]) -> Option<f64> {
    // ---
    if values.len() < statistic.min_samples() {
        return None;
    }

    match statistic {
        Statistic::Mean => Some(mean(values)),
        Statistic::Min => values.iter().copied().reduce(f64::min),
        Statistic::Max => values.iter().copied().reduce(f64::max),
        Statistic::Std => {
            let mean = mean(values);
            let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            Some((sum_sq / (values.len() - 1) as f64).sqrt())
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
