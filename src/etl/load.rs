//! Load: resolve derived signal names and upsert facts in one unit of work.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::{
    models::{BucketedStatistic, FactRow},
    store::{Repository, Session},
    EtlError, StoreError,
};

/// Outcome of a successful load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub signals_resolved: usize,
    pub rows_written: u64,
}

/// Persist `stats` through `session` atomically.
///
/// Signal resolution and fact upserts share one unit of work: either all of
/// it commits or none of it does. Loading the same statistics again
/// overwrites values in place.
pub async fn load<S: Session>(
    stats: &[BucketedStatistic],
    session: &mut S,
) -> Result<LoadReport, EtlError> {
    // ---
    if stats.is_empty() {
        info!("Nothing to load.");
        return Ok(LoadReport::default());
    }

    info!("Loading {} statistics into target store", stats.len());

    let mut repo = session.begin().await?;

    match write_batch(&mut repo, stats).await {
        Ok(report) => match repo.commit().await {
            Ok(()) => {
                info!(
                    "Successfully loaded {} records across {} signals",
                    report.rows_written, report.signals_resolved
                );
                Ok(report)
            }
            Err(e) => {
                error!("Commit failed, batch rolled back: {}", e);
                Err(e.into())
            }
        },
        Err(e) => {
            error!("Error loading data, rolling back batch: {}", e);
            if let Err(rb) = repo.rollback().await {
                warn!("Rollback failed: {}", rb);
            }
            Err(e.into())
        }
    }
}

async fn write_batch<R: Repository>(
    repo: &mut R,
    stats: &[BucketedStatistic],
) -> Result<LoadReport, StoreError> {
    // ---
    // Sorted so concurrent batches lock new signal rows in the same order.
    let names: BTreeSet<&str> = stats.iter().map(|s| s.signal_name.as_str()).collect();

    let mut signal_ids: HashMap<&str, i32> = HashMap::with_capacity(names.len());
    for name in names {
        let id = repo.get_or_create_signal(name).await?;
        signal_ids.insert(name, id);
    }

    // One row per key; a repeated key keeps its last value.
    let mut facts: BTreeMap<(DateTime<Utc>, i32), f64> = BTreeMap::new();
    for stat in stats {
        let signal_id = *signal_ids
            .get(stat.signal_name.as_str())
            .ok_or_else(|| StoreError::UnknownSignal(stat.signal_name.clone()))?;
        facts.insert((stat.bucket_start, signal_id), stat.value);
    }

    let rows: Vec<FactRow> = facts
        .into_iter()
        .map(|((timestamp, signal_id), value)| FactRow {
            timestamp,
            signal_id,
            value,
        })
        .collect();

    let rows_written = repo.upsert_facts(&rows).await?;

    Ok(LoadReport {
        signals_resolved: signal_ids.len(),
        rows_written,
    })
}
