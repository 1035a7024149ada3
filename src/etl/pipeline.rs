//! Pipeline driver: Extract → Transform → Load for one calendar date.
//!
//! The driver either owns its target session (connects, uses, closes) or
//! borrows one from the caller, in which case it never closes it. Either way
//! the date is validated before any network or database work starts.

use chrono::NaiveDate;
use sqlx::{Connection, PgConnection};
use tracing::{info, instrument, warn};

use super::{extract::Extractor, load::load, load::LoadReport, transform::transform};
use crate::{store::Session, EtlError};

/// Processed-row counts for one run, for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub date: NaiveDate,
    pub extracted: usize,
    pub transformed: usize,
    pub loaded: LoadReport,
}

/// Parse a run date in strict `YYYY-MM-DD` form.
pub fn parse_run_date(raw: &str) -> Result<NaiveDate, EtlError> {
    // ---
    let trimmed = raw.trim();
    if trimmed.len() != 10 {
        return Err(EtlError::InvalidDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| EtlError::InvalidDate(raw.to_string()))
}

/// Daily ETL driver bound to one raw data source.
#[derive(Debug, Clone)]
pub struct Pipeline {
    extractor: Extractor,
}

impl Pipeline {
    pub fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }

    /// Run for `date` on a session the caller owns and will close.
    pub async fn run_with_session<S: Session>(
        &self,
        date: &str,
        session: &mut S,
    ) -> Result<RunReport, EtlError> {
        // ---
        let date = parse_run_date(date)?;
        self.run_stages(date, session).await
    }

    /// Run for `date` on a dedicated connection to `target_db_url`.
    ///
    /// The connection is closed on every exit path; a failure to close is
    /// logged and does not replace the run's own outcome.
    pub async fn run_owned(&self, date: &str, target_db_url: &str) -> Result<RunReport, EtlError> {
        // ---
        let date = parse_run_date(date)?;

        let mut conn = PgConnection::connect(target_db_url)
            .await
            .map_err(EtlError::Session)?;

        let result = self.run_stages(date, &mut conn).await;

        if let Err(e) = conn.close().await {
            warn!("Failed to close target session for {}: {}", date, e);
        }
        result
    }

    #[instrument(name = "etl_run", skip(self, session))]
    async fn run_stages<S: Session>(
        &self,
        date: NaiveDate,
        session: &mut S,
    ) -> Result<RunReport, EtlError> {
        // ---
        session.ensure_schema().await.map_err(EtlError::Schema)?;

        let raw = self.extractor.extract(date).await?;
        let stats = transform(&raw);
        let loaded = load(&stats, session).await?;

        let report = RunReport {
            date,
            extracted: raw.len(),
            transformed: stats.len(),
            loaded,
        };
        info!(
            "Run for {} complete: extracted={} transformed={} loaded={}",
            date, report.extracted, report.transformed, report.loaded.rows_written
        );
        Ok(report)
    }
}
