//! Database schema management for `sensorflow-etl`.
//!
//! Ensures required tables and indexes exist before first use. The target
//! schema is applied by the pipeline driver on sessions it owns; the source
//! schema is applied by the source API on startup.

use sqlx::{Connection, PgConnection, PgPool};

// ---

/// Create the target store schema (idempotent).
///
/// `signal` is the dimension table mapping derived signal names to stable
/// ids; `fact` holds one value per `(timestamp, signal_id)`. The unique
/// constraint on `signal.name` and the composite primary key on `fact` are
/// what make concurrent and repeated loads safe.
pub async fn create_target_schema(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    // ---
    let mut tx = conn.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS signal (
            id   SERIAL PRIMARY KEY,
            name TEXT   NOT NULL UNIQUE
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fact (
            timestamp TIMESTAMPTZ      NOT NULL,
            signal_id INTEGER          NOT NULL REFERENCES signal (id),
            value     DOUBLE PRECISION,
            PRIMARY KEY (timestamp, signal_id)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_fact_signal_id
            ON fact (signal_id);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Create the source store schema served by `/data` (idempotent).
pub async fn create_source_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS data (
            timestamp           TIMESTAMP        PRIMARY KEY,
            wind_speed          DOUBLE PRECISION,
            power               DOUBLE PRECISION,
            ambient_temperature DOUBLE PRECISION
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
