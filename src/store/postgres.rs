//! PostgreSQL backend for the repository traits, built on `sqlx`.

use sqlx::{Connection, PgConnection, Postgres, QueryBuilder, Transaction};
use tracing::debug;

use super::{Repository, Session};
use crate::{models::FactRow, schema::create_target_schema, StoreError};

/// Rows per multi-row `INSERT`; three binds each keeps well under the
/// protocol's 65535 parameter limit.
const UPSERT_CHUNK: usize = 1000;

// ---

/// Unit of work wrapping an open `sqlx` transaction.
///
/// Dropping it without [`Repository::commit`] rolls the transaction back.
pub struct PgRepository<'c> {
    tx: Transaction<'c, Postgres>,
}

impl Session for PgConnection {
    type Repo<'a> = PgRepository<'a>;

    async fn ensure_schema(&mut self) -> Result<(), StoreError> {
        create_target_schema(self).await?;
        Ok(())
    }

    async fn begin(&mut self) -> Result<Self::Repo<'_>, StoreError> {
        // ---
        let tx = Connection::begin(self).await?;
        Ok(PgRepository { tx })
    }
}

impl PgRepository<'_> {
    async fn find_signal(&mut self, name: &str) -> Result<Option<i32>, StoreError> {
        // ---
        let id = sqlx::query_scalar::<_, i32>("SELECT id FROM signal WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(id)
    }
}

impl Repository for PgRepository<'_> {
    async fn get_or_create_signal(&mut self, name: &str) -> Result<i32, StoreError> {
        // ---
        if let Some(id) = self.find_signal(name).await? {
            return Ok(id);
        }

        // Blocks on a concurrent uncommitted insert of the same name, then
        // yields no row if that insert committed.
        let inserted = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO signal (name) VALUES ($1)
            ON CONFLICT (name) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(id) = inserted {
            debug!("Created signal {} with id {}", name, id);
            return Ok(id);
        }

        debug!("Signal {} was created concurrently, re-reading", name);
        self.find_signal(name)
            .await?
            .ok_or_else(|| StoreError::UnknownSignal(name.to_string()))
    }

    async fn upsert_facts(&mut self, rows: &[FactRow]) -> Result<u64, StoreError> {
        // ---
        let mut written = 0;

        for chunk in rows.chunks(UPSERT_CHUNK) {
            let mut qb: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO fact (timestamp, signal_id, value) ");
            qb.push_values(chunk, |mut b, row| {
                b.push_bind(row.timestamp)
                    .push_bind(row.signal_id)
                    .push_bind(row.value);
            });
            qb.push(" ON CONFLICT (timestamp, signal_id) DO UPDATE SET value = EXCLUDED.value");

            let result = qb.build().execute(&mut *self.tx).await?;
            written += result.rows_affected();
        }

        Ok(written)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
