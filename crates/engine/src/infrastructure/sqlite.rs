//! SQLite slot store implementation.
//!
//! Schema is ensured at construction. Every operation runs under a bounded
//! timeout; a timed-out write has an unknown outcome and is reported as
//! `StoreError::Timeout` so callers re-query instead of assuming either way.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use slotcast_domain::{AvailableSlot, Holder, SlotId, SlotTime, UnitId};

use super::ports::{SlotStorePort, StoreError};

/// Durable slot store on a SQLite pool.
pub struct SqliteSlotStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl SqliteSlotStore {
    /// Create the store and ensure the schema exists.
    ///
    /// The unique index on (unit_id, date, time) is the store-level
    /// uniqueness constraint; provisioning inserts rely on it for per-row
    /// idempotency.
    pub async fn new(pool: SqlitePool, timeout: Duration) -> Result<Self, StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS units (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS slots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                unit_id INTEGER NOT NULL REFERENCES units(id),
                date TEXT NOT NULL,
                time TEXT NOT NULL,
                is_booked INTEGER NOT NULL DEFAULT 0,
                name TEXT,
                email TEXT,
                phone TEXT
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_slots_unit_date_time
            ON slots(unit_id, date, time)
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { pool, timeout })
    }

    /// Run a query future under the configured timeout.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| StoreError::Database(e.to_string())),
            Err(_) => Err(StoreError::Timeout),
        }
    }
}

fn row_to_slot(row: &SqliteRow) -> Result<AvailableSlot, StoreError> {
    let time: String = row
        .try_get("time")
        .map_err(|e| StoreError::Database(e.to_string()))?;
    let time: SlotTime = time
        .parse()
        .map_err(|e: slotcast_domain::DomainError| StoreError::Database(e.to_string()))?;

    let get_err = |e: sqlx::Error| StoreError::Database(e.to_string());
    Ok(AvailableSlot {
        id: SlotId::from_i64(row.try_get("id").map_err(get_err)?),
        unit_id: UnitId::from_i64(row.try_get("unit_id").map_err(get_err)?),
        unit_name: row.try_get("unit_name").map_err(get_err)?,
        date: row.try_get("date").map_err(get_err)?,
        time,
        is_booked: row.try_get("is_booked").map_err(get_err)?,
        name: row.try_get("holder_name").map_err(get_err)?,
        email: row.try_get("holder_email").map_err(get_err)?,
        phone: row.try_get("holder_phone").map_err(get_err)?,
    })
}

#[async_trait]
impl SlotStorePort for SqliteSlotStore {
    async fn list_slots_with_unit_names(&self) -> Result<Vec<AvailableSlot>, StoreError> {
        let rows = self
            .bounded(
                sqlx::query(
                    r#"
                    SELECT slots.id, slots.unit_id, units.name AS unit_name,
                           slots.date, slots.time, slots.is_booked,
                           slots.name AS holder_name, slots.email AS holder_email,
                           slots.phone AS holder_phone
                    FROM slots
                    JOIN units ON slots.unit_id = units.id
                    ORDER BY slots.date, slots.time, slots.unit_id
                    "#,
                )
                .fetch_all(&self.pool),
            )
            .await?;

        rows.iter().map(row_to_slot).collect()
    }

    async fn slot_exists(&self, id: SlotId) -> Result<bool, StoreError> {
        let row = self
            .bounded(
                sqlx::query("SELECT 1 FROM slots WHERE id = ? LIMIT 1")
                    .bind(id.as_i64())
                    .fetch_optional(&self.pool),
            )
            .await?;
        Ok(row.is_some())
    }

    async fn book_slot_if_free(&self, id: SlotId, holder: &Holder) -> Result<u64, StoreError> {
        let result = self
            .bounded(
                sqlx::query(
                    r#"
                    UPDATE slots
                    SET is_booked = 1, name = ?, email = ?, phone = ?
                    WHERE id = ? AND is_booked = 0
                    "#,
                )
                .bind(&holder.name)
                .bind(&holder.email)
                .bind(&holder.phone)
                .bind(id.as_i64())
                .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_unit_ids(&self) -> Result<Vec<UnitId>, StoreError> {
        let ids: Vec<i64> = self
            .bounded(
                sqlx::query_scalar("SELECT id FROM units ORDER BY id").fetch_all(&self.pool),
            )
            .await?;
        Ok(ids.into_iter().map(UnitId::from_i64).collect())
    }

    async fn count_slots(&self, date: NaiveDate, unit_id: UnitId) -> Result<i64, StoreError> {
        self.bounded(
            sqlx::query_scalar("SELECT COUNT(*) FROM slots WHERE date = ? AND unit_id = ?")
                .bind(date)
                .bind(unit_id.as_i64())
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn insert_slot(
        &self,
        time: SlotTime,
        date: NaiveDate,
        unit_id: UnitId,
    ) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query(
                r#"
                INSERT INTO slots (time, is_booked, date, unit_id)
                VALUES (?, 0, ?, ?)
                ON CONFLICT(unit_id, date, time) DO NOTHING
                "#,
            )
            .bind(time.as_str())
            .bind(date)
            .bind(unit_id.as_i64())
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn delete_slots_outside(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<u64, StoreError> {
        let result = self
            .bounded(
                sqlx::query("DELETE FROM slots WHERE date < ? OR date > ?")
                    .bind(from)
                    .bind(to)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_duplicate_slots(&self) -> Result<u64, StoreError> {
        // The unique index prevents new duplicates; this sweep heals rows
        // created before the index existed. Lowest id survives.
        let result = self
            .bounded(
                sqlx::query(
                    r#"
                    DELETE FROM slots
                    WHERE id NOT IN (
                        SELECT MIN(id)
                        FROM slots
                        GROUP BY date, time, unit_id
                    )
                    "#,
                )
                .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected())
    }
}
