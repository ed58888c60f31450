use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use core_types::{PriceSchedule, ScheduleId, Scope};
use log::warn;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use rust_decimal::Decimal;

use crate::{
    error::{StoreError, StoreResult},
    store::{ScheduleStore, ScheduleTx},
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS price_schedules (
    id                TEXT PRIMARY KEY,
    scope             TEXT NOT NULL,
    selling_price     TEXT NOT NULL,
    cost_price        TEXT NOT NULL,
    currency          TEXT NOT NULL,
    effective_from_ms INTEGER NOT NULL,
    effective_to_ms   INTEGER,
    created_at_ms     INTEGER NOT NULL,
    created_by        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_price_schedules_scope_from
    ON price_schedules (scope, effective_from_ms);
";

const COLUMNS: &str = "id, scope, selling_price, cost_price, currency, \
                       effective_from_ms, effective_to_ms, created_at_ms, created_by";

/// SQLite-backed schedule store. Writers serialize on `BEGIN IMMEDIATE`;
/// the busy timeout makes a contending writer wait rather than fail.
pub struct SqliteScheduleStore {
    conn: Mutex<Connection>,
}

impl SqliteScheduleStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(StoreError::backend)?;
        Self::init(conn)
    }

    /// Private in-memory database; used by tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::backend)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(StoreError::backend)?;
        conn.execute_batch(SCHEMA).map_err(StoreError::backend)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

struct SqliteTx<'a> {
    tx: &'a Transaction<'a>,
}

impl ScheduleTx for SqliteTx<'_> {
    fn find_open(&mut self, scope: &Scope) -> StoreResult<Option<PriceSchedule>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM price_schedules \
             WHERE scope = ?1 AND effective_to_ms IS NULL LIMIT 1"
        );
        self.tx
            .query_row(&sql, params![scope.key()], decode_row)
            .optional()
            .map_err(StoreError::backend)?
            .map(raw_to_schedule)
            .transpose()
    }

    fn find_overlapping(
        &mut self,
        scope: &Scope,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
        excluding: Option<ScheduleId>,
    ) -> StoreResult<Option<PriceSchedule>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM price_schedules \
             WHERE scope = ?1 \
               AND (?2 IS NULL OR id != ?2) \
               AND (?4 IS NULL OR effective_from_ms < ?4) \
               AND (effective_to_ms IS NULL OR effective_to_ms > ?3) \
             ORDER BY effective_from_ms ASC LIMIT 1"
        );
        self.tx
            .query_row(
                &sql,
                params![
                    scope.key(),
                    excluding.map(|id| id.to_hex()),
                    from.timestamp_millis(),
                    to.map(|end| end.timestamp_millis()),
                ],
                decode_row,
            )
            .optional()
            .map_err(StoreError::backend)?
            .map(raw_to_schedule)
            .transpose()
    }

    fn insert(&mut self, record: &PriceSchedule) -> StoreResult<()> {
        self.tx
            .execute(
                "INSERT INTO price_schedules \
                 (id, scope, selling_price, cost_price, currency, \
                  effective_from_ms, effective_to_ms, created_at_ms, created_by) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id.to_hex(),
                    record.scope.key(),
                    record.selling_price_per_liter.to_string(),
                    record.cost_price_per_liter.to_string(),
                    record.currency,
                    record.effective_from.timestamp_millis(),
                    record.effective_to.map(|end| end.timestamp_millis()),
                    record.created_at.timestamp_millis(),
                    record.created_by,
                ],
            )
            .map_err(StoreError::backend)?;
        Ok(())
    }

    fn close(&mut self, id: ScheduleId, effective_to: DateTime<Utc>) -> StoreResult<()> {
        let changed = self
            .tx
            .execute(
                "UPDATE price_schedules SET effective_to_ms = ?2 WHERE id = ?1",
                params![id.to_hex(), effective_to.timestamp_millis()],
            )
            .map_err(StoreError::backend)?;
        if changed == 0 {
            return Err(StoreError::MissingRecord { id });
        }
        Ok(())
    }
}

impl ScheduleStore for SqliteScheduleStore {
    fn in_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn ScheduleTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| E::from(StoreError::backend(err)))?;
        let out = {
            let mut handle = SqliteTx { tx: &tx };
            work(&mut handle)
        };
        match out {
            Ok(value) => {
                tx.commit().map_err(|err| E::from(StoreError::backend(err)))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!("[schedule-store] rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }

    fn find_containing(&self, scope: &Scope, at: DateTime<Utc>) -> StoreResult<Option<PriceSchedule>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {COLUMNS} FROM price_schedules \
             WHERE scope = ?1 \
               AND effective_from_ms <= ?2 \
               AND (effective_to_ms IS NULL OR effective_to_ms > ?2) \
             ORDER BY effective_from_ms DESC LIMIT 1"
        );
        conn.query_row(&sql, params![scope.key(), at.timestamp_millis()], decode_row)
            .optional()
            .map_err(StoreError::backend)?
            .map(raw_to_schedule)
            .transpose()
    }

    fn list(&self, scope: &Scope) -> StoreResult<Vec<PriceSchedule>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {COLUMNS} FROM price_schedules \
             WHERE scope = ?1 ORDER BY effective_from_ms ASC"
        );
        let mut stmt = conn.prepare(&sql).map_err(StoreError::backend)?;
        let rows = stmt
            .query_map(params![scope.key()], decode_row)
            .map_err(StoreError::backend)?;
        let mut records = Vec::new();
        for raw in rows {
            records.push(raw_to_schedule(raw.map_err(StoreError::backend)?)?);
        }
        Ok(records)
    }
}

struct RawRow {
    id: String,
    scope: String,
    selling_price: String,
    cost_price: String,
    currency: String,
    effective_from_ms: i64,
    effective_to_ms: Option<i64>,
    created_at_ms: i64,
    created_by: String,
}

fn decode_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        scope: row.get(1)?,
        selling_price: row.get(2)?,
        cost_price: row.get(3)?,
        currency: row.get(4)?,
        effective_from_ms: row.get(5)?,
        effective_to_ms: row.get(6)?,
        created_at_ms: row.get(7)?,
        created_by: row.get(8)?,
    })
}

fn raw_to_schedule(raw: RawRow) -> StoreResult<PriceSchedule> {
    let id = ScheduleId::from_hex(&raw.id)
        .ok_or_else(|| StoreError::Corrupt(format!("bad schedule id {}", raw.id)))?;
    let scope = Scope::from_key(&raw.scope)
        .ok_or_else(|| StoreError::Corrupt(format!("bad scope key {}", raw.scope)))?;
    let selling_price_per_liter = parse_decimal(&raw.selling_price)?;
    let cost_price_per_liter = parse_decimal(&raw.cost_price)?;
    let effective_to = match raw.effective_to_ms {
        Some(ms) => Some(parse_instant(ms)?),
        None => None,
    };
    Ok(PriceSchedule {
        id,
        scope,
        selling_price_per_liter,
        cost_price_per_liter,
        currency: raw.currency,
        effective_from: parse_instant(raw.effective_from_ms)?,
        effective_to,
        created_at: parse_instant(raw.created_at_ms)?,
        created_by: raw.created_by,
    })
}

fn parse_decimal(raw: &str) -> StoreResult<Decimal> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("bad decimal {raw}")))
}

fn parse_instant(ms: i64) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StoreError::Corrupt(format!("bad timestamp {ms}")))
}
