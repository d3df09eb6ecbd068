//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Engines and the query service call store methods; they never execute
//! SQL directly.
//!
//! Derived tables are replaced wholesale: DELETE + bulk INSERT + the
//! table_version row, all in one transaction. File databases run in WAL
//! mode, so readers keep seeing the previous version until commit.

mod forecast;
mod rfm;
mod rollup;
mod sales;

use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::{
    error::AnalyticsResult,
    event::BatchLogEntry,
    outcome::{DataOutcome, LiveRows},
    snapshot::{TableState, TableVersion},
};

/// Every table the store knows, by name.
pub mod tables {
    pub const TRANSACTIONS: &str = "transactions";
    pub const RFM_SEGMENTS: &str = "rfm_segments";
    pub const SEGMENT_SUMMARY: &str = "segment_summary";
    pub const DAILY_SALES: &str = "daily_sales";
    pub const COUNTRY_SUMMARY: &str = "country_summary";
    pub const PRODUCT_PERFORMANCE: &str = "product_performance";
    pub const MONTHLY_SALES: &str = "monthly_sales";
    pub const SALES_SUMMARY: &str = "sales_summary";
    pub const SALES_FORECAST: &str = "sales_forecast";
    pub const MONTHLY_FORECAST: &str = "monthly_forecast";
    pub const FORECAST_INSIGHT: &str = "forecast_insight";

    /// Tables reported by `--verify`, in pipeline order.
    pub const ALL: [&str; 11] = [
        TRANSACTIONS,
        RFM_SEGMENTS,
        SEGMENT_SUMMARY,
        DAILY_SALES,
        COUNTRY_SUMMARY,
        PRODUCT_PERFORMANCE,
        MONTHLY_SALES,
        SALES_SUMMARY,
        SALES_FORECAST,
        MONTHLY_FORECAST,
        FORECAST_INSIGHT,
    ];
}

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(2000);

pub struct AnalyticsStore {
    conn: Connection,
}

impl AnalyticsStore {
    /// Open (or create) the analytics database at `path` for writing.
    pub fn open(path: &str) -> AnalyticsResult<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout(path: &str, busy_timeout: Duration) -> AnalyticsResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        if let Err(e) = conn.execute_batch("PRAGMA journal_mode=WAL;") {
            log::warn!("Could not enable WAL on {path}, readers may block on writes: {e}");
        }
        conn.busy_timeout(busy_timeout)?;
        Ok(Self { conn })
    }

    /// Read-only connection for the serving path. Fails if the file does
    /// not exist; the caller degrades to sample data.
    pub fn open_read_only(path: &str, busy_timeout: Duration) -> AnalyticsResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.busy_timeout(busy_timeout)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AnalyticsResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AnalyticsResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_sales.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_rfm.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_rollups.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_forecast.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/005_batch.sql"))?;
        Ok(())
    }

    // ── Table state ───────────────────────────────────────────────────────

    pub fn table_state(&self, table: &str) -> AnalyticsResult<TableState> {
        table_state(&self.conn, table)
    }

    pub fn row_count(&self, table: &'static str) -> AnalyticsResult<i64> {
        let n = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn table_version(&self, table: &str) -> AnalyticsResult<Option<TableVersion>> {
        let version = self
            .conn
            .query_row(
                "SELECT table_name, run_id, row_count, committed_at
                 FROM table_version WHERE table_name = ?1",
                params![table],
                |row| {
                    Ok(TableVersion {
                        table_name:   row.get(0)?,
                        run_id:       row.get(1)?,
                        row_count:    row.get(2)?,
                        committed_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(version)
    }

    // ── Locks ─────────────────────────────────────────────────────────────

    /// Take the recompute lock on `table` for `run_id`. Returns false when
    /// another run holds a lock younger than `stale_after_secs`.
    pub fn try_lock_table(
        &self,
        table: &str,
        run_id: &str,
        now_secs: i64,
        stale_after_secs: i64,
    ) -> AnalyticsResult<bool> {
        let reclaimed = self.conn.execute(
            "DELETE FROM recompute_lock WHERE table_name = ?1 AND locked_at <= ?2",
            params![table, now_secs - stale_after_secs],
        )?;
        if reclaimed > 0 {
            log::warn!("Reclaimed stale recompute lock on {table}");
        }
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO recompute_lock (table_name, run_id, locked_at)
             VALUES (?1, ?2, ?3)",
            params![table, run_id, now_secs],
        )?;
        Ok(inserted == 1)
    }

    pub fn unlock_table(&self, table: &str, run_id: &str) -> AnalyticsResult<()> {
        self.conn.execute(
            "DELETE FROM recompute_lock WHERE table_name = ?1 AND run_id = ?2",
            params![table, run_id],
        )?;
        Ok(())
    }

    pub fn lock_holder(&self, table: &str) -> AnalyticsResult<Option<String>> {
        let holder = self
            .conn
            .query_row(
                "SELECT run_id FROM recompute_lock WHERE table_name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(holder)
    }

    // ── Recompute log ─────────────────────────────────────────────────────

    pub fn append_log(&self, entry: &BatchLogEntry) -> AnalyticsResult<()> {
        self.conn.execute(
            "INSERT INTO recompute_log (run_id, seq, job, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.run_id,
                entry.seq,
                entry.job,
                entry.event_type,
                entry.payload,
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn log_for_run(&self, run_id: &str) -> AnalyticsResult<Vec<BatchLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, seq, job, event_type, payload, created_at
             FROM recompute_log WHERE run_id = ?1
             ORDER BY seq ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(BatchLogEntry {
                    id:         Some(row.get(0)?),
                    run_id:     row.get(1)?,
                    seq:        row.get(2)?,
                    job:        row.get(3)?,
                    event_type: row.get(4)?,
                    payload:    row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Shared helpers ────────────────────────────────────────────────────

    /// Replace `targets` wholesale in one write transaction. `write` inserts
    /// the new rows; any error rolls back and leaves the previous contents.
    fn replace_tables<F>(
        &self,
        run_id: &str,
        targets: &[(&'static str, usize)],
        write: F,
    ) -> AnalyticsResult<()>
    where
        F: FnOnce(&Connection) -> AnalyticsResult<()>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let conn: &Connection = &tx;
        for (table, _) in targets {
            conn.execute(&format!("DELETE FROM {table}"), [])?;
        }
        write(conn)?;

        let committed_at = chrono::Utc::now().to_rfc3339();
        for (table, rows) in targets {
            conn.execute(
                "INSERT INTO table_version (table_name, run_id, row_count, committed_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(table_name) DO UPDATE SET
                    run_id = excluded.run_id,
                    row_count = excluded.row_count,
                    committed_at = excluded.committed_at",
                params![table, run_id, *rows as i64, committed_at],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Run `query` against `table` inside one read transaction, so the
    /// table state and the rows come from the same snapshot. `None` from
    /// the query means the filter matched nothing.
    fn read_table<T, F>(&self, table: &'static str, query: F) -> DataOutcome<LiveRows<T>>
    where
        F: FnOnce(&Connection) -> AnalyticsResult<Option<T>>,
    {
        self.try_read_table(table, query)
            .unwrap_or_else(DataOutcome::Failed)
    }

    fn try_read_table<T, F>(
        &self,
        table: &'static str,
        query: F,
    ) -> AnalyticsResult<DataOutcome<LiveRows<T>>>
    where
        F: FnOnce(&Connection) -> AnalyticsResult<Option<T>>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let conn: &Connection = &tx;
        let outcome = match table_state(conn, table)? {
            TableState::Absent | TableState::Unpopulated => DataOutcome::Missing { table },
            TableState::Populated { as_of } => match query(conn)? {
                Some(data) => DataOutcome::Rows(LiveRows { data, as_of }),
                None => DataOutcome::Empty,
            },
        };
        tx.finish()?;
        Ok(outcome)
    }

    /// `read_table` for list queries: an empty list is `Empty`.
    fn read_list<T, F>(&self, table: &'static str, query: F) -> DataOutcome<LiveRows<Vec<T>>>
    where
        F: FnOnce(&Connection) -> AnalyticsResult<Vec<T>>,
    {
        self.read_table(table, |conn| {
            let rows = query(conn)?;
            Ok((!rows.is_empty()).then_some(rows))
        })
    }
}

fn table_state(conn: &Connection, table: &str) -> AnalyticsResult<TableState> {
    let exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Ok(TableState::Absent);
    }

    let versioned = version_exists(conn)?;
    if versioned {
        let as_of: Option<String> = conn
            .query_row(
                "SELECT committed_at FROM table_version WHERE table_name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(as_of) = as_of {
            return Ok(TableState::Populated { as_of: Some(as_of) });
        }
    }

    // Filled by something other than the batch engine.
    let has_rows: i64 = conn.query_row(
        &format!("SELECT EXISTS (SELECT 1 FROM {table})"),
        [],
        |row| row.get(0),
    )?;
    Ok(if has_rows == 1 {
        TableState::Populated { as_of: None }
    } else {
        TableState::Unpopulated
    })
}

fn version_exists(conn: &Connection) -> AnalyticsResult<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'table_version'",
        [],
        |row| row.get(0),
    )?;
    Ok(n == 1)
}

/// Dates are stored as `YYYY-MM-DD` text.
fn date_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<chrono::NaiveDate> {
    let text: String = row.get(idx)?;
    chrono::NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

const DATE_FORMAT: &str = "%Y-%m-%d";
