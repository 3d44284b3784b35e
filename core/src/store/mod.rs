//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The resolver and the orchestrator call store methods — they never execute SQL directly.

use crate::{config::EngineConfig, error::SnapshotResult};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use std::time::Duration;

mod control_entry;
mod snapshot;

pub struct SnapshotStore {
    pub(crate) conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
    wal: bool,
    busy_timeout: Duration,
}

impl SnapshotStore {
    pub fn open(path: &str) -> SnapshotResult<Self> {
        Self::open_with(path, true, Duration::from_millis(5_000))
    }

    /// Open the database named in `config`.
    pub fn from_config(config: &EngineConfig) -> SnapshotResult<Self> {
        config.validate()?;
        if config.database_path == ":memory:" {
            return Self::in_memory();
        }
        Self::open_with(
            &config.database_path,
            config.wal,
            Duration::from_millis(config.busy_timeout_ms),
        )
    }

    fn open_with(path: &str, wal: bool, busy_timeout: Duration) -> SnapshotResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.busy_timeout(busy_timeout)?;
        if wal {
            // Shared-memory and :memory: databases ignore WAL.
            let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        }
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
            wal,
            busy_timeout,
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SnapshotResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: None,
            wal: false,
            busy_timeout: Duration::from_millis(5_000),
        })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    /// For file-based databases, this opens the same file.
    pub fn reopen(&self) -> SnapshotResult<Self> {
        match &self.path {
            Some(p) => Self::open_with(p, self.wal, self.busy_timeout),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SnapshotResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_source.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/002_monthly_snapshot.sql"))?;
        Ok(())
    }
}

// ── Timestamp columns ─────────────────────────────────────────────

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(column: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, millis))
}

pub(crate) fn opt_from_millis(
    column: usize,
    millis: Option<i64>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    millis.map(|ms| from_millis(column, ms)).transpose()
}
