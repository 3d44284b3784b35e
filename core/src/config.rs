use crate::error::{SnapshotError, SnapshotResult};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

/// Largest UTC offset any real time zone uses.
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// SQLite database file. `":memory:"` opens a private in-memory database.
    pub database_path: String,
    /// Fixed UTC offset at which month boundaries and "now" are read.
    #[serde(default)]
    pub month_offset_minutes: i32,
    #[serde(default = "default_wal")]
    pub wal: bool,
    /// How long a writer waits for another connection's write lock.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_wal() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl EngineConfig {
    /// Load from a JSON file.
    /// In tests, use EngineConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn for_database(database_path: impl Into<String>) -> Self {
        Self {
            database_path: database_path.into(),
            month_offset_minutes: 0,
            wal: default_wal(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    /// In-memory database, UTC month boundaries.
    pub fn default_test() -> Self {
        Self::for_database(":memory:")
    }

    pub fn validate(&self) -> SnapshotResult<()> {
        if self.database_path.trim().is_empty() {
            return Err(SnapshotError::InvalidArgument(
                "database_path must not be empty".into(),
            ));
        }
        self.month_offset().map(|_| ())
    }

    pub fn month_offset(&self) -> SnapshotResult<FixedOffset> {
        let minutes = self.month_offset_minutes;
        if minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(SnapshotError::InvalidArgument(format!(
                "month_offset_minutes {minutes} outside ±{MAX_OFFSET_MINUTES}"
            )));
        }
        FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
            SnapshotError::InvalidArgument(format!("invalid month_offset_minutes {minutes}"))
        })
    }
}
