use crate::engine::MonthResult;
use crate::types::YearMonth;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Snapshot write for {year_month} rolled back: {source}")]
    TransactionFailure {
        year_month: YearMonth,
        #[source]
        source: rusqlite::Error,
    },

    #[error(
        "Backfill stopped at {failed_month} after {} completed month(s): {source}",
        .completed.len()
    )]
    PartialBackfillFailure {
        completed: Vec<MonthResult>,
        failed_month: YearMonth,
        #[source]
        source: Box<SnapshotError>,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;
