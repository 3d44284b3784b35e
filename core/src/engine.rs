//! The snapshot engine — drives resolve → aggregate → write.
//!
//! FLOW (per month, fixed):
//!   1. Window resolver  (read current source state)
//!   2. Aggregator       (pure counts)
//!   3. Snapshot writer  (one transaction, wholesale replace)
//!
//! RULES:
//!   - Every month is its own transaction. A multi-month run commits month
//!     by month, so an interrupted run never leaves a half-written month.
//!   - Runs stop at the first failing month. Months already committed stay.
//!   - Regeneration is an unconditional overwrite, never an incremental patch.
//!   - Two callers regenerating the same month race; the later commit wins.

use crate::{
    aggregate::{aggregate, MonthCounts},
    clock::{Clock, SystemClock},
    config::EngineConfig,
    error::{SnapshotError, SnapshotResult},
    snapshot::{MonthDetail, MonthlySnapshotSummary},
    store::SnapshotStore,
    types::YearMonth,
    window,
};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

/// Outcome of generating one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthResult {
    pub year_month: YearMonth,
    pub total: i64,
    #[serde(rename = "new")]
    pub new_this_month: i64,
    pub departures: i64,
}

impl MonthResult {
    fn from_counts(year_month: YearMonth, counts: &MonthCounts) -> Self {
        Self {
            year_month,
            total: counts.total_members,
            new_this_month: counts.new_this_month,
            departures: counts.departures_this_month,
        }
    }
}

pub struct SnapshotEngine {
    store:  SnapshotStore,
    clock:  Box<dyn Clock>,
    offset: FixedOffset,
}

impl SnapshotEngine {
    pub fn new(store: SnapshotStore, clock: Box<dyn Clock>, offset: FixedOffset) -> Self {
        Self { store, clock, offset }
    }

    /// Open and migrate the database named in `config`, reading time from the system clock.
    pub fn from_config(config: &EngineConfig) -> SnapshotResult<Self> {
        Self::from_config_with_clock(config, Box::new(SystemClock))
    }

    pub fn from_config_with_clock(
        config: &EngineConfig,
        clock: Box<dyn Clock>,
    ) -> SnapshotResult<Self> {
        let store = SnapshotStore::from_config(config)?;
        store.migrate()?;
        Ok(Self::new(store, clock, config.month_offset()?))
    }

    /// In-memory engine with UTC month boundaries.
    pub fn build_test(clock: Box<dyn Clock>) -> SnapshotResult<Self> {
        Self::from_config_with_clock(&EngineConfig::default_test(), clock)
    }

    /// The source/snapshot store. Used to seed entries and by tooling.
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn current_month(&self) -> YearMonth {
        YearMonth::containing(self.clock.now(), self.offset)
    }

    /// Rebuild one month's snapshot from the current source state.
    pub fn generate(&self, year_month: YearMonth) -> SnapshotResult<MonthResult> {
        let resolved = window::resolve(&self.store, year_month, self.offset)?;
        let counts = aggregate(&resolved.entries, &resolved.window);

        let unrecognized = counts.unrecognized_status_count();
        if unrecognized > 0 {
            log::warn!(
                "{year_month}: {unrecognized} entr(ies) with unrecognised status counted in total only"
            );
        }

        self.store
            .replace_month_snapshot(year_month, &counts, &resolved.entries, self.clock.now())?;

        let result = MonthResult::from_counts(year_month, &counts);
        log::info!(
            "{year_month}: {} members ({} new, {} departures)",
            result.total,
            result.new_this_month,
            result.departures
        );
        Ok(result)
    }

    /// Same as `generate`, taking a raw "YYYY-MM" key.
    pub fn generate_str(&self, raw_year_month: &str) -> SnapshotResult<MonthResult> {
        self.generate(YearMonth::parse(raw_year_month)?)
    }

    /// Generate `from` through `to` inclusive, oldest first, stopping at the
    /// first failure.
    pub fn generate_range(
        &self,
        from: YearMonth,
        to: YearMonth,
    ) -> SnapshotResult<Vec<MonthResult>> {
        if from > to {
            return Err(SnapshotError::InvalidArgument(format!(
                "range start {from} is after range end {to}"
            )));
        }

        let mut completed = Vec::new();
        for year_month in from.through(to) {
            match self.generate(year_month) {
                Ok(result) => completed.push(result),
                Err(source) => {
                    log::warn!(
                        "run {from}..={to} stopped at {year_month} after {} month(s): {source}",
                        completed.len()
                    );
                    return Err(SnapshotError::PartialBackfillFailure {
                        completed,
                        failed_month: year_month,
                        source: Box::new(source),
                    });
                }
            }
        }
        Ok(completed)
    }

    /// Generate every month from the earliest entry date through the
    /// current month. The current month is necessarily partial.
    pub fn generate_retroactive(&self) -> SnapshotResult<Vec<MonthResult>> {
        let earliest = self
            .store
            .earliest_entry_date()?
            .ok_or_else(|| SnapshotError::NotFound("no control entries to backfill from".into()))?;

        let first = YearMonth::containing(earliest, self.offset);
        let current = self.current_month();
        if first > current {
            log::warn!("earliest entry month {first} is after current month {current}; nothing to backfill");
            return Ok(Vec::new());
        }

        log::info!("backfilling {first} through {current}");
        self.generate_range(first, current)
    }

    // ── Consumer surface ──────────────────────────────────────────

    /// Every generated month, newest first.
    pub fn list_months(&self) -> SnapshotResult<Vec<MonthlySnapshotSummary>> {
        self.store.snapshot_summaries()
    }

    pub fn month_detail(&self, year_month: YearMonth) -> SnapshotResult<MonthDetail> {
        let summary = self
            .store
            .snapshot_summary(year_month)?
            .ok_or_else(|| SnapshotError::NotFound(format!("no snapshot for {year_month}")))?;
        let members = self.store.snapshot_members(year_month)?;
        Ok(MonthDetail { summary, members })
    }
}
