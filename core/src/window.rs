//! Window resolution — which control entries were alive during a month.
//!
//! An entry lives over `[entry_date, deleted_at ?? +inf)`. It belongs to a
//! month when that interval overlaps `[month_start, month_end]`, both ends
//! inclusive. The store evaluates the predicate in SQL; `MonthWindow`
//! carries the same test for callers holding entries in memory.
//!
//! Status is read as it is *now*. A month that has since been left behind
//! reports today's status, not the one that held back then.

use crate::{
    control_entry::ControlEntry,
    error::SnapshotResult,
    store::SnapshotStore,
    types::{MonthWindow, YearMonth},
};
use chrono::FixedOffset;

/// A month's window plus the entries alive in it, in report order
/// (client name, then unit number).
#[derive(Debug, Clone)]
pub struct ResolvedMonth {
    pub year_month: YearMonth,
    pub window: MonthWindow,
    pub entries: Vec<ControlEntry>,
}

pub fn resolve(
    store: &SnapshotStore,
    year_month: YearMonth,
    offset: FixedOffset,
) -> SnapshotResult<ResolvedMonth> {
    let window = year_month.window(offset);
    let entries = store.entries_overlapping(&window)?;

    debug_assert!(
        entries
            .iter()
            .all(|e| window.overlaps_lifetime(e.entry_date, e.deleted_at)),
        "store returned an entry outside {year_month}"
    );
    log::debug!("{year_month}: resolved {} entries", entries.len());

    Ok(ResolvedMonth { year_month, window, entries })
}

/// Parse a raw "YYYY-MM" key and resolve it.
pub fn resolve_str(
    store: &SnapshotStore,
    raw_year_month: &str,
    offset: FixedOffset,
) -> SnapshotResult<ResolvedMonth> {
    resolve(store, YearMonth::parse(raw_year_month)?, offset)
}
