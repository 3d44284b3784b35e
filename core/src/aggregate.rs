//! Month aggregation — pure counting over a resolved entry set.
//!
//! No I/O, no clock. Same entries + same window = same counts.

use crate::{
    control_entry::{ControlEntry, EntryStatus},
    types::MonthWindow,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthCounts {
    pub total_members:         i64,
    pub new_this_month:        i64,
    pub departures_this_month: i64,
    pub pipeline_count:        i64,
    pub in_progress_count:     i64,
    pub member_count:          i64,
    pub exiting_count:         i64,
    pub with_generator:        i64,
    pub without_generator:     i64,
}

impl MonthCounts {
    /// Sum of the four known status buckets. Falls short of
    /// `total_members` only when an entry carries an unrecognised status.
    pub fn status_total(&self) -> i64 {
        self.pipeline_count + self.in_progress_count + self.member_count + self.exiting_count
    }

    pub fn unrecognized_status_count(&self) -> i64 {
        self.total_members - self.status_total()
    }
}

pub fn aggregate(entries: &[ControlEntry], window: &MonthWindow) -> MonthCounts {
    let mut counts = MonthCounts {
        total_members: entries.len() as i64,
        ..MonthCounts::default()
    };

    for entry in entries {
        if window.contains(entry.entry_date) {
            counts.new_this_month += 1;
        }
        if entry.deleted_at.is_some_and(|d| window.contains(d)) {
            counts.departures_this_month += 1;
        }
        match entry.status {
            EntryStatus::Pipeline => counts.pipeline_count += 1,
            EntryStatus::InProgress => counts.in_progress_count += 1,
            EntryStatus::Member => counts.member_count += 1,
            EntryStatus::Exiting => counts.exiting_count += 1,
            EntryStatus::Unrecognized(_) => {}
        }
        if entry.has_generator() {
            counts.with_generator += 1;
        }
    }

    counts.without_generator = counts.total_members - counts.with_generator;
    counts
}
