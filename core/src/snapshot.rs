//! Persisted monthly snapshot rows.
//!
//! A summary and its members are written together and replaced together.
//! Nothing here is ever updated in place.

use crate::{
    aggregate::MonthCounts,
    control_entry::{ControlEntry, EntryStatus},
    types::{EntityId, SnapshotId, YearMonth},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySnapshotSummary {
    pub id:           SnapshotId,
    pub year_month:   YearMonth,
    #[serde(flatten)]
    pub counts:       MonthCounts,
    pub generated_at: DateTime<Utc>,
}

/// Frozen copy of one control entry as it looked when the month was generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySnapshotMember {
    pub id:                        String,
    pub snapshot_id:               SnapshotId,
    pub position:                  i64,
    pub entry_id:                  EntityId,
    pub proposal_id:               EntityId,
    pub consumer_unit_id:          EntityId,
    pub generator_id:              Option<EntityId>,
    pub status:                    EntryStatus,
    pub client_name:               String,
    pub consultant_name:           Option<String>,
    pub unit_number:               String,
    pub unit_nickname:             Option<String>,
    pub generator_number:          Option<String>,
    pub average_consumption:       f64,
    pub calibrated_consumption:    Option<f64>,
    pub calibration_percent:       Option<f64>,
    pub tariff_discount_percent:   f64,
    pub flag_discount_percent:     f64,
    pub entry_date:                DateTime<Utc>,
    pub signature_date:            Option<DateTime<Utc>>,
    pub in_progress_date:          Option<DateTime<Utc>>,
    pub ownership_date:            Option<DateTime<Utc>>,
    pub generator_allocation_date: Option<DateTime<Utc>>,
    pub deleted_at:                Option<DateTime<Utc>>,
}

impl MonthlySnapshotMember {
    pub fn freeze(
        entry: &ControlEntry,
        id: String,
        snapshot_id: &SnapshotId,
        position: i64,
    ) -> Self {
        Self {
            id,
            snapshot_id: snapshot_id.clone(),
            position,
            entry_id: entry.entry_id.clone(),
            proposal_id: entry.proposal_id.clone(),
            consumer_unit_id: entry.consumer_unit_id.clone(),
            generator_id: entry.generator_id.clone(),
            status: entry.status.clone(),
            client_name: entry.client_name.clone(),
            consultant_name: entry.consultant_name.clone(),
            unit_number: entry.unit_number.clone(),
            unit_nickname: entry.unit_nickname.clone(),
            generator_number: entry.generator_number.clone(),
            average_consumption: entry.average_consumption,
            calibrated_consumption: entry.calibrated_consumption,
            calibration_percent: entry.calibration_percent,
            tariff_discount_percent: entry.tariff_discount_percent,
            flag_discount_percent: entry.flag_discount_percent,
            entry_date: entry.entry_date,
            signature_date: entry.signature_date,
            in_progress_date: entry.in_progress_date,
            ownership_date: entry.ownership_date,
            generator_allocation_date: entry.generator_allocation_date,
            deleted_at: entry.deleted_at,
        }
    }
}

/// One month as served to consumers: the summary plus its ordered members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthDetail {
    pub summary: MonthlySnapshotSummary,
    pub members: Vec<MonthlySnapshotMember>,
}
