//! Control entries — the mutable source records the engine reads.
//!
//! The engine never writes these. The insert/update helpers in the store
//! exist so the runner and the tests can populate a source database.

use crate::types::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum EntryStatus {
    Pipeline,
    InProgress,
    Member,
    Exiting,
    /// A value outside the four known states. Counted in totals only.
    Unrecognized(String),
}

impl EntryStatus {
    pub const KNOWN: [EntryStatus; 4] = [
        EntryStatus::Pipeline,
        EntryStatus::InProgress,
        EntryStatus::Member,
        EntryStatus::Exiting,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pipeline => "pipeline",
            Self::InProgress => "in_progress",
            Self::Member => "member",
            Self::Exiting => "exiting",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn from_db(raw: &str) -> Self {
        match raw {
            "pipeline" => Self::Pipeline,
            "in_progress" => Self::InProgress,
            "member" => Self::Member,
            "exiting" => Self::Exiting,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for EntryStatus {
    fn from(value: String) -> Self {
        Self::from_db(&value)
    }
}

impl From<EntryStatus> for String {
    fn from(value: EntryStatus) -> Self {
        value.as_str().to_string()
    }
}

/// One control entry, pre-joined with the display fields of its proposal,
/// consumer unit and generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlEntry {
    pub entry_id:                  EntityId,
    pub proposal_id:               EntityId,
    pub consumer_unit_id:          EntityId,
    pub generator_id:              Option<EntityId>,
    pub status:                    EntryStatus,
    // Display fields, resolved via join.
    pub client_name:               String,
    pub consultant_name:           Option<String>,
    pub unit_number:               String,
    pub unit_nickname:             Option<String>,
    pub generator_number:          Option<String>,
    // Numeric fields.
    pub average_consumption:       f64,
    pub calibrated_consumption:    Option<f64>,
    pub calibration_percent:       Option<f64>,
    pub tariff_discount_percent:   f64,
    pub flag_discount_percent:     f64,
    // Lifetime. `entry_date` is the signature date when present, else intake.
    pub entry_date:                DateTime<Utc>,
    pub signature_date:            Option<DateTime<Utc>>,
    pub in_progress_date:          Option<DateTime<Utc>>,
    pub ownership_date:            Option<DateTime<Utc>>,
    pub generator_allocation_date: Option<DateTime<Utc>>,
    pub created_at:                DateTime<Utc>,
    pub deleted_at:                Option<DateTime<Utc>>,
}

impl ControlEntry {
    pub fn has_generator(&self) -> bool {
        self.generator_id.is_some()
    }
}

/// Input for inserting a control entry into the source tables.
#[derive(Debug, Clone)]
pub struct NewControlEntry {
    pub entry_id:                  EntityId,
    pub proposal_id:               EntityId,
    pub consumer_unit_id:          EntityId,
    pub generator_id:              Option<EntityId>,
    pub status:                    EntryStatus,
    pub average_consumption:       f64,
    pub calibrated_consumption:    Option<f64>,
    pub calibration_percent:       Option<f64>,
    pub tariff_discount_percent:   f64,
    pub flag_discount_percent:     f64,
    pub intake_date:               DateTime<Utc>,
    pub signature_date:            Option<DateTime<Utc>>,
    pub in_progress_date:          Option<DateTime<Utc>>,
    pub ownership_date:            Option<DateTime<Utc>>,
    pub generator_allocation_date: Option<DateTime<Utc>>,
    pub created_at:                DateTime<Utc>,
}

impl NewControlEntry {
    pub fn new(
        entry_id: impl Into<EntityId>,
        proposal_id: impl Into<EntityId>,
        consumer_unit_id: impl Into<EntityId>,
        status: EntryStatus,
        intake_date: DateTime<Utc>,
    ) -> Self {
        Self {
            entry_id: entry_id.into(),
            proposal_id: proposal_id.into(),
            consumer_unit_id: consumer_unit_id.into(),
            generator_id: None,
            status,
            average_consumption: 0.0,
            calibrated_consumption: None,
            calibration_percent: None,
            tariff_discount_percent: 0.0,
            flag_discount_percent: 0.0,
            intake_date,
            signature_date: None,
            in_progress_date: None,
            ownership_date: None,
            generator_allocation_date: None,
            created_at: intake_date,
        }
    }

    pub fn with_generator(mut self, generator_id: impl Into<EntityId>) -> Self {
        self.generator_id = Some(generator_id.into());
        self
    }

    pub fn signed_at(mut self, at: DateTime<Utc>) -> Self {
        self.signature_date = Some(at);
        self
    }

    /// Signature date wins over the intake date.
    pub fn entry_date(&self) -> DateTime<Utc> {
        self.signature_date.unwrap_or(self.intake_date)
    }
}
