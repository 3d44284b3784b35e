//! Source-side queries: control entries and their joined display records.

use super::{from_millis, opt_from_millis, to_millis, SnapshotStore};
use crate::{
    control_entry::{ControlEntry, EntryStatus, NewControlEntry},
    error::{SnapshotError, SnapshotResult},
    types::MonthWindow,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

const ENTRY_COLUMNS: &str = "
    ce.entry_id, ce.proposal_id, ce.consumer_unit_id, ce.generator_id, ce.status,
    p.client_name, p.consultant_name, cu.unit_number, cu.nickname, g.generator_number,
    ce.average_consumption, ce.calibrated_consumption, ce.calibration_percent,
    ce.tariff_discount_percent, ce.flag_discount_percent,
    COALESCE(ce.signature_date, ce.intake_date),
    ce.signature_date, ce.in_progress_date, ce.ownership_date,
    ce.generator_allocation_date, ce.created_at, ce.deleted_at";

const ENTRY_JOINS: &str = "
    FROM control_entry ce
    JOIN proposal p       ON p.proposal_id = ce.proposal_id
    JOIN consumer_unit cu ON cu.unit_id = ce.consumer_unit_id
    LEFT JOIN generator_unit g ON g.generator_id = ce.generator_id";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<ControlEntry> {
    Ok(ControlEntry {
        entry_id:                  row.get(0)?,
        proposal_id:               row.get(1)?,
        consumer_unit_id:          row.get(2)?,
        generator_id:              row.get(3)?,
        status:                    EntryStatus::from_db(&row.get::<_, String>(4)?),
        client_name:               row.get(5)?,
        consultant_name:           row.get(6)?,
        unit_number:               row.get(7)?,
        unit_nickname:             row.get(8)?,
        generator_number:          row.get(9)?,
        average_consumption:       row.get(10)?,
        calibrated_consumption:    row.get(11)?,
        calibration_percent:       row.get(12)?,
        tariff_discount_percent:   row.get(13)?,
        flag_discount_percent:     row.get(14)?,
        entry_date:                from_millis(15, row.get(15)?)?,
        signature_date:            opt_from_millis(16, row.get(16)?)?,
        in_progress_date:          opt_from_millis(17, row.get(17)?)?,
        ownership_date:            opt_from_millis(18, row.get(18)?)?,
        generator_allocation_date: opt_from_millis(19, row.get(19)?)?,
        created_at:                from_millis(20, row.get(20)?)?,
        deleted_at:                opt_from_millis(21, row.get(21)?)?,
    })
}

impl SnapshotStore {
    // ── Reference records ─────────────────────────────────────────

    pub fn insert_proposal(
        &self,
        proposal_id: &str,
        client_name: &str,
        consultant_name: Option<&str>,
    ) -> SnapshotResult<()> {
        self.conn.execute(
            "INSERT INTO proposal (proposal_id, client_name, consultant_name)
             VALUES (?1, ?2, ?3)",
            params![proposal_id, client_name, consultant_name],
        )?;
        Ok(())
    }

    pub fn insert_consumer_unit(
        &self,
        unit_id: &str,
        unit_number: &str,
        nickname: Option<&str>,
    ) -> SnapshotResult<()> {
        self.conn.execute(
            "INSERT INTO consumer_unit (unit_id, unit_number, nickname) VALUES (?1, ?2, ?3)",
            params![unit_id, unit_number, nickname],
        )?;
        Ok(())
    }

    pub fn insert_generator_unit(
        &self,
        generator_id: &str,
        generator_number: &str,
    ) -> SnapshotResult<()> {
        self.conn.execute(
            "INSERT INTO generator_unit (generator_id, generator_number) VALUES (?1, ?2)",
            params![generator_id, generator_number],
        )?;
        Ok(())
    }

    // ── Control entries ───────────────────────────────────────────

    pub fn insert_control_entry(&self, e: &NewControlEntry) -> SnapshotResult<()> {
        self.conn.execute(
            "INSERT INTO control_entry (
                entry_id, proposal_id, consumer_unit_id, generator_id, status,
                average_consumption, calibrated_consumption, calibration_percent,
                tariff_discount_percent, flag_discount_percent,
                intake_date, signature_date, in_progress_date, ownership_date,
                generator_allocation_date, created_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)",
            params![
                &e.entry_id,
                &e.proposal_id,
                &e.consumer_unit_id,
                &e.generator_id,
                e.status.as_str(),
                e.average_consumption,
                e.calibrated_consumption,
                e.calibration_percent,
                e.tariff_discount_percent,
                e.flag_discount_percent,
                to_millis(e.intake_date),
                e.signature_date.map(to_millis),
                e.in_progress_date.map(to_millis),
                e.ownership_date.map(to_millis),
                e.generator_allocation_date.map(to_millis),
                to_millis(e.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn update_entry_status(&self, entry_id: &str, status: &EntryStatus) -> SnapshotResult<()> {
        let changed = self.conn.execute(
            "UPDATE control_entry SET status = ?1 WHERE entry_id = ?2",
            params![status.as_str(), entry_id],
        )?;
        if changed == 0 {
            return Err(SnapshotError::NotFound(format!("control entry {entry_id}")));
        }
        Ok(())
    }

    /// Mark an entry inactive at `at`. The deletion may not precede the entry date.
    pub fn soft_delete_entry(&self, entry_id: &str, at: DateTime<Utc>) -> SnapshotResult<()> {
        let row: Option<(i64, Option<i64>)> = self
            .conn
            .query_row(
                "SELECT COALESCE(signature_date, intake_date), deleted_at
                 FROM control_entry WHERE entry_id = ?1",
                params![entry_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (entry_date, deleted_at) =
            row.ok_or_else(|| SnapshotError::NotFound(format!("control entry {entry_id}")))?;
        if deleted_at.is_some() {
            return Err(SnapshotError::InvalidArgument(format!(
                "control entry {entry_id} is already deleted"
            )));
        }
        if to_millis(at) < entry_date {
            return Err(SnapshotError::InvalidArgument(format!(
                "deletion at {at} precedes entry date of {entry_id}"
            )));
        }

        self.conn.execute(
            "UPDATE control_entry SET deleted_at = ?1 WHERE entry_id = ?2",
            params![to_millis(at), entry_id],
        )?;
        Ok(())
    }

    /// Entries whose lifetime `[entry_date, deleted_at ?? +inf)` overlaps
    /// `window`, ordered by client name, then unit number.
    pub fn entries_overlapping(&self, window: &MonthWindow) -> SnapshotResult<Vec<ControlEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} {ENTRY_JOINS}
             WHERE COALESCE(ce.signature_date, ce.intake_date) <= ?2
               AND (ce.deleted_at IS NULL OR ce.deleted_at >= ?1)
             ORDER BY p.client_name ASC, cu.unit_number ASC, ce.entry_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![to_millis(window.start), to_millis(window.end)],
            entry_from_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn control_entry(&self, entry_id: &str) -> SnapshotResult<Option<ControlEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} {ENTRY_JOINS} WHERE ce.entry_id = ?1");
        let entry = self
            .conn
            .query_row(&sql, params![entry_id], entry_from_row)
            .optional()?;
        Ok(entry)
    }

    /// Earliest entry date across every entry, deleted ones included.
    pub fn earliest_entry_date(&self) -> SnapshotResult<Option<DateTime<Utc>>> {
        let earliest: Option<i64> = self.conn.query_row(
            "SELECT MIN(COALESCE(signature_date, intake_date)) FROM control_entry",
            [],
            |row| row.get(0),
        )?;
        Ok(opt_from_millis(0, earliest)?)
    }

    pub fn control_entry_count(&self) -> SnapshotResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM control_entry",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
