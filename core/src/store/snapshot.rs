//! Monthly snapshot persistence — the atomic replace and the read side.

use super::{from_millis, opt_from_millis, to_millis, SnapshotStore};
use crate::{
    aggregate::MonthCounts,
    control_entry::{ControlEntry, EntryStatus},
    error::{SnapshotError, SnapshotResult},
    snapshot::{MonthlySnapshotMember, MonthlySnapshotSummary},
    types::{SnapshotId, YearMonth},
};
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const SUMMARY_COLUMNS: &str = "
    snapshot_id, year_month, total_members, new_this_month, departures_this_month,
    pipeline_count, in_progress_count, member_count, exiting_count,
    with_generator, without_generator, generated_at";

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<MonthlySnapshotSummary> {
    let raw_month: String = row.get(1)?;
    let year_month = YearMonth::parse(&raw_month).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(MonthlySnapshotSummary {
        id: row.get(0)?,
        year_month,
        counts: MonthCounts {
            total_members:         row.get(2)?,
            new_this_month:        row.get(3)?,
            departures_this_month: row.get(4)?,
            pipeline_count:        row.get(5)?,
            in_progress_count:     row.get(6)?,
            member_count:          row.get(7)?,
            exiting_count:         row.get(8)?,
            with_generator:        row.get(9)?,
            without_generator:     row.get(10)?,
        },
        generated_at: from_millis(11, row.get(11)?)?,
    })
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<MonthlySnapshotMember> {
    Ok(MonthlySnapshotMember {
        id:                        row.get(0)?,
        snapshot_id:               row.get(1)?,
        position:                  row.get(2)?,
        entry_id:                  row.get(3)?,
        proposal_id:               row.get(4)?,
        consumer_unit_id:          row.get(5)?,
        generator_id:              row.get(6)?,
        status:                    EntryStatus::from_db(&row.get::<_, String>(7)?),
        client_name:               row.get(8)?,
        consultant_name:           row.get(9)?,
        unit_number:               row.get(10)?,
        unit_nickname:             row.get(11)?,
        generator_number:          row.get(12)?,
        average_consumption:       row.get(13)?,
        calibrated_consumption:    row.get(14)?,
        calibration_percent:       row.get(15)?,
        tariff_discount_percent:   row.get(16)?,
        flag_discount_percent:     row.get(17)?,
        entry_date:                from_millis(18, row.get(18)?)?,
        signature_date:            opt_from_millis(19, row.get(19)?)?,
        in_progress_date:          opt_from_millis(20, row.get(20)?)?,
        ownership_date:            opt_from_millis(21, row.get(21)?)?,
        generator_allocation_date: opt_from_millis(22, row.get(22)?)?,
        deleted_at:                opt_from_millis(23, row.get(23)?)?,
    })
}

impl SnapshotStore {
    // ── Writer ────────────────────────────────────────────────────

    /// Replace the snapshot for `year_month` with a fresh summary and one
    /// member row per entry, in the given order.
    ///
    /// All four steps (delete members, delete summary, insert summary,
    /// insert members) share one IMMEDIATE transaction. Any failure rolls
    /// the month back to whatever was committed before the call.
    pub fn replace_month_snapshot(
        &self,
        year_month: YearMonth,
        counts: &MonthCounts,
        entries: &[ControlEntry],
        generated_at: DateTime<Utc>,
    ) -> SnapshotResult<MonthlySnapshotSummary> {
        let summary = MonthlySnapshotSummary {
            id: Uuid::new_v4().to_string(),
            year_month,
            counts: *counts,
            // Stored at millisecond precision; keep the returned copy identical.
            generated_at: generated_at.trunc_subsecs(3),
        };

        let write = || -> rusqlite::Result<()> {
            let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
            delete_month(&tx, year_month)?;
            insert_summary(&tx, &summary)?;
            for (position, entry) in entries.iter().enumerate() {
                let member = MonthlySnapshotMember::freeze(
                    entry,
                    Uuid::new_v4().to_string(),
                    &summary.id,
                    position as i64,
                );
                insert_member(&tx, &member)?;
            }
            tx.commit()
        };

        write().map_err(|source| SnapshotError::TransactionFailure { year_month, source })?;
        log::debug!(
            "{year_month}: snapshot {} written with {} member(s)",
            summary.id,
            entries.len()
        );
        Ok(summary)
    }

    /// Drop a month's snapshot. Returns false when none existed.
    pub fn delete_month_snapshot(&self, year_month: YearMonth) -> SnapshotResult<bool> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let existed = delete_month(&tx, year_month)?;
        tx.commit()?;
        Ok(existed)
    }

    // ── Read side ─────────────────────────────────────────────────

    /// Every generated month, newest first.
    pub fn snapshot_summaries(&self) -> SnapshotResult<Vec<MonthlySnapshotSummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM monthly_snapshot_summary ORDER BY year_month DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], summary_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn snapshot_summary(
        &self,
        year_month: YearMonth,
    ) -> SnapshotResult<Option<MonthlySnapshotSummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM monthly_snapshot_summary WHERE year_month = ?1"
        );
        let summary = self
            .conn
            .query_row(&sql, params![year_month.to_string()], summary_from_row)
            .optional()?;
        Ok(summary)
    }

    /// Members of a month in resolver order. Empty when the month was never generated.
    pub fn snapshot_members(
        &self,
        year_month: YearMonth,
    ) -> SnapshotResult<Vec<MonthlySnapshotMember>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.member_id, m.snapshot_id, m.position, m.entry_id, m.proposal_id,
                    m.consumer_unit_id, m.generator_id, m.status, m.client_name,
                    m.consultant_name, m.unit_number, m.unit_nickname, m.generator_number,
                    m.average_consumption, m.calibrated_consumption, m.calibration_percent,
                    m.tariff_discount_percent, m.flag_discount_percent, m.entry_date,
                    m.signature_date, m.in_progress_date, m.ownership_date,
                    m.generator_allocation_date, m.deleted_at
             FROM monthly_snapshot_member m
             JOIN monthly_snapshot_summary s ON s.snapshot_id = m.snapshot_id
             WHERE s.year_month = ?1
             ORDER BY m.position ASC",
        )?;
        let rows = stmt.query_map(params![year_month.to_string()], member_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Test / summary helpers ────────────────────────────────────

    /// Member rows across every month, orphans included (for tests).
    pub fn snapshot_member_row_count(&self) -> SnapshotResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM monthly_snapshot_member",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn existing_snapshot_id(
    tx: &Transaction<'_>,
    year_month: YearMonth,
) -> rusqlite::Result<Option<SnapshotId>> {
    tx.query_row(
        "SELECT snapshot_id FROM monthly_snapshot_summary WHERE year_month = ?1",
        params![year_month.to_string()],
        |row| row.get(0),
    )
    .optional()
}

/// Members first, then the summary: the member FK points at the summary.
fn delete_month(tx: &Transaction<'_>, year_month: YearMonth) -> rusqlite::Result<bool> {
    let Some(snapshot_id) = existing_snapshot_id(tx, year_month)? else {
        return Ok(false);
    };
    tx.execute(
        "DELETE FROM monthly_snapshot_member WHERE snapshot_id = ?1",
        params![snapshot_id],
    )?;
    tx.execute(
        "DELETE FROM monthly_snapshot_summary WHERE snapshot_id = ?1",
        params![snapshot_id],
    )?;
    Ok(true)
}

fn insert_summary(tx: &Transaction<'_>, s: &MonthlySnapshotSummary) -> rusqlite::Result<()> {
    let c = &s.counts;
    tx.execute(
        "INSERT INTO monthly_snapshot_summary (
            snapshot_id, year_month, total_members, new_this_month, departures_this_month,
            pipeline_count, in_progress_count, member_count, exiting_count,
            with_generator, without_generator, generated_at
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
        params![
            &s.id,
            s.year_month.to_string(),
            c.total_members,
            c.new_this_month,
            c.departures_this_month,
            c.pipeline_count,
            c.in_progress_count,
            c.member_count,
            c.exiting_count,
            c.with_generator,
            c.without_generator,
            to_millis(s.generated_at),
        ],
    )?;
    Ok(())
}

fn insert_member(tx: &Transaction<'_>, m: &MonthlySnapshotMember) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO monthly_snapshot_member (
            member_id, snapshot_id, position, entry_id, proposal_id, consumer_unit_id,
            generator_id, status, client_name, consultant_name, unit_number,
            unit_nickname, generator_number, average_consumption, calibrated_consumption,
            calibration_percent, tariff_discount_percent, flag_discount_percent,
            entry_date, signature_date, in_progress_date, ownership_date,
            generator_allocation_date, deleted_at
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22,?23,?24)",
        params![
            &m.id,
            &m.snapshot_id,
            m.position,
            &m.entry_id,
            &m.proposal_id,
            &m.consumer_unit_id,
            &m.generator_id,
            m.status.as_str(),
            &m.client_name,
            &m.consultant_name,
            &m.unit_number,
            &m.unit_nickname,
            &m.generator_number,
            m.average_consumption,
            m.calibrated_consumption,
            m.calibration_percent,
            m.tariff_discount_percent,
            m.flag_discount_percent,
            to_millis(m.entry_date),
            m.signature_date.map(to_millis),
            m.in_progress_date.map(to_millis),
            m.ownership_date.map(to_millis),
            m.generator_allocation_date.map(to_millis),
            m.deleted_at.map(to_millis),
        ],
    )?;
    Ok(())
}
