//! Single-month generation: the worked A/B/C scenario, idempotence,
//! aggregate consistency and the consumer read side.

use chrono::{DateTime, TimeZone, Utc};
use membership_snapshot_core::{
    clock::FixedClock,
    control_entry::{EntryStatus, NewControlEntry},
    engine::SnapshotEngine,
    error::SnapshotError,
    types::YearMonth,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
}

fn ym(raw: &str) -> YearMonth {
    YearMonth::parse(raw).unwrap()
}

fn engine() -> SnapshotEngine {
    SnapshotEngine::build_test(Box::new(FixedClock(at(2025, 6, 15)))).expect("test engine")
}

/// A: member since 2025-01-05 with a generator.
/// B: exiting, entered 2025-01-20, deleted 2025-02-10.
/// C: pipeline since 2025-02-01.
fn seed_abc(engine: &SnapshotEngine) {
    let store = engine.store();
    store.insert_generator_unit("gen-1", "GD-0001").unwrap();
    for (id, client) in [("a", "Client A"), ("b", "Client B"), ("c", "Client C")] {
        store.insert_proposal(&format!("p-{id}"), client, Some("Consultant")).unwrap();
        store.insert_consumer_unit(&format!("u-{id}"), &format!("UC-{id}"), None).unwrap();
    }

    let a = NewControlEntry::new("A", "p-a", "u-a", EntryStatus::Member, at(2025, 1, 5))
        .with_generator("gen-1");
    let b = NewControlEntry::new("B", "p-b", "u-b", EntryStatus::Exiting, at(2025, 1, 20));
    let c = NewControlEntry::new("C", "p-c", "u-c", EntryStatus::Pipeline, at(2025, 2, 1));
    for e in [&a, &b, &c] {
        store.insert_control_entry(e).unwrap();
    }
    store.soft_delete_entry("B", at(2025, 2, 10)).unwrap();
}

fn member_ids(engine: &SnapshotEngine, month: &str) -> Vec<String> {
    engine
        .month_detail(ym(month))
        .unwrap()
        .members
        .into_iter()
        .map(|m| m.entry_id)
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn worked_scenario_january() {
    let engine = engine();
    seed_abc(&engine);

    let result = engine.generate(ym("2025-01")).unwrap();
    assert_eq!(result.total, 2);
    assert_eq!(result.new_this_month, 2);
    assert_eq!(result.departures, 0);
    assert_eq!(member_ids(&engine, "2025-01"), ["A", "B"]);

    let summary = engine.month_detail(ym("2025-01")).unwrap().summary;
    assert_eq!(summary.counts.with_generator, 1);
    assert_eq!(summary.counts.without_generator, 1);
    assert_eq!(summary.counts.member_count, 1);
    assert_eq!(summary.counts.exiting_count, 1);
}

#[test]
fn worked_scenario_february_keeps_entry_deleted_mid_month() {
    let engine = engine();
    seed_abc(&engine);

    let result = engine.generate(ym("2025-02")).unwrap();
    assert_eq!(result.total, 3);
    assert_eq!(result.new_this_month, 1);
    assert_eq!(result.departures, 1);
    assert_eq!(member_ids(&engine, "2025-02"), ["A", "B", "C"]);
}

#[test]
fn worked_scenario_march_drops_departed_entry() {
    let engine = engine();
    seed_abc(&engine);

    let result = engine.generate(ym("2025-03")).unwrap();
    assert_eq!(result.total, 2);
    assert_eq!(result.new_this_month, 0);
    assert_eq!(result.departures, 0);
    assert_eq!(member_ids(&engine, "2025-03"), ["A", "C"]);
}

#[test]
fn regenerating_unchanged_month_is_content_identical() {
    let engine = engine();
    seed_abc(&engine);

    engine.generate(ym("2025-03")).unwrap();
    let first = engine.month_detail(ym("2025-03")).unwrap();
    engine.generate(ym("2025-03")).unwrap();
    let second = engine.month_detail(ym("2025-03")).unwrap();

    assert_eq!(first.summary.counts, second.summary.counts);
    assert_eq!(first.members.len(), second.members.len());
    for (a, b) in first.members.iter().zip(&second.members) {
        // Identifiers are minted per run; everything else must match.
        let mut b = b.clone();
        b.id = a.id.clone();
        b.snapshot_id = a.snapshot_id.clone();
        assert_eq!(a, &b);
    }
    assert_eq!(engine.list_months().unwrap().len(), 1);
}

#[test]
fn regeneration_picks_up_source_edits() {
    let engine = engine();
    seed_abc(&engine);

    engine.generate(ym("2025-03")).unwrap();
    engine
        .store()
        .update_entry_status("C", &EntryStatus::Member)
        .unwrap();
    engine.generate(ym("2025-03")).unwrap();

    let counts = engine.month_detail(ym("2025-03")).unwrap().summary.counts;
    assert_eq!(counts.member_count, 2);
    assert_eq!(counts.pipeline_count, 0);
}

#[test]
fn aggregate_invariants_hold_for_every_month() {
    let engine = engine();
    seed_abc(&engine);

    for month in ["2024-12", "2025-01", "2025-02", "2025-03", "2025-06"] {
        engine.generate(ym(month)).unwrap();
        let detail = engine.month_detail(ym(month)).unwrap();
        let c = detail.summary.counts;
        assert_eq!(c.total_members, detail.members.len() as i64, "{month}");
        assert_eq!(c.status_total(), c.total_members, "{month}");
        assert_eq!(c.with_generator + c.without_generator, c.total_members, "{month}");
    }
}

#[test]
fn empty_month_still_produces_a_snapshot() {
    let engine = engine();
    seed_abc(&engine);

    let result = engine.generate(ym("2024-12")).unwrap();
    assert_eq!(result.total, 0);
    let detail = engine.month_detail(ym("2024-12")).unwrap();
    assert!(detail.members.is_empty());
}

#[test]
fn malformed_year_month_is_invalid_argument() {
    let engine = engine();
    for bad in ["2025-3", "2025-13", "March 2025", ""] {
        let err = engine.generate_str(bad).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidArgument(_)), "{bad:?}: {err:?}");
    }
}

#[test]
fn detail_of_ungenerated_month_is_not_found() {
    let engine = engine();
    let err = engine.month_detail(ym("2025-01")).unwrap_err();
    assert!(matches!(err, SnapshotError::NotFound(_)));
}

#[test]
fn list_months_is_newest_first() {
    let engine = engine();
    seed_abc(&engine);
    for month in ["2025-02", "2025-01", "2025-03"] {
        engine.generate(ym(month)).unwrap();
    }
    let months: Vec<String> = engine
        .list_months()
        .unwrap()
        .into_iter()
        .map(|s| s.year_month.to_string())
        .collect();
    assert_eq!(months, ["2025-03", "2025-02", "2025-01"]);
}

#[test]
fn detail_serializes_as_camel_case_json() {
    let engine = engine();
    seed_abc(&engine);
    engine.generate(ym("2025-01")).unwrap();

    let json = serde_json::to_value(engine.month_detail(ym("2025-01")).unwrap()).unwrap();
    assert_eq!(json["summary"]["yearMonth"], "2025-01");
    assert_eq!(json["summary"]["totalMembers"], 2);
    assert_eq!(json["summary"]["withGenerator"], 1);
    assert_eq!(json["members"][0]["entryId"], "A");
    assert_eq!(json["members"][0]["status"], "member");
    assert_eq!(json["members"][0]["generatorNumber"], "GD-0001");
}
