//! Parallel generation of different months over one file database.

use chrono::{FixedOffset, TimeZone, Utc};
use membership_snapshot_core::{
    clock::FixedClock,
    config::EngineConfig,
    engine::SnapshotEngine,
    sample_data::seed_sample_entries,
    types::YearMonth,
};
use std::thread;

#[test]
fn disjoint_months_generate_concurrently() {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = dir.path().join("snapshots.db");
    let config = EngineConfig::for_database(db_path.to_string_lossy());
    let now = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();

    let engine = SnapshotEngine::from_config_with_clock(&config, Box::new(FixedClock(now))).unwrap();
    seed_sample_entries(engine.store(), 42, 150, now).unwrap();

    let months: Vec<YearMonth> = YearMonth::parse("2024-07")
        .unwrap()
        .through(YearMonth::parse("2025-06").unwrap());

    let handles: Vec<_> = months
        .chunks(3)
        .map(|chunk| {
            let store = engine.store().reopen().unwrap();
            let chunk = chunk.to_vec();
            thread::spawn(move || {
                let worker = SnapshotEngine::new(
                    store,
                    Box::new(FixedClock(now)),
                    FixedOffset::east_opt(0).unwrap(),
                );
                chunk
                    .into_iter()
                    .map(|m| worker.generate(m).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut parallel: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().expect("worker panicked"))
        .collect();
    parallel.sort_by_key(|r| r.year_month);

    assert_eq!(engine.list_months().unwrap().len(), months.len());

    // A sequential rerun over the same source must agree month for month.
    let sequential = engine
        .generate_range(months[0], *months.last().unwrap())
        .unwrap();
    assert_eq!(parallel, sequential);
}

#[test]
fn same_month_regenerated_from_two_connections_keeps_one_snapshot() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = EngineConfig::for_database(dir.path().join("same.db").to_string_lossy());
    let now = Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap();

    let engine = SnapshotEngine::from_config_with_clock(&config, Box::new(FixedClock(now))).unwrap();
    seed_sample_entries(engine.store(), 7, 40, now).unwrap();
    let march = YearMonth::parse("2025-03").unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let store = engine.store().reopen().unwrap();
            thread::spawn(move || {
                let worker = SnapshotEngine::new(
                    store,
                    Box::new(FixedClock(now)),
                    FixedOffset::east_opt(0).unwrap(),
                );
                for _ in 0..5 {
                    worker.generate(march).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("worker panicked");
    }

    // Last writer wins, but the month is never duplicated or left half-written.
    let detail = engine.month_detail(march).unwrap();
    assert_eq!(engine.list_months().unwrap().len(), 1);
    assert_eq!(detail.summary.counts.total_members, detail.members.len() as i64);
    assert_eq!(
        engine.store().snapshot_member_row_count().unwrap(),
        detail.members.len() as i64
    );
}
