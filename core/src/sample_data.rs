//! Deterministic synthetic control entries for demos and tests.
//!
//! Entries are spread over the 18 months before `anchor`. About a quarter
//! are soft-deleted, always on or after their entry date and never after
//! `anchor`. Seeding the same store twice with the same seed fails on the
//! primary keys; use a different seed to add more.

use crate::{
    control_entry::{EntryStatus, NewControlEntry},
    error::{SnapshotError, SnapshotResult},
    rng::SeededRng,
    store::SnapshotStore,
};
use chrono::{DateTime, Duration, Utc};

const SPREAD_DAYS: u64 = 540;
const GENERATOR_POOL: usize = 5;

const CLIENT_PREFIXES: &[&str] = &[
    "Sunrise", "Valley", "Cedar", "Harbor", "Granite", "Meadow", "Riverside", "Summit",
    "Oakwood", "Bluebird", "Prairie", "Lakeside",
];

const CLIENT_KINDS: &[&str] = &[
    "Bakery", "Dental Clinic", "Hardware", "Pharmacy", "Dairy Farm", "Auto Repair",
    "School", "Supermarket", "Print Shop", "Hotel",
];

const CONSULTANTS: &[&str] = &["Ana Lima", "Bruno Costa", "Carla Souza", "Diego Alves"];

const NICKNAMES: &[&str] = &["main", "warehouse", "annex", "office", "barn"];

/// Weighted status draw: most long-lived entries end up as members.
fn draw_status(rng: &mut SeededRng) -> EntryStatus {
    let roll = rng.next_f64();
    if roll < 0.15 {
        EntryStatus::Pipeline
    } else if roll < 0.35 {
        EntryStatus::InProgress
    } else if roll < 0.85 {
        EntryStatus::Member
    } else {
        EntryStatus::Exiting
    }
}

/// Insert `count` synthetic entries and return their ids in insertion order.
pub fn seed_sample_entries(
    store: &SnapshotStore,
    seed: u64,
    count: usize,
    anchor: DateTime<Utc>,
) -> SnapshotResult<Vec<String>> {
    if count == 0 {
        return Err(SnapshotError::InvalidArgument("count must be > 0".into()));
    }

    let mut rng = SeededRng::new(seed);
    let prefix = format!("s{seed:x}");
    let window_start = anchor - Duration::days(SPREAD_DAYS as i64);

    let generators: Vec<String> = (0..GENERATOR_POOL)
        .map(|g| format!("{prefix}-gen-{g}"))
        .collect();
    for (g, generator_id) in generators.iter().enumerate() {
        store.insert_generator_unit(generator_id, &format!("GD-{seed:x}-{g:02}"))?;
    }

    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let proposal_id = format!("{prefix}-prop-{i:04}");
        let unit_id = format!("{prefix}-unit-{i:04}");
        let entry_id = format!("{prefix}-entry-{i:04}");

        let client = format!("{} {}", rng.pick(CLIENT_PREFIXES), rng.pick(CLIENT_KINDS));
        let consultant = rng.chance(0.8).then(|| *rng.pick(CONSULTANTS));
        store.insert_proposal(&proposal_id, &client, consultant)?;

        let nickname = rng.chance(0.5).then(|| *rng.pick(NICKNAMES));
        store.insert_consumer_unit(&unit_id, &format!("UC-{seed:x}-{i:05}"), nickname)?;

        let intake = window_start
            + Duration::days(rng.next_u64_below(SPREAD_DAYS) as i64)
            + Duration::minutes(rng.next_u64_below(24 * 60) as i64);
        let mut entry = NewControlEntry::new(
            entry_id.clone(),
            proposal_id,
            unit_id,
            draw_status(&mut rng),
            intake,
        );
        entry.average_consumption = rng.between(150.0, 4_000.0).round();
        entry.tariff_discount_percent = *rng.pick(&[10.0, 12.0, 15.0, 18.0, 20.0]);
        entry.flag_discount_percent = *rng.pick(&[0.0, 0.0, 5.0]);

        if rng.chance(0.7) {
            let signed = intake + Duration::days(rng.next_u64_below(21) as i64);
            entry.signature_date = Some(signed.min(anchor));
        }
        if rng.chance(0.4) {
            entry.generator_id = Some(rng.pick(&generators).clone());
            entry.generator_allocation_date = Some(entry.entry_date());
        }
        if rng.chance(0.5) {
            entry.calibration_percent = Some(rng.between(-10.0, 10.0).round());
            entry.calibrated_consumption = entry
                .calibration_percent
                .map(|pct| (entry.average_consumption * (1.0 + pct / 100.0)).round());
        }
        store.insert_control_entry(&entry)?;

        if rng.chance(0.25) {
            let entered = entry.entry_date();
            let room = (anchor - entered).num_days().max(0) as u64;
            let deleted = entered + Duration::days(rng.next_u64_below(room + 1) as i64);
            store.soft_delete_entry(&entry_id, deleted.min(anchor).max(entered))?;
        }

        ids.push(entry_id);
    }

    log::info!("seeded {count} sample entries (seed {seed:#x})");
    Ok(ids)
}
