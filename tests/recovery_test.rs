//! Integration tests for crash recovery
//!
//! Crashes are simulated by leaving the artifact files in the state a save
//! would have left them in when interrupted at each step.

use durable_clock::codec;
use durable_clock::{
    Clock, ClockIdentity, LifecycleState, PersistedRecord, PersistentStore, StoreError,
};
use std::fs;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const MILLI: i64 = 1_000_000;
const SECOND: i64 = 1_000 * MILLI;

fn setup() -> (TempDir, PersistentStore, ClockIdentity) {
    let temp = TempDir::new().unwrap();
    let store = PersistentStore::new(temp.path()).with_durable_writes(false);
    (temp, store, ClockIdentity::generate())
}

fn record(correction: i64, state: LifecycleState) -> PersistedRecord {
    PersistedRecord {
        correction,
        wall_clock_save_time: durable_clock::models::wall_clock_nanos(),
        state,
    }
}

fn write_record(path: &std::path::Path, record: &PersistedRecord) {
    fs::write(path, codec::encode(record)).unwrap();
}

// =========================================================================
// Interrupted saves
// =========================================================================

#[test]
fn test_crash_after_staging_renamed_before_backup_deleted() {
    let (_temp, store, id) = setup();
    let paths = store.paths(&id);

    // old record rotated to backup, new record already in primary
    write_record(&paths.backup, &record(SECOND, LifecycleState::Paused));
    write_record(&paths.primary, &record(2 * SECOND, LifecycleState::Paused));

    let snapshot = store.load(&id).unwrap();
    assert_eq!(snapshot.state, LifecycleState::Paused);
    assert_eq!(snapshot.correction, 2 * SECOND);
}

#[test]
fn test_crash_after_primary_moved_before_staging_renamed() {
    let (_temp, store, id) = setup();
    let paths = store.paths(&id);

    // primary gone, previous record in backup, half-written staging
    write_record(&paths.backup, &record(3 * SECOND, LifecycleState::Stopped));
    fs::write(&paths.staging, [0xAB; 7]).unwrap();

    let snapshot = store.load(&id).unwrap();
    assert_eq!(snapshot.state, LifecycleState::Stopped);
    assert_eq!(snapshot.correction, 3 * SECOND);
    assert!(paths.primary.exists());
    assert!(!paths.backup.exists());
}

#[test]
fn test_crash_while_writing_staging_keeps_primary() {
    let (_temp, store, id) = setup();
    let paths = store.paths(&id);

    write_record(&paths.primary, &record(4 * SECOND, LifecycleState::Paused));
    fs::write(&paths.staging, [0u8; 12]).unwrap();

    let snapshot = store.load(&id).unwrap();
    assert_eq!(snapshot.correction, 4 * SECOND);

    // Next save overwrites the stale staging file
    store.save(&id, &snapshot).unwrap();
    assert!(!paths.staging.exists());
    assert_eq!(store.peek(&id).unwrap().unwrap().correction, 4 * SECOND);
}

// =========================================================================
// Corruption
// =========================================================================

#[test]
fn test_corrupt_state_fails_construction_then_starts_fresh() {
    let (temp, store, id) = setup();
    let paths = store.paths(&id);

    let mut bytes = codec::encode(&record(5 * SECOND, LifecycleState::Paused));
    bytes[10] ^= 0x08;
    fs::write(&paths.primary, bytes).unwrap();

    let err = Clock::open_in(temp.path(), id).unwrap_err();
    assert!(err.is_recovery());
    assert!(!err.is_invalid_state_tag());
    assert!(!paths.primary.exists());

    let clock = Clock::open_in(temp.path(), id).unwrap();
    assert_eq!(clock.state(), LifecycleState::New);
    assert_eq!(clock.elapsed(), 0);
    clock.destroy().unwrap();
}

#[test]
fn test_unknown_state_tag_fails_construction() {
    let (temp, store, id) = setup();
    let paths = store.paths(&id);

    // Valid checksum over an out-of-range tag
    let mut bytes = codec::encode(&record(0, LifecycleState::New));
    bytes[16..20].copy_from_slice(&9i32.to_be_bytes());
    let checksum = codec::checksum(&bytes[..codec::PAYLOAD_LEN]);
    bytes[20..24].copy_from_slice(&checksum.to_be_bytes());
    fs::write(&paths.primary, bytes).unwrap();

    let err = Clock::open_in(temp.path(), id).unwrap_err();
    assert!(err.is_recovery());
    assert!(err.is_invalid_state_tag());
    assert!(!paths.primary.exists());
}

#[test]
fn test_empty_primary_is_reported_as_truncated() {
    let (_temp, store, id) = setup();
    fs::write(store.paths(&id).primary, b"").unwrap();

    let err = store.load(&id).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Decode(durable_clock::DecodeError::Truncated(0))
    ));
}

// =========================================================================
// Restart accounting
// =========================================================================

#[test]
fn test_running_clock_is_credited_with_downtime() {
    let (temp, store, id) = setup();
    let now = durable_clock::models::wall_clock_nanos();
    write_record(
        &store.paths(&id).primary,
        &PersistedRecord {
            correction: 2 * SECOND,
            wall_clock_save_time: now - 3 * SECOND,
            state: LifecycleState::Running,
        },
    );

    let clock = Clock::open_in(temp.path(), id).unwrap();
    let elapsed = clock.elapsed();
    assert_eq!(clock.state(), LifecycleState::Running);
    assert!(elapsed >= 5 * SECOND, "elapsed {} below 5s", elapsed);
    assert!(elapsed < 6 * SECOND, "elapsed {} above 6s", elapsed);
    clock.destroy().unwrap();
}

#[test]
fn test_paused_clock_is_not_credited_with_downtime() {
    let (temp, store, id) = setup();
    let now = durable_clock::models::wall_clock_nanos();
    write_record(
        &store.paths(&id).primary,
        &PersistedRecord {
            correction: 2 * SECOND,
            wall_clock_save_time: now - 60 * SECOND,
            state: LifecycleState::Paused,
        },
    );

    let clock = Clock::open_in(temp.path(), id).unwrap();
    assert_eq!(clock.state(), LifecycleState::Paused);
    assert_eq!(clock.elapsed(), 2 * SECOND);
    clock.destroy().unwrap();
}

#[test]
fn test_reopen_after_drop_continues_running_time() {
    let temp = TempDir::new().unwrap();
    let id = ClockIdentity::generate();

    let clock = Clock::open_in(temp.path(), id).unwrap();
    clock.start().unwrap();
    thread::sleep(Duration::from_millis(150));
    let before = clock.elapsed();
    // Dropping stops the worker but leaves the artifacts, like a killed process
    drop(clock);

    let gap = Duration::from_millis(200);
    let started = std::time::Instant::now();
    thread::sleep(gap);

    let clock = Clock::open_in(temp.path(), id).unwrap();
    let after = clock.elapsed();
    let measured = started.elapsed().as_nanos() as i64;

    assert_eq!(clock.state(), LifecycleState::Running);
    // Allow for wall-clock resolution around the save and reopen
    assert!(after >= before + 200 * MILLI - 20 * MILLI, "after {} before {}", after, before);
    assert!(after <= before + measured + 200 * MILLI, "after {} before {}", after, before);
    clock.destroy().unwrap();
}

#[test]
fn test_close_then_reopen_preserves_paused_value() {
    let temp = TempDir::new().unwrap();
    let id = ClockIdentity::generate();

    let clock = Clock::open_in(temp.path(), id).unwrap();
    clock.start().unwrap();
    thread::sleep(Duration::from_millis(60));
    clock.pause().unwrap();
    let frozen = clock.elapsed();
    clock.close().unwrap();

    let clock = Clock::open_in(temp.path(), id).unwrap();
    assert_eq!(clock.state(), LifecycleState::Paused);
    assert_eq!(clock.elapsed(), frozen);
    clock.destroy().unwrap();
}
