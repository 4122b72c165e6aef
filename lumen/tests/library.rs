use lumen::components::straight::{Straight, StraightParams};
use lumen::error::ErrorSource;
use lumen::library::{BatchStatus, CompareStatus, LockOptions, Locker};
use lumen::registry::ComponentRegistry;
use tempdir::TempDir;

mod common;
use common::setup_ctx;

fn straight_registry(width: f64) -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry
        .register::<Straight>(
            "straight",
            StraightParams {
                length: 10.0,
                width,
            },
        )
        .unwrap();
    registry
}

fn locker_in(dir: &TempDir, registry: ComponentRegistry) -> Locker {
    Locker::new(
        registry,
        dir.path().join("gdslib"),
        dir.path().join("gdslib_test"),
    )
}

#[test]
fn test_lock_writes_entry_tuple() {
    let dir = TempDir::new("test_lock").unwrap();
    let ctx = setup_ctx();
    let locker = locker_in(&dir, straight_registry(0.5));

    locker.lock(&ctx, "straight").unwrap();

    let lib = dir.path().join("gdslib");
    assert!(lib.join("straight.gds").is_file());
    assert!(lib.join("straight.json").is_file());
    assert!(lib.join("straight.ports").is_file());

    let ports = std::fs::read_to_string(lib.join("straight.ports")).unwrap();
    let lines: Vec<&str> = ports.lines().collect();
    assert_eq!(lines, vec!["E0 10000 0 500 0", "W0 0 0 500 180"]);

    let settings: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(lib.join("straight.json")).unwrap())
            .unwrap();
    assert_eq!(settings["component"], "straight");
    assert_eq!(settings["settings"]["width"], 0.5);
}

#[test]
fn test_compare_writes_new_reference_without_failing() {
    let dir = TempDir::new("test_compare_new").unwrap();
    let ctx = setup_ctx();
    let locker = locker_in(&dir, straight_registry(0.5));

    // First comparison: no reference exists yet.
    let status = locker.compare(&ctx, "straight").unwrap();
    assert!(matches!(status, CompareStatus::New));
    assert!(status.is_ok());
    assert!(dir.path().join("gdslib/straight.gds").is_file());

    // Second comparison: the reference just written must match.
    let status = locker.compare(&ctx, "straight").unwrap();
    assert!(matches!(status, CompareStatus::Match));
}

#[test]
fn test_compare_detects_parameter_drift() {
    let dir = TempDir::new("test_compare_drift").unwrap();

    let ctx = setup_ctx();
    let locker = locker_in(&dir, straight_registry(0.5));
    locker.lock(&ctx, "straight").unwrap();

    // The same component type, re-registered with a different width.
    let ctx = setup_ctx();
    let locker = locker_in(&dir, straight_registry(0.6));
    let status = locker.compare(&ctx, "straight").unwrap();
    let CompareStatus::Mismatch { diff } = status else {
        panic!("expected a mismatch, got {status:?}");
    };
    let rendered = diff.to_string();
    assert!(rendered.contains("width"), "diff should name the changed key");
    assert!(rendered.contains("0.5") && rendered.contains("0.6"));
}

#[test]
fn test_lock_changed_leaves_unchanged_entries_untouched() {
    let dir = TempDir::new("test_lock_changed").unwrap();
    let ctx = setup_ctx();
    let locker = locker_in(&dir, straight_registry(0.5));
    locker.lock(&ctx, "straight").unwrap();

    let gds_path = dir.path().join("gdslib/straight.gds");
    let before = std::fs::read(&gds_path).unwrap();

    // Nothing changed: the reference file must not be rewritten. A rewrite
    // would change the embedded GDS timestamps even for identical geometry.
    let records = locker.lock_changed(&ctx);
    assert_eq!(records.len(), 1);
    assert!(matches!(records[0].status, BatchStatus::Unchanged));
    let after = std::fs::read(&gds_path).unwrap();
    assert_eq!(before, after, "unchanged entry was rewritten");

    // A parameter change must re-lock the entry.
    let ctx = setup_ctx();
    let locker = locker_in(&dir, straight_registry(0.6));
    let records = locker.lock_changed(&ctx);
    assert!(matches!(records[0].status, BatchStatus::Changed { .. }));
    let relocked = std::fs::read(&gds_path).unwrap();
    assert_ne!(before, relocked, "changed entry was not re-locked");

    // After re-locking, the library matches again.
    let status = locker.compare(&ctx, "straight").unwrap();
    assert!(matches!(status, CompareStatus::Match));
}

#[test]
fn test_report_changed_does_not_mutate_library() {
    let dir = TempDir::new("test_report").unwrap();
    let ctx = setup_ctx();
    let locker = locker_in(&dir, straight_registry(0.5));
    locker.lock(&ctx, "straight").unwrap();
    let gds_path = dir.path().join("gdslib/straight.gds");
    let before = std::fs::read(&gds_path).unwrap();

    let ctx = setup_ctx();
    let locker = locker_in(&dir, straight_registry(0.6));
    let records = locker.report_changed(&ctx);
    assert!(matches!(records[0].status, BatchStatus::Changed { .. }));

    let after = std::fs::read(&gds_path).unwrap();
    assert_eq!(before, after, "report_changed must not rewrite the library");
}

#[test]
fn test_assert_unchanged() {
    let dir = TempDir::new("test_assert").unwrap();
    let ctx = setup_ctx();
    let locker = locker_in(&dir, straight_registry(0.5));
    locker.lock(&ctx, "straight").unwrap();
    locker.assert_unchanged(&ctx).unwrap();

    let ctx = setup_ctx();
    let locker = locker_in(&dir, straight_registry(0.6));
    let err = locker.assert_unchanged(&ctx).unwrap_err();
    assert!(matches!(
        err.source(),
        ErrorSource::ReferenceMismatch(name) if name.as_str() == "straight"
    ));
}

#[test]
fn test_batch_isolates_build_failures() {
    let dir = TempDir::new("test_batch_isolation").unwrap();
    let ctx = setup_ctx();

    let mut registry = ComponentRegistry::new();
    registry
        .register::<Straight>(
            "bad_straight",
            StraightParams {
                length: -1.0,
                width: 0.5,
            },
        )
        .unwrap();
    registry
        .register::<Straight>("good_straight", StraightParams::default())
        .unwrap();
    let locker = locker_in(&dir, registry);

    let records = locker.report_changed(&ctx);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].component_type, "bad_straight");
    assert!(matches!(records[0].status, BatchStatus::Failed(_)));
    // The bad entry does not stop the good one from being processed.
    assert_eq!(records[1].component_type, "good_straight");
    assert!(matches!(records[1].status, BatchStatus::New));
}

#[test]
fn test_build_failure_reports_registry_context() {
    let dir = TempDir::new("test_build_error").unwrap();
    let ctx = setup_ctx();

    let mut registry = ComponentRegistry::new();
    registry
        .register::<Straight>(
            "bad_straight",
            StraightParams {
                length: -1.0,
                width: 0.5,
            },
        )
        .unwrap();
    let locker = locker_in(&dir, registry);

    let err = locker.lock(&ctx, "bad_straight").unwrap_err();
    let message = format!("{err}");
    assert!(message.contains("bad_straight"));
    assert!(
        message.contains("registry contains"),
        "build errors should list the registry contents: {message}"
    );
}

#[test]
fn test_overlay_written_on_mismatch() {
    let dir = TempDir::new("test_overlay").unwrap();
    let ctx = setup_ctx();
    let locker = locker_in(&dir, straight_registry(0.5));
    locker.lock(&ctx, "straight").unwrap();

    let ctx = setup_ctx();
    let locker = locker_in(&dir, straight_registry(0.6)).with_options(LockOptions {
        write_overlay: true,
        ..Default::default()
    });
    let status = locker.compare(&ctx, "straight").unwrap();
    assert!(matches!(status, CompareStatus::Mismatch { .. }));
    assert!(dir.path().join("gdslib_test/straight_diff.gds").is_file());
}

#[test]
fn test_promote_copies_the_full_tuple() {
    let dir = TempDir::new("test_promote").unwrap();
    let ctx = setup_ctx();
    let locker = locker_in(&dir, straight_registry(0.5));

    // Build into the test directory only (no reference yet means compare
    // also locks, so build the test entry via compare then delete the lib).
    locker.compare(&ctx, "straight").unwrap();
    std::fs::remove_dir_all(dir.path().join("gdslib")).unwrap();

    locker.promote("straight").unwrap();
    let lib = dir.path().join("gdslib");
    assert!(lib.join("straight.gds").is_file());
    assert!(lib.join("straight.json").is_file());
    assert!(lib.join("straight.ports").is_file());
}
