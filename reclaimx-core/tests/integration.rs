//! Integration tests for the reclaimx record store and services
//!
//! Every test works against real CSV tables in a fresh temp directory, so
//! durability, locking and recovery run through the same code path a
//! frontend process would use.

use reclaimx_core::store::RecordStore;
use reclaimx_core::{
    CsvStore, Error, Reclaim, Report, ReportLedger, ReportStatus, Resource, Summary, User,
    UserDirectory,
};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn open_app(dir: &Path) -> Reclaim {
    reclaimx_core::logging::init_test();
    Reclaim::open_dir(dir).expect("failed to open tables")
}

// ============================================
// Scenarios
// ============================================

#[test]
fn test_register_and_authenticate() {
    let dir = TempDir::new().unwrap();
    let app = open_app(dir.path());

    app.register("Ann", "111", "pw").unwrap();

    let session = app.login("111", "pw").expect("login should succeed");
    assert_eq!(session.name, "Ann");

    assert!(matches!(
        app.login("111", "wrong"),
        Err(Error::InvalidCredentials)
    ));
}

#[test]
fn test_water_report_lifecycle_in_analytics() {
    let dir = TempDir::new().unwrap();
    let app = open_app(dir.path());
    let session = app.register("Ann", "111", "pw").unwrap();

    let report = app
        .submit_report(&session, Resource::Water, "Hostel B", "tap left running")
        .unwrap();
    assert_eq!(
        app.analytics().summarize(Resource::Water).unwrap(),
        Summary {
            total: 1,
            resolved: 0,
            pending: 1
        }
    );

    app.set_status(report.id, ReportStatus::Resolved).unwrap();
    assert_eq!(
        app.analytics().summarize(Resource::Water).unwrap(),
        Summary {
            total: 1,
            resolved: 1,
            pending: 0
        }
    );
    assert_eq!(
        app.analytics().summarize(Resource::Electricity).unwrap(),
        Summary::default()
    );
}

// ============================================
// Persistence
// ============================================

#[test]
fn test_reports_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let created = {
        let app = open_app(dir.path());
        let session = app.register("Ann", "111", "pw").unwrap();
        app.submit_report(&session, Resource::Infrastructure, "Library", "door, \"stuck\"\nopen")
            .unwrap()
    };

    let app = open_app(dir.path());
    let listed = app
        .reports()
        .list_by_resource(Resource::Infrastructure)
        .unwrap();
    assert_eq!(listed, vec![created]);
    assert!(app.login("111", "pw").is_ok());
}

#[test]
fn test_header_row_names_columns() {
    let dir = TempDir::new().unwrap();
    open_app(dir.path());

    let users = fs::read_to_string(dir.path().join("users.csv")).unwrap();
    assert_eq!(users, "\"name\",\"phone\",\"password\"\n");

    let reports = fs::read_to_string(dir.path().join("reports.csv")).unwrap();
    assert_eq!(
        reports,
        "\"id\",\"reporterPhone\",\"resource\",\"location\",\"description\",\"status\",\"createdAt\"\n"
    );
}

#[test]
fn test_plaintext_password_never_written() {
    let dir = TempDir::new().unwrap();
    let app = open_app(dir.path());
    app.register("Ann", "111", "hunter2-plaintext").unwrap();

    let users = fs::read_to_string(dir.path().join("users.csv")).unwrap();
    assert!(!users.contains("hunter2-plaintext"));
    assert!(users.contains("$argon2id$"));
}

#[test]
fn test_load_all_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let ledger = ReportLedger::open(dir.path().join("reports.csv")).unwrap();
    for location in ["A", "B", "C"] {
        ledger.create("111", Resource::Water, location, "").unwrap();
    }

    let store = CsvStore::<Report>::open(dir.path().join("reports.csv")).unwrap();
    let first = store.load_all().unwrap();
    let second = store.load_all().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_one_corrupt_row_among_ten() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reports.csv");
    {
        let ledger = ReportLedger::open(&path).unwrap();
        for i in 0..9 {
            ledger
                .create("111", Resource::Electricity, &format!("Room {i}"), "")
                .unwrap();
        }
    }

    // Splice a corrupt row into the middle of the file.
    let content = fs::read_to_string(&path).unwrap();
    let mut lines: Vec<&str> = content.lines().collect();
    lines.insert(5, "\"not-a-number\",\"111\",\"Electricity\",\"X\",\"\",\"Pending\",\"garbage\"");
    fs::write(&path, lines.join("\n") + "\n").unwrap();

    let store = CsvStore::<Report>::open(&path).unwrap();
    let scan = store.scan().unwrap();
    assert_eq!(scan.records.len(), 9);
    assert_eq!(scan.skipped.len(), 1);
    assert_eq!(scan.skipped[0].line, 6);

    let ledger = ReportLedger::with_store(store);
    assert_eq!(
        ledger.list_by_resource(Resource::Electricity).unwrap().len(),
        9
    );
}

#[test]
fn test_status_update_keeps_corrupt_row() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reports.csv");
    let ledger = ReportLedger::open(&path).unwrap();
    let report = ledger.create("111", Resource::Water, "A", "").unwrap();

    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str("\"broken\"\n");
    fs::write(&path, content).unwrap();

    ledger.update_status(report.id, ReportStatus::Resolved).unwrap();
    assert!(fs::read_to_string(&path).unwrap().ends_with("\"broken\"\n"));

    let store = CsvStore::<Report>::open(&path).unwrap();
    let scan = store.scan().unwrap();
    assert_eq!(scan.skipped.len(), 1);
    assert_eq!(scan.records[0].status, ReportStatus::Resolved);
}

#[test]
fn test_unclosed_quote_row_hides_no_reports() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reports.csv");
    let ledger = ReportLedger::open(&path).unwrap();
    let created: Vec<Report> = (0..9)
        .map(|i| {
            ledger
                .create("111", Resource::Water, &format!("Tap {i}"), "")
                .unwrap()
        })
        .collect();

    let corrupt = "\"5\",\"111\",\"Water\",\"X";
    let content = fs::read_to_string(&path).unwrap();
    let mut lines: Vec<&str> = content.lines().collect();
    lines.insert(5, corrupt);
    fs::write(&path, lines.join("\n") + "\n").unwrap();

    let scan = CsvStore::<Report>::open(&path).unwrap().scan().unwrap();
    assert_eq!(scan.records, created);
    assert_eq!(scan.skipped.len(), 1);
    assert_eq!(scan.skipped[0].line, 6);

    // The report right after the corrupt line survives a rewrite.
    let neighbour = created[4].id;
    ledger.update_status(neighbour, ReportStatus::Resolved).unwrap();

    let after = ledger.list().unwrap();
    assert_eq!(after.len(), 9);
    for (before, now) in created.iter().zip(&after) {
        if before.id == neighbour {
            assert_eq!(now.status, ReportStatus::Resolved);
        } else {
            assert_eq!(now, before);
        }
    }
    assert!(fs::read_to_string(&path)
        .unwrap()
        .lines()
        .any(|line| line == corrupt));
}

#[test]
fn test_update_status_changes_only_target() {
    let dir = TempDir::new().unwrap();
    let app = open_app(dir.path());
    let session = app.register("Ann", "111", "pw").unwrap();

    let reports: Vec<Report> = (0..5)
        .map(|i| {
            app.submit_report(&session, Resource::Water, &format!("Tap {i}"), "")
                .unwrap()
        })
        .collect();

    app.set_status(reports[2].id, ReportStatus::Resolved).unwrap();

    let after = app.reports().list().unwrap();
    for (before, now) in reports.iter().zip(&after) {
        if before.id == reports[2].id {
            assert_eq!(now.status, ReportStatus::Resolved);
            assert_eq!(now.location, before.location);
        } else {
            assert_eq!(now, before);
        }
    }

    assert!(matches!(
        app.set_status(1, ReportStatus::Resolved),
        Err(Error::NotFound(1))
    ));
}

#[test]
fn test_schema_mismatch_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.csv");
    fs::write(&path, "\"Name\",\"Phone\",\"Password\"\n\"Ann\",\"111\",\"pw\"\n").unwrap();

    let err = UserDirectory::open(&path).unwrap_err();
    assert!(matches!(err, Error::Schema { table: "users", .. }));
}

// ============================================
// Concurrency
// ============================================

#[test]
fn test_concurrent_creates_get_distinct_ids() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reports.csv");
    ReportLedger::open(&path).unwrap();

    const WRITERS: usize = 16;
    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let path = path.clone();
            thread::spawn(move || {
                // Each thread opens its own handle, as separate sessions would.
                let ledger = ReportLedger::open(&path).unwrap();
                ledger
                    .create(&format!("{i}"), Resource::Water, "Lab", "")
                    .unwrap()
                    .id
            })
        })
        .collect();

    let ids: HashSet<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), WRITERS);

    let stored = ReportLedger::open(&path).unwrap().list().unwrap();
    assert_eq!(stored.len(), WRITERS);
    let stored_ids: HashSet<u64> = stored.iter().map(|r| r.id).collect();
    assert_eq!(stored_ids, ids);
}

#[test]
fn test_concurrent_register_same_phone_single_winner() {
    let dir = TempDir::new().unwrap();
    let users = Arc::new(UserDirectory::open(dir.path().join("users.csv")).unwrap());

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let users = Arc::clone(&users);
            thread::spawn(move || users.register(&format!("User {i}"), "111", "pw"))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, Error::DuplicatePhone(_))));

    let stored: Vec<User> = users.list().unwrap();
    assert_eq!(stored.len(), 1);
}

#[test]
fn test_concurrent_create_and_update_lose_nothing() {
    let dir = TempDir::new().unwrap();
    let ledger = Arc::new(ReportLedger::open(dir.path().join("reports.csv")).unwrap());
    let seeded: Vec<u64> = (0..8)
        .map(|_| ledger.create("111", Resource::Water, "Seed", "").unwrap().id)
        .collect();

    let creator = {
        let ledger = Arc::clone(&ledger);
        thread::spawn(move || {
            for _ in 0..8 {
                ledger.create("222", Resource::Electricity, "New", "").unwrap();
            }
        })
    };
    let updater = {
        let ledger = Arc::clone(&ledger);
        let seeded = seeded.clone();
        thread::spawn(move || {
            for id in seeded {
                ledger.update_status(id, ReportStatus::Resolved).unwrap();
            }
        })
    };
    creator.join().unwrap();
    updater.join().unwrap();

    let all = ledger.list().unwrap();
    assert_eq!(all.len(), 16);
    assert!(all
        .iter()
        .filter(|r| seeded.contains(&r.id))
        .all(|r| r.status == ReportStatus::Resolved));
    assert_eq!(
        all.iter()
            .filter(|r| r.resource == Resource::Electricity)
            .count(),
        8
    );
}
