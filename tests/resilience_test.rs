use frontdesk::db;
use tempfile::TempDir;

#[test]
fn open_creates_new_db_at_nonexistent_path() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("subdir").join("new.db");

    // Should not exist yet
    assert!(!db_path.exists());

    let conn = db::open_database(&db_path).unwrap();

    // Should have been created
    assert!(db_path.exists());

    // Every namespace should be queryable
    for table in db::schema::NAMESPACES {
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0, "{table} should start empty");
    }
}

#[test]
fn reopening_keeps_archived_lines() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("frontdesk.db");

    {
        let mut conn = db::open_database(&db_path).unwrap();
        let at = chrono::DateTime::parse_from_rfc3339("2015-02-17T10:00:00Z").unwrap();
        frontdesk::archive::append(&mut conn, "carol", "still here", at).unwrap();
    }

    let conn = db::open_database(&db_path).unwrap();
    let lines = frontdesk::archive::messages_on_day(&conn, "2015", "02", "17").unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text, "still here");
}

#[test]
fn health_check_passes_on_valid_db() {
    let conn = db::open_memory_database().unwrap();

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.schema_version, db::migrations::CURRENT_SCHEMA_VERSION);
    assert_eq!(report.line_count, 0);
    assert_eq!(report.nick_count, 0);
    assert_eq!(report.pending_recipients, 0);
    assert_eq!(report.link_count, 0);
}

#[test]
fn busy_timeout_is_set() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("test.db");

    let conn = db::open_database(&db_path).unwrap();

    let timeout: i64 = conn
        .pragma_query_value(None, "busy_timeout", |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);
}

#[test]
fn wal_journal_is_enabled() {
    let tmp = TempDir::new().unwrap();
    let conn = db::open_database(tmp.path().join("test.db")).unwrap();

    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}
