use interntrack_core::db::migrations::{latest_version, schema_version};
use interntrack_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "applications");

    // Only the primary-key autoindex; listing sorts on `json_extract`.
    let explicit_indexes: i64 = conn
        .query_row(
            "SELECT COUNT(*)
             FROM sqlite_master
             WHERE type = 'index' AND tbl_name = 'applications' AND sql IS NOT NULL;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(explicit_indexes, 0);
}

#[test]
fn reopening_file_database_keeps_schema_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("interntrack.sqlite3");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO applications (id, document, created_at, updated_at)
         VALUES ('a', '{\"createdAt\":1,\"updatedAt\":1}', 1, 1);",
        [],
    )
    .unwrap();
    drop(conn);

    let reopened = open_db(&path).unwrap();
    assert_eq!(schema_version(&reopened).unwrap(), latest_version());
    let rows: i64 = reopened
        .query_row("SELECT COUNT(*) FROM applications;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_rejects_non_json_documents_and_reversed_timestamps() {
    let conn = open_db_in_memory().unwrap();

    let not_json = conn.execute(
        "INSERT INTO applications (id, document, created_at, updated_at)
         VALUES ('a', 'not json', 1, 1);",
        [],
    );
    assert!(not_json.is_err());

    let reversed = conn.execute(
        "INSERT INTO applications (id, document, created_at, updated_at)
         VALUES ('b', '{}', 5, 1);",
        [],
    );
    assert!(reversed.is_err());
}

fn assert_table_exists(conn: &Connection, name: &str) {
    assert_schema_object(conn, "table", name);
}

fn assert_schema_object(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}
