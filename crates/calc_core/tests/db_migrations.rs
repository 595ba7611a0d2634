use calc_core::db::migrations::latest_version;
use calc_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "principals");
    assert_table_exists(&conn, "calculations");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calc.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "calculations");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
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
fn schema_rejects_operand2_shape_violations() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO principals (id, display_name, is_staff) VALUES ('p1', 'alice', 0);",
        [],
    )
    .unwrap();

    let sqrt_with_operand2 = conn.execute(
        "INSERT INTO calculations
            (owner_id, operand1, operand2, operation, result, expression, created_at)
         VALUES ('p1', 4, 1, 'sqrt', 2, '√(4)', 0);",
        [],
    );
    assert!(sqrt_with_operand2.is_err());

    let add_without_operand2 = conn.execute(
        "INSERT INTO calculations
            (owner_id, operand1, operand2, operation, result, expression, created_at)
         VALUES ('p1', 4, NULL, 'add', 4, '4 + ?', 0);",
        [],
    );
    assert!(add_without_operand2.is_err());
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let orphan = conn.execute(
        "INSERT INTO calculations
            (owner_id, operand1, operand2, operation, result, expression, created_at)
         VALUES ('nobody', 1, 2, 'add', 3, '1 + 2', 0);",
        [],
    );
    assert!(orphan.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
