use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use signal_query::{Database, DecryptionKey, Error, KeyFileSource, OutputSink, QueryRunner, Value};
use tempfile::TempDir;

const KEY: &str = "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4";
const WRONG_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

// Helper function to run a pragma and drain whatever rows it answers with
fn run_pragma(conn: &Connection, sql: &str) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    while rows.next()?.is_some() {}
    Ok(())
}

// Helper function to build a store encrypted the way Signal Desktop does it
fn create_signal_db(dir: &Path) -> rusqlite::Result<PathBuf> {
    let path = dir.join("db.sqlite");
    let conn = Connection::open(&path)?;
    run_pragma(&conn, &format!("PRAGMA key = \"x'{KEY}'\""))?;
    run_pragma(&conn, "PRAGMA cipher_page_size = 4096")?;
    run_pragma(&conn, "PRAGMA kdf_iter = 64000")?;
    run_pragma(&conn, "PRAGMA cipher_hmac_algorithm = HMAC_SHA512")?;
    run_pragma(&conn, "PRAGMA cipher_kdf_algorithm = PBKDF2_HMAC_SHA512")?;
    conn.execute_batch(
        r#"
        CREATE TABLE conversations (id TEXT PRIMARY KEY, name TEXT);
        CREATE TABLE messages (
            id TEXT PRIMARY KEY,
            conversationId TEXT NOT NULL,
            body TEXT,
            sent_at INTEGER
        );
        "#,
    )?;
    conn.execute(
        "INSERT INTO conversations (id, name) VALUES (?1, ?2)",
        params!["c1", "Alice"],
    )?;
    conn.execute(
        "INSERT INTO messages (id, conversationId, body, sent_at) VALUES (?1, ?2, ?3, ?4)",
        params!["m1", "c1", "hi there", 1_700_000_000_000_i64],
    )?;
    conn.execute(
        "INSERT INTO messages (id, conversationId, body, sent_at) VALUES (?1, ?2, ?3, ?4)",
        params!["m2", "c1", "see you\ntomorrow", 1_700_000_100_000_i64],
    )?;
    Ok(path)
}

// Helper function to write a config.json holding `key`
fn write_key_file(dir: &Path, key: &str) -> PathBuf {
    let path = dir.join("config.json");
    fs::write(&path, format!("{{\n  \"key\": \"{key}\"\n}}\n")).unwrap();
    path
}

fn setup() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = create_signal_db(dir.path()).unwrap();
    (dir, db_path)
}

#[test]
fn test_open_and_query() -> signal_query::Result<()> {
    let (dir, db_path) = setup();
    let key_file = write_key_file(dir.path(), KEY);

    let db = Database::open(&db_path, &key_file)?;
    let results = db.fetch_all(
        "SELECT m.id, c.name, m.body FROM messages m JOIN conversations c ON c.id = m.conversationId ORDER BY m.sent_at",
    )?;
    assert_eq!(results.columns, vec!["id", "name", "body"]);
    assert_eq!(
        results.rows,
        vec![
            vec![Value::from("m1"), Value::from("Alice"), Value::from("hi there")],
            vec![Value::from("m2"), Value::from("Alice"), Value::from("see you\ntomorrow")],
        ]
    );
    db.close()
}

#[test]
fn test_csv_export_is_one_line_per_row() -> signal_query::Result<()> {
    let (dir, db_path) = setup();
    let key_file = write_key_file(dir.path(), KEY);
    let out = dir.path().join("messages.csv");

    let db = Database::open(&db_path, &key_file)?;
    let runner = QueryRunner::new(&db, OutputSink::Csv(out.clone()));
    runner.execute("SELECT id, body, sent_at FROM messages ORDER BY sent_at", &mut Vec::new())?;

    let written = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = written.split_terminator("\r\n").collect();
    assert_eq!(
        lines,
        vec![
            "id,body,sent_at",
            "m1,hi there,1700000000000",
            "m2,see you\\ntomorrow,1700000100000",
        ]
    );
    drop(runner);
    db.close()
}

#[test]
fn test_wrong_key_fails_on_first_read() {
    let (dir, db_path) = setup();
    let key_file = write_key_file(dir.path(), WRONG_KEY);

    // The engine confirms any key; the mismatch shows up when pages are read.
    let db = Database::open(&db_path, &key_file).unwrap();
    let err = db.fetch_all("SELECT count(*) FROM messages").unwrap_err();
    assert!(matches!(err, Error::Query(_)));
    assert!(err.to_string().contains("file is not a database"), "{err}");
    db.close().unwrap();
}

#[test]
fn test_short_key_on_empty_file() -> signal_query::Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let key_file = dir.path().join("config.json");
    fs::write(&key_file, r#"{"key":"00112233"}"#).unwrap();

    let db = Database::open(&dir.path().join("db.sqlite"), &key_file)?;
    let runner = QueryRunner::new(&db, OutputSink::Console);
    let mut console = Vec::new();
    runner.execute("SELECT 1", &mut console)?;
    assert_eq!(String::from_utf8(console).unwrap(), "(1,)\n");
    drop(runner);
    db.close()
}

#[test]
fn test_missing_key_file() {
    let (dir, db_path) = setup();
    let err = Database::open(&db_path, &dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, Error::KeyFile { source: KeyFileSource::Io(_), .. }));
}

#[test]
fn test_key_file_without_key_field() {
    let (dir, db_path) = setup();
    let key_file = dir.path().join("config.json");
    fs::write(&key_file, r#"{"encryptedKey":"v10abcdef"}"#).unwrap();
    let err = Database::open(&db_path, &key_file).unwrap_err();
    assert!(matches!(err, Error::KeyFile { source: KeyFileSource::Json(_), .. }));
}

#[test]
fn test_open_with_key_matches_key_file() -> signal_query::Result<()> {
    let (_dir, db_path) = setup();
    let db = Database::open_with_key(&db_path, &DecryptionKey::from_hex(KEY))?;
    let results = db.fetch_all("SELECT count(*) AS n FROM messages")?;
    assert_eq!(results.rows, vec![vec![Value::Integer(2)]]);
    assert_eq!(db.path(), db_path.as_path());
    db.close()
}
