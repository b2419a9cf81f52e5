//! The encrypted connection: cipher handshake, values and result sets.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection, InterruptHandle, Row};
use tracing::Span;

use crate::error::{Error, Result};
use crate::key_file::DecryptionKey;
use crate::render;

/// Core value types read back from the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

/// Rows returned by one statement, fetched eagerly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names in declaration order.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Cipher parameters Signal Desktop encrypts its store with. Issued in this
/// order, after the key.
pub const CIPHER_SETTINGS: [&str; 4] = [
    "PRAGMA cipher_page_size = 4096",
    "PRAGMA kdf_iter = 64000",
    "PRAGMA cipher_hmac_algorithm = HMAC_SHA512",
    "PRAGMA cipher_kdf_algorithm = PBKDF2_HMAC_SHA512",
];

/// Something that can run a pragma and hand back its first row.
pub trait PragmaRunner {
    /// Run `sql`, returning the first row if there is one. Remaining rows are drained.
    fn pragma(&mut self, sql: &str) -> rusqlite::Result<Option<Vec<Value>>>;
}

impl PragmaRunner for Connection {
    fn pragma(&mut self, sql: &str) -> rusqlite::Result<Option<Vec<Value>>> {
        let mut stmt = self.prepare(sql)?;
        let width = stmt.column_count();
        let mut rows = stmt.query([])?;
        let first = match rows.next()? {
            Some(row) => Some(read_row(row, width)?),
            None => None,
        };
        while rows.next()?.is_some() {}
        Ok(first)
    }
}

/// Whether the engine's reply to `PRAGMA KEY` confirms the key.
///
/// SQLCipher answers a single `ok` row; anything containing `ok` passes.
pub fn key_accepted(response: &str) -> bool {
    response.contains("ok")
}

/// Apply the key and the cipher settings, in that order.
///
/// Stops before the cipher settings when the key is not confirmed. A confirmed
/// key does not prove the file decrypts; a wrong key surfaces on the first
/// real read.
pub fn apply_decryption_key<R>(runner: &mut R, key: &DecryptionKey) -> Result<()>
where
    R: PragmaRunner + ?Sized,
{
    let reply = runner.pragma(&key.pragma())?;
    let response = reply.as_deref().map_or_else(|| "None".to_string(), render::tuple);
    if !key_accepted(&response) {
        return Err(Error::Decryption { response });
    }
    for sql in CIPHER_SETTINGS {
        runner.pragma(sql)?;
    }
    Ok(())
}

fn read_row(row: &Row<'_>, width: usize) -> rusqlite::Result<Vec<Value>> {
    (0..width).map(|i| row.get_ref(i).map(Value::from)).collect()
}

/// An open, keyed connection to the encrypted store.
///
/// Dropping the handle closes the connection; `close` does the same and
/// reports failures.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
    path: PathBuf,
    span: Span,
}

impl Database {
    /// Read the key from `key_file_path` and open `db_path` with it.
    pub fn open(db_path: &Path, key_file_path: &Path) -> Result<Self> {
        let key = DecryptionKey::read(key_file_path)?;
        Self::open_with_key(db_path, &key)
    }

    pub fn open_with_key(db_path: &Path, key: &DecryptionKey) -> Result<Self> {
        let span = tracing::info_span!("signal_db", path = %db_path.display());
        let conn = span.in_scope(|| -> Result<Connection> {
            let mut conn = Connection::open(db_path)?;
            tracing::info!(
                "Decrypting database {} using key {}...",
                db_path.display(),
                key.log_prefix()
            );
            apply_decryption_key(&mut conn, key)?;
            Ok(conn)
        })?;
        Ok(Self {
            conn,
            path: db_path.to_path_buf(),
            span,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle that aborts the statement currently running on this connection.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }

    /// Run one statement and collect every row.
    ///
    /// Text holding no statement (blank, comments only) yields an empty
    /// result set. Text holding more than one statement is rejected before
    /// anything runs.
    pub fn fetch_all(&self, sql: &str) -> Result<ResultSet> {
        let _enter = self.span.enter();
        let mut batch = Batch::new(&self.conn, sql);
        let Some(mut stmt) = batch.next()? else {
            return Ok(ResultSet::default());
        };
        if batch.next()?.is_some() {
            return Err(rusqlite::Error::MultipleStatement.into());
        }
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let rows = stmt
            .query_map([], |row| read_row(row, width))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        tracing::debug!(rows = rows.len(), "statement finished");
        Ok(ResultSet { columns, rows })
    }

    pub fn close(self) -> Result<()> {
        let _enter = self.span.enter();
        tracing::debug!("closing database");
        self.conn.close().map_err(|(_, err)| Error::Close(err))
    }
}
