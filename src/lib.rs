//! Query the encrypted Signal Desktop message store.
//!
//! # Intention
//!
//! - Open the SQLCipher database with the key Signal keeps in `config.json`.
//! - Run arbitrary SQL against it and emit rows as console text, CSV or NDJSON.
//!
//! # Architectural Boundaries
//!
//! - `sqlite` owns the connection and the cipher handshake.
//! - `query` owns execution, sinks and the interactive loop.
//! - `render` turns values into text and JSON; it does no I/O.
//! - `config` and `shell` are the command-line and terminal surface.
//! - No schema knowledge: every statement is passed to the engine as written.

pub mod config;
pub mod error;
pub mod key_file;
pub mod query;
pub mod render;
pub mod shell;
pub mod sqlite;

pub use config::{Cli, HeaderPolicy, OutputFormat, Settings};
pub use error::{Error, KeyFileSource, Result};
pub use key_file::DecryptionKey;
pub use query::{OutputSink, QueryRunner, ReplExit, ReplInput};
pub use sqlite::{Database, ResultSet, Value};
