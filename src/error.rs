use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why a key file could not be turned into a key.
#[derive(Debug, Error)]
pub enum KeyFileSource {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read key file {}: {source}", path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: KeyFileSource,
    },

    #[error("Failed to decrypt database (engine replied {response})")]
    Decryption { response: String },

    /// Engine failure while preparing, stepping or reading a statement.
    /// Displays the engine message unchanged.
    #[error(transparent)]
    Query(#[from] rusqlite::Error),

    #[error("failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write to console: {0}")]
    Console(#[source] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("failed to close database: {0}")]
    Close(#[source] rusqlite::Error),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] io::Error),

    #[error("Unsupported operating system.")]
    UnsupportedPlatform,
}

impl Error {
    pub(crate) fn key_file(path: impl Into<PathBuf>, source: impl Into<KeyFileSource>) -> Self {
        Self::KeyFile {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn output(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }
}
