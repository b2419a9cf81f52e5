//! Command-line surface and the settings derived from it.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use directories::BaseDirs;

use crate::error::{Error, Result};
use crate::query::OutputSink;

/// File format used when `--output_file` is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    /// Newline-delimited JSON, one object per row.
    Json,
}

/// When the CSV sink writes its header row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum HeaderPolicy {
    /// On every query, even when appending to a file that already has one.
    #[default]
    Always,
    /// Only when the file is empty.
    Once,
}

#[derive(Debug, Parser)]
#[command(
    name = "signal-query",
    version,
    about = "Execute SQL query on an encrypted SQLite database."
)]
pub struct Cli {
    /// SQL query to execute; starts an interactive prompt when omitted or empty
    #[arg(long)]
    pub query: Option<String>,

    /// Path to the encrypted SQLite database [default: <config dir>/Signal/sql/db.sqlite]
    #[arg(long = "db_path", value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Path to the key file [default: <config dir>/Signal/config.json]
    #[arg(long = "key_file_path", value_name = "PATH")]
    pub key_file_path: Option<PathBuf>,

    /// Path to the output file; rows are appended. Prints to the console when omitted
    #[arg(long = "output_file", value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    /// Output file format
    #[arg(long = "output_format", value_enum, default_value_t = OutputFormat::Csv)]
    pub output_format: OutputFormat,

    /// When to write the CSV header row
    #[arg(long = "csv_header", value_enum, default_value_t = HeaderPolicy::Always)]
    pub csv_header: HeaderPolicy,
}

/// Everything a run needs, with default paths resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub key_file_path: PathBuf,
    pub query: Option<String>,
    pub sink: OutputSink,
    pub csv_header: HeaderPolicy,
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let db_path = match cli.db_path {
            Some(path) => path,
            None => default_db_path()?,
        };
        let key_file_path = match cli.key_file_path {
            Some(path) => path,
            None => default_key_path()?,
        };
        Ok(Self {
            db_path,
            key_file_path,
            query: cli.query.filter(|query| !query.is_empty()),
            sink: OutputSink::new(cli.output_file, cli.output_format),
            csv_header: cli.csv_header,
        })
    }
}

/// Signal Desktop's data directory under the platform config directory.
pub fn default_signal_dir() -> Result<PathBuf> {
    tracing::info!("Operating system: {}", std::env::consts::OS);
    let base = BaseDirs::new().ok_or(Error::UnsupportedPlatform)?;
    Ok(base.config_dir().join("Signal"))
}

pub fn default_db_path() -> Result<PathBuf> {
    Ok(default_signal_dir()?.join("sql").join("db.sqlite"))
}

pub fn default_key_path() -> Result<PathBuf> {
    Ok(default_signal_dir()?.join("config.json"))
}
