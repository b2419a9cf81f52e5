//! Statement execution, result sinks and the interactive loop.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::Span;

use crate::config::{HeaderPolicy, OutputFormat};
use crate::error::{Error, Result};
use crate::render;
use crate::sqlite::{Database, ResultSet};

pub const PROMPT: &str = "sql> ";

/// Where query results go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    /// One tuple-rendered line per row.
    Console,
    /// Appended CSV, header row first.
    Csv(PathBuf),
    /// Appended newline-delimited JSON.
    Ndjson(PathBuf),
}

impl OutputSink {
    /// Without a file every format prints to the console.
    pub fn new(output_file: Option<PathBuf>, format: OutputFormat) -> Self {
        match (output_file, format) {
            (None, _) => OutputSink::Console,
            (Some(path), OutputFormat::Csv) => OutputSink::Csv(path),
            (Some(path), OutputFormat::Json) => OutputSink::Ndjson(path),
        }
    }
}

/// One event fed to the interactive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Line(String),
    EndOfInput,
    Interrupted,
}

/// Why the interactive loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplExit {
    /// The user typed `exit`.
    Exit,
    EndOfInput,
    Interrupted,
}

pub fn is_exit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// Runs statements against one database and writes results to one sink.
pub struct QueryRunner<'db> {
    db: &'db Database,
    sink: OutputSink,
    header: HeaderPolicy,
    span: Span,
}

impl<'db> QueryRunner<'db> {
    pub fn new(db: &'db Database, sink: OutputSink) -> Self {
        let span = tracing::info_span!("query_runner", sink = ?sink);
        Self {
            db,
            sink,
            header: HeaderPolicy::default(),
            span,
        }
    }

    pub fn with_header_policy(mut self, header: HeaderPolicy) -> Self {
        self.header = header;
        self
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    /// Execute `sql` and write every row to the sink.
    ///
    /// `console` receives rows only when the sink is [`OutputSink::Console`].
    /// File sinks are opened, appended to, and closed within this call.
    pub fn execute(&self, sql: &str, console: &mut dyn Write) -> Result<()> {
        let _enter = self.span.enter();
        let results = self.db.fetch_all(sql)?;
        match &self.sink {
            OutputSink::Console => write_console(&results, console),
            OutputSink::Csv(path) => append_csv(path, &results, self.header),
            OutputSink::Ndjson(path) => append_ndjson(path, &results),
        }
    }

    /// Prompt, read, execute until `exit`, end of input or an interrupt.
    ///
    /// `interrupted` is checked before every line, so lines already read
    /// ahead never run once it is set. Query failures are printed as
    /// `Error: <message>` and the loop goes on. Only failing to write to
    /// `console` ends it with an error.
    pub fn repl<I>(
        &self,
        input: I,
        interrupted: &AtomicBool,
        console: &mut dyn Write,
    ) -> Result<ReplExit>
    where
        I: IntoIterator<Item = ReplInput>,
    {
        tracing::info!("Entering interactive mode. Type your queries, and type 'exit' to quit.");
        let mut input = input.into_iter();
        loop {
            if interrupted.load(Ordering::SeqCst) {
                writeln!(console).map_err(Error::Console)?;
                return Ok(ReplExit::Interrupted);
            }
            write!(console, "{PROMPT}")
                .and_then(|()| console.flush())
                .map_err(Error::Console)?;
            let line = match input.next() {
                Some(ReplInput::Line(line)) => line,
                Some(ReplInput::Interrupted) => {
                    writeln!(console).map_err(Error::Console)?;
                    return Ok(ReplExit::Interrupted);
                }
                Some(ReplInput::EndOfInput) | None => {
                    writeln!(console).map_err(Error::Console)?;
                    return Ok(ReplExit::EndOfInput);
                }
            };
            if interrupted.load(Ordering::SeqCst) {
                writeln!(console).map_err(Error::Console)?;
                return Ok(ReplExit::Interrupted);
            }
            let sql = line.trim();
            if is_exit_command(sql) {
                return Ok(ReplExit::Exit);
            }
            if let Err(err) = self.execute(sql, console) {
                tracing::debug!(error = %err, "statement failed");
                writeln!(console, "Error: {err}").map_err(Error::Console)?;
            }
        }
    }
}

fn write_console(results: &ResultSet, console: &mut dyn Write) -> Result<()> {
    for row in &results.rows {
        writeln!(console, "{}", render::tuple(row)).map_err(Error::Console)?;
    }
    console.flush().map_err(Error::Console)
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::output(path, e))
}

fn append_csv(path: &Path, results: &ResultSet, header: HeaderPolicy) -> Result<()> {
    let file = open_append(path)?;
    let write_header = match header {
        HeaderPolicy::Always => true,
        HeaderPolicy::Once => file.metadata().map_err(|e| Error::output(path, e))?.len() == 0,
    };
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(file);
    // Statements without columns have nothing to head.
    if write_header && !results.columns.is_empty() {
        writer.write_record(&results.columns)?;
    }
    for row in &results.rows {
        writer.write_record(row.iter().map(render::csv_cell))?;
    }
    writer.flush().map_err(|e| Error::output(path, e))
}

fn append_ndjson(path: &Path, results: &ResultSet) -> Result<()> {
    let mut out = BufWriter::new(open_append(path)?);
    for row in &results.rows {
        serde_json::to_writer(&mut out, &render::json_row(&results.columns, row))?;
        out.write_all(b"\n").map_err(|e| Error::output(path, e))?;
    }
    out.flush().map_err(|e| Error::output(path, e))
}
