use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use signal_query::shell::{self, InterruptWatch};
use signal_query::{Cli, Database, QueryRunner, ReplExit, Settings};

/// Exit status after SIGINT/SIGTERM, as a shell reports it.
const INTERRUPTED: u8 = 130;

fn main() -> Result<ExitCode> {
    init_logging();
    let settings = Settings::from_cli(Cli::parse())?;

    let db = Database::open(&settings.db_path, &settings.key_file_path)
        .with_context(|| format!("failed to open {}", settings.db_path.display()))?;
    let outcome = run(&db, &settings);
    let closed = db.close();
    if let (Err(_), Err(err)) = (&outcome, &closed) {
        tracing::error!(error = %err, "failed to close database");
    }
    let code = outcome?;
    closed?;
    Ok(code)
}

fn run(db: &Database, settings: &Settings) -> Result<ExitCode> {
    let runner = QueryRunner::new(db, settings.sink.clone()).with_header_policy(settings.csv_header);
    tracing::debug!(sink = ?runner.sink(), "runner ready");

    let Some(sql) = settings.query.as_deref() else {
        return Ok(match shell::interactive(&runner, db.interrupt_handle())? {
            ReplExit::Interrupted => ExitCode::from(INTERRUPTED),
            ReplExit::Exit | ReplExit::EndOfInput => ExitCode::SUCCESS,
        });
    };

    let watch = InterruptWatch::start(db.interrupt_handle(), None)?;
    let result = runner.execute(sql, &mut io::stdout().lock());
    if watch.interrupted() {
        return Ok(ExitCode::from(INTERRUPTED));
    }
    result?;
    Ok(ExitCode::SUCCESS)
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}
