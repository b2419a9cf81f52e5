//! Terminal plumbing for the binary: stdin lines and Ctrl-C.
//!
//! The database is only ever touched from the calling thread. A reader thread
//! forwards stdin lines and, on Unix, a watcher thread turns SIGINT/SIGTERM
//! into an interrupt of the running statement, a raised flag and a
//! [`ReplInput::Interrupted`] event.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rusqlite::InterruptHandle;

use crate::error::{Error, Result};
use crate::query::{QueryRunner, ReplExit, ReplInput};

/// Lines the stdin reader may hold ahead of the loop.
const READ_AHEAD: usize = 16;

/// Watches for termination signals until dropped.
pub struct InterruptWatch {
    interrupted: Arc<AtomicBool>,
    #[cfg(unix)]
    handle: signal_hook::iterator::Handle,
    thread: Option<JoinHandle<()>>,
}

impl InterruptWatch {
    /// Start watching. On a signal the statement running on `db` is aborted,
    /// the flag is raised and `notify`, if given and not full, receives
    /// [`ReplInput::Interrupted`].
    #[cfg(unix)]
    pub fn start(db: InterruptHandle, notify: Option<SyncSender<ReplInput>>) -> Result<Self> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(Error::Signals)?;
        let handle = signals.handle();
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&interrupted);
        let thread = thread::spawn(move || {
            for signal in signals.forever() {
                tracing::debug!(signal, "interrupt received");
                flag.store(true, Ordering::SeqCst);
                db.interrupt();
                if let Some(tx) = &notify {
                    // A full channel means the loop is busy; it sees the flag next.
                    let _ = tx.try_send(ReplInput::Interrupted);
                }
            }
        });
        Ok(Self {
            interrupted,
            handle,
            thread: Some(thread),
        })
    }

    /// Signals keep their default behaviour on this platform.
    #[cfg(not(unix))]
    pub fn start(_db: InterruptHandle, _notify: Option<SyncSender<ReplInput>>) -> Result<Self> {
        Ok(Self {
            interrupted: Arc::new(AtomicBool::new(false)),
            thread: None,
        })
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    pub fn flag(&self) -> &AtomicBool {
        &self.interrupted
    }
}

impl Drop for InterruptWatch {
    fn drop(&mut self) {
        #[cfg(unix)]
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Run the interactive loop on stdin/stdout until `exit`, EOF or Ctrl-C.
pub fn interactive(runner: &QueryRunner<'_>, db: InterruptHandle) -> Result<ReplExit> {
    let (tx, rx) = mpsc::sync_channel(READ_AHEAD);
    let watch = InterruptWatch::start(db, Some(tx.clone()))?;
    spawn_stdin_reader(tx);
    let mut stdout = io::stdout();
    runner.repl(rx, watch.flag(), &mut stdout)
}

// The reader stays blocked on stdin after the loop ends; it dies with the process.
fn spawn_stdin_reader(tx: SyncSender<ReplInput>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(ReplInput::Line(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(ReplInput::EndOfInput);
    });
}
