//! Debounced save scheduling
//!
//! A single worker thread owns the deadline. Every `arm` replaces the
//! previous deadline, so there is never more than one save outstanding and a
//! burst of changes collapses into one write after the burst goes quiet.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

enum Command {
    /// (Re)arm the timer to fire at this instant
    Arm(Instant),
    /// Drop the pending deadline without firing
    Cancel,
    /// Fire now if armed, then exit
    Shutdown,
}

/// Handle to the debounce worker
pub(crate) struct SaveScheduler {
    delay: Duration,
    tx: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl SaveScheduler {
    /// Start the worker; `action` runs on the worker thread each time a deadline expires
    pub(crate) fn spawn<F>(delay: Duration, action: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let worker = thread::spawn(move || scheduler_thread(rx, action));

        Self {
            delay,
            tx,
            worker: Some(worker),
        }
    }

    /// Schedule the action `delay` from now, superseding any pending deadline
    pub(crate) fn arm(&self) {
        let deadline = Instant::now() + self.delay;
        if self.tx.send(Command::Arm(deadline)).is_err() {
            tracing::warn!("Settings save worker is gone, debounced save dropped");
        }
        tracing::trace!("Debounced settings save armed ({:?})", self.delay);
    }

    pub(crate) fn cancel(&self) {
        let _ = self.tx.send(Command::Cancel);
    }

    /// Run any pending action and stop the worker. Blocks until it has exited.
    pub(crate) fn shutdown(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Settings save worker panicked");
            }
        }
    }
}

impl Drop for SaveScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn scheduler_thread<F: FnMut()>(rx: Receiver<Command>, mut action: F) {
    let mut deadline: Option<Instant> = None;

    loop {
        let command = match deadline {
            Some(at) => match rx.recv_timeout(at.saturating_duration_since(Instant::now())) {
                Ok(command) => command,
                Err(RecvTimeoutError::Timeout) => {
                    deadline = None;
                    action();
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // Handle dropped without shutdown: still honour the pending save
                    action();
                    break;
                }
            },
            None => match rx.recv() {
                Ok(command) => command,
                Err(_) => break,
            },
        };

        match command {
            Command::Arm(at) => deadline = Some(at),
            Command::Cancel => deadline = None,
            Command::Shutdown => {
                if deadline.take().is_some() {
                    action();
                }
                break;
            }
        }
    }
}
