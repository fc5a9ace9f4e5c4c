//! Background dump and recycle worker.
//!
//! [`GriddleRegistry::spawn_maintenance`] starts one named thread that runs
//! [`GriddleRegistry::dump_all`] every `dump_interval` and
//! [`GriddleRegistry::recycle_griddles`] every `recycle_check_interval`.
//! The thread sleeps on a `parking_lot::Condvar`, so
//! [`MaintenanceHandle::stop`] wakes it immediately instead of waiting out
//! the current interval.
//!
//! Stopping the worker does not shut the registry down; call
//! [`GriddleRegistry::shutdown`] afterwards for the final recycle and dump.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use griddle::{GriddleConfig, GriddleRegistry};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = GriddleConfig::builder()
//!     .dump_dir(dir.path())
//!     .vector_size(1024)
//!     .dump_interval(Duration::from_millis(20))
//!     .build()?;
//!
//! let registry = Arc::new(GriddleRegistry::open(config)?);
//! let worker = registry.spawn_maintenance().unwrap();
//! registry.add_griddle("votes", 3)?;
//!
//! worker.stop();
//! registry.shutdown();
//! assert!(dir.path().join("votes.3.dat").exists());
//! # Ok::<(), griddle::GriddleError>(())
//! ```

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::GriddleRegistry;

/// Thread name of the maintenance worker.
pub const MAINTENANCE_THREAD_NAME: &str = "griddle-maintenance";

#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// Owner of a running maintenance thread.
///
/// Dropping the handle stops and joins the thread.
#[derive(Debug)]
#[must_use = "dropping the handle stops the maintenance worker"]
pub struct MaintenanceHandle {
    signal: Arc<StopSignal>,
    thread: Option<JoinHandle<()>>,
}

impl MaintenanceHandle {
    /// Stop the worker and wait for it to exit.
    ///
    /// A pass already in progress finishes first.
    pub fn stop(mut self) {
        self.stop_and_join();
    }

    /// Whether the worker thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    fn stop_and_join(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        *self.signal.stopped.lock() = true;
        self.signal.wake.notify_all();
        if thread.join().is_err() {
            tracing::error!("maintenance worker panicked");
        }
    }
}

impl Drop for MaintenanceHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

impl GriddleRegistry {
    /// Start the periodic dump and recycle worker.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn_maintenance(self: &Arc<Self>) -> io::Result<MaintenanceHandle> {
        let signal = Arc::new(StopSignal::default());
        let registry = Arc::clone(self);
        let worker_signal = Arc::clone(&signal);

        let thread = thread::Builder::new()
            .name(MAINTENANCE_THREAD_NAME.to_string())
            .spawn(move || run(&registry, &worker_signal))?;

        tracing::info!(
            dump_interval = ?self.config().dump_interval(),
            recycle_check_interval = ?self.config().recycle_check_interval(),
            "maintenance worker started"
        );
        Ok(MaintenanceHandle {
            signal,
            thread: Some(thread),
        })
    }
}

fn run(registry: &GriddleRegistry, signal: &StopSignal) {
    let dump_interval = registry.config().dump_interval();
    let recycle_interval = registry.config().recycle_check_interval();
    let start = Instant::now();
    let mut next_dump = start + dump_interval;
    let mut next_recycle = start + recycle_interval;

    let mut stopped = signal.stopped.lock();
    while !*stopped {
        let deadline = next_dump.min(next_recycle);
        if signal.wake.wait_until(&mut stopped, deadline).timed_out() && !*stopped {
            // Passes run unlocked so stop() never waits on file I/O for the lock.
            MutexGuard::unlocked(&mut stopped, || {
                let now = Instant::now();
                if now >= next_recycle {
                    registry.recycle_griddles();
                    next_recycle = now + recycle_interval;
                }
                if now >= next_dump {
                    let summary = registry.dump_all();
                    if !summary.is_success() {
                        tracing::warn!(failed = ?summary.failed, "periodic dump incomplete");
                    }
                    next_dump = now + dump_interval;
                }
            });
        }
    }
    tracing::info!("maintenance worker stopped");
}
