//! Runtime utilities that abstract over the underlying executor.
//!
//! The output core never runs async code on its controlling thread. It only
//! needs a pool of threads that may block inside backend calls, so the pool
//! built here is a tokio runtime used purely for its blocking pool.

use std::io;
use std::time::Duration;

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion using a lightweight runtime.
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}

/// Builder for the background pool that executes blocking bodies.
#[derive(Debug, Clone)]
pub struct WorkerPoolBuilder {
    thread_name: String,
    max_threads: usize,
    keep_alive: Option<Duration>,
}

impl WorkerPoolBuilder {
    /// Create a builder for a pool of at most `max_threads` blocking threads.
    pub fn new(thread_name: impl Into<String>, max_threads: usize) -> Self {
        Self {
            thread_name: thread_name.into(),
            max_threads,
            keep_alive: None,
        }
    }

    /// How long an idle blocking thread lingers before exiting.
    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    /// Build the runtime.
    ///
    /// A single async worker thread drives the runtime; blocking bodies go to
    /// a separate pool capped at `max_threads`.
    pub fn build(self) -> io::Result<Runtime> {
        if self.max_threads == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "worker pool needs at least one blocking thread",
            ));
        }

        let mut builder = Builder::new_multi_thread();
        builder
            .worker_threads(1)
            .max_blocking_threads(self.max_threads)
            .thread_name(self.thread_name);

        if let Some(keep_alive) = self.keep_alive {
            builder.thread_keep_alive(keep_alive);
        }

        builder.build()
    }
}
