//! # Work Dispatcher
//!
//! Submits envelope bodies to the worker pool and queues finished envelopes
//! for the controlling thread. The queue is an unbounded channel: a send from
//! the worker happens-before the matching receive in the [`EventLoop`], which
//! is all the synchronization the result slot needs.
//!
//! [`EventLoop`]: crate::event_loop::EventLoop

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use core_async::runtime::Handle;
use core_async::sync::mpsc;
use tracing::{debug, warn};

use crate::envelope::{Operation, PendingTask, TaskEnvelope, TaskId};
use crate::error::{OutputError, Result};
use crate::handle::{HandleState, InFlightGuard};
use crate::value::{CompletionValue, ScriptCallback};

pub(crate) type Completion = Box<dyn PendingTask>;

struct DispatcherShared {
    pool: Handle,
    completions: mpsc::UnboundedSender<Completion>,
    in_flight: AtomicUsize,
    next_id: AtomicU64,
    closed: AtomicBool,
}

/// Cloneable submission side of an [`EventLoop`](crate::event_loop::EventLoop).
#[derive(Clone)]
pub struct WorkDispatcher {
    shared: Arc<DispatcherShared>,
}

impl WorkDispatcher {
    pub(crate) fn new(pool: Handle, completions: mpsc::UnboundedSender<Completion>) -> Self {
        Self {
            shared: Arc::new(DispatcherShared {
                pool,
                completions,
                in_flight: AtomicUsize::new(0),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Number of submitted envelopes not yet handed to the event loop.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Run `body` on a worker with exclusive access to the handle, then queue
    /// the envelope for delivery to `callback`.
    pub(crate) fn submit<R, F>(
        &self,
        operation: Operation,
        guard: InFlightGuard,
        body: F,
        callback: ScriptCallback,
    ) -> Result<TaskId>
    where
        R: CompletionValue,
        F: FnOnce(&mut HandleState) -> R + Send + 'static,
    {
        if self.is_closed() {
            return Err(OutputError::DispatcherClosed);
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let handle_id = guard.handle().id();
        let mut envelope = TaskEnvelope::new(id, operation, guard, Box::new(body), callback);

        self.shared.in_flight.fetch_add(1, Ordering::AcqRel);
        debug!(task = id, handle = handle_id, operation = %operation, "Submitting to worker pool");

        let completions = self.shared.completions.clone();
        self.shared.pool.spawn_blocking(move || {
            envelope.execute();
            if completions.send(Box::new(envelope)).is_err() {
                warn!(
                    task = id,
                    operation = %operation,
                    "Event loop torn down; dropping completion without callback"
                );
            }
        });

        Ok(id)
    }

    /// Called by the event loop once it has taken a completion off the queue.
    pub(crate) fn mark_delivered(&self) {
        self.shared.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for WorkDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkDispatcher")
            .field("in_flight", &self.in_flight())
            .field("closed", &self.is_closed())
            .finish()
    }
}
