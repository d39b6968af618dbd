//! # Controlling Event Loop
//!
//! The single thread that issues calls and receives their completions.
//! Callbacks only ever run inside [`EventLoop::run`] or
//! [`EventLoop::run_pending`], on the thread that calls them.

use std::time::Duration;

use core_async::runtime::{Runtime, WorkerPoolBuilder};
use core_async::sync::mpsc;
use core_runtime::config::DispatchSettings;
use tracing::{debug, info, warn};

use crate::dispatcher::{Completion, WorkDispatcher};
use crate::error::Result;
use crate::marshal::{FaultHandler, LogFaultHandler};

pub struct EventLoop {
    runtime: Option<Runtime>,
    dispatcher: WorkDispatcher,
    completions: mpsc::UnboundedReceiver<Completion>,
    faults: Box<dyn FaultHandler>,
    shutdown_timeout: Duration,
}

impl EventLoop {
    /// Build the worker pool described by `settings`.
    ///
    /// Must not be called from inside an async runtime.
    pub fn new(settings: &DispatchSettings) -> Result<Self> {
        settings.validate()?;

        let runtime = WorkerPoolBuilder::new(settings.thread_name.clone(), settings.worker_threads)
            .keep_alive(settings.worker_keep_alive())
            .build()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = WorkDispatcher::new(runtime.handle().clone(), tx);

        info!(
            workers = settings.worker_threads,
            thread_name = %settings.thread_name,
            "Worker pool started"
        );

        Ok(Self {
            runtime: Some(runtime),
            dispatcher,
            completions: rx,
            faults: Box::new(LogFaultHandler),
            shutdown_timeout: settings.shutdown_timeout(),
        })
    }

    /// Replace the handler receiving callback failures.
    pub fn with_fault_handler(mut self, handler: impl FaultHandler + 'static) -> Self {
        self.faults = Box::new(handler);
        self
    }

    pub fn set_fault_handler(&mut self, handler: impl FaultHandler + 'static) {
        self.faults = Box::new(handler);
    }

    pub fn dispatcher(&self) -> WorkDispatcher {
        self.dispatcher.clone()
    }

    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    /// Deliver completions until nothing is in flight, blocking while
    /// workers are busy. Calls submitted by callbacks are waited for too.
    ///
    /// Returns the number of callbacks delivered.
    pub fn run(&mut self) -> usize {
        let mut delivered = 0;
        while self.runtime.is_some() && self.dispatcher.in_flight() > 0 {
            let Some(task) = self.completions.blocking_recv() else {
                break;
            };
            self.deliver(task);
            delivered += 1;
        }
        delivered
    }

    /// Deliver only the completions that are already queued.
    pub fn run_pending(&mut self) -> usize {
        let mut delivered = 0;
        while self.runtime.is_some() {
            let Ok(task) = self.completions.try_recv() else {
                break;
            };
            self.deliver(task);
            delivered += 1;
        }
        delivered
    }

    fn deliver(&mut self, task: Completion) {
        self.dispatcher.mark_delivered();
        debug!(task = task.id(), operation = %task.operation(), "Completion received");
        task.deliver(self.faults.as_mut());
    }

    /// Tear down the loop.
    ///
    /// Stops accepting submissions, drops queued completions without running
    /// their callbacks, then waits up to the configured timeout for running
    /// backend calls. Idempotent; also runs on drop.
    pub fn shutdown(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };

        self.dispatcher.close();
        self.completions.close();

        let mut dropped = 0usize;
        while let Ok(task) = self.completions.try_recv() {
            warn!(
                task = task.id(),
                operation = %task.operation(),
                "Dropping undelivered completion at shutdown"
            );
            dropped += 1;
        }

        runtime.shutdown_timeout(self.shutdown_timeout);
        info!(dropped, "Worker pool shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.runtime.is_none()
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("dispatcher", &self.dispatcher)
            .field("shut_down", &self.is_shut_down())
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutputError;

    #[test]
    fn rejects_invalid_settings() {
        let settings = DispatchSettings {
            worker_threads: 0,
            ..DispatchSettings::default()
        };
        assert!(matches!(
            EventLoop::new(&settings),
            Err(OutputError::Runtime(_))
        ));
    }

    #[test]
    fn idle_loop_returns_immediately() {
        let mut event_loop = EventLoop::new(&DispatchSettings::default()).unwrap();
        assert_eq!(event_loop.in_flight(), 0);
        assert_eq!(event_loop.run(), 0);
        assert_eq!(event_loop.run_pending(), 0);
    }

    #[test]
    fn shutdown_is_idempotent_and_closes_dispatcher() {
        let mut event_loop = EventLoop::new(&DispatchSettings::default()).unwrap();
        let dispatcher = event_loop.dispatcher();
        assert!(!dispatcher.is_closed());

        event_loop.shutdown();
        event_loop.shutdown();

        assert!(event_loop.is_shut_down());
        assert!(dispatcher.is_closed());
    }
}
