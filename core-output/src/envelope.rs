//! # Async Task Envelope
//!
//! One envelope per outstanding Write, Flush or Close. It is moved from the
//! controlling thread to a worker, mutated once there, and moved back for
//! delivery; it is never shared.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use core_async::task::panic_message;

use crate::handle::{AudioHandle, HandleState, InFlightGuard};
use crate::marshal::{self, FaultHandler};
use crate::value::{CompletionValue, ScriptCallback};

/// Identifier assigned to each submitted call, unique per dispatcher.
pub type TaskId = u64;

/// The asynchronous operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Write,
    Flush,
    Close,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Write => "write",
            Operation::Flush => "flush",
            Operation::Close => "close",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) type TaskBody<R> = Box<dyn FnOnce(&mut HandleState) -> R + Send>;

/// Per-call state carried across the thread boundary.
pub struct TaskEnvelope<R: CompletionValue> {
    id: TaskId,
    operation: Operation,
    body: Option<TaskBody<R>>,
    result: R,
    callback: Option<ScriptCallback>,
    guard: Option<InFlightGuard>,
    panic: Option<String>,
}

impl<R: CompletionValue> TaskEnvelope<R> {
    pub(crate) fn new(
        id: TaskId,
        operation: Operation,
        guard: InFlightGuard,
        body: TaskBody<R>,
        callback: ScriptCallback,
    ) -> Self {
        Self {
            id,
            operation,
            body: Some(body),
            result: R::default(),
            callback: Some(callback),
            guard: Some(guard),
            panic: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The result slot. Holds `R::default()` until the body has run.
    pub fn result(&self) -> &R {
        &self.result
    }

    /// The handle this call refers to, while the call is outstanding.
    pub fn handle(&self) -> Option<&AudioHandle> {
        self.guard.as_ref().map(InFlightGuard::handle)
    }
}

impl<R: CompletionValue> fmt::Debug for TaskEnvelope<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskEnvelope")
            .field("id", &self.id)
            .field("operation", &self.operation)
            .field("executed", &self.body.is_none())
            .field("panic", &self.panic)
            .finish()
    }
}

/// Type-erased view of an envelope, as it travels through the completion
/// channel.
pub(crate) trait PendingTask: Send {
    fn id(&self) -> TaskId;

    fn operation(&self) -> Operation;

    /// Run the body on the current (worker) thread. A panic is captured and
    /// leaves the result slot at its default.
    fn execute(&mut self);

    /// Release the handle, then invoke the callback exactly once.
    fn deliver(self: Box<Self>, faults: &mut dyn FaultHandler);
}

impl<R: CompletionValue> PendingTask for TaskEnvelope<R> {
    fn id(&self) -> TaskId {
        self.id
    }

    fn operation(&self) -> Operation {
        self.operation
    }

    fn execute(&mut self) {
        let (Some(body), Some(guard)) = (self.body.take(), self.guard.as_ref()) else {
            return;
        };

        let mut state = guard.handle().lock();
        match panic::catch_unwind(AssertUnwindSafe(|| body(&mut *state))) {
            Ok(result) => self.result = result,
            Err(payload) => self.panic = Some(panic_message(payload.as_ref())),
        }
    }

    fn deliver(mut self: Box<Self>, faults: &mut dyn FaultHandler) {
        // Released first so the callback may issue the next call on the handle.
        drop(self.guard.take());

        let Some(callback) = self.callback.take() else {
            return;
        };
        let result = std::mem::take(&mut self.result);

        marshal::complete(
            self.id,
            self.operation,
            callback,
            result.into_script_value(),
            self.panic.take(),
            faults,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::{Fault, FaultKind};
    use crate::value::ScriptValue;
    use std::sync::mpsc;

    fn envelope<F>(handle: &AudioHandle, body: F, callback: ScriptCallback) -> TaskEnvelope<i32>
    where
        F: FnOnce(&mut HandleState) -> i32 + Send + 'static,
    {
        let guard = handle.try_acquire().unwrap();
        TaskEnvelope::new(1, Operation::Write, guard, Box::new(body), callback)
    }

    #[test]
    fn result_slot_starts_at_default() {
        let handle = AudioHandle::new();
        let env = envelope(&handle, |_| 9, ScriptCallback::from_fn(|_| {}));
        assert_eq!(*env.result(), 0);
        assert_eq!(env.handle().map(AudioHandle::id), Some(handle.id()));
    }

    #[test]
    fn execute_stores_result_and_deliver_releases_handle() {
        let handle = AudioHandle::new();
        let (tx, rx) = mpsc::channel();
        let probe = handle.clone();
        let mut env = envelope(
            &handle,
            |_| 512,
            ScriptCallback::from_fn(move |args| {
                tx.send((args.to_vec(), probe.is_busy())).unwrap();
            }),
        );

        env.execute();
        assert_eq!(*env.result(), 512);
        assert!(handle.is_busy());

        let mut faults: Vec<Fault> = Vec::new();
        Box::new(env).deliver(&mut |fault| faults.push(fault));

        let (args, busy_during_callback) = rx.recv().unwrap();
        assert_eq!(args, vec![ScriptValue::Int(512)]);
        assert!(!busy_during_callback);
        assert!(faults.is_empty());
    }

    #[test]
    fn body_panic_keeps_default_and_reports_fault() {
        let handle = AudioHandle::new();
        let (tx, rx) = mpsc::channel();
        let mut env = envelope(
            &handle,
            |_| panic!("backend exploded"),
            ScriptCallback::from_fn(move |args| tx.send(args.to_vec()).unwrap()),
        );

        env.execute();
        assert_eq!(*env.result(), 0);

        let mut faults = Vec::new();
        Box::new(env).deliver(&mut |fault: Fault| faults.push(fault));

        assert_eq!(rx.recv().unwrap(), vec![ScriptValue::Int(0)]);
        assert_eq!(faults.len(), 1);
        assert!(matches!(
            &faults[0].kind,
            FaultKind::BodyPanicked(message) if message == "backend exploded"
        ));
        assert!(!handle.is_busy());
    }

    #[test]
    fn dropping_undelivered_envelope_releases_handle() {
        let handle = AudioHandle::new();
        let callback = ScriptCallback::from_fn(|_| panic!("must not be called"));
        let env = envelope(&handle, |_| 1, callback);
        assert!(handle.is_busy());
        drop(env);
        assert!(!handle.is_busy());
    }
}
