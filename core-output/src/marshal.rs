//! # Completion Marshaler
//!
//! Runs on the controlling thread. Turns a finished envelope's result into a
//! callback argument, invokes the callback exactly once and escalates
//! anything that went wrong to the host's [`FaultHandler`].

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use core_async::task::panic_message;
use tracing::{debug, error};

use crate::envelope::{Operation, TaskId};
use crate::value::{ScriptCallback, ScriptError, ScriptValue};

/// What went wrong while completing a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    /// The callback returned an error.
    CallbackFailed(ScriptError),
    /// The callback panicked.
    CallbackPanicked(String),
    /// The backend call panicked on the worker. The callback still ran with
    /// the default result.
    BodyPanicked(String),
}

/// A failure escalated to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub task: TaskId,
    pub operation: Operation,
    pub kind: FaultKind,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FaultKind::CallbackFailed(err) => {
                write!(f, "{} callback of task {} failed: {}", self.operation, self.task, err)
            }
            FaultKind::CallbackPanicked(message) => {
                write!(f, "{} callback of task {} panicked: {}", self.operation, self.task, message)
            }
            FaultKind::BodyPanicked(message) => {
                write!(f, "{} of task {} panicked on a worker: {}", self.operation, self.task, message)
            }
        }
    }
}

/// The host's top-level handler for uncaught callback failures.
pub trait FaultHandler: Send {
    fn handle(&mut self, fault: Fault);
}

impl<F> FaultHandler for F
where
    F: FnMut(Fault) + Send,
{
    fn handle(&mut self, fault: Fault) {
        self(fault)
    }
}

/// Default handler: logs every fault at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFaultHandler;

impl FaultHandler for LogFaultHandler {
    fn handle(&mut self, fault: Fault) {
        error!(task = fault.task, operation = %fault.operation, "{}", fault);
    }
}

pub(crate) fn complete(
    task: TaskId,
    operation: Operation,
    callback: ScriptCallback,
    value: ScriptValue,
    body_panic: Option<String>,
    faults: &mut dyn FaultHandler,
) {
    if let Some(message) = body_panic {
        faults.handle(Fault {
            task,
            operation,
            kind: FaultKind::BodyPanicked(message),
        });
    }

    debug!(task, operation = %operation, result = ?value, "Invoking completion callback");

    let args = [value];
    let kind = match panic::catch_unwind(AssertUnwindSafe(|| callback.call(&args))) {
        Ok(Ok(())) => return,
        Ok(Err(err)) => FaultKind::CallbackFailed(err),
        Err(payload) => FaultKind::CallbackPanicked(panic_message(payload.as_ref())),
    };

    faults.handle(Fault {
        task,
        operation,
        kind,
    });
}
