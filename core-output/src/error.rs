//! # Output Error Types
//!
//! Errors raised synchronously by the binding, before any work reaches the
//! pool. Backend failures are never errors here: they travel as integer
//! statuses through the return value of `open` or through callbacks.

use thiserror::Error;

use crate::envelope::Operation;
use crate::handle::HandlePhase;

#[derive(Error, Debug)]
pub enum OutputError {
    /// The handle already has a call in flight.
    #[error("Handle {handle} is busy with an outstanding call")]
    HandleBusy { handle: u64 },

    /// The handle is not in a phase that accepts the operation.
    #[error("Cannot {operation} handle {handle} in phase {phase:?}")]
    HandleNotOpen {
        handle: u64,
        operation: Operation,
        phase: HandlePhase,
    },

    /// The requested write length is larger than the buffer or than a
    /// backend can report.
    #[error("Write of {length} bytes is out of bounds (buffer holds {available})")]
    BufferOutOfBounds { length: usize, available: usize },

    /// The event loop has been torn down.
    #[error("Work dispatcher has been shut down")]
    DispatcherClosed,

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    /// The worker pool could not be created.
    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OutputError>;
