//! # Output Binding
//!
//! The four caller-facing operations. Open runs synchronously on the calling
//! thread; Write, Flush and Close are checked synchronously and then run on
//! the worker pool, reporting through their callback.

use std::sync::Arc;

use bridge_traits::output::{OutputModule, Status, StreamParams, STATUS_ERR, STATUS_OK};
use bytes::Bytes;
use core_runtime::config::{FlushReporting, OutputConfig};
use tracing::{debug, instrument, trace};

use crate::dispatcher::WorkDispatcher;
use crate::envelope::{Operation, TaskId};
use crate::error::{OutputError, Result};
use crate::event_loop::EventLoop;
use crate::exports::ModuleExports;
use crate::handle::{AudioHandle, HandlePhase, HandleState, InFlightGuard};
use crate::value::ScriptCallback;

/// Value a flush callback receives under [`FlushReporting::Observed`].
pub const OBSERVED_FLUSH_RESULT: Status = 1;

/// Entry point of the output core. Cheap to clone and shareable across
/// threads; completions are still delivered only by the owning
/// [`EventLoop`].
#[derive(Clone)]
pub struct OutputBinding {
    module: Arc<dyn OutputModule>,
    dispatcher: WorkDispatcher,
    flush_reporting: FlushReporting,
    exports: Arc<ModuleExports>,
}

impl OutputBinding {
    /// Register the configured backend and start the worker pool.
    ///
    /// Returns the binding together with the event loop that delivers its
    /// completions.
    pub fn initialize(config: &OutputConfig) -> Result<(Self, EventLoop)> {
        config.validate()?;
        let event_loop = EventLoop::new(&config.dispatch)?;
        let binding = Self::with_dispatcher(config, event_loop.dispatcher());
        Ok((binding, event_loop))
    }

    /// Bind to an existing event loop's dispatcher.
    pub fn with_dispatcher(config: &OutputConfig, dispatcher: WorkDispatcher) -> Self {
        let module = Arc::clone(&config.output_module);
        let exports = ModuleExports::register(module.as_ref(), &config.probe_params);

        Self {
            module,
            dispatcher,
            flush_reporting: config.dispatch.flush_reporting,
            exports: Arc::new(exports),
        }
    }

    pub fn exports(&self) -> &ModuleExports {
        &self.exports
    }

    pub fn module(&self) -> &Arc<dyn OutputModule> {
        &self.module
    }

    pub fn flush_reporting(&self) -> FlushReporting {
        self.flush_reporting
    }

    /// Reset `handle`, configure it and open the backend stream.
    ///
    /// Returns the backend status: `0` on success, the non-zero status of
    /// whichever of `init` or `open` failed otherwise.
    #[instrument(skip(self, handle), fields(handle = handle.id()))]
    pub fn open(&self, handle: &AudioHandle, channels: i32, rate: i32, format: i32) -> Result<Status> {
        let _guard = handle.try_acquire()?;
        let mut state = handle.lock();

        state.reset();
        state.params = StreamParams::new(channels, rate, format);
        let params = state.params;

        let mut output = match self.module.init(&params) {
            Ok(output) => output,
            Err(status) => {
                let status = if status == STATUS_OK { STATUS_ERR } else { status };
                debug!(status, "Backend init failed");
                return Ok(status);
            }
        };

        let status = output.open(&params);
        state.output = Some(output);
        state.phase = if status == STATUS_OK {
            HandlePhase::Open
        } else {
            HandlePhase::Initialized
        };

        debug!(status, phase = ?state.phase, "Open finished");
        Ok(status)
    }

    /// Write the first `length` bytes of `buffer`. The callback receives the
    /// byte count the backend reported, short or negative counts included.
    pub fn write(
        &self,
        handle: &AudioHandle,
        buffer: Bytes,
        length: usize,
        callback: ScriptCallback,
    ) -> Result<TaskId> {
        if length > buffer.len() || i32::try_from(length).is_err() {
            return Err(OutputError::BufferOutOfBounds {
                length,
                available: buffer.len(),
            });
        }

        let guard = acquire(handle, Operation::Write, &[HandlePhase::Open])?;
        let chunk = buffer.slice(..length);

        self.dispatcher.submit(
            Operation::Write,
            guard,
            move |state: &mut HandleState| match state.output.as_mut() {
                Some(output) => output.write(&chunk),
                None => STATUS_ERR,
            },
            callback,
        )
    }

    /// Ask the backend to push buffered audio out.
    ///
    /// See [`FlushReporting`] for the value the callback receives.
    pub fn flush(&self, handle: &AudioHandle, callback: ScriptCallback) -> Result<TaskId> {
        let guard = acquire(handle, Operation::Flush, &[HandlePhase::Open])?;
        let reporting = self.flush_reporting;

        self.dispatcher.submit(
            Operation::Flush,
            guard,
            move |state: &mut HandleState| {
                let flushed = match state.output.as_mut() {
                    Some(output) if output.supports_flush() => {
                        output.flush();
                        true
                    }
                    _ => false,
                };
                trace!(flushed, "Flush body finished");

                match reporting {
                    FlushReporting::Observed => OBSERVED_FLUSH_RESULT,
                    FlushReporting::Corrected => STATUS_OK,
                }
            },
            callback,
        )
    }

    /// Close the stream and release backend state. The callback receives
    /// `deinit`'s status when the backend has one, `0` otherwise. The handle
    /// ends up [`HandlePhase::Closed`].
    pub fn close(&self, handle: &AudioHandle, callback: ScriptCallback) -> Result<TaskId> {
        let guard = acquire(
            handle,
            Operation::Close,
            &[HandlePhase::Initialized, HandlePhase::Open],
        )?;

        self.dispatcher.submit(
            Operation::Close,
            guard,
            |state: &mut HandleState| {
                let mut status = STATUS_OK;
                if let Some(mut output) = state.output.take() {
                    output.close();
                    if output.supports_deinit() {
                        status = output.deinit();
                    }
                }
                state.phase = HandlePhase::Closed;
                status
            },
            callback,
        )
    }
}

/// Claim the handle, then check it is in one of `allowed`.
fn acquire(
    handle: &AudioHandle,
    operation: Operation,
    allowed: &[HandlePhase],
) -> Result<InFlightGuard> {
    let guard = handle.try_acquire()?;
    let phase = handle.phase();
    if !allowed.contains(&phase) {
        return Err(OutputError::HandleNotOpen {
            handle: handle.id(),
            operation,
            phase,
        });
    }
    Ok(guard)
}

impl std::fmt::Debug for OutputBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputBinding")
            .field("backend", &self.module.info().name)
            .field("dispatcher", &self.dispatcher)
            .field("flush_reporting", &self.flush_reporting)
            .finish()
    }
}
