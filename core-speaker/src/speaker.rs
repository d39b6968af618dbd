//! A writable PCM sink.
//!
//! [`Speaker`] sits on top of [`OutputBinding`]: it picks the encoding from
//! its [`PcmFormat`], opens the native stream on the first write, cuts
//! incoming chunks into backend-sized pieces and reports its lifecycle on an
//! [`EventBus`].
//!
//! Completions (`done`) run on whichever thread drives the [`EventLoop`],
//! except when an operation finishes without touching the backend, in which
//! case `done` runs before the method returns.
//!
//! [`EventLoop`]: core_output::EventLoop

use std::fmt;
use std::sync::Arc;

use bridge_traits::output::{STATUS_ERR, STATUS_OK};
use bytes::Bytes;
use core_output::{AudioHandle, HandlePhase, OutputBinding, ScriptCallback, ScriptValue};
use core_runtime::events::{EventBus, EventSeverity, EventStream, SpeakerEvent};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{Result, SpeakerError};
use crate::format::{format_constant, PcmFormat, SpeakerOptions};
use crate::module::{self, FormatQuery};

/// Completion of a speaker operation.
pub type Done = Box<dyn FnOnce(Result<()>) + Send + 'static>;

struct SpeakerState {
    format: PcmFormat,
    handle: Option<AudioHandle>,
    closing: bool,
    closed: bool,
    close_waiters: Vec<Done>,
}

/// A `done` that either the backend callback or the submitting code fires,
/// whichever gets to it first.
#[derive(Clone)]
struct PendingDone(Arc<Mutex<Option<Done>>>);

impl PendingDone {
    fn new(done: Done) -> Self {
        Self(Arc::new(Mutex::new(Some(done))))
    }

    fn take(&self) -> Option<Done> {
        self.0.lock().take()
    }

    fn finish(&self, result: Result<()>) {
        if let Some(done) = self.take() {
            done(result);
        }
    }
}

/// PCM sink writing to the linked output backend.
///
/// Cloning is cheap; clones share the stream and the event bus.
#[derive(Clone)]
pub struct Speaker {
    binding: OutputBinding,
    events: EventBus,
    state: Arc<Mutex<SpeakerState>>,
}

impl Speaker {
    /// Create a speaker. Nothing is opened until the first write.
    pub fn new(binding: OutputBinding, options: &SpeakerOptions) -> Result<Self> {
        let format = PcmFormat::resolve(options, None)?;
        debug!(?format, "Created speaker");

        Ok(Self {
            binding,
            events: EventBus::default(),
            state: Arc::new(Mutex::new(SpeakerState {
                format,
                handle: None,
                closing: false,
                closed: false,
                close_waiters: Vec::new(),
            })),
        })
    }

    pub fn binding(&self) -> &OutputBinding {
        &self.binding
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub fn pcm_format(&self) -> PcmFormat {
        self.state.lock().format.clone()
    }

    /// Re-apply `options`, keeping earlier values for anything left unset.
    /// Takes effect on the next open.
    pub fn format(&self, options: &SpeakerOptions) -> Result<()> {
        let mut state = self.state.lock();
        let format = PcmFormat::resolve(options, Some(&state.format))?;
        debug!(?format, "Speaker format updated");
        state.format = format;
        Ok(())
    }

    pub fn handle(&self) -> Option<AudioHandle> {
        self.state.lock().handle.clone()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().handle.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn backend(&self) -> &str {
        module::backend(&self.binding)
    }

    pub fn description(&self) -> &str {
        module::description(&self.binding)
    }

    pub fn version(&self) -> String {
        module::version(&self.binding)
    }

    pub fn is_supported<'a>(&self, query: impl Into<FormatQuery<'a>>) -> bool {
        module::is_supported(&self.binding, query)
    }

    /// Open the native stream for the current format.
    ///
    /// Failures are also reported as [`SpeakerEvent::Error`].
    #[instrument(skip(self))]
    pub fn open(&self) -> Result<AudioHandle> {
        let mut state = self.state.lock();
        if state.handle.is_some() {
            return Err(self.report(SpeakerError::AlreadyOpen));
        }

        let format = state.format.clone();
        let Some(encoding) = format_constant(&format) else {
            return Err(self.report(SpeakerError::InvalidFormat));
        };

        let handle = AudioHandle::new();
        let status = self
            .binding
            .open(&handle, format.channels, format.sample_rate, encoding.code())
            .map_err(|err| self.report(err.into()))?;
        if status != STATUS_OK {
            if handle.phase() == HandlePhase::Initialized {
                self.release_unopened(&handle);
            }
            return Err(self.report(SpeakerError::OpenFailed(status)));
        }

        debug!(handle = handle.id(), ?encoding, "Speaker opened");
        state.handle = Some(handle.clone());
        drop(state);

        self.emit(SpeakerEvent::Open);
        Ok(handle)
    }

    /// Run close (and deinit) on a handle whose init succeeded but whose open
    /// did not.
    fn release_unopened(&self, handle: &AudioHandle) {
        let id = handle.id();
        let released = ScriptCallback::from_fn(move |_args: &[ScriptValue]| {
            debug!(handle = id, "Released stream that failed to open");
        });
        if let Err(err) = self.binding.close(handle, released) {
            warn!(handle = id, error = %err, "Could not release stream that failed to open");
        }
    }

    /// Write `chunk`, opening the stream first if needed.
    ///
    /// The chunk goes out in pieces of `block_align * samples_per_frame`
    /// bytes, one after the other. Each accepted piece emits
    /// [`SpeakerEvent::Drain`]; a short write emits [`SpeakerEvent::Error`]
    /// and completes without writing the rest.
    pub fn write<F>(&self, chunk: Bytes, done: F)
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let (existing, format) = {
            let state = self.state.lock();
            if state.closed || state.closing {
                drop(state);
                debug!("Write after close ignored");
                return done(Ok(()));
            }
            (state.handle.clone(), state.format.clone())
        };

        let handle = match existing {
            Some(handle) => handle,
            None => match self.open() {
                Ok(handle) => handle,
                Err(err) => return done(Err(err)),
            },
        };

        let piece_size = match format.chunk_size() {
            0 => chunk.len().max(1),
            size => size,
        };
        self.write_piece(handle, chunk, piece_size, Box::new(done));
    }

    fn write_piece(&self, handle: AudioHandle, mut remaining: Bytes, piece_size: usize, done: Done) {
        if self.state.lock().closed {
            return done(Ok(()));
        }

        let piece = if remaining.len() > piece_size {
            remaining.split_to(piece_size)
        } else {
            std::mem::take(&mut remaining)
        };
        let expected = piece.len();

        let pending = PendingDone::new(done);
        let on_written = pending.clone();
        let speaker = self.clone();
        let next_handle = handle.clone();

        let callback = ScriptCallback::new(move |args: &[ScriptValue]| {
            let Some(done) = on_written.take() else {
                return Ok(());
            };
            let written = args.first().and_then(ScriptValue::as_i32).unwrap_or(STATUS_ERR);

            if usize::try_from(written).ok() != Some(expected) {
                warn!(written, expected, "Short write");
                speaker.report(SpeakerError::WriteFailed(written));
                done(Ok(()));
            } else {
                speaker.emit(SpeakerEvent::Drain);
                if remaining.is_empty() {
                    done(Ok(()));
                } else {
                    speaker.write_piece(next_handle, remaining, piece_size, done);
                }
            }
            Ok(())
        });

        if let Err(err) = self.binding.write(&handle, piece, expected, callback) {
            pending.finish(Err(err.into()));
        }
    }

    /// Close the stream. Later calls complete immediately, and calls made
    /// while the native close is running complete together with it.
    ///
    /// [`SpeakerEvent::Close`] is emitted once, when the speaker first
    /// becomes closed.
    pub fn close<F>(&self, done: F)
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let mut state = self.state.lock();
        if state.closed {
            drop(state);
            return done(Ok(()));
        }
        if state.closing {
            state.close_waiters.push(Box::new(done));
            return;
        }

        let Some(handle) = state.handle.clone() else {
            debug!("Closing a speaker that was never opened");
            state.closed = true;
            drop(state);
            self.emit(SpeakerEvent::Close);
            return done(Ok(()));
        };

        let speaker = self.clone();
        let callback = ScriptCallback::new(move |_args: &[ScriptValue]| {
            speaker.finish_close();
            Ok(())
        });

        // The callback needs this lock, so it cannot run before the waiter
        // is queued.
        match self.binding.close(&handle, callback) {
            Ok(task) => {
                debug!(task, handle = handle.id(), "Speaker closing");
                state.closing = true;
                state.close_waiters.push(Box::new(done));
            }
            Err(err) => {
                drop(state);
                done(Err(self.report(err.into())));
            }
        }
    }

    fn finish_close(&self) {
        let waiters = {
            let mut state = self.state.lock();
            state.handle = None;
            state.closing = false;
            state.closed = true;
            std::mem::take(&mut state.close_waiters)
        };

        debug!(waiters = waiters.len(), "Speaker closed");
        self.emit(SpeakerEvent::Close);
        for done in waiters {
            done(Ok(()));
        }
    }

    /// Flush the backend, then close. Completes immediately when nothing
    /// was ever opened.
    pub fn flush<F>(&self, done: F)
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let Some(handle) = self.handle() else {
            return done(Ok(()));
        };

        let pending = PendingDone::new(Box::new(done));
        let on_flushed = pending.clone();
        let speaker = self.clone();

        let callback = ScriptCallback::new(move |_args: &[ScriptValue]| {
            speaker.emit(SpeakerEvent::Flush);
            if let Some(done) = on_flushed.take() {
                speaker.close(done);
            }
            Ok(())
        });

        if let Err(err) = self.binding.flush(&handle, callback) {
            pending.finish(Err(self.report(err.into())));
        }
    }

    /// Write the last chunk, if any, then close.
    pub fn end<F>(&self, chunk: Option<Bytes>, done: F)
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        match chunk {
            Some(chunk) => {
                let speaker = self.clone();
                self.write(chunk, move |result| match result {
                    Ok(()) => speaker.close(done),
                    Err(err) => done(Err(err)),
                });
            }
            None => self.close(done),
        }
    }

    fn emit(&self, event: SpeakerEvent) {
        match event.severity() {
            EventSeverity::Error | EventSeverity::Warning => {
                warn!(event = event.description(), details = ?event, "Speaker event")
            }
            EventSeverity::Info => info!(event = event.description(), "Speaker event"),
            EventSeverity::Debug => trace!(event = event.description(), "Speaker event"),
        }
        // No subscribers is fine.
        let _ = self.events.emit(event);
    }

    fn report(&self, err: SpeakerError) -> SpeakerError {
        self.emit(SpeakerEvent::Error {
            message: err.to_string(),
        });
        err
    }
}

impl fmt::Debug for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Speaker")
            .field("backend", &self.backend())
            .field("format", &state.format)
            .field("handle", &state.handle.as_ref().map(AudioHandle::id))
            .field("closing", &state.closing)
            .field("closed", &state.closed)
            .finish()
    }
}
