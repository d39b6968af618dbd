//! # Audio Handle
//!
//! The record describing one output stream. Callers allocate it with
//! [`AudioHandle::new`] and keep it for as long as they like; the core only
//! initializes and mutates it, and holds clones only while a call that
//! references it is outstanding.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bridge_traits::output::{AudioOutput, StreamParams};
use parking_lot::{Mutex, MutexGuard};

use crate::error::{OutputError, Result};

/// Byte size of the handle record, exported as `sizeof_audio_output_t`.
pub const HANDLE_RECORD_SIZE: usize = std::mem::size_of::<HandleState>();

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Where a handle is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlePhase {
    /// Never opened, or reset by a failed `init`.
    Zeroed,
    /// `init` succeeded but `open` did not. Only Close is accepted.
    Initialized,
    /// Ready for Write, Flush and Close.
    Open,
    /// Terminal. The backend stream has been dropped.
    Closed,
}

/// Mutable contents of a handle.
pub struct HandleState {
    pub(crate) params: StreamParams,
    pub(crate) output: Option<Box<dyn AudioOutput>>,
    pub(crate) phase: HandlePhase,
}

impl HandleState {
    fn zeroed() -> Self {
        Self {
            params: StreamParams::default(),
            output: None,
            phase: HandlePhase::Zeroed,
        }
    }

    /// Return to the all-zero state. Any previous stream is dropped
    /// without being closed.
    pub(crate) fn reset(&mut self) {
        *self = Self::zeroed();
    }
}

struct HandleInner {
    id: u64,
    busy: AtomicBool,
    state: Mutex<HandleState>,
}

/// Caller-owned output stream record.
///
/// Cloning is cheap and every clone refers to the same stream.
#[derive(Clone)]
pub struct AudioHandle {
    inner: Arc<HandleInner>,
}

impl AudioHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
                busy: AtomicBool::new(false),
                state: Mutex::new(HandleState::zeroed()),
            }),
        }
    }

    /// Process-unique identifier, used in logs and errors.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn phase(&self) -> HandlePhase {
        self.inner.state.lock().phase
    }

    /// The channels, rate and format last written by Open.
    pub fn params(&self) -> StreamParams {
        self.inner.state.lock().params
    }

    /// Whether a call referencing this handle is outstanding.
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Mark the handle busy for the lifetime of the returned guard.
    pub(crate) fn try_acquire(&self) -> Result<InFlightGuard> {
        self.inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| OutputError::HandleBusy { handle: self.id() })?;

        Ok(InFlightGuard {
            handle: self.clone(),
        })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, HandleState> {
        self.inner.state.lock()
    }
}

impl Default for AudioHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AudioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("AudioHandle")
            .field("id", &self.inner.id)
            .field("phase", &state.phase)
            .field("params", &state.params)
            .field("busy", &self.is_busy())
            .finish()
    }
}

/// Holds a handle's busy flag. Dropping it releases the flag, wherever the
/// owning envelope ends up being dropped.
pub(crate) struct InFlightGuard {
    handle: AudioHandle,
}

impl InFlightGuard {
    pub(crate) fn handle(&self) -> &AudioHandle {
        &self.handle
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.handle.inner.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_handle_is_zeroed() {
        let handle = AudioHandle::new();
        assert_eq!(handle.phase(), HandlePhase::Zeroed);
        assert_eq!(handle.params(), StreamParams::default());
        assert!(!handle.is_busy());
    }

    #[test]
    fn ids_are_unique() {
        let a = AudioHandle::new();
        let b = AudioHandle::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn guard_is_exclusive_and_released_on_drop() {
        let handle = AudioHandle::new();
        let guard = handle.try_acquire().unwrap();
        assert!(handle.is_busy());

        let clone = handle.clone();
        assert!(matches!(
            clone.try_acquire(),
            Err(OutputError::HandleBusy { handle: id }) if id == handle.id()
        ));

        drop(guard);
        assert!(!handle.is_busy());
        assert!(clone.try_acquire().is_ok());
    }

    #[test]
    fn reset_clears_state() {
        let handle = AudioHandle::new();
        {
            let mut state = handle.lock();
            state.params = StreamParams::probe_default();
            state.phase = HandlePhase::Open;
            state.reset();
        }
        assert_eq!(handle.phase(), HandlePhase::Zeroed);
        assert_eq!(handle.params().channels, 0);
    }

    #[test]
    fn record_size_is_nonzero() {
        assert!(HANDLE_RECORD_SIZE >= std::mem::size_of::<StreamParams>());
    }
}
