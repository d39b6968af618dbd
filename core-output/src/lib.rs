//! # Output Core
//!
//! Exposes a native audio-output backend to a single-threaded scripting
//! host. Blocking backend calls run on a worker pool; their results come back
//! through one-shot callbacks delivered on the controlling thread.
//!
//! ## Overview
//!
//! - [`AudioHandle`] - caller-owned stream record
//! - [`OutputBinding`] - Open / Write / Flush / Close and module registration
//! - [`TaskEnvelope`] - per-call state moved to a worker and back
//! - [`WorkDispatcher`] - submits envelope bodies to the pool
//! - [`EventLoop`] - the controlling context; delivers completions
//!
//! ## Usage
//!
//! ```no_run
//! use bridge_desktop::NullOutputModule;
//! use bridge_traits::encoding::Encoding;
//! use bytes::Bytes;
//! use core_output::{AudioHandle, OutputBinding, ScriptCallback};
//! use core_runtime::config::OutputConfig;
//! use std::sync::Arc;
//!
//! let config = OutputConfig::builder()
//!     .output_module(Arc::new(NullOutputModule::new()))
//!     .build()?;
//! let (binding, mut event_loop) = OutputBinding::initialize(&config)?;
//!
//! let handle = AudioHandle::new();
//! assert_eq!(binding.open(&handle, 2, 44100, Encoding::Signed16.code())?, 0);
//!
//! binding.write(
//!     &handle,
//!     Bytes::from(vec![0u8; 1024]),
//!     1024,
//!     ScriptCallback::from_fn(|args| println!("wrote {:?}", args)),
//! )?;
//! event_loop.run();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binding;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod event_loop;
pub mod exports;
pub mod handle;
pub mod marshal;
pub mod value;

pub use binding::{OutputBinding, OBSERVED_FLUSH_RESULT};
pub use dispatcher::WorkDispatcher;
pub use envelope::{Operation, TaskEnvelope, TaskId};
pub use error::{OutputError, Result};
pub use event_loop::EventLoop;
pub use exports::{ModuleExports, METHOD_NAMES};
pub use handle::{AudioHandle, HandlePhase, HandleState, HANDLE_RECORD_SIZE};
pub use marshal::{Fault, FaultHandler, FaultKind, LogFaultHandler};
pub use value::{CompletionValue, ScriptCallback, ScriptError, ScriptValue};
