//! # Output Bridge Traits
//!
//! The contract between the output core and the audio backend it drives.
//!
//! ## Overview
//!
//! Exactly one backend is linked into a build. The core never talks to a
//! device directly; it calls through [`OutputModule`](output::OutputModule)
//! to initialize a stream and through [`AudioOutput`](output::AudioOutput)
//! for everything afterwards. Statuses cross this boundary as plain integers
//! so backends can pass their native error codes through untouched.
//!
//! ## Traits
//!
//! - [`OutputModule`](output::OutputModule) - static metadata plus `init`
//! - [`AudioOutput`](output::AudioOutput) - the per-stream function table
//! - [`LoggerSink`](log_sink::LoggerSink) - forward structured logs to host logging
//!
//! ## Thread Safety
//!
//! Modules are shared (`Send + Sync`). A stream is `Send` only: the core moves
//! it to whichever worker thread runs the current call, and never lets two
//! threads touch it at once.
//!
//! ## Examples
//!
//! ```
//! use bridge_traits::output::{AudioOutput, ModuleInfo, OutputModule, Status, StreamParams};
//!
//! struct Silent;
//!
//! impl AudioOutput for Silent {
//!     fn open(&mut self, _params: &StreamParams) -> Status { 0 }
//!     fn write(&mut self, buffer: &[u8]) -> i32 { buffer.len() as i32 }
//!     fn close(&mut self) {}
//!     fn get_formats(&self, _params: &StreamParams) -> i32 { 0 }
//! }
//!
//! struct SilentModule(ModuleInfo);
//!
//! impl OutputModule for SilentModule {
//!     fn info(&self) -> &ModuleInfo { &self.0 }
//!     fn init(&self, _params: &StreamParams) -> Result<Box<dyn AudioOutput>, Status> {
//!         Ok(Box::new(Silent))
//!     }
//! }
//! ```

pub mod encoding;
pub mod error;
pub mod log_sink;
pub mod output;

pub use encoding::Encoding;
pub use error::BridgeError;

pub use log_sink::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use output::{
    AudioOutput, ModuleInfo, OutputModule, Status, StreamParams, STATUS_ERR, STATUS_OK,
};
