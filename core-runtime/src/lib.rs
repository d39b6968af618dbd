//! # Core Runtime Module
//!
//! Ambient infrastructure shared by the output core and the speaker layer:
//! - Logging and tracing setup
//! - Configuration (`OutputConfig` and the JSON-loadable `DispatchSettings`)
//! - Event bus for speaker lifecycle events
//!
//! Nothing here performs audio I/O. The backend is only carried through
//! [`config::OutputConfig`] so the output core receives it by injection.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{DispatchSettings, FlushReporting, OutputConfig, OutputConfigBuilder};
pub use error::{Error, Result};
