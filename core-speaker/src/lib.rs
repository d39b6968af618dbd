//! # Speaker
//!
//! A PCM sink over [`core_output`]. Callers describe their audio with
//! [`SpeakerOptions`], push chunks with [`Speaker::write`] and finish with
//! [`Speaker::end`], [`Speaker::flush`] or [`Speaker::close`]. Lifecycle
//! events ([`SpeakerEvent`]) are broadcast to every subscriber.
//!
//! ```no_run
//! use bridge_desktop::NullOutputModule;
//! use bytes::Bytes;
//! use core_output::OutputBinding;
//! use core_runtime::config::OutputConfig;
//! use core_speaker::{Speaker, SpeakerOptions};
//! use std::sync::Arc;
//!
//! let config = OutputConfig::builder()
//!     .output_module(Arc::new(NullOutputModule::new()))
//!     .build()?;
//! let (binding, mut event_loop) = OutputBinding::initialize(&config)?;
//!
//! let speaker = Speaker::new(binding, &SpeakerOptions::new().with_sample_rate(48000))?;
//! speaker.end(Some(Bytes::from(vec![0u8; 8192])), |result| {
//!     if let Err(err) = result {
//!         eprintln!("playback failed: {err}");
//!     }
//! });
//! event_loop.run();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod format;
pub mod module;
pub mod speaker;

pub use core_runtime::events::{EventStream, SpeakerEvent};
pub use error::{Result, SpeakerError};
pub use format::{format_constant, Endianness, PcmFormat, SpeakerOptions};
pub use module::{backend, description, is_supported, supported_formats, version, FormatQuery};
pub use speaker::{Done, Speaker};
