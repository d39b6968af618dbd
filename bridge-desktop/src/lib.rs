//! # Desktop Output Backends
//!
//! Concrete [`OutputModule`] implementations for desktop hosts.
//!
//! ## Overview
//!
//! - [`NullOutputModule`] - accepts and discards every write, optionally
//!   sleeping for the duration the audio would take to play
//! - [`RawFileOutputModule`] - appends raw interleaved PCM to a file
//!
//! Exactly one of them is the compiled-in backend returned by
//! [`default_module`]; the `raw-file-default` feature switches it from the
//! null sink to the raw file sink.
//!
//! ## Usage
//!
//! ```
//! use bridge_desktop::NullOutputModule;
//! use bridge_traits::output::{OutputModule, StreamParams};
//!
//! let module = NullOutputModule::new();
//! let mut output = module.init(&StreamParams::probe_default()).unwrap();
//! assert_eq!(output.open(&StreamParams::probe_default()), 0);
//! assert_eq!(output.write(&[0u8; 64]), 64);
//! output.close();
//! ```

mod null;
mod raw_file;

pub use null::{NullOutput, NullOutputModule};
pub use raw_file::{RawFileOutput, RawFileOutputModule};

use bridge_traits::encoding::Encoding;
use bridge_traits::output::{OutputModule, Status, StreamParams, STATUS_ERR};
use std::sync::Arc;

/// Module API revision reported by the desktop backends.
pub const OUTPUT_API_VERSION: i32 = 2;

/// The backend linked into this build.
#[cfg(not(feature = "raw-file-default"))]
pub fn default_module() -> Arc<dyn OutputModule> {
    Arc::new(NullOutputModule::paced())
}

/// The backend linked into this build.
#[cfg(feature = "raw-file-default")]
pub fn default_module() -> Arc<dyn OutputModule> {
    Arc::new(RawFileOutputModule::in_cache_dir())
}

/// Bitmask with every known encoding set.
pub(crate) fn all_formats() -> i32 {
    Encoding::ALL
        .iter()
        .fold(0, |mask, encoding| mask | encoding.code())
}

/// Shared parameter check for both backends: positive channel count and
/// rate, and a known encoding.
pub(crate) fn validate_params(params: &StreamParams) -> Result<(), Status> {
    if params.channels <= 0 || params.rate <= 0 || params.encoding().is_none() {
        tracing::warn!(
            channels = params.channels,
            rate = params.rate,
            format = params.format,
            "Rejecting stream parameters"
        );
        return Err(STATUS_ERR);
    }
    Ok(())
}
