//! Output backend contract.
//!
//! A backend is split in two. The [`OutputModule`] is the static, shareable
//! part: metadata and the `init` entry point. `init` hands back a boxed
//! [`AudioOutput`], which plays the role of the per-stream function table and
//! carries whatever state the backend needs for that stream.
//!
//! Optional primitives (`flush`, `deinit`) are advertised through
//! `supports_flush` / `supports_deinit` rather than being silently no-ops, so
//! callers can tell "absent" apart from "present and did nothing".

use serde::{Deserialize, Serialize};

use crate::encoding::Encoding;

/// Integer status returned by backend primitives. `0` means success.
pub type Status = i32;

/// Success.
pub const STATUS_OK: Status = 0;

/// Generic failure, used when a backend reports failure without a code.
pub const STATUS_ERR: Status = -1;

/// Stream configuration written into a handle before `init`.
///
/// Fields are raw integers: they come straight from the caller and it is the
/// backend's job to reject values it cannot honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamParams {
    /// Number of interleaved channels.
    pub channels: i32,
    /// Sample rate in hertz.
    pub rate: i32,
    /// Encoding code (see [`Encoding`]).
    pub format: i32,
}

impl StreamParams {
    pub fn new(channels: i32, rate: i32, format: i32) -> Self {
        Self {
            channels,
            rate,
            format,
        }
    }

    /// The configuration used to probe supported formats at registration.
    pub fn probe_default() -> Self {
        Self::new(2, 44100, Encoding::Signed16.code())
    }

    /// The encoding, when `format` is a known code.
    pub fn encoding(&self) -> Option<Encoding> {
        Encoding::from_code(self.format)
    }

    /// Bytes per interleaved frame, when the configuration is valid.
    pub fn frame_size(&self) -> Option<usize> {
        let channels = usize::try_from(self.channels).ok().filter(|c| *c > 0)?;
        Some(self.encoding()?.sample_size() * channels)
    }

    /// Bytes consumed per second of audio, when the configuration is valid.
    pub fn byte_rate(&self) -> Option<usize> {
        let rate = usize::try_from(self.rate).ok().filter(|r| *r > 0)?;
        Some(self.frame_size()? * rate)
    }
}

/// Static description of the linked backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub api_version: i32,
    pub name: String,
    pub description: String,
    pub revision: String,
}

impl ModuleInfo {
    pub fn new(
        api_version: i32,
        name: impl Into<String>,
        description: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            api_version,
            name: name.into(),
            description: description.into(),
            revision: revision.into(),
        }
    }
}

/// The linked backend.
///
/// # Example
///
/// ```ignore
/// let output = module.init(&StreamParams::probe_default())?;
/// ```
pub trait OutputModule: Send + Sync {
    /// Metadata exported at registration.
    fn info(&self) -> &ModuleInfo;

    /// Populate a stream for `params`.
    ///
    /// On failure returns the backend's non-zero status. A returned status of
    /// `0` is a contract violation; the core treats it as [`STATUS_ERR`].
    fn init(&self, params: &StreamParams) -> Result<Box<dyn AudioOutput>, Status>;
}

/// Per-stream primitives installed by [`OutputModule::init`].
///
/// Every method except `open` and `get_formats` may block; the core only
/// calls them from worker threads.
pub trait AudioOutput: Send {
    /// Open the sink. `0` on success.
    fn open(&mut self, params: &StreamParams) -> Status;

    /// Write up to `buffer.len()` bytes. Returns the number written, which may
    /// be short, or a negative backend error.
    fn write(&mut self, buffer: &[u8]) -> i32;

    /// Whether [`flush`](Self::flush) is implemented.
    fn supports_flush(&self) -> bool {
        false
    }

    /// Push buffered audio out to the device.
    fn flush(&mut self) {}

    /// Release the open sink.
    fn close(&mut self);

    /// Whether [`deinit`](Self::deinit) is implemented.
    fn supports_deinit(&self) -> bool {
        false
    }

    /// Release backend state after `close`.
    fn deinit(&mut self) -> Status {
        STATUS_OK
    }

    /// Bitmask of encodings supported for `params`' channels and rate.
    fn get_formats(&self, params: &StreamParams) -> i32;
}
