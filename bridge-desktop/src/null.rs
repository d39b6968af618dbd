//! Discarding output sink.

use bridge_traits::output::{
    AudioOutput, ModuleInfo, OutputModule, Status, StreamParams, STATUS_ERR, STATUS_OK,
};
use std::time::Duration;
use tracing::debug;

use crate::{all_formats, validate_params, OUTPUT_API_VERSION};

/// Backend whose streams accept and drop all audio.
///
/// With pacing enabled each write sleeps for as long as the audio it carries
/// would take to play, so callers see realistic back-pressure.
#[derive(Debug, Clone)]
pub struct NullOutputModule {
    info: ModuleInfo,
    paced: bool,
}

impl NullOutputModule {
    /// Unpaced: writes return immediately.
    pub fn new() -> Self {
        Self {
            info: ModuleInfo::new(
                OUTPUT_API_VERSION,
                "null",
                "Discards all audio; optionally paced at the stream's byte rate",
                env!("CARGO_PKG_VERSION"),
            ),
            paced: false,
        }
    }

    /// Paced: writes block for the playback duration of their payload.
    pub fn paced() -> Self {
        Self {
            paced: true,
            ..Self::new()
        }
    }
}

impl Default for NullOutputModule {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputModule for NullOutputModule {
    fn info(&self) -> &ModuleInfo {
        &self.info
    }

    fn init(&self, params: &StreamParams) -> Result<Box<dyn AudioOutput>, Status> {
        validate_params(params)?;
        Ok(Box::new(NullOutput {
            byte_rate: if self.paced { params.byte_rate() } else { None },
            bytes_discarded: 0,
            is_open: false,
        }))
    }
}

/// A stream of the null backend.
#[derive(Debug)]
pub struct NullOutput {
    byte_rate: Option<usize>,
    bytes_discarded: u64,
    is_open: bool,
}

impl NullOutput {
    pub fn bytes_discarded(&self) -> u64 {
        self.bytes_discarded
    }
}

impl AudioOutput for NullOutput {
    fn open(&mut self, _params: &StreamParams) -> Status {
        self.is_open = true;
        STATUS_OK
    }

    fn write(&mut self, buffer: &[u8]) -> i32 {
        if !self.is_open {
            return STATUS_ERR;
        }
        if let Some(byte_rate) = self.byte_rate {
            let seconds = buffer.len() as f64 / byte_rate as f64;
            std::thread::sleep(Duration::from_secs_f64(seconds));
        }
        self.bytes_discarded += buffer.len() as u64;
        i32::try_from(buffer.len()).unwrap_or(i32::MAX)
    }

    fn supports_flush(&self) -> bool {
        true
    }

    fn flush(&mut self) {}

    fn close(&mut self) {
        debug!(bytes = self.bytes_discarded, "Null output closed");
        self.is_open = false;
    }

    fn supports_deinit(&self) -> bool {
        true
    }

    fn deinit(&mut self) -> Status {
        STATUS_OK
    }

    fn get_formats(&self, _params: &StreamParams) -> i32 {
        all_formats()
    }
}
