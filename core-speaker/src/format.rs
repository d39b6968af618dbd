//! PCM format selection.
//!
//! [`SpeakerOptions`] is what a caller asks for; every field is optional.
//! [`PcmFormat`] is the resolved format, with each missing option taken from
//! the previously resolved format or from the defaults.

use std::fmt;

use bridge_traits::encoding::Encoding;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpeakerError};

pub const DEFAULT_CHANNELS: i32 = 2;
pub const DEFAULT_SAMPLE_RATE: i32 = 44100;
pub const DEFAULT_SAMPLES_PER_FRAME: usize = 1024;
pub const DEFAULT_WATER_MARK: usize = 0;

/// Byte order of samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endianness {
    #[serde(rename = "LE")]
    Little,
    #[serde(rename = "BE")]
    Big,
}

impl Endianness {
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Little => f.write_str("LE"),
            Endianness::Big => f.write_str("BE"),
        }
    }
}

/// Requested speaker format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpeakerOptions {
    pub bit_depth: Option<u32>,
    pub channels: Option<i32>,
    pub sample_rate: Option<i32>,
    pub float: Option<bool>,
    pub signed: Option<bool>,
    /// Must equal the native byte order when given.
    pub endianness: Option<Endianness>,
    /// Frames per backend write.
    pub samples_per_frame: Option<usize>,
    pub high_water_mark: Option<usize>,
    pub low_water_mark: Option<usize>,
}

impl SpeakerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bit_depth(mut self, bit_depth: u32) -> Self {
        self.bit_depth = Some(bit_depth);
        self
    }

    pub fn with_channels(mut self, channels: i32) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: i32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_float(mut self, float: bool) -> Self {
        self.float = Some(float);
        self
    }

    pub fn with_signed(mut self, signed: bool) -> Self {
        self.signed = Some(signed);
        self
    }

    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = Some(endianness);
        self
    }

    pub fn with_samples_per_frame(mut self, samples: usize) -> Self {
        self.samples_per_frame = Some(samples);
        self
    }

    pub fn with_water_marks(mut self, low: usize, high: usize) -> Self {
        self.low_water_mark = Some(low);
        self.high_water_mark = Some(high);
        self
    }
}

/// Resolved speaker format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    pub bit_depth: u32,
    pub channels: i32,
    pub sample_rate: i32,
    pub float: bool,
    pub signed: bool,
    pub endianness: Endianness,
    pub samples_per_frame: usize,
    pub high_water_mark: usize,
    pub low_water_mark: usize,
}

impl PcmFormat {
    /// Resolve `options` against `previous` and the defaults.
    ///
    /// Fails when a non-native byte order is requested or when a backend
    /// write of `samples_per_frame` frames would not fit in memory.
    ///
    /// A previously resolved `bit_depth` wins over the float default, so
    /// switching `float` on later keeps the old depth unless a new one is
    /// given.
    pub fn resolve(options: &SpeakerOptions, previous: Option<&PcmFormat>) -> Result<Self> {
        let native = Endianness::native();
        if let Some(requested) = options.endianness {
            if requested != native {
                return Err(SpeakerError::EndiannessMismatch { native, requested });
            }
        }

        let float = options
            .float
            .or(previous.map(|format| format.float))
            .unwrap_or(false);
        let bit_depth = options
            .bit_depth
            .or(previous.map(|format| format.bit_depth))
            .unwrap_or(if float { 32 } else { 16 });

        let format = Self {
            bit_depth,
            channels: options
                .channels
                .or(previous.map(|format| format.channels))
                .unwrap_or(DEFAULT_CHANNELS),
            sample_rate: options
                .sample_rate
                .or(previous.map(|format| format.sample_rate))
                .unwrap_or(DEFAULT_SAMPLE_RATE),
            float,
            signed: options
                .signed
                .or(previous.map(|format| format.signed))
                .unwrap_or(bit_depth != 8),
            endianness: native,
            samples_per_frame: options
                .samples_per_frame
                .or(previous.map(|format| format.samples_per_frame))
                .unwrap_or(DEFAULT_SAMPLES_PER_FRAME),
            high_water_mark: options
                .high_water_mark
                .or(previous.map(|format| format.high_water_mark))
                .unwrap_or(DEFAULT_WATER_MARK),
            low_water_mark: options
                .low_water_mark
                .or(previous.map(|format| format.low_water_mark))
                .unwrap_or(DEFAULT_WATER_MARK),
        };

        if format
            .block_align()
            .checked_mul(format.samples_per_frame)
            .is_none()
        {
            return Err(SpeakerError::FrameTooLarge {
                samples_per_frame: format.samples_per_frame,
                block_align: format.block_align(),
            });
        }
        Ok(format)
    }

    /// Bytes per interleaved frame.
    pub fn block_align(&self) -> usize {
        let channels = usize::try_from(self.channels).unwrap_or(0);
        ((self.bit_depth / 8) as usize).saturating_mul(channels)
    }

    /// Bytes handed to the backend per write.
    pub fn chunk_size(&self) -> usize {
        self.block_align().saturating_mul(self.samples_per_frame)
    }

    pub fn encoding(&self) -> Option<Encoding> {
        format_constant(self)
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            bit_depth: 16,
            channels: DEFAULT_CHANNELS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            float: false,
            signed: true,
            endianness: Endianness::native(),
            samples_per_frame: DEFAULT_SAMPLES_PER_FRAME,
            high_water_mark: DEFAULT_WATER_MARK,
            low_water_mark: DEFAULT_WATER_MARK,
        }
    }
}

/// The encoding for a format, or `None` when no encoding matches.
pub fn format_constant(format: &PcmFormat) -> Option<Encoding> {
    if format.float {
        match format.bit_depth {
            32 => return Some(Encoding::Float32),
            64 => return Some(Encoding::Float64),
            _ => {}
        }
    }

    let encoding = match (format.bit_depth, format.signed) {
        (8, true) => Encoding::Signed8,
        (8, false) => Encoding::Unsigned8,
        (16, true) => Encoding::Signed16,
        (16, false) => Encoding::Unsigned16,
        (24, true) => Encoding::Signed24,
        (24, false) => Encoding::Unsigned24,
        (32, true) => Encoding::Signed32,
        (32, false) => Encoding::Unsigned32,
        _ => return None,
    };
    Some(encoding)
}
