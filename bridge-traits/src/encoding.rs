//! PCM sample encodings understood by output backends.
//!
//! The numeric values are the `MPG123_ENC_*` codes used by the native output
//! modules, so a code received from a caller can be handed to a backend and
//! OR-ed into a supported-formats bitmask without translation.

use serde::{Deserialize, Serialize};

const ENC_16: i32 = 0x040;
const ENC_24: i32 = 0x4000;
const ENC_32: i32 = 0x100;
const ENC_SIGNED: i32 = 0x080;
const ENC_FLOAT: i32 = 0xe00;

/// A PCM sample encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Encoding {
    Float32 = 0x200,
    Float64 = 0x400,
    Signed8 = ENC_SIGNED | 0x02,
    Unsigned8 = 0x01,
    Signed16 = ENC_16 | ENC_SIGNED | 0x10,
    Unsigned16 = ENC_16 | 0x20,
    Signed24 = ENC_24 | ENC_SIGNED | 0x1000,
    Unsigned24 = ENC_24 | 0x2000,
    Signed32 = ENC_32 | ENC_SIGNED | 0x1000,
    Unsigned32 = ENC_32 | 0x2000,
}

impl Encoding {
    /// Every encoding, in the order the constants are exported.
    pub const ALL: [Encoding; 10] = [
        Encoding::Float32,
        Encoding::Float64,
        Encoding::Signed8,
        Encoding::Unsigned8,
        Encoding::Signed16,
        Encoding::Unsigned16,
        Encoding::Signed24,
        Encoding::Unsigned24,
        Encoding::Signed32,
        Encoding::Unsigned32,
    ];

    /// The raw code passed across the scripting boundary.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Map a raw code back to an encoding. Unknown codes yield `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|encoding| encoding.code() == code)
    }

    /// Name of the exported constant, e.g. `MPG123_ENC_SIGNED_16`.
    pub const fn constant_name(self) -> &'static str {
        match self {
            Encoding::Float32 => "MPG123_ENC_FLOAT_32",
            Encoding::Float64 => "MPG123_ENC_FLOAT_64",
            Encoding::Signed8 => "MPG123_ENC_SIGNED_8",
            Encoding::Unsigned8 => "MPG123_ENC_UNSIGNED_8",
            Encoding::Signed16 => "MPG123_ENC_SIGNED_16",
            Encoding::Unsigned16 => "MPG123_ENC_UNSIGNED_16",
            Encoding::Signed24 => "MPG123_ENC_SIGNED_24",
            Encoding::Unsigned24 => "MPG123_ENC_UNSIGNED_24",
            Encoding::Signed32 => "MPG123_ENC_SIGNED_32",
            Encoding::Unsigned32 => "MPG123_ENC_UNSIGNED_32",
        }
    }

    /// Bytes occupied by one sample of one channel.
    pub const fn sample_size(self) -> usize {
        match self {
            Encoding::Signed8 | Encoding::Unsigned8 => 1,
            Encoding::Signed16 | Encoding::Unsigned16 => 2,
            Encoding::Signed24 | Encoding::Unsigned24 => 3,
            Encoding::Signed32 | Encoding::Unsigned32 | Encoding::Float32 => 4,
            Encoding::Float64 => 8,
        }
    }

    pub const fn is_float(self) -> bool {
        self.code() & ENC_FLOAT != 0
    }

    pub const fn is_signed(self) -> bool {
        self.is_float() || self.code() & ENC_SIGNED != 0
    }

    pub const fn is_8bit(self) -> bool {
        self.sample_size() == 1
    }
}

impl From<Encoding> for i32 {
    fn from(encoding: Encoding) -> Self {
        encoding.code()
    }
}

impl TryFrom<i32> for Encoding {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Encoding::from_code(code).ok_or(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_native_constants() {
        assert_eq!(Encoding::Signed16.code(), 0x0d0);
        assert_eq!(Encoding::Unsigned16.code(), 0x060);
        assert_eq!(Encoding::Signed8.code(), 0x082);
        assert_eq!(Encoding::Unsigned8.code(), 0x001);
        assert_eq!(Encoding::Signed24.code(), 0x5080);
        assert_eq!(Encoding::Unsigned24.code(), 0x6000);
        assert_eq!(Encoding::Signed32.code(), 0x1180);
        assert_eq!(Encoding::Unsigned32.code(), 0x2100);
        assert_eq!(Encoding::Float32.code(), 0x200);
        assert_eq!(Encoding::Float64.code(), 0x400);
    }

    #[test]
    fn codes_are_distinct_and_round_trip() {
        for encoding in Encoding::ALL {
            assert_eq!(Encoding::from_code(encoding.code()), Some(encoding));
        }
        assert_eq!(Encoding::from_code(0x7fff_0000), None);
        assert_eq!(Encoding::try_from(31), Err(31));
    }

    #[test]
    fn sample_properties() {
        assert_eq!(Encoding::Signed24.sample_size(), 3);
        assert_eq!(Encoding::Float64.sample_size(), 8);
        assert!(Encoding::Float32.is_float());
        assert!(Encoding::Float32.is_signed());
        assert!(!Encoding::Unsigned16.is_signed());
        assert!(Encoding::Signed8.is_signed());
        assert!(Encoding::Unsigned8.is_8bit());
        assert!(Encoding::Signed8.is_8bit());
        assert!(!Encoding::Signed16.is_8bit());
    }
}
