use bridge_traits::output::Status;
use core_output::OutputError;
use thiserror::Error;

use crate::format::Endianness;

#[derive(Error, Debug)]
pub enum SpeakerError {
    #[error("invalid PCM format specified")]
    InvalidFormat,

    #[error("open() called more than once")]
    AlreadyOpen,

    #[error("open() failed: {0}")]
    OpenFailed(Status),

    #[error("native endianness is {native}, but {requested} was requested")]
    EndiannessMismatch {
        native: Endianness,
        requested: Endianness,
    },

    #[error("{samples_per_frame} frames of {block_align} bytes do not fit in one write")]
    FrameTooLarge {
        samples_per_frame: usize,
        block_align: usize,
    },

    #[error("write() failed: {0}")]
    WriteFailed(i32),

    #[error(transparent)]
    Output(#[from] OutputError),
}

pub type Result<T> = std::result::Result<T, SpeakerError>;
