//! Failures of backend setup that happen outside a stream.
//!
//! Stream primitives report integer statuses instead; see
//! [`output`](crate::output).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// An output path has no directory component to create.
    #[error("{} has no parent directory", .0.display())]
    NoParentDirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
