//! Error types for raw video operations.
//!
//! A single [`Error`] enum is shared by the format registry, the plane
//! geometry calculator, the frame reader/writer and the packed codec.
//!
//! # Usage
//!
//! ```rust
//! use vraw_core::{Error, Result};
//!
//! fn check_size(width: u32, height: u32) -> Result<()> {
//!     if width == 0 || height == 0 {
//!         return Err(Error::invalid_argument("resolution must be nonzero"));
//!     }
//!     Ok(())
//! }
//! # assert!(check_size(0, 4).is_err());
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by raw video operations.
///
/// # Categories
///
/// - **Caller errors**: [`InvalidArgument`](Error::InvalidArgument),
///   [`BufferTooSmall`](Error::BufferTooSmall)
/// - **File errors**: [`NotFound`](Error::NotFound), [`Io`](Error::Io)
/// - **Data errors**: [`Protocol`](Error::Protocol),
///   [`Unsupported`](Error::Unsupported)
/// - **Stream state**: [`Exhausted`](Error::Exhausted)
/// - **Resources**: [`OutOfMemory`](Error::OutOfMemory)
#[derive(Debug, Error)]
pub enum Error {
    /// Missing, zero or inconsistent configuration or frame parameter.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Caller buffer cannot hold a full frame.
    #[error("buffer too small: {actual} bytes, {required} required")]
    BufferTooSmall {
        /// Minimum buffer size in bytes
        required: usize,
        /// Size of the buffer that was provided
        actual: usize,
    },

    /// Input file could not be opened.
    #[error("file not found: {}", path.display())]
    NotFound {
        /// Path that was opened
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Malformed container header, frame marker or file size.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// End of data in non-looping playback.
    #[error("end of stream")]
    Exhausted,

    /// Known format or layout combination that is not implemented.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Underlying read, write, seek or flush failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame buffer allocation failed.
    #[error("out of memory: cannot allocate {requested} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        requested: usize,
    },
}

impl Error {
    /// Creates an [`Error::InvalidArgument`] error.
    #[inline]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Creates an [`Error::Protocol`] error.
    #[inline]
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Creates an [`Error::Unsupported`] error.
    #[inline]
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Creates an [`Error::BufferTooSmall`] error.
    #[inline]
    pub fn buffer_too_small(required: usize, actual: usize) -> Self {
        Self::BufferTooSmall { required, actual }
    }

    /// Maps an open failure to [`Error::NotFound`] or [`Error::Io`].
    pub fn from_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.into(),
                source,
            }
        } else {
            Self::Io(source)
        }
    }

    /// Returns `true` for caller-side argument errors.
    #[inline]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::BufferTooSmall { .. })
    }

    /// Returns `true` when a non-looping stream ran out of frames.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// Returns `true` if this is an I/O error.
    #[inline]
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::NotFound { .. })
    }
}
