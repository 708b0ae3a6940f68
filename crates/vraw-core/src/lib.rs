//! # vraw-core
//!
//! Core types for uncompressed video frame I/O.
//!
//! - [`RawFormat`] - Immutable pixel format descriptor and the
//!   [`SUPPORTED_FORMATS`] registry
//! - [`FrameLayout`], [`Alignment`] - Per-plane strides and sizes
//! - [`Frame`], [`FrameMut`], [`FrameInfo`] - Borrowed frame views and metadata
//! - [`Error`], [`Result`] - Unified error type
//!
//! ## Crate Structure
//!
//! ```text
//! vraw-core (this crate)
//!    ^
//!    |
//!    +-- vraw-io (y4m container, reader, writer, packed codec, psnr)
//!    +-- vraw-cli (vraw binary)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod format;
pub mod frame;
pub mod geometry;

pub use error::*;
pub use format::*;
pub use frame::*;
pub use geometry::*;

/// Prelude module for convenient imports.
///
/// ```
/// use vraw_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::format::{DataLayout, Endianness, RawFormat};
    pub use crate::frame::{Fraction, Frame, FrameInfo, FrameMut, Resolution, Sar};
    pub use crate::geometry::{Alignment, FrameLayout};
}
