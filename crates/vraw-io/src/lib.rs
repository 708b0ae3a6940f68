//! # vraw-io
//!
//! Reading and writing of uncompressed video frames.
//!
//! - [`FrameReader`] - Sequential reader with forward and ping-pong looping
//! - [`FrameWriter`] - Tightly packed frame writer
//! - [`y4m`] - YUV4MPEG2 header and frame markers
//! - [`packed`] - Packed 10-bit (4 samples / 5 bytes) codec
//! - [`psnr`] - Per-plane PSNR
//! - `image` - PNG still-image ingestion (feature `png`)
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use vraw_core::{RawFormat, Resolution};
//! use vraw_io::{FrameReader, FrameWriter, ReaderConfig, WriterConfig};
//!
//! let res = Resolution::new(1920, 1080);
//! let mut reader = FrameReader::open("in.nv12", ReaderConfig::new(RawFormat::NV12, res))?;
//! let mut writer = FrameWriter::create("out.nv12", WriterConfig::new(RawFormat::NV12, res))?;
//! let mut buf = vec![0u8; reader.min_buf_size()];
//! loop {
//!     match reader.read_frame(&mut buf) {
//!         Ok(frame) => writer.write_frame(&frame)?,
//!         Err(e) if e.is_exhausted() => break,
//!         Err(e) => return Err(e),
//!     }
//! }
//! writer.close()?;
//! ```
//!
//! # Supported Formats
//!
//! | Family | Layout | Storage |
//! |--------|--------|---------|
//! | i420 / yv12 | planar 4:2:0 | 8, 16le, 16be, 16le_high, 16be_high |
//! | nv12 / nv21 | semi-planar 4:2:0 | 8, 16le, 16be, 16le_high, 16be_high |
//! | nv21_10_packed | semi-planar 4:2:0 | 4 x 10 bit in 5 bytes |
//! | gray / gray16 | single plane | 8, 16le |
//! | raw8 / raw16 / raw32 | single plane | 8, 16le/be, 32le/be |

#![warn(missing_docs)]

pub mod packed;
pub mod playback;
pub mod psnr;
pub mod reader;
pub mod writer;
pub mod y4m;

#[cfg(feature = "png")]
pub mod image;

pub use packed::{pack_frame, unpack_frame};
pub use playback::{LoopMode, Playback};
pub use psnr::compute_psnr;
pub use reader::{FrameReader, ReaderConfig};
pub use writer::{FrameWriter, WriterConfig};

pub use vraw_core::{Error, Result};

/// Whether a path names a YUV4MPEG2 file (`.y4m` extension).
pub fn is_y4m_path<P: AsRef<std::path::Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("y4m"))
}
