//! Raw frame writer.
//!
//! [`FrameWriter`] appends frames to a file, tightly packing each plane's
//! rows regardless of the strides of the source frame. In y4m mode the
//! header is written on creation and every frame is prefixed with
//! `FRAME\n`.
//!
//! # Example
//!
//! ```rust,ignore
//! use vraw_core::{RawFormat, Resolution};
//! use vraw_io::{FrameWriter, WriterConfig};
//!
//! let config = WriterConfig::new(RawFormat::I420, Resolution::new(1920, 1080)).with_y4m(true);
//! let mut writer = FrameWriter::create("out.y4m", config)?;
//! writer.write_frame(&frame)?;
//! writer.close()?;
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use vraw_core::{Error, Fraction, Frame, FrameLayout, RawFormat, Resolution, Result, Sar};

use crate::y4m::{self, Y4mHeader};

/// Options for creating a [`FrameWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// Write a YUV4MPEG2 header and frame markers.
    pub y4m: bool,
    /// Pixel format of every written frame.
    pub format: RawFormat,
    /// Frame dimensions.
    pub resolution: Resolution,
    /// Frame rate recorded in the y4m header; zero means 30/1.
    pub framerate: Fraction,
    /// Aspect ratio recorded in the y4m header; zero means 1:1.
    pub sar: Sar,
}

impl WriterConfig {
    /// Headerless output of the given format and size.
    pub fn new(format: RawFormat, resolution: Resolution) -> Self {
        Self {
            y4m: false,
            format,
            resolution,
            framerate: Fraction::default(),
            sar: Sar::default(),
        }
    }

    /// Enables or disables the y4m container.
    pub fn with_y4m(mut self, y4m: bool) -> Self {
        self.y4m = y4m;
        self
    }

    /// Sets the frame rate.
    pub fn with_framerate(mut self, framerate: Fraction) -> Self {
        self.framerate = framerate;
        self
    }

    /// Sets the sample aspect ratio.
    pub fn with_sar(mut self, sar: Sar) -> Self {
        self.sar = sar;
        self
    }
}

/// Writer session over one output file.
#[derive(Debug)]
pub struct FrameWriter {
    path: PathBuf,
    file: BufWriter<File>,
    config: WriterConfig,
    layout: FrameLayout,
    frames: u64,
}

impl FrameWriter {
    /// Creates (truncates) `path` and writes the y4m header if configured.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for an unsupported format, a zero
    ///   resolution, a packed 10-bit width not divisible by 4, or a y4m
    ///   output format other than i420 / i420_10_16le
    /// - [`Error::NotFound`] / [`Error::Io`] if the file cannot be created
    pub fn create<P: AsRef<Path>>(path: P, config: WriterConfig) -> Result<Self> {
        let path = path.as_ref();
        if !config.format.is_supported() {
            return Err(Error::invalid_argument(format!(
                "unsupported format {}",
                config.format
            )));
        }
        if config.resolution.is_empty() {
            return Err(Error::invalid_argument(format!(
                "resolution {} must be nonzero",
                config.resolution
            )));
        }
        let layout = FrameLayout::compute(config.format, config.resolution, None)?;
        if config.y4m {
            y4m::tag_for_format(config.format)?;
        }

        let mut config = config;
        config.framerate = config.framerate.or_default();
        config.sar = config.sar.or_default();

        let file = File::create(path).map_err(|e| Error::from_open(path, e))?;
        let mut file = BufWriter::new(file);
        if config.y4m {
            Y4mHeader::new(config.format, config.resolution, config.framerate, config.sar)
                .write_to(&mut file)?;
        }

        debug!(
            path = %path.display(),
            format = %config.format,
            resolution = %config.resolution,
            y4m = config.y4m,
            "created raw video"
        );
        Ok(Self {
            path: path.to_path_buf(),
            file,
            config,
            layout,
            frames: 0,
        })
    }

    /// Appends one frame.
    ///
    /// Rows of every plane are written with the plane's row width, reading
    /// the source with the frame's strides. The file is flushed afterwards.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for a format or resolution mismatch, or a
    ///   missing / short plane or stride
    /// - [`Error::Io`] for write failures
    pub fn write_frame(&mut self, frame: &Frame<'_>) -> Result<()> {
        let info = &frame.info;
        if info.format != self.config.format {
            return Err(Error::invalid_argument(format!(
                "frame format {} does not match writer format {}",
                info.format, self.config.format
            )));
        }
        if !info.resolution.is_empty() && info.resolution != self.config.resolution {
            return Err(Error::invalid_argument(format!(
                "frame resolution {} does not match writer resolution {}",
                info.resolution, self.config.resolution
            )));
        }

        // Validate everything before the first byte goes out.
        let mut sources = [(&[][..], 0usize); vraw_core::MAX_PLANE_COUNT];
        for (i, plane) in self.layout.planes().iter().enumerate() {
            sources[i] = frame.checked_plane(i, plane)?;
        }

        if self.config.y4m {
            y4m::write_frame_marker(&mut self.file)?;
        }
        for (plane, &(data, stride)) in self.layout.planes().iter().zip(&sources) {
            if stride == plane.row_bytes {
                self.file.write_all(&data[..plane.row_bytes * plane.rows])?;
            } else {
                for row in data.chunks(stride).take(plane.rows) {
                    self.file.write_all(&row[..plane.row_bytes])?;
                }
            }
        }
        self.file.flush()?;

        trace!(index = info.index, frames = self.frames, "wrote frame");
        self.frames += 1;
        Ok(())
    }

    /// Effective configuration, defaults applied.
    #[inline]
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Bytes per luma row on disk.
    #[inline]
    pub fn primary_line_width(&self) -> usize {
        self.layout.planes()[0].row_bytes
    }

    /// On-disk plane layout.
    #[inline]
    pub fn frame_layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Frames written so far.
    #[inline]
    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    /// Flushes and releases the file.
    pub fn close(mut self) -> Result<()> {
        self.file.flush()?;
        debug!(path = %self.path.display(), frames = self.frames, "closed raw video");
        Ok(())
    }
}
