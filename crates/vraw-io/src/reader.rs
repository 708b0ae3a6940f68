//! Sequential and looping raw frame reader.
//!
//! A [`FrameReader`] owns one file and a cursor over its fixed-size frames.
//! Each [`read_frame`](FrameReader::read_frame) call copies one frame into
//! a caller buffer using the in-memory (possibly aligned) plane layout and
//! advances according to the [`Playback`] state.
//!
//! # Example
//!
//! ```rust,ignore
//! use vraw_core::{RawFormat, Resolution};
//! use vraw_io::{FrameReader, LoopMode, ReaderConfig};
//!
//! let config = ReaderConfig::new(RawFormat::NV12, Resolution::new(1920, 1080))
//!     .with_loop(LoopMode::Forward);
//! let mut reader = FrameReader::open("clip.nv12", config)?;
//! let mut buf = vec![0u8; reader.min_buf_size()];
//! let frame = reader.read_frame(&mut buf)?;
//! println!("frame {} at {}us", frame.info.index, frame.info.timestamp);
//! ```
//!
//! # File Layout
//!
//! Raw files are a plain concatenation of frames, each frame its planes in
//! order with rows tightly packed. In y4m mode a text header precedes the
//! frames and every frame starts with `FRAME\n`. The payload size must be an
//! exact multiple of the frame extent.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};
use vraw_core::{
    Alignment, Error, Fraction, Frame, FrameInfo, FrameLayout, RawFormat, Resolution, Result, Sar,
};

use crate::playback::{Exhaustion, LoopMode, Playback};
use crate::y4m::{self, FRAME_MARKER, Y4mHeader};

// === Configuration ===

/// Options for opening a [`FrameReader`].
///
/// In y4m mode format, resolution, framerate and SAR come from the file
/// header and the values given here are replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Input carries a YUV4MPEG2 header and frame markers.
    pub y4m: bool,
    /// Pixel format, required without y4m.
    pub format: Option<RawFormat>,
    /// Frame dimensions, required without y4m.
    pub resolution: Resolution,
    /// Frame rate; zero means 30/1.
    pub framerate: Fraction,
    /// Sample aspect ratio; zero means 1:1.
    pub sar: Sar,
    /// In-memory plane alignment.
    pub alignment: Alignment,
    /// First file frame to read; also the first output index.
    pub start_index: u64,
    /// Begin moving towards frame 0 (requires [`LoopMode::Reverse`]).
    pub start_reversed: bool,
    /// Read at most the first `max_count` file frames, 0 for all.
    pub max_count: u64,
    /// Behaviour at the end of data.
    pub loop_mode: LoopMode,
}

impl ReaderConfig {
    /// Raw (headerless) input of a known format and size.
    pub fn new(format: RawFormat, resolution: Resolution) -> Self {
        Self {
            format: Some(format),
            resolution,
            ..Default::default()
        }
    }

    /// YUV4MPEG2 input; geometry comes from the header.
    pub fn y4m() -> Self {
        Self {
            y4m: true,
            ..Default::default()
        }
    }

    /// Sets the loop mode.
    pub fn with_loop(mut self, mode: LoopMode) -> Self {
        self.loop_mode = mode;
        self
    }

    /// Sets the start frame and direction.
    pub fn with_start(mut self, index: u64, reversed: bool) -> Self {
        self.start_index = index;
        self.start_reversed = reversed;
        self
    }

    /// Limits reading to the first `count` file frames.
    pub fn with_max_count(mut self, count: u64) -> Self {
        self.max_count = count;
        self
    }

    /// Sets in-memory plane alignment.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Sets the nominal frame rate.
    pub fn with_framerate(mut self, framerate: Fraction) -> Self {
        self.framerate = framerate;
        self
    }

    /// Sets the sample aspect ratio.
    pub fn with_sar(mut self, sar: Sar) -> Self {
        self.sar = sar;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.start_reversed && self.loop_mode != LoopMode::Reverse {
            return Err(Error::invalid_argument(
                "start_reversed requires reverse looping",
            ));
        }
        if self.y4m {
            return Ok(());
        }
        let format = self
            .format
            .ok_or_else(|| Error::invalid_argument("pixel format is required without y4m"))?;
        if !format.is_supported() {
            return Err(Error::invalid_argument(format!("unsupported format {format}")));
        }
        if self.resolution.is_empty() {
            return Err(Error::invalid_argument(format!(
                "resolution {} must be nonzero",
                self.resolution
            )));
        }
        Ok(())
    }
}

// === Reader ===

/// Reader session over one raw or y4m file.
#[derive(Debug)]
pub struct FrameReader {
    path: PathBuf,
    file: BufReader<File>,
    config: ReaderConfig,
    format: RawFormat,
    file_layout: FrameLayout,
    memory_layout: FrameLayout,
    header_offset: u64,
    frame_extent: u64,
    file_frame_count: u64,
    position: u64,
    stream_pos: Option<u64>,
    playback: Playback,
    timestamp: u64,
    count: u64,
}

impl FrameReader {
    /// Opens `path` and prepares the first read.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for missing or inconsistent configuration
    /// - [`Error::NotFound`] if the file cannot be opened
    /// - [`Error::Protocol`] for a bad y4m header or a file size that is not a
    ///   whole number of frames
    pub fn open<P: AsRef<Path>>(path: P, config: ReaderConfig) -> Result<Self> {
        let path = path.as_ref();
        config.validate()?;

        let file = File::open(path).map_err(|e| Error::from_open(path, e))?;
        let file_size = file.metadata()?.len();
        let mut file = BufReader::new(file);

        let mut config = config;
        let (header_offset, marker_len) = if config.y4m {
            let (header, len) = Y4mHeader::read_from(&mut file)?;
            if config.format.is_some_and(|f| f != header.format) {
                debug!(header = %header.format, "y4m header overrides configured format");
            }
            config.format = Some(header.format);
            config.resolution = header.resolution;
            config.framerate = header.framerate;
            config.sar = header.sar;
            (len as u64, FRAME_MARKER.len() as u64)
        } else {
            (0, 0)
        };
        config.framerate = config.framerate.or_default();
        config.sar = config.sar.or_default();

        let format = config
            .format
            .ok_or_else(|| Error::invalid_argument("pixel format is required"))?;
        if config.resolution.is_empty() {
            return Err(Error::protocol(format!("zero resolution {}", config.resolution)));
        }

        let file_layout = FrameLayout::compute(format, config.resolution, None)?;
        let memory_layout =
            FrameLayout::compute(format, config.resolution, Some(&config.alignment))?;
        let frame_extent = file_layout.frame_size() as u64 + marker_len;

        let payload = file_size.checked_sub(header_offset).unwrap_or_default();
        if payload % frame_extent != 0 {
            return Err(Error::protocol(format!(
                "{}: {payload} bytes is not a multiple of the {frame_extent}-byte frame",
                path.display()
            )));
        }
        let file_frame_count = payload / frame_extent;

        let mut reader = Self {
            path: path.to_path_buf(),
            file,
            config,
            format,
            file_layout,
            memory_layout,
            header_offset,
            frame_extent,
            file_frame_count,
            position: config.start_index,
            stream_pos: Some(header_offset),
            playback: Playback::new(config.loop_mode, config.start_reversed, config.start_index),
            timestamp: 0,
            count: config.start_index,
        };
        if config.start_index > 0 && config.start_index >= reader.end() {
            return Err(Error::invalid_argument(format!(
                "start index {} past the {} readable frames",
                config.start_index,
                reader.end()
            )));
        }

        debug!(
            path = %reader.path.display(),
            format = %format,
            resolution = %config.resolution,
            frames = file_frame_count,
            frame_size = reader.file_layout.frame_size(),
            buffer_size = reader.min_buf_size(),
            "opened raw video"
        );
        Ok(reader)
    }

    /// Reads the next frame into `data` and returns a view of it.
    ///
    /// Planes are stored at the offsets and strides of
    /// [`frame_layout`](Self::frame_layout); padding bytes are left untouched.
    /// In loop modes the end of data wraps at most once per call.
    ///
    /// # Errors
    ///
    /// - [`Error::BufferTooSmall`] if `data` is shorter than
    ///   [`min_buf_size`](Self::min_buf_size)
    /// - [`Error::Exhausted`] at the end of data without looping
    /// - [`Error::Protocol`] for a corrupt frame marker
    /// - [`Error::Io`] for read or seek failures
    pub fn read_frame<'a>(&mut self, data: &'a mut [u8]) -> Result<Frame<'a>> {
        let required = self.memory_layout.frame_size();
        if data.len() < required {
            return Err(Error::buffer_too_small(required, data.len()));
        }

        let mut wrapped = false;
        while !self.read_at_cursor(data)? {
            if wrapped {
                return Err(Error::Exhausted);
            }
            match self.playback.on_exhausted(self.position) {
                Exhaustion::Stop => return Err(Error::Exhausted),
                Exhaustion::Retry(to) => {
                    debug!(from = self.position, to, "wrapping playback");
                    self.position = to;
                    wrapped = true;
                }
            }
        }

        let mut info = FrameInfo::new(self.format, self.config.resolution);
        info.sar = self.config.sar;
        info.framerate = self.config.framerate;
        info.timestamp = self.timestamp;
        info.index = self.count;
        trace!(position = self.position, index = self.count, "read frame");

        self.timestamp += self.config.framerate.frame_duration();
        self.count += 1;
        self.position += 1;
        if let Some(to) = self.playback.after_read(self.position) {
            self.position = to;
        }

        Frame::from_buffer(data, &self.memory_layout, info)
    }

    /// Copies the frame under the cursor; `Ok(false)` when there is none.
    fn read_at_cursor(&mut self, data: &mut [u8]) -> Result<bool> {
        if self.position >= self.end() {
            return Ok(false);
        }
        let offset = self.header_offset + self.position * self.frame_extent;
        if self.stream_pos.take() != Some(offset) {
            self.file.seek(SeekFrom::Start(offset))?;
        }

        if self.config.y4m && !y4m::read_frame_marker(&mut self.file)? {
            return Ok(false);
        }

        let offsets = self.memory_layout.plane_offsets();
        let planes = self.file_layout.planes().iter().zip(self.memory_layout.planes());
        for ((disk, mem), base) in planes.zip(offsets) {
            let result = if mem.stride == disk.row_bytes {
                let len = disk.row_bytes * disk.rows;
                self.file.read_exact(&mut data[base..base + len])
            } else {
                (0..disk.rows).try_for_each(|row| {
                    let start = base + row * mem.stride;
                    self.file.read_exact(&mut data[start..start + disk.row_bytes])
                })
            };
            match result {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    warn!(path = %self.path.display(), position = self.position, "file truncated");
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.stream_pos = Some(offset + self.frame_extent);
        Ok(true)
    }

    /// One past the last readable file frame.
    fn end(&self) -> u64 {
        match self.config.max_count {
            0 => self.file_frame_count,
            max => self.file_frame_count.min(max),
        }
    }

    /// Effective configuration, with header values and defaults applied.
    #[inline]
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Pixel format of produced frames.
    #[inline]
    pub fn format(&self) -> RawFormat {
        self.format
    }

    /// Frame dimensions.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.config.resolution
    }

    /// Smallest buffer accepted by [`read_frame`](Self::read_frame).
    #[inline]
    pub fn min_buf_size(&self) -> usize {
        self.memory_layout.frame_size()
    }

    /// Number of whole frames in the file.
    #[inline]
    pub fn file_frame_count(&self) -> u64 {
        self.file_frame_count
    }

    /// In-memory plane layout of produced frames.
    #[inline]
    pub fn frame_layout(&self) -> &FrameLayout {
        &self.memory_layout
    }

    /// On-disk plane layout.
    #[inline]
    pub fn file_layout(&self) -> &FrameLayout {
        &self.file_layout
    }

    /// File frame index the next read starts from.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Current playback state.
    #[inline]
    pub fn playback(&self) -> Playback {
        self.playback
    }

    /// Path of the input file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Changes the frame rate used for subsequent timestamps.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for a zero rate.
    pub fn set_framerate(&mut self, framerate: Fraction) -> Result<()> {
        if framerate.is_zero() {
            return Err(Error::invalid_argument(format!("zero framerate {framerate}")));
        }
        self.config.framerate = framerate;
        Ok(())
    }

    /// Releases the file.
    pub fn close(self) {
        debug!(path = %self.path.display(), frames = self.count, "closed raw video");
    }
}
