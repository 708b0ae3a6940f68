//! Frame metadata and borrowed frame views.
//!
//! Frame storage always belongs to the caller. [`Frame`] and [`FrameMut`]
//! only borrow per-plane slices of that storage for the duration of a call,
//! together with a [`FrameInfo`] describing format, geometry and timing.
//!
//! # Example
//!
//! ```rust
//! use vraw_core::{FrameInfo, FrameLayout, FrameMut, RawFormat, Resolution};
//!
//! let res = Resolution::new(8, 4);
//! let layout = FrameLayout::compute(RawFormat::NV12, res, None).unwrap();
//! let mut buf = vec![0u8; layout.frame_size()];
//! let mut frame = FrameMut::from_buffer(&mut buf, &layout, FrameInfo::new(RawFormat::NV12, res)).unwrap();
//! frame.plane_mut(0).unwrap().fill(16);
//! assert_eq!(frame.as_frame().plane(0).unwrap()[0], 16);
//! ```

use std::fmt;

use crate::error::{Error, Result};
use crate::format::{MAX_PLANE_COUNT, RawFormat};
use crate::geometry::{FrameLayout, PlaneLayout};

/// Timestamp units per second used for produced frames.
pub const TIMESCALE: u32 = 1_000_000;

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Creates a resolution.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Frame rate as a rational number of frames per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Fraction {
    /// Numerator.
    pub num: u32,
    /// Denominator.
    pub den: u32,
}

impl Fraction {
    /// Rate used when none is configured.
    pub const DEFAULT_FRAMERATE: Self = Self::new(30, 1);

    /// Creates a fraction.
    #[inline]
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Whether the rate is unusable (zero numerator or denominator).
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.num == 0 || self.den == 0
    }

    /// Returns `self`, or 30/1 when zero.
    #[inline]
    pub const fn or_default(self) -> Self {
        if self.is_zero() { Self::DEFAULT_FRAMERATE } else { self }
    }

    /// Duration of one frame in [`TIMESCALE`] units, truncated.
    ///
    /// Zero for a zero rate.
    #[inline]
    pub const fn frame_duration(&self) -> u64 {
        if self.num == 0 {
            return 0;
        }
        TIMESCALE as u64 * self.den as u64 / self.num as u64
    }

    /// Rate as floating point frames per second.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        if self.den == 0 { 0.0 } else { self.num as f64 / self.den as f64 }
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Sample aspect ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Sar {
    /// Horizontal term.
    pub width: u32,
    /// Vertical term.
    pub height: u32,
}

impl Sar {
    /// Square pixels.
    pub const SQUARE: Self = Self::new(1, 1);

    /// Creates an aspect ratio.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `self`, or 1:1 when either term is zero.
    #[inline]
    pub const fn or_default(self) -> Self {
        if self.width == 0 || self.height == 0 { Self::SQUARE } else { self }
    }
}

impl fmt::Display for Sar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// Metadata carried with every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Pixel format of the planes.
    pub format: RawFormat,
    /// Frame dimensions.
    pub resolution: Resolution,
    /// Sample aspect ratio.
    pub sar: Sar,
    /// Nominal frame rate.
    pub framerate: Fraction,
    /// Row stride of each plane in bytes, zero for absent planes.
    pub strides: [usize; MAX_PLANE_COUNT],
    /// Presentation time in `timescale` units.
    pub timestamp: u64,
    /// Units per second of `timestamp`.
    pub timescale: u32,
    /// Output counter of the producing session.
    pub index: u64,
    /// Wall clock capture time, zero when unknown.
    pub capture_timestamp: u64,
}

impl FrameInfo {
    /// Metadata with 1:1 SAR, 30/1 rate and zeroed timing.
    pub const fn new(format: RawFormat, resolution: Resolution) -> Self {
        Self {
            format,
            resolution,
            sar: Sar::SQUARE,
            framerate: Fraction::DEFAULT_FRAMERATE,
            strides: [0; MAX_PLANE_COUNT],
            timestamp: 0,
            timescale: TIMESCALE,
            index: 0,
            capture_timestamp: 0,
        }
    }

    /// Copies timing fields (timestamp, timescale, index, capture time).
    pub fn copy_timing_from(&mut self, other: &FrameInfo) {
        self.timestamp = other.timestamp;
        self.timescale = other.timescale;
        self.index = other.index;
        self.capture_timestamp = other.capture_timestamp;
    }
}

/// Read-only view of a frame's planes.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Plane data, each slice starting at the plane's first row.
    pub planes: [Option<&'a [u8]>; MAX_PLANE_COUNT],
    /// Frame metadata.
    pub info: FrameInfo,
}

impl<'a> Frame<'a> {
    /// Frame without planes; attach them with [`with_plane`](Self::with_plane).
    pub fn new(info: FrameInfo) -> Self {
        Self {
            planes: [None; MAX_PLANE_COUNT],
            info,
        }
    }

    /// Attaches plane `index` with the given row stride.
    ///
    /// Indices past [`MAX_PLANE_COUNT`] are ignored.
    pub fn with_plane(mut self, index: usize, data: &'a [u8], stride: usize) -> Self {
        if index < MAX_PLANE_COUNT {
            self.planes[index] = Some(data);
            self.info.strides[index] = stride;
        }
        self
    }

    /// Splits a contiguous buffer into planes following `layout`.
    pub fn from_buffer(data: &'a [u8], layout: &FrameLayout, mut info: FrameInfo) -> Result<Self> {
        let required = layout.frame_size();
        if data.len() < required {
            return Err(Error::buffer_too_small(required, data.len()));
        }
        let mut planes = [None; MAX_PLANE_COUNT];
        let mut rest = data;
        for (slot, plane) in planes.iter_mut().zip(layout.planes()) {
            let (head, tail) = rest.split_at(plane.size);
            *slot = Some(head);
            rest = tail;
        }
        info.strides = layout.strides();
        Ok(Self { planes, info })
    }

    /// Plane data, if attached.
    #[inline]
    pub fn plane(&self, index: usize) -> Option<&'a [u8]> {
        self.planes.get(index).copied().flatten()
    }

    /// Row stride of a plane, zero when unknown.
    #[inline]
    pub fn stride(&self, index: usize) -> usize {
        self.info.strides.get(index).copied().unwrap_or(0)
    }

    /// Plane data and stride, checked against the expected geometry.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the plane is missing or too short.
    pub fn checked_plane(&self, index: usize, layout: &PlaneLayout) -> Result<(&'a [u8], usize)> {
        let data = self
            .plane(index)
            .ok_or_else(|| Error::invalid_argument(format!("missing plane {index}")))?;
        let stride = self.stride(index);
        layout.check_buffer(index, data.len(), stride)?;
        Ok((data, stride))
    }
}

/// Writable view of a frame's planes.
#[derive(Debug)]
pub struct FrameMut<'a> {
    /// Plane data, each slice starting at the plane's first row.
    pub planes: [Option<&'a mut [u8]>; MAX_PLANE_COUNT],
    /// Frame metadata.
    pub info: FrameInfo,
}

impl<'a> FrameMut<'a> {
    /// Splits a contiguous buffer into writable planes following `layout`.
    pub fn from_buffer(
        data: &'a mut [u8],
        layout: &FrameLayout,
        mut info: FrameInfo,
    ) -> Result<Self> {
        let required = layout.frame_size();
        if data.len() < required {
            return Err(Error::buffer_too_small(required, data.len()));
        }
        let mut planes: [Option<&'a mut [u8]>; MAX_PLANE_COUNT] = [None, None, None];
        let mut rest = data;
        for (slot, plane) in planes.iter_mut().zip(layout.planes()) {
            let (head, tail) = rest.split_at_mut(plane.size);
            *slot = Some(head);
            rest = tail;
        }
        info.strides = layout.strides();
        Ok(Self { planes, info })
    }

    /// Mutable plane data, if attached.
    #[inline]
    pub fn plane_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        self.planes.get_mut(index)?.as_deref_mut()
    }

    /// Row stride of a plane, zero when unknown.
    #[inline]
    pub fn stride(&self, index: usize) -> usize {
        self.info.strides.get(index).copied().unwrap_or(0)
    }

    /// Checks a plane against the expected geometry without borrowing it.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the plane is missing or too short.
    pub fn check_plane(&self, index: usize, layout: &PlaneLayout) -> Result<()> {
        let len = self
            .planes
            .get(index)
            .and_then(|p| p.as_ref())
            .map(|p| p.len())
            .ok_or_else(|| Error::invalid_argument(format!("missing plane {index}")))?;
        layout.check_buffer(index, len, self.stride(index))
    }

    /// Reborrows as a read-only frame.
    pub fn as_frame(&self) -> Frame<'_> {
        let mut planes = [None; MAX_PLANE_COUNT];
        for (slot, plane) in planes.iter_mut().zip(&self.planes) {
            *slot = plane.as_deref();
        }
        Frame {
            planes,
            info: self.info,
        }
    }
}

/// Allocates a frame buffer of `len` bytes filled with `fill`.
///
/// # Errors
///
/// [`Error::OutOfMemory`] when the allocation cannot be satisfied.
pub fn alloc_frame_buffer(len: usize, fill: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::OutOfMemory { requested: len })?;
    buf.resize(len, fill);
    Ok(buf)
}
