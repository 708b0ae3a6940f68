//! Plane geometry: row widths, strides and sizes of every plane of a frame.
//!
//! [`FrameLayout::compute`] is a pure function of a [`RawFormat`], a
//! [`Resolution`] and optional hardware [`Alignment`]. Readers compute it
//! twice: unaligned for the on-disk frame and aligned for the in-memory
//! buffer.
//!
//! # Example
//!
//! ```rust
//! use vraw_core::{FrameLayout, RawFormat, Resolution};
//!
//! let layout = FrameLayout::compute(RawFormat::I420, Resolution::new(4, 4), None).unwrap();
//! assert_eq!(layout.plane_count(), 3);
//! assert_eq!(layout.frame_size(), 24);
//! ```

use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::format::{DataLayout, MAX_PLANE_COUNT, PixelLayout, RawFormat};
use crate::frame::Resolution;

/// Per-plane hardware alignment constraints, in bytes / rows.
///
/// All-or-nothing: if any entry is nonzero every plane is aligned (zero
/// entries then count as 1), otherwise no alignment is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Alignment {
    /// Row stride alignment per plane.
    pub stride: [u32; MAX_PLANE_COUNT],
    /// Row count alignment per plane.
    pub scanline: [u32; MAX_PLANE_COUNT],
    /// Total plane size alignment per plane.
    pub size: [u32; MAX_PLANE_COUNT],
}

impl Alignment {
    /// Same constraints on every plane.
    pub const fn uniform(stride: u32, scanline: u32, size: u32) -> Self {
        Self {
            stride: [stride; MAX_PLANE_COUNT],
            scanline: [scanline; MAX_PLANE_COUNT],
            size: [size; MAX_PLANE_COUNT],
        }
    }

    /// Whether any plane carries a nonzero constraint.
    pub fn is_constrained(&self) -> bool {
        self.stride
            .iter()
            .chain(&self.scanline)
            .chain(&self.size)
            .any(|&a| a != 0)
    }
}

/// Geometry of one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Meaningful bytes per row.
    pub row_bytes: usize,
    /// Meaningful rows.
    pub rows: usize,
    /// Bytes between row starts, `>= row_bytes`.
    pub stride: usize,
    /// Bytes reserved for the plane, `>= stride * rows`.
    pub size: usize,
}

impl PlaneLayout {
    /// Checks that `len` bytes read with `stride` cover every row of the plane.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] naming plane `index`.
    pub fn check_buffer(&self, index: usize, len: usize, stride: usize) -> Result<()> {
        if stride == 0 || stride < self.row_bytes {
            return Err(Error::invalid_argument(format!(
                "plane {index} stride {stride} below row width {}",
                self.row_bytes
            )));
        }
        let needed = (self.rows.saturating_sub(1))
            .checked_mul(stride)
            .and_then(|n| n.checked_add(self.row_bytes))
            .ok_or_else(|| Error::invalid_argument("plane size overflows"))?;
        if len < needed {
            return Err(Error::invalid_argument(format!(
                "plane {index} holds {len} bytes, {needed} needed"
            )));
        }
        Ok(())
    }
}

/// Geometry of all planes of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    planes: SmallVec<[PlaneLayout; MAX_PLANE_COUNT]>,
}

impl FrameLayout {
    /// Computes plane geometry for `format` at `resolution`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for a zero dimension, a packed 10-bit
    ///   width not divisible by 4, or a size that overflows `usize`
    /// - [`Error::Unsupported`] for a bit-packed non-YUV format
    pub fn compute(
        format: RawFormat,
        resolution: Resolution,
        alignment: Option<&Alignment>,
    ) -> Result<Self> {
        if resolution.is_empty() {
            return Err(Error::invalid_argument(format!(
                "zero resolution {resolution} for {format}"
            )));
        }
        let width = resolution.width as usize;
        let height = resolution.height as usize;
        let chroma_width = width.div_ceil(2);
        let chroma_height = height.div_ceil(2);

        let mut rows: SmallVec<[(usize, usize); MAX_PLANE_COUNT]> = SmallVec::new();
        if format.is_packed_10bit() {
            if format.layout != PixelLayout::Yuv420 || format.data_layout != DataLayout::SemiPlanar {
                return Err(Error::unsupported(format!("bit-packed {format}")));
            }
            if width % 4 != 0 {
                return Err(Error::invalid_argument(format!(
                    "{format} needs a width divisible by 4, got {width}"
                )));
            }
            let packed = checked(width, 5)? / 4;
            rows.push((packed, height));
            rows.push((packed, chroma_height));
        } else {
            let elem = format
                .element_size()
                .ok_or_else(|| Error::unsupported(format!("element size of {format}")))?;
            match (format.layout, format.data_layout) {
                (PixelLayout::Yuv420, DataLayout::Planar) => {
                    rows.push((checked(width, elem)?, height));
                    rows.push((checked(chroma_width, elem)?, chroma_height));
                    rows.push((checked(chroma_width, elem)?, chroma_height));
                }
                (PixelLayout::Yuv420, DataLayout::SemiPlanar) => {
                    rows.push((checked(width, elem)?, height));
                    rows.push((checked(chroma_width * 2, elem)?, chroma_height));
                }
                _ => {
                    let row = checked(width, elem * format.components())?;
                    rows.push((row, height));
                }
            }
        }

        let align = alignment.filter(|a| a.is_constrained());
        let mut planes = SmallVec::new();
        for (i, (row_bytes, plane_rows)) in rows.into_iter().enumerate() {
            let (stride, aligned_rows, size) = match align {
                Some(a) => {
                    let stride = round_up(row_bytes, a.stride[i])?;
                    let aligned_rows = round_up(plane_rows, a.scanline[i])?;
                    let size = round_up(checked(stride, aligned_rows)?, a.size[i])?;
                    (stride, aligned_rows, size)
                }
                None => (row_bytes, plane_rows, checked(row_bytes, plane_rows)?),
            };
            debug_assert!(size >= stride * aligned_rows);
            planes.push(PlaneLayout {
                row_bytes,
                rows: plane_rows,
                stride,
                size,
            });
        }
        Ok(Self { planes })
    }

    /// Number of planes.
    #[inline]
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// All planes in order.
    #[inline]
    pub fn planes(&self) -> &[PlaneLayout] {
        &self.planes
    }

    /// One plane, if present.
    #[inline]
    pub fn plane(&self, index: usize) -> Option<&PlaneLayout> {
        self.planes.get(index)
    }

    /// Total frame size: sum of plane sizes.
    pub fn frame_size(&self) -> usize {
        self.planes.iter().map(|p| p.size).sum()
    }

    /// Byte offset of each plane within a contiguous frame buffer.
    pub fn plane_offsets(&self) -> [usize; MAX_PLANE_COUNT] {
        let mut offsets = [0; MAX_PLANE_COUNT];
        let mut acc = 0;
        for (slot, plane) in offsets.iter_mut().zip(&self.planes) {
            *slot = acc;
            acc += plane.size;
        }
        offsets
    }

    /// Stride of each plane, zero for absent planes.
    pub fn strides(&self) -> [usize; MAX_PLANE_COUNT] {
        let mut strides = [0; MAX_PLANE_COUNT];
        for (slot, plane) in strides.iter_mut().zip(&self.planes) {
            *slot = plane.stride;
        }
        strides
    }
}

fn checked(a: usize, b: usize) -> Result<usize> {
    a.checked_mul(b)
        .ok_or_else(|| Error::invalid_argument("frame dimensions overflow"))
}

fn round_up(value: usize, align: u32) -> Result<usize> {
    let align = (align as usize).max(1);
    value
        .checked_next_multiple_of(align)
        .ok_or_else(|| Error::invalid_argument("aligned size overflows"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(format: RawFormat, w: u32, h: u32) -> FrameLayout {
        FrameLayout::compute(format, Resolution::new(w, h), None).expect("layout failed")
    }

    #[test]
    fn test_i420_unaligned() {
        let l = layout(RawFormat::I420, 64, 48);
        assert_eq!(l.plane_count(), 3);
        assert_eq!(l.planes()[0].row_bytes, 64);
        assert_eq!(l.planes()[1].row_bytes, 32);
        assert_eq!(l.planes()[2].rows, 24);
        assert_eq!(l.frame_size(), 64 * 48 * 3 / 2);
        assert_eq!(l.plane_offsets(), [0, 3072, 3072 + 768]);
    }

    #[test]
    fn test_semi_planar_16bit() {
        let l = layout(RawFormat::NV12_10_16LE, 64, 48);
        assert_eq!(l.plane_count(), 2);
        assert_eq!(l.planes()[0].stride, 128);
        assert_eq!(l.planes()[1].stride, 128);
        assert_eq!(l.planes()[1].rows, 24);
        assert_eq!(l.frame_size(), 64 * 48 * 3);
    }

    #[test]
    fn test_packed_10bit() {
        let l = layout(RawFormat::NV21_10_PACKED, 64, 48);
        assert_eq!(l.planes()[0].row_bytes, 80);
        assert_eq!(l.planes()[1].row_bytes, 80);
        assert_eq!(l.frame_size(), 80 * 48 + 80 * 24);

        let err = FrameLayout::compute(RawFormat::NV21_10_PACKED, Resolution::new(66, 48), None)
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_single_plane() {
        assert_eq!(layout(RawFormat::GRAY, 10, 3).frame_size(), 30);
        assert_eq!(layout(RawFormat::RAW16_BE, 10, 3).frame_size(), 60);
        assert_eq!(layout(RawFormat::RAW32, 10, 3).frame_size(), 120);
        assert_eq!(layout(RawFormat::RGBA, 10, 3).planes()[0].stride, 40);
    }

    #[test]
    fn test_odd_dimensions_round_chroma_up() {
        let l = layout(RawFormat::I420, 5, 3);
        assert_eq!(l.planes()[1].row_bytes, 3);
        assert_eq!(l.planes()[1].rows, 2);
        let l = layout(RawFormat::NV21, 5, 3);
        assert_eq!(l.planes()[1].row_bytes, 6);
    }

    #[test]
    fn test_zero_resolution() {
        let err = FrameLayout::compute(RawFormat::I420, Resolution::new(0, 48), None).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_alignment_applied() {
        let align = Alignment::uniform(128, 32, 4096);
        let l = FrameLayout::compute(RawFormat::NV12, Resolution::new(100, 50), Some(&align))
            .expect("layout failed");
        let y = l.planes()[0];
        assert_eq!(y.row_bytes, 100);
        assert_eq!(y.stride, 128);
        assert_eq!(y.rows, 50);
        assert_eq!(y.size, 8192);
        let uv = l.planes()[1];
        assert_eq!(uv.stride, 128);
        assert_eq!(uv.size, 4096);
        assert_eq!(l.frame_size(), 12288);
    }

    #[test]
    fn test_alignment_all_or_nothing() {
        let mut align = Alignment::default();
        assert!(!align.is_constrained());
        let plain = FrameLayout::compute(RawFormat::I420, Resolution::new(30, 10), Some(&align))
            .expect("layout failed");
        assert_eq!(plain, layout(RawFormat::I420, 30, 10));

        // One nonzero entry switches alignment on; zeros elsewhere act as 1.
        align.stride[2] = 64;
        let aligned = FrameLayout::compute(RawFormat::I420, Resolution::new(30, 10), Some(&align))
            .expect("layout failed");
        assert_eq!(aligned.planes()[0].stride, 30);
        assert_eq!(aligned.planes()[2].stride, 64);
        assert_eq!(aligned.planes()[2].size, 64 * 5);
    }

    #[test]
    fn test_check_buffer() {
        let plane = PlaneLayout {
            row_bytes: 4,
            rows: 3,
            stride: 4,
            size: 12,
        };
        plane.check_buffer(0, 12, 4).expect("tight buffer");
        plane.check_buffer(0, 20, 8).expect("strided buffer without tail padding");
        assert!(plane.check_buffer(0, 19, 8).unwrap_err().is_invalid_argument());
        assert!(plane.check_buffer(1, 100, 3).unwrap_err().is_invalid_argument());
        assert!(plane.check_buffer(1, 100, 0).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_stride_invariants() {
        let align = Alignment::uniform(64, 16, 0);
        for (_, format) in crate::format::SUPPORTED_FORMATS {
            for (w, h) in [(16, 16), (64, 36), (320, 240)] {
                let l = FrameLayout::compute(*format, Resolution::new(w, h), Some(&align))
                    .expect("layout failed");
                for p in l.planes() {
                    assert!(p.stride >= p.row_bytes);
                    assert!(p.size >= p.stride * p.rows);
                }
            }
        }
    }
}
