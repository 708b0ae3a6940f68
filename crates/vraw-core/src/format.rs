//! Raw pixel format descriptors and the supported-format registry.
//!
//! A [`RawFormat`] describes how samples of one frame are stored: the
//! subsampling layout, plane arrangement, chroma order, bit depth, storage
//! element size and byte order. Descriptors are plain `Copy` values compared
//! by value.
//!
//! The registry ([`SUPPORTED_FORMATS`]) is a `const` table. Readers and
//! writers accept a descriptor only if it equals one of its entries.
//!
//! # Usage
//!
//! ```rust
//! use vraw_core::format::{DataLayout, RawFormat};
//!
//! let fmt: RawFormat = "nv21_10_packed".parse().unwrap();
//! assert_eq!(fmt, RawFormat::NV21_10_PACKED);
//! assert_eq!(fmt.data_layout, DataLayout::SemiPlanar);
//! assert_eq!(fmt.plane_count(), 2);
//! assert!(fmt.is_supported());
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Maximum number of planes in any supported format.
pub const MAX_PLANE_COUNT: usize = 3;

/// Sample arrangement of a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    /// Luma plus 2x2 subsampled chroma.
    Yuv420,
    /// Single luma channel.
    Gray,
    /// Sensor mosaic data, one sample per pixel.
    Bayer,
    /// Interleaved R, G, B, A.
    Rgba,
    /// Interleaved A, B, G, R.
    Abgr,
}

/// Which chroma component comes first in plane or interleave order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChromaOrder {
    /// U (Cb) before V (Cr): i420, nv12.
    Uv,
    /// V (Cr) before U (Cb): yv12, nv21.
    Vu,
}

/// How the components are distributed over planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataLayout {
    /// One plane per component.
    Planar,
    /// Luma plane plus one interleaved chroma plane.
    SemiPlanar,
    /// All components interleaved in a single plane.
    Packed,
}

/// Byte order of multi-byte storage elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

/// Location of one chroma component inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChromaSite {
    /// Plane holding the component.
    pub plane: usize,
    /// Byte offset of the first sample within each row.
    pub offset: usize,
}

/// Where U and V samples live and the byte distance between neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChromaSites {
    /// U (Cb) location.
    pub u: ChromaSite,
    /// V (Cr) location.
    pub v: ChromaSite,
    /// Bytes between two consecutive samples of the same component.
    pub jump: usize,
}

/// Immutable description of a raw pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawFormat {
    /// Subsampling / component arrangement.
    pub layout: PixelLayout,
    /// Chroma component order (ignored for non-YUV layouts).
    pub order: ChromaOrder,
    /// Significant bits per sample.
    pub bit_depth: u8,
    /// Plane arrangement.
    pub data_layout: DataLayout,
    /// Stored bits per sample: 8, 16, 32, or 10 for packed 10-bit.
    pub data_size: u8,
    /// Byte order of multi-byte elements.
    pub endianness: Endianness,
    /// Significant bits sit in the high part of the storage element.
    pub msb_aligned: bool,
}

const fn yuv(
    order: ChromaOrder,
    data_layout: DataLayout,
    bit_depth: u8,
    data_size: u8,
    endianness: Endianness,
    msb_aligned: bool,
) -> RawFormat {
    RawFormat {
        layout: PixelLayout::Yuv420,
        order,
        bit_depth,
        data_layout,
        data_size,
        endianness,
        msb_aligned,
    }
}

const fn mono(layout: PixelLayout, bits: u8, endianness: Endianness) -> RawFormat {
    RawFormat {
        layout,
        order: ChromaOrder::Uv,
        bit_depth: bits,
        data_layout: DataLayout::Planar,
        data_size: bits,
        endianness,
        msb_aligned: false,
    }
}

const fn interleaved(layout: PixelLayout) -> RawFormat {
    RawFormat {
        layout,
        order: ChromaOrder::Uv,
        bit_depth: 8,
        data_layout: DataLayout::Packed,
        data_size: 8,
        endianness: Endianness::Little,
        msb_aligned: false,
    }
}

use ChromaOrder::{Uv, Vu};
use DataLayout::{Planar, SemiPlanar};
use Endianness::{Big, Little};

impl RawFormat {
    // === 8-bit 4:2:0 ===

    /// Planar Y, U, V; 8 bits.
    pub const I420: Self = yuv(Uv, Planar, 8, 8, Little, false);
    /// Planar Y, V, U; 8 bits.
    pub const YV12: Self = yuv(Vu, Planar, 8, 8, Little, false);
    /// Y plus interleaved UV; 8 bits.
    pub const NV12: Self = yuv(Uv, SemiPlanar, 8, 8, Little, false);
    /// Y plus interleaved VU; 8 bits.
    pub const NV21: Self = yuv(Vu, SemiPlanar, 8, 8, Little, false);

    // === 10-bit in 16-bit little-endian, low bits ===

    /// i420, 10 bits in 16-bit LE elements.
    pub const I420_10_16LE: Self = yuv(Uv, Planar, 10, 16, Little, false);
    /// yv12, 10 bits in 16-bit LE elements.
    pub const YV12_10_16LE: Self = yuv(Vu, Planar, 10, 16, Little, false);
    /// nv12, 10 bits in 16-bit LE elements.
    pub const NV12_10_16LE: Self = yuv(Uv, SemiPlanar, 10, 16, Little, false);
    /// nv21, 10 bits in 16-bit LE elements.
    pub const NV21_10_16LE: Self = yuv(Vu, SemiPlanar, 10, 16, Little, false);

    // === 10-bit in 16-bit big-endian, low bits ===

    /// i420, 10 bits in 16-bit BE elements.
    pub const I420_10_16BE: Self = yuv(Uv, Planar, 10, 16, Big, false);
    /// yv12, 10 bits in 16-bit BE elements.
    pub const YV12_10_16BE: Self = yuv(Vu, Planar, 10, 16, Big, false);
    /// nv12, 10 bits in 16-bit BE elements.
    pub const NV12_10_16BE: Self = yuv(Uv, SemiPlanar, 10, 16, Big, false);
    /// nv21, 10 bits in 16-bit BE elements.
    pub const NV21_10_16BE: Self = yuv(Vu, SemiPlanar, 10, 16, Big, false);

    // === 10-bit in 16-bit, high bits ===

    /// i420, 10 bits in the high part of 16-bit LE elements.
    pub const I420_10_16LE_HIGH: Self = yuv(Uv, Planar, 10, 16, Little, true);
    /// yv12, 10 bits in the high part of 16-bit LE elements.
    pub const YV12_10_16LE_HIGH: Self = yuv(Vu, Planar, 10, 16, Little, true);
    /// nv12, 10 bits in the high part of 16-bit LE elements.
    pub const NV12_10_16LE_HIGH: Self = yuv(Uv, SemiPlanar, 10, 16, Little, true);
    /// nv21, 10 bits in the high part of 16-bit LE elements.
    pub const NV21_10_16LE_HIGH: Self = yuv(Vu, SemiPlanar, 10, 16, Little, true);
    /// i420, 10 bits in the high part of 16-bit BE elements.
    pub const I420_10_16BE_HIGH: Self = yuv(Uv, Planar, 10, 16, Big, true);
    /// yv12, 10 bits in the high part of 16-bit BE elements.
    pub const YV12_10_16BE_HIGH: Self = yuv(Vu, Planar, 10, 16, Big, true);
    /// nv12, 10 bits in the high part of 16-bit BE elements.
    pub const NV12_10_16BE_HIGH: Self = yuv(Uv, SemiPlanar, 10, 16, Big, true);
    /// nv21, 10 bits in the high part of 16-bit BE elements.
    pub const NV21_10_16BE_HIGH: Self = yuv(Vu, SemiPlanar, 10, 16, Big, true);

    /// nv21 with four 10-bit samples packed into every 5 bytes.
    pub const NV21_10_PACKED: Self = yuv(Vu, SemiPlanar, 10, 10, Little, false);

    // === Single-plane ===

    /// 8-bit luma only.
    pub const GRAY: Self = mono(PixelLayout::Gray, 8, Little);
    /// 16-bit LE luma only.
    pub const GRAY16: Self = mono(PixelLayout::Gray, 16, Little);
    /// 8-bit sensor data.
    pub const RAW8: Self = mono(PixelLayout::Bayer, 8, Little);
    /// 16-bit LE sensor data.
    pub const RAW16: Self = mono(PixelLayout::Bayer, 16, Little);
    /// 16-bit BE sensor data.
    pub const RAW16_BE: Self = mono(PixelLayout::Bayer, 16, Big);
    /// 32-bit LE sensor data.
    pub const RAW32: Self = mono(PixelLayout::Bayer, 32, Little);
    /// 32-bit BE sensor data.
    pub const RAW32_BE: Self = mono(PixelLayout::Bayer, 32, Big);

    /// Interleaved 8-bit RGBA (still images only).
    pub const RGBA: Self = interleaved(PixelLayout::Rgba);
    /// Interleaved 8-bit ABGR (still images only).
    pub const ABGR: Self = interleaved(PixelLayout::Abgr);

    /// Number of planes a frame of this format carries.
    #[inline]
    pub const fn plane_count(&self) -> usize {
        match (self.layout, self.data_layout) {
            (PixelLayout::Yuv420, DataLayout::Planar) => 3,
            (PixelLayout::Yuv420, DataLayout::SemiPlanar) => 2,
            _ => 1,
        }
    }

    /// Interleaved components per pixel in the first plane.
    #[inline]
    pub const fn components(&self) -> usize {
        match self.layout {
            PixelLayout::Rgba | PixelLayout::Abgr => 4,
            _ => 1,
        }
    }

    /// Bytes per storage element, `None` for bit-packed formats.
    #[inline]
    pub const fn element_size(&self) -> Option<usize> {
        match self.data_size {
            8 => Some(1),
            16 => Some(2),
            32 => Some(4),
            _ => None,
        }
    }

    /// Whether samples are bit-packed (four 10-bit samples per 5 bytes).
    #[inline]
    pub const fn is_packed_10bit(&self) -> bool {
        self.data_size == 10
    }

    /// Largest sample value for the bit depth.
    #[inline]
    pub const fn max_value(&self) -> u32 {
        if self.bit_depth >= 32 {
            u32::MAX
        } else {
            (1u32 << self.bit_depth) - 1
        }
    }

    /// Whether the descriptor equals an entry of [`SUPPORTED_FORMATS`].
    pub fn is_supported(&self) -> bool {
        SUPPORTED_FORMATS.iter().any(|(_, f)| f == self)
    }

    /// Canonical name, for registry entries and the still-image formats.
    pub fn name(&self) -> Option<&'static str> {
        SUPPORTED_FORMATS
            .iter()
            .chain(IMAGE_FORMATS)
            .find(|(_, f)| f == self)
            .map(|(name, _)| *name)
    }

    /// Looks up a format by its canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        SUPPORTED_FORMATS
            .iter()
            .chain(IMAGE_FORMATS)
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, f)| *f)
    }

    /// Returns the U/V locations for planar and semi-planar 4:2:0 formats.
    ///
    /// Offsets and jump are in bytes. Bit-packed and single-plane formats
    /// are [`Error::Unsupported`].
    pub fn chroma_sites(&self) -> Result<ChromaSites> {
        let elem = match (self.layout, self.element_size()) {
            (PixelLayout::Yuv420, Some(e)) => e,
            _ => return Err(Error::unsupported(format!("no chroma planes in {self}"))),
        };
        let first = ChromaSite { plane: 1, offset: 0 };
        let sites = match (self.data_layout, self.order) {
            (DataLayout::Planar, ChromaOrder::Uv) => ChromaSites {
                u: first,
                v: ChromaSite { plane: 2, offset: 0 },
                jump: elem,
            },
            (DataLayout::Planar, ChromaOrder::Vu) => ChromaSites {
                u: ChromaSite { plane: 2, offset: 0 },
                v: first,
                jump: elem,
            },
            (DataLayout::SemiPlanar, ChromaOrder::Uv) => ChromaSites {
                u: first,
                v: ChromaSite { plane: 1, offset: elem },
                jump: 2 * elem,
            },
            (DataLayout::SemiPlanar, ChromaOrder::Vu) => ChromaSites {
                u: ChromaSite { plane: 1, offset: elem },
                v: first,
                jump: 2 * elem,
            },
            (DataLayout::Packed, _) => {
                return Err(Error::unsupported(format!("no chroma planes in {self}")));
            }
        };
        Ok(sites)
    }
}

impl fmt::Display for RawFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(
                f,
                "{:?}/{:?}/{:?} {}bit in {} ({:?})",
                self.layout,
                self.data_layout,
                self.order,
                self.bit_depth,
                self.data_size,
                self.endianness
            ),
        }
    }
}

impl FromStr for RawFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| Error::invalid_argument(format!("unknown format: {s}")))
    }
}

/// Formats accepted by the frame reader and writer.
pub const SUPPORTED_FORMATS: &[(&str, RawFormat)] = &[
    ("i420", RawFormat::I420),
    ("yv12", RawFormat::YV12),
    ("nv12", RawFormat::NV12),
    ("nv21", RawFormat::NV21),
    ("i420_10_16le", RawFormat::I420_10_16LE),
    ("yv12_10_16le", RawFormat::YV12_10_16LE),
    ("nv12_10_16le", RawFormat::NV12_10_16LE),
    ("nv21_10_16le", RawFormat::NV21_10_16LE),
    ("i420_10_16be", RawFormat::I420_10_16BE),
    ("yv12_10_16be", RawFormat::YV12_10_16BE),
    ("nv12_10_16be", RawFormat::NV12_10_16BE),
    ("nv21_10_16be", RawFormat::NV21_10_16BE),
    ("i420_10_16le_high", RawFormat::I420_10_16LE_HIGH),
    ("yv12_10_16le_high", RawFormat::YV12_10_16LE_HIGH),
    ("nv12_10_16le_high", RawFormat::NV12_10_16LE_HIGH),
    ("nv21_10_16le_high", RawFormat::NV21_10_16LE_HIGH),
    ("i420_10_16be_high", RawFormat::I420_10_16BE_HIGH),
    ("yv12_10_16be_high", RawFormat::YV12_10_16BE_HIGH),
    ("nv12_10_16be_high", RawFormat::NV12_10_16BE_HIGH),
    ("nv21_10_16be_high", RawFormat::NV21_10_16BE_HIGH),
    ("nv21_10_packed", RawFormat::NV21_10_PACKED),
    ("gray", RawFormat::GRAY),
    ("gray16", RawFormat::GRAY16),
    ("raw8", RawFormat::RAW8),
    ("raw16", RawFormat::RAW16),
    ("raw16_be", RawFormat::RAW16_BE),
    ("raw32", RawFormat::RAW32),
    ("raw32_be", RawFormat::RAW32_BE),
];

const IMAGE_FORMATS: &[(&str, RawFormat)] = &[("rgba", RawFormat::RGBA), ("abgr", RawFormat::ABGR)];
