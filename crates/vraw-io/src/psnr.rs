//! Per-plane PSNR between two 4:2:0 frames.
//!
//! The two frames may use different layouts (e.g. i420 against nv21) as
//! long as resolution, bit depth and storage size agree.
//!
//! ```text
//! nmse = sum((a - b)^2) / (w * h * (2^bits - 1)^2)
//! psnr = -10 * log10(nmse)          (1000.0 when nmse == 0)
//! ```

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use vraw_core::{Endianness, Error, Frame, FrameLayout, RawFormat, Result};

/// PSNR reported for identical planes.
pub const PSNR_IDENTICAL: f64 = 1000.0;

/// Converts a normalized MSE to PSNR in dB.
#[inline]
pub fn psnr_from_mse(nmse: f64) -> f64 {
    if nmse == 0.0 {
        PSNR_IDENTICAL
    } else {
        -10.0 * nmse.log10()
    }
}

/// Where one component's samples live in a frame.
#[derive(Debug, Clone, Copy)]
struct Component<'a> {
    data: &'a [u8],
    stride: usize,
    offset: usize,
    jump: usize,
}

impl Component<'_> {
    fn sample(&self, format: RawFormat, row: usize, col: usize) -> u32 {
        let at = row * self.stride + self.offset + col * self.jump;
        let bytes = &self.data[at..];
        let raw = match (format.data_size, format.endianness) {
            (8, _) => u32::from(bytes[0]),
            (_, Endianness::Little) => u32::from(LittleEndian::read_u16(bytes)),
            (_, Endianness::Big) => u32::from(BigEndian::read_u16(bytes)),
        };
        if format.msb_aligned {
            raw >> (16 - u32::from(format.bit_depth))
        } else {
            raw
        }
    }
}

/// Locates Y, U and V of a frame after checking its planes.
fn components<'a>(frame: &Frame<'a>) -> Result<[Component<'a>; 3]> {
    let format = frame.info.format;
    let sites = format.chroma_sites()?;
    let elem = match format.element_size() {
        Some(e @ (1 | 2)) => e,
        _ => return Err(Error::unsupported(format!("psnr of {format}"))),
    };
    let layout = FrameLayout::compute(format, frame.info.resolution, None)?;
    let mut planes = [(&[][..], 0usize); 3];
    for (i, plane) in layout.planes().iter().enumerate() {
        planes[i] = frame.checked_plane(i, plane)?;
    }
    let at = |plane: usize, offset: usize, jump: usize| Component {
        data: planes[plane].0,
        stride: planes[plane].1,
        offset,
        jump,
    };
    Ok([
        at(0, 0, elem),
        at(sites.u.plane, sites.u.offset, sites.jump),
        at(sites.v.plane, sites.v.offset, sites.jump),
    ])
}

/// Computes the PSNR of the Y, U and V planes of `b` against `a`.
///
/// # Errors
///
/// - [`Error::InvalidArgument`] for differing or zero resolutions, bit
///   depths or storage sizes, or short planes / strides
/// - [`Error::Unsupported`] unless both frames are planar or semi-planar
///   4:2:0 with 8- or 16-bit storage
pub fn compute_psnr(a: &Frame<'_>, b: &Frame<'_>) -> Result<[f64; 3]> {
    let (fa, fb) = (a.info.format, b.info.format);
    if a.info.resolution != b.info.resolution || a.info.resolution.is_empty() {
        return Err(Error::invalid_argument(format!(
            "cannot compare {} with {}",
            a.info.resolution, b.info.resolution
        )));
    }
    if fa.bit_depth != fb.bit_depth || fa.data_size != fb.data_size {
        return Err(Error::invalid_argument(format!(
            "sample formats differ: {fa} vs {fb}"
        )));
    }

    let ca = components(a)?;
    let cb = components(b)?;
    let width = a.info.resolution.width as usize;
    let height = a.info.resolution.height as usize;
    let dims = [
        (width, height),
        (width.div_ceil(2), height.div_ceil(2)),
        (width.div_ceil(2), height.div_ceil(2)),
    ];
    let max = f64::from(fa.max_value());

    let mut psnr = [0.0; 3];
    for (k, &(w, h)) in dims.iter().enumerate() {
        let mut sum: u64 = 0;
        for row in 0..h {
            for col in 0..w {
                let d = i64::from(ca[k].sample(fa, row, col)) - i64::from(cb[k].sample(fb, row, col));
                sum += (d * d) as u64;
            }
        }
        let nmse = sum as f64 / ((w * h) as f64 * max * max);
        psnr[k] = psnr_from_mse(nmse);
    }
    Ok(psnr)
}
