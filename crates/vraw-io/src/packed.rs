//! Packed 10-bit codec.
//!
//! The packed layout stores four 10-bit samples in 5 bytes with no padding.
//! A block is the 40-bit little-endian word
//!
//! ```text
//! bits  0..10  sample 0
//! bits 10..20  sample 1
//! bits 20..30  sample 2
//! bits 30..40  sample 3
//! ```
//!
//! Luma rows pack consecutive pixels. Chroma rows of
//! [`RawFormat::NV21_10_PACKED`] interleave `V0 U0 V1 U1 ...`.
//!
//! Unpacked sides may be 8-bit (`v << 2` on packing, rounded back on
//! unpacking) or 10-bit values in 16-bit little- or big-endian elements,
//! for the i420 / yv12 / nv12 / nv21 families.
//!
//! # Example
//!
//! ```rust
//! use vraw_io::packed::{pack_block, unpack_block};
//!
//! let bytes = pack_block([1, 2, 3, 1023]);
//! assert_eq!(unpack_block(&bytes), [1, 2, 3, 1023]);
//! ```

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tracing::trace;
use vraw_core::{ChromaSites, Endianness, Error, Frame, FrameInfo, FrameLayout, FrameMut, RawFormat, Result};

/// Samples per packed block.
pub const BLOCK_SAMPLES: usize = 4;

/// Bytes per packed block.
pub const BLOCK_BYTES: usize = 5;

const MASK_10: u16 = 0x3FF;

// === Block level ===

/// Packs four 10-bit samples into 5 bytes. Bits above 10 are dropped.
#[inline]
pub fn pack_block(samples: [u16; BLOCK_SAMPLES]) -> [u8; BLOCK_BYTES] {
    let word = samples
        .iter()
        .rev()
        .fold(0u64, |acc, &s| (acc << 10) | u64::from(s & MASK_10));
    let bytes = word.to_le_bytes();
    [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]]
}

/// Unpacks 5 bytes into four 10-bit samples.
#[inline]
pub fn unpack_block(bytes: &[u8; BLOCK_BYTES]) -> [u16; BLOCK_SAMPLES] {
    let mut wide = [0u8; 8];
    wide[..BLOCK_BYTES].copy_from_slice(bytes);
    let word = u64::from_le_bytes(wide);
    std::array::from_fn(|k| ((word >> (10 * k)) as u16) & MASK_10)
}

/// Packs a row of samples; `samples.len()` must be a multiple of 4.
pub fn pack_line(samples: &[u16], out: &mut [u8]) {
    for (chunk, dst) in samples
        .chunks_exact(BLOCK_SAMPLES)
        .zip(out.chunks_exact_mut(BLOCK_BYTES))
    {
        dst.copy_from_slice(&pack_block([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
}

/// Unpacks a packed row into `samples`.
pub fn unpack_line(packed: &[u8], samples: &mut [u16]) {
    for (src, dst) in packed
        .chunks_exact(BLOCK_BYTES)
        .zip(samples.chunks_exact_mut(BLOCK_SAMPLES))
    {
        let block = [src[0], src[1], src[2], src[3], src[4]];
        dst.copy_from_slice(&unpack_block(&block));
    }
}

// === Sample encodings ===

/// Storage of unpacked samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// 8-bit samples, scaled to 10 bits.
    U8,
    /// 10-bit values in 16-bit little-endian elements.
    U16Le,
    /// 10-bit values in 16-bit big-endian elements.
    U16Be,
}

impl SampleEncoding {
    /// Encoding of a 4:2:0 planar or semi-planar format.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] for every other format, including MSB-aligned
    /// 16-bit storage.
    pub fn for_format(format: RawFormat) -> Result<Self> {
        let yuv = format.is_supported() && format.chroma_sites().is_ok();
        match (yuv, format.data_size, format.msb_aligned, format.endianness) {
            (true, 8, _, _) => Ok(Self::U8),
            (true, 16, false, Endianness::Little) => Ok(Self::U16Le),
            (true, 16, false, Endianness::Big) => Ok(Self::U16Be),
            _ => Err(Error::unsupported(format!("packed 10-bit conversion of {format}"))),
        }
    }

    /// Bytes per element.
    #[inline]
    pub const fn element_size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16Le | Self::U16Be => 2,
        }
    }

    /// Reads one sample as a 10-bit value.
    #[inline]
    pub fn load(self, bytes: &[u8]) -> u16 {
        match self {
            Self::U8 => u16::from(bytes[0]) << 2,
            Self::U16Le => LittleEndian::read_u16(bytes) & MASK_10,
            Self::U16Be => BigEndian::read_u16(bytes) & MASK_10,
        }
    }

    /// Stores one 10-bit value, rounding to 8 bits where needed.
    #[inline]
    pub fn store(self, value: u16, bytes: &mut [u8]) {
        match self {
            Self::U8 => bytes[0] = ((value + 2) >> 2).min(255) as u8,
            Self::U16Le => LittleEndian::write_u16(bytes, value & MASK_10),
            Self::U16Be => BigEndian::write_u16(bytes, value & MASK_10),
        }
    }
}

/// Reads samples at `offset + k * jump` into every `step`-th slot of `out`.
fn gather(line: &[u8], offset: usize, jump: usize, enc: SampleEncoding, out: &mut [u16], step: usize) {
    for (k, slot) in out.iter_mut().step_by(step).enumerate() {
        *slot = enc.load(&line[offset + k * jump..]);
    }
}

/// Writes every `step`-th value of `samples` to `offset + k * jump`.
fn scatter(line: &mut [u8], offset: usize, jump: usize, enc: SampleEncoding, samples: &[u16], step: usize) {
    for (k, &value) in samples.iter().step_by(step).enumerate() {
        enc.store(value, &mut line[offset + k * jump..]);
    }
}

// === Frame level ===

/// Geometry shared by both directions.
struct Plan {
    enc: SampleEncoding,
    sites: ChromaSites,
    unpacked: FrameLayout,
    packed: FrameLayout,
    width: usize,
}

fn plan(unpacked: &FrameInfo, packed: &FrameInfo) -> Result<Plan> {
    if packed.format != RawFormat::NV21_10_PACKED {
        return Err(Error::unsupported(format!(
            "{} is not a packed 10-bit format",
            packed.format
        )));
    }
    let enc = SampleEncoding::for_format(unpacked.format)?;
    let sites = unpacked.format.chroma_sites()?;
    if unpacked.resolution != packed.resolution {
        return Err(Error::invalid_argument(format!(
            "resolution mismatch: {} vs {}",
            unpacked.resolution, packed.resolution
        )));
    }
    let resolution = unpacked.resolution;
    Ok(Plan {
        enc,
        sites,
        unpacked: FrameLayout::compute(unpacked.format, resolution, None)?,
        packed: FrameLayout::compute(RawFormat::NV21_10_PACKED, resolution, None)?,
        width: resolution.width as usize,
    })
}

/// Packs an 8-bit or 16-bit 4:2:0 frame into `nv21_10_packed`.
///
/// Timing metadata is copied to `dst`.
///
/// # Errors
///
/// - [`Error::Unsupported`] if `dst` is not `nv21_10_packed` or `src` is not
///   one of the i420 / yv12 / nv12 / nv21 8-bit, 16le or 16be formats
/// - [`Error::InvalidArgument`] for mismatched resolutions, a width not
///   divisible by 4, or missing / short planes
pub fn pack_frame(src: &Frame<'_>, dst: &mut FrameMut<'_>) -> Result<()> {
    let plan = plan(&src.info, &dst.info)?;
    let elem = plan.enc.element_size();

    let (y_src, y_stride) = src.checked_plane(0, &plan.unpacked.planes()[0])?;
    let u_plane = &plan.unpacked.planes()[plan.sites.u.plane];
    let v_plane = &plan.unpacked.planes()[plan.sites.v.plane];
    let (u_src, u_stride) = src.checked_plane(plan.sites.u.plane, u_plane)?;
    let (v_src, v_stride) = src.checked_plane(plan.sites.v.plane, v_plane)?;
    for (i, plane) in plan.packed.planes().iter().enumerate() {
        dst.check_plane(i, plane)?;
    }

    let luma = plan.packed.planes()[0];
    let chroma = plan.packed.planes()[1];
    let mut samples = vec![0u16; plan.width];

    let y_dst_stride = dst.stride(0);
    let y_dst = dst
        .plane_mut(0)
        .ok_or_else(|| Error::invalid_argument("missing plane 0"))?;
    for row in 0..luma.rows {
        gather(&y_src[row * y_stride..], 0, elem, plan.enc, &mut samples, 1);
        let start = row * y_dst_stride;
        pack_line(&samples, &mut y_dst[start..start + luma.row_bytes]);
    }

    let uv_dst_stride = dst.stride(1);
    let uv_dst = dst
        .plane_mut(1)
        .ok_or_else(|| Error::invalid_argument("missing plane 1"))?;
    let (u, v, jump) = (plan.sites.u, plan.sites.v, plan.sites.jump);
    for row in 0..chroma.rows {
        gather(&v_src[row * v_stride..], v.offset, jump, plan.enc, &mut samples, 2);
        gather(&u_src[row * u_stride..], u.offset, jump, plan.enc, &mut samples[1..], 2);
        let start = row * uv_dst_stride;
        pack_line(&samples, &mut uv_dst[start..start + chroma.row_bytes]);
    }

    dst.info.copy_timing_from(&src.info);
    trace!(from = %src.info.format, index = src.info.index, "packed frame");
    Ok(())
}

/// Unpacks an `nv21_10_packed` frame into an 8-bit or 16-bit 4:2:0 frame.
///
/// 8-bit output rounds `(v + 2) >> 2`, saturating at 255. Timing metadata
/// is copied to `dst`.
///
/// # Errors
///
/// Same conditions as [`pack_frame`], with the roles swapped.
pub fn unpack_frame(src: &Frame<'_>, dst: &mut FrameMut<'_>) -> Result<()> {
    let plan = plan(&dst.info, &src.info)?;
    let elem = plan.enc.element_size();

    let luma = plan.packed.planes()[0];
    let chroma = plan.packed.planes()[1];
    let (y_src, y_stride) = src.checked_plane(0, &luma)?;
    let (uv_src, uv_stride) = src.checked_plane(1, &chroma)?;
    for (i, plane) in plan.unpacked.planes().iter().enumerate() {
        dst.check_plane(i, plane)?;
    }

    let mut samples = vec![0u16; plan.width];

    let y_dst_stride = dst.stride(0);
    let y_dst = dst
        .plane_mut(0)
        .ok_or_else(|| Error::invalid_argument("missing plane 0"))?;
    for row in 0..luma.rows {
        let start = row * y_stride;
        unpack_line(&y_src[start..start + luma.row_bytes], &mut samples);
        scatter(&mut y_dst[row * y_dst_stride..], 0, elem, plan.enc, &samples, 1);
    }

    let (u, v, jump) = (plan.sites.u, plan.sites.v, plan.sites.jump);
    let u_stride = dst.stride(u.plane);
    let v_stride = dst.stride(v.plane);
    for row in 0..chroma.rows {
        let start = row * uv_stride;
        unpack_line(&uv_src[start..start + chroma.row_bytes], &mut samples);

        let v_dst = dst
            .plane_mut(v.plane)
            .ok_or_else(|| Error::invalid_argument("missing V plane"))?;
        scatter(&mut v_dst[row * v_stride..], v.offset, jump, plan.enc, &samples, 2);
        let u_dst = dst
            .plane_mut(u.plane)
            .ok_or_else(|| Error::invalid_argument("missing U plane"))?;
        scatter(&mut u_dst[row * u_stride..], u.offset, jump, plan.enc, &samples[1..], 2);
    }

    dst.info.copy_timing_from(&src.info);
    trace!(to = %dst.info.format, index = src.info.index, "unpacked frame");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vraw_core::Resolution;

    #[test]
    fn test_pack_block_bit_layout() {
        // Sample k occupies bits 10k..10k+10 of a little-endian 40-bit word.
        assert_eq!(pack_block([0x3FF, 0, 0, 0]), [0xFF, 0x03, 0, 0, 0]);
        assert_eq!(pack_block([0, 0x3FF, 0, 0]), [0, 0xFC, 0x0F, 0, 0]);
        assert_eq!(pack_block([0, 0, 0x3FF, 0]), [0, 0, 0xF0, 0x3F, 0]);
        assert_eq!(pack_block([0, 0, 0, 0x3FF]), [0, 0, 0, 0xC0, 0xFF]);
        assert_eq!(pack_block([0xFFFF, 0, 0, 0]), [0xFF, 0x03, 0, 0, 0]);
    }

    #[test]
    fn test_block_roundtrip_edges() {
        for samples in [[0, 0, 0, 0], [1023; 4], [1, 512, 1022, 3], [0x155, 0x2AA, 0x155, 0x2AA]] {
            assert_eq!(unpack_block(&pack_block(samples)), samples);
        }
    }

    #[test]
    fn test_block_roundtrip_every_value() {
        for pos in 0..BLOCK_SAMPLES {
            for fill in [0u16, 1023] {
                for v in 0..1024u16 {
                    let mut samples = [fill; BLOCK_SAMPLES];
                    samples[pos] = v;
                    let bytes = pack_block(samples);
                    assert_eq!(unpack_block(&bytes), samples, "pos {pos} value {v}");
                    assert_eq!(pack_block(unpack_block(&bytes)), bytes);
                }
            }
        }
    }

    #[test]
    fn test_8bit_scaling() {
        for v in 0..=255u8 {
            let mut byte = [0u8];
            let ten = SampleEncoding::U8.load(&[v]);
            assert_eq!(ten, u16::from(v) << 2);
            SampleEncoding::U8.store(ten, &mut byte);
            assert_eq!(byte[0], v);
        }
        let mut byte = [0u8];
        SampleEncoding::U8.store(1023, &mut byte);
        assert_eq!(byte[0], 255);
        SampleEncoding::U8.store(1, &mut byte);
        assert_eq!(byte[0], 0);
        SampleEncoding::U8.store(2, &mut byte);
        assert_eq!(byte[0], 1);
    }

    #[test]
    fn test_16bit_endianness() {
        assert_eq!(SampleEncoding::U16Le.load(&[0x01, 0x02]), 0x201);
        assert_eq!(SampleEncoding::U16Be.load(&[0x02, 0x01]), 0x201);
        assert_eq!(SampleEncoding::U16Le.load(&[0xFF, 0xFF]), 0x3FF);
        let mut out = [0u8; 2];
        SampleEncoding::U16Be.store(0x201, &mut out);
        assert_eq!(out, [0x02, 0x01]);
    }

    #[test]
    fn test_encoding_for_format() {
        assert_eq!(SampleEncoding::for_format(RawFormat::YV12).unwrap(), SampleEncoding::U8);
        assert_eq!(SampleEncoding::for_format(RawFormat::NV12_10_16LE).unwrap(), SampleEncoding::U16Le);
        assert_eq!(SampleEncoding::for_format(RawFormat::I420_10_16BE).unwrap(), SampleEncoding::U16Be);
        for format in [
            RawFormat::NV21_10_16LE_HIGH,
            RawFormat::GRAY,
            RawFormat::RAW16,
            RawFormat::NV21_10_PACKED,
            RawFormat::RGBA,
        ] {
            assert!(matches!(SampleEncoding::for_format(format), Err(Error::Unsupported(_))));
        }
    }

    fn frame_buffers(format: RawFormat, res: Resolution) -> (FrameLayout, Vec<u8>) {
        let layout = FrameLayout::compute(format, res, None).expect("layout");
        let buf = vec![0u8; layout.frame_size()];
        (layout, buf)
    }

    #[test]
    fn test_pack_nv21_8bit_ordering() {
        let res = Resolution::new(4, 2);
        let (layout, mut src_buf) = frame_buffers(RawFormat::NV21, res);
        src_buf[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        // V0 U0 V1 U1
        src_buf[8..12].copy_from_slice(&[10, 20, 30, 40]);
        let src = Frame::from_buffer(&src_buf, &layout, FrameInfo::new(RawFormat::NV21, res)).unwrap();

        let (packed_layout, mut dst_buf) = frame_buffers(RawFormat::NV21_10_PACKED, res);
        let mut dst = FrameMut::from_buffer(
            &mut dst_buf,
            &packed_layout,
            FrameInfo::new(RawFormat::NV21_10_PACKED, res),
        )
        .unwrap();
        pack_frame(&src, &mut dst).expect("pack failed");

        assert_eq!(dst_buf[0..5], pack_block([4, 8, 12, 16]));
        assert_eq!(dst_buf[5..10], pack_block([20, 24, 28, 32]));
        assert_eq!(dst_buf[10..15], pack_block([40, 80, 120, 160]));
    }

    #[test]
    fn test_pack_i420_chroma_interleaves_v_first() {
        let res = Resolution::new(4, 2);
        let (layout, mut src_buf) = frame_buffers(RawFormat::I420, res);
        src_buf[8..10].copy_from_slice(&[1, 2]); // U
        src_buf[10..12].copy_from_slice(&[3, 4]); // V
        let src = Frame::from_buffer(&src_buf, &layout, FrameInfo::new(RawFormat::I420, res)).unwrap();

        let (packed_layout, mut dst_buf) = frame_buffers(RawFormat::NV21_10_PACKED, res);
        let mut dst = FrameMut::from_buffer(
            &mut dst_buf,
            &packed_layout,
            FrameInfo::new(RawFormat::NV21_10_PACKED, res),
        )
        .unwrap();
        pack_frame(&src, &mut dst).expect("pack failed");
        assert_eq!(dst_buf[10..15], pack_block([12, 4, 16, 8]));
    }

    #[test]
    fn test_unpack_16be_planar() {
        let res = Resolution::new(4, 2);
        let (packed_layout, mut src_buf) = frame_buffers(RawFormat::NV21_10_PACKED, res);
        src_buf[0..5].copy_from_slice(&pack_block([1, 2, 3, 4]));
        src_buf[5..10].copy_from_slice(&pack_block([5, 6, 7, 8]));
        src_buf[10..15].copy_from_slice(&pack_block([100, 200, 300, 400]));
        let mut info = FrameInfo::new(RawFormat::NV21_10_PACKED, res);
        info.timestamp = 66_666;
        info.index = 2;
        let src = Frame::from_buffer(&src_buf, &packed_layout, info).unwrap();

        let (layout, mut dst_buf) = frame_buffers(RawFormat::YV12_10_16BE, res);
        let mut dst =
            FrameMut::from_buffer(&mut dst_buf, &layout, FrameInfo::new(RawFormat::YV12_10_16BE, res))
                .unwrap();
        unpack_frame(&src, &mut dst).expect("unpack failed");
        assert_eq!(dst.info.timestamp, 66_666);
        assert_eq!(dst.info.index, 2);

        assert_eq!(&dst_buf[0..4], &[0, 1, 0, 2]);
        assert_eq!(&dst_buf[14..16], &[0, 8]);
        // yv12: plane 1 is V, plane 2 is U.
        assert_eq!(&dst_buf[16..20], &[0, 100, 1, 44]);
        assert_eq!(&dst_buf[20..24], &[0, 200, 1, 144]);
    }

    #[test]
    fn test_rejections() {
        let res = Resolution::new(4, 2);
        let (layout, src_buf) = frame_buffers(RawFormat::NV12, res);
        let src = Frame::from_buffer(&src_buf, &layout, FrameInfo::new(RawFormat::NV12, res)).unwrap();

        // Destination is not packed.
        let (nv12_layout, mut other) = frame_buffers(RawFormat::NV12, res);
        let mut dst =
            FrameMut::from_buffer(&mut other, &nv12_layout, FrameInfo::new(RawFormat::NV12, res)).unwrap();
        assert!(matches!(pack_frame(&src, &mut dst), Err(Error::Unsupported(_))));

        // Resolution mismatch.
        let big = Resolution::new(8, 2);
        let (packed_layout, mut packed) = frame_buffers(RawFormat::NV21_10_PACKED, big);
        let mut dst = FrameMut::from_buffer(
            &mut packed,
            &packed_layout,
            FrameInfo::new(RawFormat::NV21_10_PACKED, big),
        )
        .unwrap();
        assert!(pack_frame(&src, &mut dst).unwrap_err().is_invalid_argument());

        // Missing chroma plane.
        let partial = Frame::new(FrameInfo::new(RawFormat::NV12, res)).with_plane(0, &src_buf[..8], 4);
        let (packed_layout, mut packed) = frame_buffers(RawFormat::NV21_10_PACKED, res);
        let mut dst = FrameMut::from_buffer(
            &mut packed,
            &packed_layout,
            FrameInfo::new(RawFormat::NV21_10_PACKED, res),
        )
        .unwrap();
        assert!(pack_frame(&partial, &mut dst).unwrap_err().is_invalid_argument());
        assert!(packed.iter().all(|&b| b == 0));
    }
}
