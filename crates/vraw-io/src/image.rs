//! Still-image ingestion: PNG into a single RGBA plane.
//!
//! Two-step API mirroring the frame reader: query the buffer size, then fill
//! a caller buffer.
//!
//! ```rust,ignore
//! use vraw_io::image::{image_buf_size, read_image};
//!
//! let mut buf = vec![0u8; image_buf_size("logo.png")?];
//! let frame = read_image("logo.png", &mut buf)?;
//! assert_eq!(frame.stride(0), frame.info.resolution.width as usize * 4);
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::debug;
use vraw_core::{Error, Frame, FrameInfo, FrameLayout, RawFormat, Resolution, Result};

fn decoder(path: &Path) -> Result<png::Decoder<BufReader<File>>> {
    let file = File::open(path).map_err(|e| Error::from_open(path, e))?;
    let mut decoder = png::Decoder::new(BufReader::new(file));
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    Ok(decoder)
}

fn decode_error(e: png::DecodingError) -> Error {
    match e {
        png::DecodingError::IoError(io) => Error::Io(io),
        other => Error::protocol(format!("png: {other}")),
    }
}

/// Bytes needed by [`read_image`]: `width * height * 4`.
///
/// # Errors
///
/// [`Error::NotFound`] for a missing file, [`Error::Protocol`] for a
/// malformed PNG header.
pub fn image_buf_size<P: AsRef<Path>>(path: P) -> Result<usize> {
    let reader = decoder(path.as_ref())?.read_info().map_err(decode_error)?;
    let info = reader.info();
    let resolution = Resolution::new(info.width, info.height);
    Ok(FrameLayout::compute(RawFormat::RGBA, resolution, None)?.frame_size())
}

/// Decodes a PNG into `data` as 8-bit RGBA.
///
/// Gray, gray+alpha, RGB, palette and 16-bit inputs are converted; missing
/// alpha is opaque. The frame has one plane with stride `width * 4` and a
/// 1:1 SAR.
///
/// # Errors
///
/// - [`Error::NotFound`] for a missing file
/// - [`Error::Protocol`] for a malformed PNG
/// - [`Error::BufferTooSmall`] if `data` cannot hold the image
pub fn read_image<'a, P: AsRef<Path>>(path: P, data: &'a mut [u8]) -> Result<Frame<'a>> {
    let path = path.as_ref();
    let mut reader = decoder(path)?.read_info().map_err(decode_error)?;
    let resolution = Resolution::new(reader.info().width, reader.info().height);
    let layout = FrameLayout::compute(RawFormat::RGBA, resolution, None)?;
    if data.len() < layout.frame_size() {
        return Err(Error::buffer_too_small(layout.frame_size(), data.len()));
    }

    let size = reader
        .output_buffer_size()
        .ok_or_else(|| Error::protocol("png: cannot determine output buffer size"))?;
    let mut decoded = vraw_core::alloc_frame_buffer(size, 0)?;
    let out = reader.next_frame(&mut decoded).map_err(decode_error)?;
    let src = &decoded[..out.buffer_size()];
    let src_line = out.line_size;
    let rgba_line = resolution.width as usize * 4;

    let channels = match out.color_type {
        png::ColorType::Grayscale => 1,
        png::ColorType::GrayscaleAlpha => 2,
        png::ColorType::Rgb => 3,
        png::ColorType::Rgba => 4,
        png::ColorType::Indexed => {
            return Err(Error::unsupported("png: palette was not expanded"));
        }
    };
    for (src_row, dst_row) in src
        .chunks(src_line)
        .zip(data.chunks_mut(rgba_line))
        .take(resolution.height as usize)
    {
        for (px, rgba) in src_row.chunks_exact(channels).zip(dst_row.chunks_exact_mut(4)) {
            let pixel = match channels {
                1 => [px[0], px[0], px[0], 255],
                2 => [px[0], px[0], px[0], px[1]],
                3 => [px[0], px[1], px[2], 255],
                _ => [px[0], px[1], px[2], px[3]],
            };
            rgba.copy_from_slice(&pixel);
        }
    }

    debug!(
        path = %path.display(),
        resolution = %resolution,
        color = ?out.color_type,
        "decoded png"
    );
    Frame::from_buffer(data, &layout, FrameInfo::new(RawFormat::RGBA, resolution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufWriter;
    use tempfile::tempdir;

    fn write_png(path: &Path, width: u32, height: u32, color: png::ColorType, pixels: &[u8]) {
        let file = File::create(path).expect("create png");
        let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().expect("png header");
        writer.write_image_data(pixels).expect("png data");
    }

    #[test]
    fn test_rgb_to_rgba() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("rgb.png");
        write_png(&path, 2, 1, png::ColorType::Rgb, &[1, 2, 3, 4, 5, 6]);

        let size = image_buf_size(&path).expect("size failed");
        assert_eq!(size, 8);
        let mut buf = vec![0u8; size];
        let frame = read_image(&path, &mut buf).expect("read failed");
        assert_eq!(frame.info.format, RawFormat::RGBA);
        assert_eq!(frame.info.resolution, Resolution::new(2, 1));
        assert_eq!(frame.stride(0), 8);
        assert_eq!(frame.info.sar, vraw_core::Sar::SQUARE);
        assert_eq!(frame.plane(0).unwrap(), &[1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_gray_alpha_to_rgba() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("ga.png");
        write_png(&path, 1, 2, png::ColorType::GrayscaleAlpha, &[10, 20, 30, 40]);
        let mut buf = vec![0u8; 8];
        let frame = read_image(&path, &mut buf).expect("read failed");
        assert_eq!(frame.plane(0).unwrap(), &[10, 10, 10, 20, 30, 30, 30, 40]);
    }

    #[test]
    fn test_errors() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("missing.png");
        assert!(matches!(image_buf_size(&missing), Err(Error::NotFound { .. })));

        let garbage = dir.path().join("garbage.png");
        std::fs::write(&garbage, b"not a png at all").unwrap();
        assert!(matches!(image_buf_size(&garbage), Err(Error::Protocol(_))));

        let path = dir.path().join("rgba.png");
        write_png(&path, 2, 2, png::ColorType::Rgba, &[0; 16]);
        let mut small = vec![0u8; 15];
        let err = read_image(&path, &mut small).unwrap_err();
        assert!(matches!(err, Error::BufferTooSmall { required: 16, actual: 15 }));
    }
}
