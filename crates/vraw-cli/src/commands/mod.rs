//! CLI command implementations

pub mod image;
pub mod info;
pub mod pack10;
pub mod psnr;
pub mod rewrite;

use crate::StreamArgs;
use anyhow::{Context, Result, bail};
use std::path::Path;
use vraw_core::{Frame, RawFormat, Resolution};
use vraw_io::{FrameReader, FrameWriter, LoopMode, ReaderConfig, WriterConfig, is_y4m_path};

/// Builds a reader config: y4m files describe themselves, raw files need
/// `format` and a resolution.
pub fn reader_config(
    path: &Path,
    format: Option<RawFormat>,
    resolution: Resolution,
) -> Result<ReaderConfig> {
    if is_y4m_path(path) {
        return Ok(ReaderConfig::y4m());
    }
    let format = format
        .with_context(|| format!("--format is required for raw input: {}", path.display()))?;
    Ok(ReaderConfig::new(format, resolution))
}

/// [`reader_config`] from shared stream arguments, with rate and SAR applied.
pub fn stream_config(path: &Path, stream: &StreamArgs) -> Result<ReaderConfig> {
    let mut config = reader_config(
        path,
        stream.format,
        Resolution::new(stream.width, stream.height),
    )?;
    if let Some(framerate) = stream.framerate {
        config = config.with_framerate(framerate);
    }
    if let Some(sar) = stream.sar {
        config = config.with_sar(sar);
    }
    Ok(config)
}

/// Loop mode from `--loop`; a looping input never ends, so it needs `--count`.
pub fn bounded_loop(direction: i32, count: u64) -> Result<LoopMode> {
    let mode = LoopMode::from(direction);
    if mode != LoopMode::None && count == 0 {
        bail!("--loop needs --count to bound the output");
    }
    Ok(mode)
}

/// Open a reader
pub fn open_reader(path: &Path, config: ReaderConfig) -> Result<FrameReader> {
    FrameReader::open(path, config).with_context(|| format!("Failed to open: {}", path.display()))
}

/// Create a writer matching the reader's stream, y4m by extension.
pub fn create_writer(path: &Path, format: RawFormat, reader: &FrameReader) -> Result<FrameWriter> {
    let config = WriterConfig::new(format, reader.resolution())
        .with_y4m(is_y4m_path(path))
        .with_framerate(reader.config().framerate)
        .with_sar(reader.config().sar);
    FrameWriter::create(path, config)
        .with_context(|| format!("Failed to create: {}", path.display()))
}

/// Reads the next frame, or `None` once the reader is exhausted.
pub fn next_frame<'a>(
    reader: &mut FrameReader,
    buf: &'a mut [u8],
) -> Result<Option<Frame<'a>>> {
    match reader.read_frame(buf) {
        Ok(frame) => Ok(Some(frame)),
        Err(e) if e.is_exhausted() => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read: {}", reader.path().display())),
    }
}

/// File size in binary units followed by the number of frames it holds,
/// e.g. `1.50 KiB (3 frames)`.
pub fn size_summary(bytes: u64, frames: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    let size = if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    };
    match frames {
        1 => format!("{size} (1 frame)"),
        n => format!("{size} ({n} frames)"),
    }
}
