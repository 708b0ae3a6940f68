//! Conversion to and from nv21_10_packed.

use crate::Pack10Args;
use anyhow::{Context, Result, bail};
use tracing::{debug, info};
use vraw_core::{FrameInfo, FrameLayout, FrameMut, RawFormat, alloc_frame_buffer};
use vraw_io::{pack_frame, unpack_frame};

/// Runs the pack10 command.
pub fn run(args: Pack10Args, verbose: u8) -> Result<()> {
    let loop_mode = super::bounded_loop(args.loop_mode, args.count)?;
    let config = super::stream_config(&args.input, &args.stream)?.with_loop(loop_mode);
    let mut reader = super::open_reader(&args.input, config)?;
    let in_format = reader.format();
    let out_format = args.out_format;

    let packing = out_format == RawFormat::NV21_10_PACKED;
    if packing == (in_format == RawFormat::NV21_10_PACKED) {
        bail!("Exactly one of {in_format} and {out_format} must be nv21_10_packed");
    }

    let resolution = reader.resolution();
    let out_layout = FrameLayout::compute(out_format, resolution, None)
        .with_context(|| format!("Cannot lay out {out_format} at {resolution}"))?;
    let mut writer = super::create_writer(&args.output, out_format, &reader)?;
    let mut in_buf = alloc_frame_buffer(reader.min_buf_size(), 0)?;
    let mut out_buf = alloc_frame_buffer(out_layout.frame_size(), 0x80)?;
    debug!(%in_format, %out_format, %resolution, packing, "pack10");

    while args.count == 0 || writer.frames_written() < args.count {
        let Some(frame) = super::next_frame(&mut reader, &mut in_buf)? else {
            break;
        };
        let index = frame.info.index;
        let mut dst = FrameMut::from_buffer(
            &mut out_buf,
            &out_layout,
            FrameInfo::new(out_format, resolution),
        )?;
        let converted = if packing {
            pack_frame(&frame, &mut dst)
        } else {
            unpack_frame(&frame, &mut dst)
        };
        converted.with_context(|| format!("Failed to convert frame #{index}"))?;
        writer
            .write_frame(&dst.as_frame())
            .with_context(|| format!("Failed to write frame #{index}"))?;
    }

    let written = writer.frames_written();
    writer
        .close()
        .with_context(|| format!("Failed to close: {}", args.output.display()))?;
    info!(frames = written, "pack10 done");
    if verbose > 0 {
        println!("{in_format} -> {out_format}: {written} frames ({resolution})");
    }
    Ok(())
}
