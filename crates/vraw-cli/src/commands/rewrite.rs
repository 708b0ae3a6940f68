//! Frame copy between raw and y4m files, with optional looping.

use crate::RewriteArgs;
use anyhow::{Context, Result};
use tracing::info;
use vraw_core::alloc_frame_buffer;

/// Runs the rewrite command.
///
/// Output format and geometry follow the input; the output extension picks
/// the container. A looping input never ends, so `--loop` needs `--count`.
pub fn run(args: RewriteArgs, verbose: u8) -> Result<()> {
    let loop_mode = super::bounded_loop(args.loop_mode, args.count)?;

    let config = super::stream_config(&args.input, &args.stream)?
        .with_loop(loop_mode)
        .with_start(args.start, args.reverse)
        .with_max_count(args.max_count);
    let mut reader = super::open_reader(&args.input, config)?;
    let mut writer = super::create_writer(&args.output, reader.format(), &reader)?;
    let mut buf = alloc_frame_buffer(reader.min_buf_size(), 0)?;

    while args.count == 0 || writer.frames_written() < args.count {
        let Some(frame) = super::next_frame(&mut reader, &mut buf)? else {
            break;
        };
        writer
            .write_frame(&frame)
            .with_context(|| format!("Failed to write frame #{}", frame.info.index))?;
    }

    let written = writer.frames_written();
    writer
        .close()
        .with_context(|| format!("Failed to close: {}", args.output.display()))?;
    info!(frames = written, output = %args.output.display(), "rewrite done");
    if verbose > 0 {
        println!(
            "{} -> {}: {} frames ({} {})",
            args.input.display(),
            args.output.display(),
            written,
            reader.format(),
            reader.resolution()
        );
    }
    Ok(())
}
