//! PNG decode to RGBA.

use crate::ImageArgs;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::info;
use vraw_core::alloc_frame_buffer;
use vraw_io::image::{image_buf_size, read_image};

/// Runs the image command, dumping the RGBA rows when an output is given.
pub fn run(args: ImageArgs, verbose: u8) -> Result<()> {
    let path = &args.input;
    let size = image_buf_size(path).with_context(|| format!("Failed to load: {}", path.display()))?;
    let mut buf = alloc_frame_buffer(size, 0)?;
    let frame =
        read_image(path, &mut buf).with_context(|| format!("Failed to load: {}", path.display()))?;
    let resolution = frame.info.resolution;
    info!(format = %frame.info.format, %resolution, "image decoded");
    println!("{}: {} {}", path.display(), frame.info.format, resolution);

    if let Some(output) = &args.output {
        let row_bytes = resolution.width as usize * 4;
        let stride = frame.stride(0);
        let data = frame.plane(0).unwrap_or_default();
        let file = File::create(output)
            .with_context(|| format!("Failed to create: {}", output.display()))?;
        let mut out = BufWriter::new(file);
        for row in data.chunks(stride).take(resolution.height as usize) {
            out.write_all(&row[..row_bytes])?;
        }
        out.flush()?;
        if verbose > 0 {
            println!("RGBA rows saved to {}", output.display());
        }
    }
    Ok(())
}
