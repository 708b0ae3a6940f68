//! PSNR between two streams, with independent decimation on each side.
//!
//! The n-th comparison pairs reference frame `n * d` with compared frame
//! `n * D`. Per-frame values are logged and optionally written to a CSV file
//! as `index y u v` lines, followed by `#mean y u v`.

use crate::PsnrArgs;
use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::info;
use vraw_core::{Frame, FrameInfo, Resolution, alloc_frame_buffer};
use vraw_io::{FrameReader, compute_psnr};

/// Runs the psnr command.
pub fn run(args: PsnrArgs, verbose: u8) -> Result<()> {
    let resolution = Resolution::new(args.width, args.height);
    let config_a = super::reader_config(&args.a, args.format, resolution)?;
    let config_b = super::reader_config(&args.b, args.format2.or(args.format), resolution)?;
    let mut reader_a = super::open_reader(&args.a, config_a)?;
    let mut reader_b = super::open_reader(&args.b, config_b)?;
    let mut buf_a = alloc_frame_buffer(reader_a.min_buf_size(), 0)?;
    let mut buf_b = alloc_frame_buffer(reader_b.min_buf_size(), 0)?;

    let mut csv = match &args.csv {
        Some(path) => Some(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create: {}", path.display())
        })?)),
        None => None,
    };

    let mut index = 0u64;
    let mut mean = [0.0f64; 3];
    loop {
        let Some(a) = next_decimated(&mut reader_a, &mut buf_a, args.decimation, index)? else {
            break;
        };
        let Some(b) = next_decimated(&mut reader_b, &mut buf_b, args.decimation2, index)? else {
            break;
        };
        let [y, u, v] =
            compute_psnr(&a, &b).with_context(|| format!("PSNR of frame #{index} failed"))?;
        info!("frame #{index}, PSNR Y={y:.3}, U={u:.3}, V={v:.3}");
        if verbose > 1 {
            println!("{index} {y:.3} {u:.3} {v:.3}");
        }
        if let Some(csv) = csv.as_mut() {
            writeln!(csv, "{index} {y:.3} {u:.3} {v:.3}")?;
        }
        for (sum, value) in mean.iter_mut().zip([y, u, v]) {
            *sum += value;
        }
        index += 1;
    }

    if index == 0 {
        bail!("0 frames processed, mean PSNR cannot be computed");
    }
    for sum in &mut mean {
        *sum /= index as f64;
    }
    let [y, u, v] = mean;
    if let Some(mut csv) = csv {
        writeln!(csv, "#mean {y:.3} {u:.3} {v:.3}")?;
        csv.flush()?;
    }
    println!("Mean PSNR: Y = {y:.3} dB, U = {u:.3} dB, V = {v:.3} dB");
    Ok(())
}

/// Reads until the frame whose index is `counter * decimation`.
fn next_decimated<'a>(
    reader: &mut FrameReader,
    buf: &'a mut [u8],
    decimation: u64,
    counter: u64,
) -> Result<Option<Frame<'a>>> {
    let info: FrameInfo = loop {
        let Some(frame) = super::next_frame(reader, buf)? else {
            return Ok(None);
        };
        let i = frame.info.index;
        if i % decimation == 0 && i / decimation == counter {
            break frame.info;
        }
    };
    let buf: &'a [u8] = buf;
    Ok(Some(Frame::from_buffer(buf, reader.frame_layout(), info)?))
}
