//! Stream info command.
//!
//! Prints format, geometry, timing and frame count of raw and y4m files.

use crate::InfoArgs;
use anyhow::Result;
use std::fs;
use vraw_core::SUPPORTED_FORMATS;
use vraw_io::FrameReader;

/// Runs the info command.
pub fn run(args: InfoArgs, verbose: u8) -> Result<()> {
    if args.formats {
        for (name, format) in SUPPORTED_FORMATS {
            println!(
                "{name:<20} {} plane(s), {}-bit in {}-bit storage",
                format.plane_count(),
                format.bit_depth,
                format.data_size
            );
        }
    }

    for path in &args.input {
        let file_size = fs::metadata(path)?.len();
        let config = super::stream_config(path, &args.stream)?;
        let reader = super::open_reader(path, config)?;
        print_text(path, &reader, file_size, verbose);

        if args.input.len() > 1 {
            println!();
        }
    }
    Ok(())
}

fn print_text(path: &std::path::Path, reader: &FrameReader, file_size: u64, verbose: u8) {
    let config = reader.config();
    let frames = reader.file_frame_count();
    println!("{}", path.display());
    println!("  Container:  {}", if config.y4m { "y4m" } else { "raw" });
    println!("  Format:     {}", reader.format());
    println!("  Resolution: {}", reader.resolution());
    println!(
        "  Framerate:  {} ({:.3} fps)",
        config.framerate,
        config.framerate.as_f64()
    );
    println!("  SAR:        {}", config.sar);
    println!("  Frame size: {} bytes", reader.file_layout().frame_size());
    println!("  Frames:     {}", frames);
    println!(
        "  Duration:   {:.3} s",
        (frames * config.framerate.frame_duration()) as f64 / 1e6
    );
    println!("  File size:  {}", super::size_summary(file_size, frames));

    if verbose > 0 {
        for (i, plane) in reader.file_layout().planes().iter().enumerate() {
            println!(
                "  Plane {}:    {} x {} bytes",
                i, plane.row_bytes, plane.rows
            );
        }
    }
}
