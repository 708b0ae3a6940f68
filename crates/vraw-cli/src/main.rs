//! vraw - raw video command-line tools
//!
//! Rewrites raw / y4m streams, converts to and from packed 10-bit, measures
//! PSNR between two streams and inspects files.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use vraw_core::{Fraction, RawFormat, Sar};

mod commands;

#[derive(Parser)]
#[command(name = "vraw")]
#[command(author, version, about = "Raw video rewrite, pack and PSNR tools")]
#[command(long_about = "
Tools for headerless raw video and YUV4MPEG2 (.y4m) files.

Examples:
  vraw info clip.y4m                              # Show stream info
  vraw info clip.nv12 -f nv12 -W 1920 -H 1080
  vraw rewrite clip.y4m out.i420                  # Strip the y4m container
  vraw rewrite in.i420 out.y4m -f i420 -W 640 -H 480 -F 25/1
  vraw rewrite in.nv12 out.nv12 -f nv12 -W 64 -H 64 -l -1 -n 100
  vraw pack10 in.yuv out.raw -f nv21_10_16le -o nv21_10_packed -W 1280 -H 720
  vraw psnr ref.i420 test.nv21 -f i420 -F nv21 -W 1280 -H 720 -c psnr.csv
  vraw image logo.png logo.rgba
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Also write log records to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Display stream information
    #[command(visible_alias = "i")]
    Info(InfoArgs),

    /// Copy frames, optionally adding or removing the y4m container
    #[command(visible_alias = "r")]
    Rewrite(RewriteArgs),

    /// Convert to or from nv21_10_packed
    Pack10(Pack10Args),

    /// Per-frame PSNR between two streams
    Psnr(PsnrArgs),

    /// Decode a PNG to RGBA
    Image(ImageArgs),
}

/// Geometry of a raw stream; ignored for .y4m files, whose header wins.
#[derive(Args, Clone, Debug, Default)]
struct StreamArgs {
    /// Pixel format (see `info --formats`)
    #[arg(short = 'f', long)]
    format: Option<RawFormat>,

    /// Frame width
    #[arg(short = 'W', long, default_value = "0")]
    width: u32,

    /// Frame height
    #[arg(short = 'H', long, default_value = "0")]
    height: u32,

    /// Frame rate as num/den
    #[arg(short = 'F', long, value_parser = parse_fraction)]
    framerate: Option<Fraction>,

    /// Sample aspect ratio as w:h
    #[arg(short = 's', long, value_parser = parse_sar)]
    sar: Option<Sar>,
}

#[derive(Args)]
struct InfoArgs {
    /// Input file(s)
    input: Vec<PathBuf>,

    #[command(flatten)]
    stream: StreamArgs,

    /// List the supported pixel formats
    #[arg(long)]
    formats: bool,
}

#[derive(Args)]
struct RewriteArgs {
    /// Input file
    input: PathBuf,

    /// Output file (.y4m writes a container)
    output: PathBuf,

    #[command(flatten)]
    stream: StreamArgs,

    /// Loop direction at end of input: 0 stop, >0 forward, <0 ping-pong
    #[arg(short = 'l', long = "loop", default_value = "0", allow_negative_numbers = true)]
    loop_mode: i32,

    /// First input frame to read
    #[arg(long, default_value = "0")]
    start: u64,

    /// Start moving towards frame 0 (needs a negative --loop)
    #[arg(long)]
    reverse: bool,

    /// Only read the first N input frames (0 = all)
    #[arg(short = 'm', long, default_value = "0")]
    max_count: u64,

    /// Stop after writing N frames (0 = until input ends)
    #[arg(short = 'n', long, default_value = "0")]
    count: u64,
}

#[derive(Args)]
struct Pack10Args {
    /// Input file
    input: PathBuf,

    /// Output file
    output: PathBuf,

    /// Input geometry (-f is the input format)
    #[command(flatten)]
    stream: StreamArgs,

    /// Output format; one side must be nv21_10_packed
    #[arg(short = 'o', long = "out-format")]
    out_format: RawFormat,

    /// Loop direction at end of input: 0 stop, >0 forward, <0 ping-pong
    #[arg(short = 'l', long = "loop", default_value = "0", allow_negative_numbers = true)]
    loop_mode: i32,

    /// Stop after N frames (0 = all)
    #[arg(short = 'n', long, default_value = "0")]
    count: u64,
}

#[derive(Args)]
struct PsnrArgs {
    /// Reference file
    a: PathBuf,

    /// Compared file
    b: PathBuf,

    /// Format of the reference
    #[arg(short = 'f', long)]
    format: Option<RawFormat>,

    /// Format of the compared file (defaults to --format)
    #[arg(short = 'F', long = "format2")]
    format2: Option<RawFormat>,

    /// Frame width
    #[arg(short = 'W', long, default_value = "0")]
    width: u32,

    /// Frame height
    #[arg(short = 'H', long, default_value = "0")]
    height: u32,

    /// Compare every Nth reference frame
    #[arg(short = 'd', long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
    decimation: u64,

    /// Compare every Nth frame of the compared file
    #[arg(short = 'D', long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
    decimation2: u64,

    /// Write per-frame results and the mean to a CSV file
    #[arg(short = 'c', long)]
    csv: Option<PathBuf>,
}

#[derive(Args)]
struct ImageArgs {
    /// Input PNG
    input: PathBuf,

    /// Optional output for the raw RGBA rows
    output: Option<PathBuf>,
}

fn parse_fraction(s: &str) -> std::result::Result<Fraction, String> {
    let (num, den) = s.split_once('/').unwrap_or((s, "1"));
    let num = num.trim().parse().map_err(|_| format!("invalid numerator in '{s}'"))?;
    let den = den.trim().parse().map_err(|_| format!("invalid denominator in '{s}'"))?;
    Ok(Fraction::new(num, den))
}

fn parse_sar(s: &str) -> std::result::Result<Sar, String> {
    let (w, h) = s
        .split_once(':')
        .ok_or_else(|| format!("expected w:h, got '{s}'"))?;
    let w = w.trim().parse().map_err(|_| format!("invalid width in '{s}'"))?;
    let h = h.trim().parse().map_err(|_| format!("invalid height in '{s}'"))?;
    Ok(Sar::new(w, h))
}

/// Installs the stderr subscriber, plus a file layer with `--log-file`.
///
/// `RUST_LOG` overrides the level chosen by `-v`. The returned guard must
/// live until exit so buffered file records are flushed.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let registry = tracing_subscriber::registry().with(filter).with(stderr);

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .context("Failed to install logger")?;
            Ok(Some(guard))
        }
        None => {
            registry.try_init().context("Failed to install logger")?;
            Ok(None)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Info(args) => commands::info::run(args, cli.verbose),
        Commands::Rewrite(args) => commands::rewrite::run(args, cli.verbose),
        Commands::Pack10(args) => commands::pack10::run(args, cli.verbose),
        Commands::Psnr(args) => commands::psnr::run(args, cli.verbose),
        Commands::Image(args) => commands::image::run(args, cli.verbose),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fraction() {
        assert_eq!(parse_fraction("30000/1001").unwrap(), Fraction::new(30000, 1001));
        assert_eq!(parse_fraction("25").unwrap(), Fraction::new(25, 1));
        assert!(parse_fraction("x/1").is_err());
    }

    #[test]
    fn test_parse_sar() {
        assert_eq!(parse_sar("4:3").unwrap(), Sar::new(4, 3));
        assert!(parse_sar("4/3").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "vraw", "-vv", "psnr", "a.i420", "b.nv21", "-f", "i420", "-F", "nv21", "-W", "16",
            "-H", "8", "-d", "2",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Psnr(args) => {
                assert_eq!(args.format, Some(RawFormat::I420));
                assert_eq!(args.format2, Some(RawFormat::NV21));
                assert_eq!(args.decimation, 2);
                assert_eq!(args.decimation2, 1);
            }
            _ => panic!("expected psnr"),
        }

        let cli = Cli::try_parse_from(["vraw", "rewrite", "a.y4m", "b.raw", "-l", "-1", "-n", "9"])
            .unwrap();
        match cli.command {
            Commands::Rewrite(args) => {
                assert_eq!(args.loop_mode, -1);
                assert_eq!(args.count, 9);
            }
            _ => panic!("expected rewrite"),
        }

        let cli = Cli::try_parse_from([
            "vraw", "pack10", "a.i420", "b.raw", "-f", "i420", "-W", "8", "-H", "4", "-o",
            "nv21_10_packed", "-l", "-1", "-n", "20",
        ])
        .unwrap();
        match cli.command {
            Commands::Pack10(args) => {
                assert_eq!(args.out_format, RawFormat::NV21_10_PACKED);
                assert_eq!(args.loop_mode, -1);
                assert_eq!(args.count, 20);
            }
            _ => panic!("expected pack10"),
        }

        assert!(Cli::try_parse_from(["vraw", "psnr", "a", "b", "-d", "0"]).is_err());
    }
}
