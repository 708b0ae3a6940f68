//! YUV4MPEG2 container header and frame markers.
//!
//! A y4m file is one text header line followed by `FRAME\n` + raw frame
//! pairs:
//!
//! ```text
//! YUV4MPEG2 W1920 H1080 F30:1 Ip A1:1 C420\n
//! FRAME\n<planes>FRAME\n<planes>...
//! ```
//!
//! Only 4:2:0 content is representable: `C420` (and the `420jpeg`,
//! `420mpeg2`, `420paldv` siting variants) maps to [`RawFormat::I420`],
//! `C420p10` to [`RawFormat::I420_10_16LE`].
//!
//! # Example
//!
//! ```rust
//! use vraw_io::y4m::Y4mHeader;
//! use vraw_core::{RawFormat, Resolution};
//!
//! let header = Y4mHeader::parse("YUV4MPEG2 W64 H48 F25:1 A1:1 C420p10").unwrap();
//! assert_eq!(header.resolution, Resolution::new(64, 48));
//! assert_eq!(header.format, RawFormat::I420_10_16LE);
//! ```

use std::io::{BufRead, Read, Write};

use tracing::trace;
use vraw_core::{Error, Fraction, RawFormat, Resolution, Result, Sar};

/// Leading token of every header.
pub const MAGIC: &str = "YUV4MPEG2";

/// Marker preceding every frame.
pub const FRAME_MARKER: &[u8; 6] = b"FRAME\n";

/// Longest accepted header line, newline included.
pub const MAX_HEADER_LEN: usize = 256;

/// Parsed global header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Y4mHeader {
    /// Frame dimensions (`W`, `H`).
    pub resolution: Resolution,
    /// Frame rate (`F`), zero when absent.
    pub framerate: Fraction,
    /// Sample aspect ratio (`A`), zero when absent.
    pub sar: Sar,
    /// Pixel format from the `C` tag, i420 when absent.
    pub format: RawFormat,
    /// Interlacing mode (`I`), if given.
    pub interlace: Option<char>,
}

impl Y4mHeader {
    /// Header for writing: progressive, given geometry and rate.
    pub fn new(format: RawFormat, resolution: Resolution, framerate: Fraction, sar: Sar) -> Self {
        Self {
            resolution,
            framerate,
            sar,
            format,
            interlace: Some('p'),
        }
    }

    /// Parses one header line (trailing newline optional).
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] for a missing magic, malformed numbers, missing
    /// dimensions or a chroma tag other than 4:2:0 8/10-bit.
    ///
    /// Parsing is strict: an unknown `C` tag is rejected rather than read
    /// as i420, and `W`, `H`, `F` and `A` values must be plain decimal
    /// integers (no trailing garbage). Tokens with other leading letters
    /// are skipped.
    pub fn parse(line: &str) -> Result<Self> {
        let mut tokens = line.trim_end_matches(['\n', '\r']).split(' ');
        if tokens.next() != Some(MAGIC) {
            return Err(Error::protocol("missing YUV4MPEG2 signature"));
        }

        let mut header = Self {
            resolution: Resolution::default(),
            framerate: Fraction::default(),
            sar: Sar::default(),
            format: RawFormat::I420,
            interlace: None,
        };
        for token in tokens {
            if token.len() < 2 {
                continue;
            }
            let Some((tag, value)) = token.split_at_checked(1) else {
                trace!(token, "ignoring y4m token");
                continue;
            };
            match tag {
                "W" => header.resolution.width = parse_number(token, value)?,
                "H" => header.resolution.height = parse_number(token, value)?,
                "F" => {
                    let (num, den) = parse_ratio(token, value)?;
                    header.framerate = Fraction::new(num, den);
                }
                "A" => {
                    let (w, h) = parse_ratio(token, value)?;
                    header.sar = Sar::new(w, h);
                }
                "I" => header.interlace = value.chars().next(),
                "C" => header.format = format_from_tag(value)?,
                _ => trace!(token, "ignoring y4m token"),
            }
        }

        if header.resolution.is_empty() {
            return Err(Error::protocol(format!(
                "y4m header without resolution: {}",
                header.resolution
            )));
        }
        Ok(header)
    }

    /// Reads and parses the header line from the start of a stream.
    ///
    /// Returns the header and its length in bytes (newline included), which
    /// is the offset of the first frame marker.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<(Self, usize)> {
        let mut line = Vec::with_capacity(64);
        let len = reader
            .by_ref()
            .take(MAX_HEADER_LEN as u64)
            .read_until(b'\n', &mut line)?;
        if line.last() != Some(&b'\n') {
            return Err(Error::protocol(format!(
                "y4m header not terminated within {MAX_HEADER_LEN} bytes"
            )));
        }
        let text = std::str::from_utf8(&line)
            .map_err(|_| Error::protocol("y4m header is not ASCII"))?;
        Ok((Self::parse(text)?, len))
    }

    /// Writes the header line.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the format has no y4m chroma tag.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let tag = tag_for_format(self.format)?;
        let interlace = self.interlace.unwrap_or('p');
        writeln!(
            writer,
            "{MAGIC} W{} H{} F{}:{} I{interlace} A{}:{} C{tag}",
            self.resolution.width,
            self.resolution.height,
            self.framerate.num,
            self.framerate.den,
            self.sar.width,
            self.sar.height,
        )?;
        Ok(())
    }
}

/// Reads the 6-byte marker in front of a frame.
///
/// Returns `Ok(false)` at a clean end of stream.
///
/// # Errors
///
/// [`Error::Protocol`] for a truncated or different marker.
pub fn read_frame_marker<R: Read>(reader: &mut R) -> Result<bool> {
    let mut marker = [0u8; FRAME_MARKER.len()];
    let mut filled = 0;
    while filled < marker.len() {
        match reader.read(&mut marker[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    match filled {
        0 => Ok(false),
        n if n == marker.len() && &marker == FRAME_MARKER => Ok(true),
        _ => Err(Error::protocol(format!(
            "bad frame marker {:?}",
            String::from_utf8_lossy(&marker[..filled])
        ))),
    }
}

/// Writes the 6-byte frame marker.
pub fn write_frame_marker<W: Write>(writer: &mut W) -> Result<()> {
    writer.write_all(FRAME_MARKER)?;
    Ok(())
}

/// The `C` tag for a format, if it can be stored in y4m.
pub fn tag_for_format(format: RawFormat) -> Result<&'static str> {
    match format {
        RawFormat::I420 => Ok("420"),
        RawFormat::I420_10_16LE => Ok("420p10"),
        other => Err(Error::invalid_argument(format!(
            "{other} cannot be stored in y4m"
        ))),
    }
}

fn format_from_tag(tag: &str) -> Result<RawFormat> {
    match tag {
        "420" | "420jpeg" | "420mpeg2" | "420paldv" => Ok(RawFormat::I420),
        "420p10" => Ok(RawFormat::I420_10_16LE),
        other => Err(Error::protocol(format!("unsupported y4m colorspace C{other}"))),
    }
}

fn parse_number(token: &str, value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| Error::protocol(format!("bad y4m token {token}")))
}

fn parse_ratio(token: &str, value: &str) -> Result<(u32, u32)> {
    let (a, b) = value
        .split_once(':')
        .ok_or_else(|| Error::protocol(format!("bad y4m ratio {token}")))?;
    Ok((parse_number(token, a)?, parse_number(token, b)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_full_header() {
        let h = Y4mHeader::parse("YUV4MPEG2 W1920 H1080 F30000:1001 Ip A4:3 C420jpeg XYSCSS=420JPEG\n")
            .expect("parse failed");
        assert_eq!(h.resolution, Resolution::new(1920, 1080));
        assert_eq!(h.framerate, Fraction::new(30000, 1001));
        assert_eq!(h.sar, Sar::new(4, 3));
        assert_eq!(h.format, RawFormat::I420);
        assert_eq!(h.interlace, Some('p'));
    }

    #[test]
    fn test_parse_defaults() {
        let h = Y4mHeader::parse("YUV4MPEG2 W8 H2 x").expect("parse failed");
        assert_eq!(h.format, RawFormat::I420);
        assert!(h.framerate.is_zero());
        assert_eq!(h.sar, Sar::default());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Y4mHeader::parse("YUV4MPEG W8 H2"), Err(Error::Protocol(_))));
        assert!(matches!(Y4mHeader::parse("YUV4MPEG2 W8"), Err(Error::Protocol(_))));
        assert!(matches!(Y4mHeader::parse("YUV4MPEG2 W8 H2 F30"), Err(Error::Protocol(_))));
        assert!(matches!(Y4mHeader::parse("YUV4MPEG2 Wabc H2"), Err(Error::Protocol(_))));
        assert!(matches!(Y4mHeader::parse("YUV4MPEG2 W8 H2 C444"), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_parse_is_strict() {
        // Unknown chroma tags are not read as i420.
        assert!(matches!(Y4mHeader::parse("YUV4MPEG2 W8 H2 Cmono"), Err(Error::Protocol(_))));
        // No atoi-style prefix parsing.
        assert!(matches!(Y4mHeader::parse("YUV4MPEG2 W8px H2"), Err(Error::Protocol(_))));
        assert!(matches!(Y4mHeader::parse("YUV4MPEG2 W8 H2 F25:1x"), Err(Error::Protocol(_))));
        assert!(matches!(Y4mHeader::parse("YUV4MPEG2 W8 H2 A-1:1"), Err(Error::Protocol(_))));
        // Non-ASCII extension tokens are skipped, not split mid-character.
        let h = Y4mHeader::parse("YUV4MPEG2 W8 H2 \u{e9}t\u{e9}").expect("parse failed");
        assert_eq!(h.resolution, Resolution::new(8, 2));
    }

    #[test]
    fn test_read_from_reports_length() {
        let text = b"YUV4MPEG2 W4 H2 F25:1 C420p10\nFRAME\n";
        let mut cursor = Cursor::new(&text[..]);
        let (h, len) = Y4mHeader::read_from(&mut cursor).expect("read failed");
        assert_eq!(len, 30);
        assert_eq!(h.format, RawFormat::I420_10_16LE);
        assert!(read_frame_marker(&mut cursor).expect("marker failed"));
        assert!(!read_frame_marker(&mut cursor).expect("marker failed"));
    }

    #[test]
    fn test_read_from_unterminated() {
        let long = format!("YUV4MPEG2 W4 H2 {}", "X".repeat(MAX_HEADER_LEN));
        let mut cursor = Cursor::new(long.into_bytes());
        assert!(matches!(Y4mHeader::read_from(&mut cursor), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_write_header() {
        let h = Y4mHeader::new(RawFormat::I420, Resolution::new(64, 48), Fraction::new(30, 1), Sar::SQUARE);
        let mut out = Vec::new();
        h.write_to(&mut out).expect("write failed");
        assert_eq!(out, b"YUV4MPEG2 W64 H48 F30:1 Ip A1:1 C420\n");

        let reparsed = Y4mHeader::parse(std::str::from_utf8(&out).unwrap()).unwrap();
        assert_eq!(reparsed, h);

        let nv12 = Y4mHeader::new(RawFormat::NV12, Resolution::new(64, 48), Fraction::new(30, 1), Sar::SQUARE);
        assert!(nv12.write_to(&mut Vec::new()).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_bad_marker() {
        let mut short = Cursor::new(&b"FRA"[..]);
        assert!(matches!(read_frame_marker(&mut short), Err(Error::Protocol(_))));
        let mut wrong = Cursor::new(&b"FRAMEX"[..]);
        assert!(matches!(read_frame_marker(&mut wrong), Err(Error::Protocol(_))));
    }
}
