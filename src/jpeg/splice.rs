//! EXIF splicing: SOI + APP1 segment written up front, encoder SOI elided.

use super::skip::SkipWriter;
use std::io::{self, Write};
use thiserror::Error;

/// Start-of-image marker, the first two bytes of every JPEG.
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// APP1 marker code — the segment EXIF lives in.
const APP1: u8 = 0xE1;

/// Maximum APP1 payload. The segment length field is a big-endian u16 that
/// counts its own two bytes, so the payload tops out at 65533.
pub const MAX_EXIF_LEN: usize = u16::MAX as usize - 2;

#[derive(Error, Debug)]
pub enum SpliceError {
    #[error("EXIF block is {len} bytes; an APP1 segment holds at most {MAX_EXIF_LEN}")]
    ExifTooLarge { len: usize },
    #[error("write to output failed: {0}")]
    Io(#[from] io::Error),
}

/// Wrap `sink` in a writer that accepts a JPEG encoder's complete output
/// and yields a JPEG with `exif` spliced in directly after SOI.
///
/// SOI and, when present, the APP1 header + payload are written to `sink`
/// here. The returned writer then drops the first two bytes fed to it — the
/// encoder's own SOI — and forwards the rest of the stream untouched.
///
/// Fails without writing anything if `exif` exceeds [`MAX_EXIF_LEN`]; fails
/// partway if the sink rejects a write, in which case no writer is returned.
pub fn exif_writer<W: Write>(
    mut sink: W,
    exif: Option<&[u8]>,
) -> Result<SkipWriter<W>, SpliceError> {
    if let Some(exif) = exif {
        if exif.len() > MAX_EXIF_LEN {
            return Err(SpliceError::ExifTooLarge { len: exif.len() });
        }
    }

    sink.write_all(&SOI)?;

    if let Some(exif) = exif {
        let seg_len = (exif.len() + 2) as u16;
        let header = [0xFF, APP1, (seg_len >> 8) as u8, (seg_len & 0xFF) as u8];
        sink.write_all(&header)?;
        sink.write_all(exif)?;
    }

    Ok(SkipWriter::new(sink, SOI.len()))
}
