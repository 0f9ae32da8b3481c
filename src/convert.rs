//! One-entry conversion pipeline: extract EXIF → decode → encode JPEG
//! through the splicing writer.
//!
//! Each call owns its own writer and output buffer; nothing is shared, so
//! callers may run conversions for different entries in parallel by simply
//! invoking this from multiple threads.

use crate::decode::{DecodeError, ImageDecoder};
use crate::jpeg::{self, SpliceError};
use image::codecs::jpeg::JpegEncoder;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("decode failed: {0}")]
    Decode(#[source] DecodeError),
    #[error("metadata extraction failed: {0}")]
    Metadata(#[source] DecodeError),
    #[error("JPEG encode failed: {0}")]
    Encode(#[source] image::ImageError),
    #[error(transparent)]
    Splice(#[from] SpliceError),
}

/// Encoder configuration. Only quality is recognized today.
#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions {
    /// JPEG quality, 1–100.
    pub quality: u8,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self { quality: 90 }
    }
}

/// Outcome of one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// The complete JPEG file, EXIF spliced in when present.
    pub jpeg: Vec<u8>,
    /// Size of the preserved EXIF block, if one was found.
    pub exif_len: Option<usize>,
}

/// Convert one image's raw container bytes to a JPEG buffer.
///
/// Absent metadata is not an error, and a malformed metadata container
/// degrades to absent. A decoder-level I/O fault during extraction is
/// fatal, as is any decode or encode failure. On error no partial buffer
/// is returned.
pub fn convert(
    decoder: &dyn ImageDecoder,
    raw: &[u8],
    opts: ConvertOptions,
) -> Result<Conversion, ConvertError> {
    let exif = match decoder.extract_exif(raw) {
        Ok(block) => block,
        Err(e @ DecodeError::Io(_)) => return Err(ConvertError::Metadata(e)),
        Err(_) => None,
    };

    let img = decoder.decode(raw).map_err(ConvertError::Decode)?;

    let mut out = Vec::new();
    let mut writer = jpeg::exif_writer(&mut out, exif.as_deref())?;
    let encoder = JpegEncoder::new_with_quality(&mut writer, opts.quality);
    img.write_with_encoder(encoder)
        .map_err(ConvertError::Encode)?;

    Ok(Conversion {
        jpeg: out,
        exif_len: exif.map(|b| b.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decoder::tests::{MockDecoder, MockExif};

    const SOI: [u8; 2] = [0xFF, 0xD8];

    #[test]
    fn output_is_a_decodable_jpeg() {
        let decoder = MockDecoder::with_image(MockExif::Absent, 40, 30);
        let result = convert(&decoder, &[], ConvertOptions::default()).unwrap();

        assert_eq!(&result.jpeg[..2], &SOI);
        assert_eq!(result.exif_len, None);
        let decoded = image::load_from_memory(&result.jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
    }

    #[test]
    fn exif_lands_directly_after_soi() {
        let block = b"Exif\0\0test-tiff-bytes".to_vec();
        let decoder = MockDecoder::with_image(MockExif::Block(block.clone()), 16, 16);
        let result = convert(&decoder, &[], ConvertOptions::default()).unwrap();

        assert_eq!(&result.jpeg[..2], &SOI);
        assert_eq!(&result.jpeg[2..4], &[0xFF, 0xE1]);
        let seg_len = u16::from_be_bytes([result.jpeg[4], result.jpeg[5]]) as usize;
        assert_eq!(seg_len, block.len() + 2);
        assert_eq!(&result.jpeg[6..6 + block.len()], &block[..]);
        assert_eq!(result.exif_len, Some(block.len()));

        // Still structurally valid with the spliced segment
        image::load_from_memory(&result.jpeg).unwrap();
    }

    #[test]
    fn conversion_is_deterministic() {
        let decoder = MockDecoder::with_image(MockExif::Block(b"Exif\0\0x".to_vec()), 24, 24);
        let a = convert(&decoder, &[], ConvertOptions::default()).unwrap();
        let b = convert(&decoder, &[], ConvertOptions::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn decode_failure_yields_no_buffer() {
        let decoder = MockDecoder::failing();
        let result = convert(&decoder, &[], ConvertOptions::default());
        assert!(matches!(result, Err(ConvertError::Decode(_))));
    }

    #[test]
    fn malformed_metadata_degrades_to_absent() {
        let decoder = MockDecoder::with_image(MockExif::Malformed, 8, 8);
        let result = convert(&decoder, &[], ConvertOptions::default()).unwrap();
        assert_eq!(result.exif_len, None);
        assert_eq!(&result.jpeg[..2], &SOI);
        // No APP1 was spliced
        assert_ne!(&result.jpeg[2..4], &[0xFF, 0xE1]);
    }

    #[test]
    fn metadata_io_fault_is_fatal() {
        let decoder = MockDecoder::with_image(MockExif::IoFault, 8, 8);
        let result = convert(&decoder, &[], ConvertOptions::default());
        assert!(matches!(result, Err(ConvertError::Metadata(_))));
    }

    #[test]
    fn oversized_exif_is_a_splice_error() {
        let block = vec![0u8; crate::jpeg::MAX_EXIF_LEN + 1];
        let decoder = MockDecoder::with_image(MockExif::Block(block), 8, 8);
        let result = convert(&decoder, &[], ConvertOptions::default());
        assert!(matches!(
            result,
            Err(ConvertError::Splice(SpliceError::ExifTooLarge { .. }))
        ));
    }
}
