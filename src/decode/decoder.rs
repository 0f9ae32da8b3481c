//! Decoder capability: the seam between the conversion pipeline and the
//! container/codec plumbing.
//!
//! The pipeline only sees [`ImageDecoder`]; the production implementation
//! is [`BmffDecoder`]. Tests swap in `MockDecoder` the same way.

use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a decodable image container: {0}")]
    Container(String),
    #[error("unsupported codec (brand \"{brand}\"); only AV1-coded images decode")]
    UnsupportedCodec { brand: String },
    #[error("AV1 decode failed: {0}")]
    Av1(String),
    #[error("malformed metadata: {0}")]
    Metadata(String),
}

/// Decoder for one BMFF-contained photo held fully in memory.
pub trait ImageDecoder: Sync {
    /// Pull the raw EXIF block out of the container. `Ok(None)` when the
    /// image simply carries none.
    fn extract_exif(&self, data: &[u8]) -> Result<Option<Vec<u8>>, DecodeError>;

    /// Decode the primary image item to pixels.
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, DecodeError>;
}

/// Production decoder: avif-parse for the container, rav1d for the AV1
/// bitstream, a hand-rolled `meta` box walk for EXIF.
///
/// EXIF extraction is codec-agnostic and works on HEVC-coded HEIC too;
/// pixel decoding is AV1-only and reports other codecs by their `ftyp`
/// brand. The trait is the seam where an HEVC-capable decoder would plug
/// in — no pure Rust one exists today.
pub struct BmffDecoder;

impl BmffDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BmffDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Brands whose primary item is AV1-coded.
fn is_av1_brand(brand: &[u8; 4]) -> bool {
    matches!(brand, b"avif" | b"avis")
}

impl ImageDecoder for BmffDecoder {
    fn extract_exif(&self, data: &[u8]) -> Result<Option<Vec<u8>>, DecodeError> {
        super::bmff::extract_exif(data)
    }

    fn decode(&self, data: &[u8]) -> Result<DynamicImage, DecodeError> {
        let avif = avif_parse::read_avif(&mut std::io::Cursor::new(data)).map_err(|e| {
            // Tell a codec mismatch apart from a broken container
            match super::bmff::major_brand(data) {
                Some(brand) if !is_av1_brand(&brand) => DecodeError::UnsupportedCodec {
                    brand: String::from_utf8_lossy(&brand).into_owned(),
                },
                _ => DecodeError::Container(format!("{e:?}")),
            }
        })?;

        let rgb = super::av1::decode_av1(&avif.primary_item)?;
        Ok(DynamicImage::ImageRgb8(rgb))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use image::RgbImage;

    /// What the mock's `extract_exif` should do.
    pub enum MockExif {
        Block(Vec<u8>),
        Absent,
        Malformed,
        IoFault,
    }

    /// Scriptable decoder for pipeline tests. `image: None` makes `decode`
    /// fail.
    pub struct MockDecoder {
        pub exif: MockExif,
        pub image: Option<RgbImage>,
    }

    impl MockDecoder {
        pub fn with_image(exif: MockExif, width: u32, height: u32) -> Self {
            let img = RgbImage::from_fn(width, height, |x, y| {
                image::Rgb([(x % 256) as u8, (y % 256) as u8, 200])
            });
            Self {
                exif,
                image: Some(img),
            }
        }

        pub fn failing() -> Self {
            Self {
                exif: MockExif::Absent,
                image: None,
            }
        }
    }

    impl ImageDecoder for MockDecoder {
        fn extract_exif(&self, _data: &[u8]) -> Result<Option<Vec<u8>>, DecodeError> {
            match &self.exif {
                MockExif::Block(b) => Ok(Some(b.clone())),
                MockExif::Absent => Ok(None),
                MockExif::Malformed => Err(DecodeError::Metadata("mock: bad meta box".into())),
                MockExif::IoFault => Err(DecodeError::Io(std::io::Error::other("mock: io"))),
            }
        }

        fn decode(&self, _data: &[u8]) -> Result<DynamicImage, DecodeError> {
            self.image
                .clone()
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| DecodeError::Container("mock: undecodable".into()))
        }
    }

    #[test]
    fn garbage_is_a_container_error() {
        let decoder = BmffDecoder::new();
        let result = decoder.decode(b"definitely not bmff");
        assert!(matches!(result, Err(DecodeError::Container(_))));
    }

    #[test]
    fn heic_brand_reports_unsupported_codec() {
        // A bare ftyp with the heic brand: enough for brand sniffing,
        // nothing for avif-parse
        let file = crate::decode::bmff::tests::ftyp(b"heic");
        let decoder = BmffDecoder::new();
        match decoder.decode(&file) {
            Err(DecodeError::UnsupportedCodec { brand }) => assert_eq!(brand, "heic"),
            other => panic!("expected UnsupportedCodec, got {other:?}"),
        }
    }

    #[test]
    fn exif_extraction_works_without_decodable_pixels() {
        // HEVC-coded files still yield their EXIF
        let file = crate::decode::bmff::tests::container_with_exif(
            &crate::decode::bmff::tests::exif_item(b"MM\x00\x2A"),
        );
        let decoder = BmffDecoder::new();
        let exif = decoder.extract_exif(&file).unwrap().expect("exif present");
        assert!(exif.starts_with(b"Exif\0\0"));
    }
}
