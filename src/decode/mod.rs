//! Image decoding — pure Rust, no C libraries to link.
//!
//! | Concern | Crate / function |
//! |---|---|
//! | **Container** | `avif-parse` (primary item extraction) |
//! | **AV1 bitstream** | `rav1d` + custom YUV→RGB |
//! | **EXIF item** | custom `meta`/`iinf`/`iloc` walk ([`bmff`]) |
//!
//! The module is split into:
//! - **Decoder**: [`ImageDecoder`] trait + [`BmffDecoder`]
//! - **Bmff**: container walk for brands and the `Exif` item
//! - **Av1**: rav1d plumbing and pixel conversion

mod av1;
pub(crate) mod bmff;
pub mod decoder;

pub use decoder::{BmffDecoder, DecodeError, ImageDecoder};
