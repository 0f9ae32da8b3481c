//! JPEG output assembly — the byte-exact part of the pipeline.
//!
//! A JPEG encoder always emits its own SOI marker as the first two bytes of
//! its stream, so metadata cannot be injected by simply writing a segment
//! first: the file would end up with two SOIs. The trick, split across two
//! small pieces:
//!
//! - [`skip::SkipWriter`]: a write-through adapter that drops the first N
//!   bytes of the logical stream and forwards the rest, however the caller
//!   chunks its writes.
//! - [`splice::exif_writer`]: writes a synthesized SOI plus an optional
//!   APP1/EXIF segment to the sink up front, then hands back a
//!   `SkipWriter` with N = 2 so the encoder's own SOI is elided.
//!
//! Net effect: EXIF lands directly after SOI without buffering or
//! re-parsing the encoder's output.

pub mod skip;
pub mod splice;

pub use skip::SkipWriter;
pub use splice::{MAX_EXIF_LEN, SpliceError, exif_writer};
