//! # zip2jpeg
//!
//! Extract HEIF-family photos (HEIC/HEIF/AVIF) from a zip export and
//! re-encode them as JPEG, preserving the embedded EXIF block
//! byte-for-byte.
//!
//! # Architecture: Splice, Don't Re-Parse
//!
//! A JPEG encoder emits a complete file starting with its own SOI marker,
//! and EXIF has to sit in an APP1 segment directly after SOI. Rather than
//! buffering the encoder's output and rewriting its header, the pipeline
//! streams it through a two-piece writer:
//!
//! ```text
//! decoder ──► pixels ──► JPEG encoder ──► [SkipWriter N=2] ──► output buffer
//!                                              ▲
//!              SOI + APP1/EXIF written here first
//! ```
//!
//! The sink is primed with a synthesized SOI and the APP1 segment; the
//! skip adapter then drops the encoder's own SOI (exactly 2 bytes) and
//! forwards everything else untouched. No re-parse, no second buffer.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`jpeg`] | The byte-exact kernel: [`jpeg::SkipWriter`] + the EXIF splicing writer |
//! | [`decode`] | Decoder capability: BMFF container walk, EXIF item extraction, AV1 pixel decode |
//! | [`convert`] | Per-entry pipeline: extract EXIF → decode → encode through the splicing writer |
//! | [`archive`] | Zip shell: sniffing, entry selection, extraction |
//! | [`output`] | CLI output formatting — per-entry result and listing lines |
//!
//! # Design Decisions
//!
//! ## Pure-Rust Decoding (No libheif, No FFmpeg)
//!
//! The decoder uses `avif-parse` for the container and `rav1d` for AV1
//! pixel data — both pure Rust, statically linked. There is no pure Rust
//! HEVC decoder, so HEVC-coded HEIC is recognized by its `ftyp` brand and
//! reported as an unsupported codec rather than silently mangled; its EXIF
//! still extracts, since the metadata walk is codec-agnostic. The
//! [`decode::ImageDecoder`] trait is the seam where an HEVC backend would
//! plug in.
//!
//! ## Per-Entry Failure Isolation
//!
//! Every stage returns a typed error tagged with where it failed; a broken
//! entry never aborts the run. The shell converts the remaining entries,
//! reports each outcome on its own line, and exits non-zero if anything
//! failed. The one deliberate soft spot: a malformed metadata box degrades
//! to "no EXIF" instead of failing the entry, because the pixels are still
//! perfectly convertible.
//!
//! ## In-Memory Pipelines, Parallel Entries
//!
//! A conversion owns its decoder output, writer, and output buffer
//! exclusively; nothing is shared between entries. That makes fan-out
//! trivial: entries are converted on the rayon pool and written out
//! sequentially afterwards.

pub mod archive;
pub mod convert;
pub mod decode;
pub mod jpeg;
pub mod output;
