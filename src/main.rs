use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip2jpeg::convert::{Conversion, ConvertError, ConvertOptions};
use zip2jpeg::decode::BmffDecoder;
use zip2jpeg::{archive, convert, output};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "zip2jpeg")]
#[command(about = "Convert HEIF/AVIF photos inside a zip export to JPEG, keeping EXIF")]
#[command(long_about = "\
Convert HEIF/AVIF photos inside a zip export to JPEG, keeping EXIF

Phone photo exports arrive as zip archives full of .heic/.avif files.
zip2jpeg pulls each image entry out, decodes it, and re-encodes it as a
plain JPEG with the original EXIF block spliced back in unchanged.

Examples:

  zip2jpeg convert export.zip photo.jpg          # single matching entry
  zip2jpeg convert export.zip out/               # one .jpg per entry
  zip2jpeg convert export.zip out/ --filter 2024 # only matching names
  zip2jpeg list export.zip --json                # what would convert

AV1-coded images (AVIF) decode in pure Rust. HEVC-coded HEIC is listed
and its EXIF extracts, but pixel decoding reports an unsupported codec.")]
#[command(version = version_string())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert image entries in a zip archive to JPEG
    Convert {
        /// Zip archive to read
        archive: PathBuf,
        /// Output file (single match) or directory (one .jpg per match)
        output: PathBuf,
        /// Only convert entries whose name contains this substring
        #[arg(long)]
        filter: Option<String>,
        /// JPEG quality
        #[arg(long, default_value_t = 90, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,
    },
    /// List convertible image entries in a zip archive
    List {
        /// Zip archive to read
        archive: PathBuf,
        /// Only list entries whose name contains this substring
        #[arg(long)]
        filter: Option<String>,
        /// Emit the listing as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Anything that can go wrong for a single entry.
#[derive(Error, Debug)]
enum EntryError {
    #[error(transparent)]
    Archive(#[from] archive::ArchiveError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Convert {
            archive: archive_path,
            output: output_path,
            filter,
            quality,
        } => run_convert(&archive_path, &output_path, filter.as_deref(), quality),
        Command::List {
            archive: archive_path,
            filter,
            json,
        } => run_list(&archive_path, filter.as_deref(), json),
    }
}

fn run_convert(
    archive_path: &Path,
    output_path: &Path,
    filter: Option<&str>,
    quality: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(archive_path)?;
    let mut archive = archive::Archive::open(data)?;

    let names = archive.image_entries(filter);
    if names.is_empty() {
        return Err(archive::ArchiveError::NoMatches.into());
    }
    let destinations = plan_destinations(&names, output_path)?;

    // The zip reader is sequential; pull entry bytes out first, then fan
    // the conversions out. Each conversion owns its own pipeline.
    let entries: Vec<(String, Result<Vec<u8>, archive::ArchiveError>)> = names
        .iter()
        .map(|name| (name.clone(), archive.read_entry(name)))
        .collect();

    let decoder = BmffDecoder::new();
    let opts = ConvertOptions { quality };
    let results: Vec<(String, Result<Conversion, EntryError>)> = entries
        .into_par_iter()
        .map(|(name, bytes)| {
            let result = bytes
                .map_err(EntryError::from)
                .and_then(|raw| convert::convert(&decoder, &raw, opts).map_err(EntryError::from));
            (name, result)
        })
        .collect();

    let mut failed = 0usize;
    for ((name, result), dest) in results.iter().zip(&destinations) {
        match result {
            Ok(conversion) => {
                std::fs::write(dest, &conversion.jpeg)?;
                println!("{}", output::converted_line(name, dest, conversion));
            }
            Err(err) => {
                failed += 1;
                eprintln!("{}", output::failed_line(name, err));
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {} entries failed", results.len()).into());
    }
    Ok(())
}

fn run_list(
    archive_path: &Path,
    filter: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(archive_path)?;
    let mut archive = archive::Archive::open(data)?;
    let infos = archive.image_entry_infos(filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
    } else {
        for line in output::listing_lines(&infos) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Decide where each entry's JPEG goes.
///
/// A single match may target a plain file path. Multiple matches need a
/// directory; each entry becomes `<name>.jpg` with path separators folded
/// into dashes so nested entries cannot collide or escape the directory.
fn plan_destinations(
    names: &[String],
    output: &Path,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    if names.len() == 1 && !output.is_dir() {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        return Ok(vec![output.to_path_buf()]);
    }

    std::fs::create_dir_all(output)?;
    Ok(names
        .iter()
        .map(|name| output.join(format!("{}.jpg", jpeg_stem(name))))
        .collect())
}

/// `nested/IMG_0001.HEIC` → `nested-IMG_0001`
fn jpeg_stem(entry_name: &str) -> String {
    let flat = entry_name.replace(['/', '\\'], "-");
    match flat.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_flattens_nested_entries() {
        assert_eq!(jpeg_stem("nested/IMG_0001.HEIC"), "nested-IMG_0001");
        assert_eq!(jpeg_stem("photo.avif"), "photo");
        assert_eq!(jpeg_stem("noext"), "noext");
    }

    #[test]
    fn single_match_targets_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("photo.jpg");
        let dests = plan_destinations(&["a.heic".to_string()], &out).unwrap();
        assert_eq!(dests, vec![out]);
    }

    #[test]
    fn multiple_matches_target_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("converted");
        let names = vec!["a.heic".to_string(), "sub/b.avif".to_string()];
        let dests = plan_destinations(&names, &out).unwrap();
        assert_eq!(dests, vec![out.join("a.jpg"), out.join("sub-b.jpg")]);
        assert!(out.is_dir());
    }
}
