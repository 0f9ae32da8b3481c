//! Zip archive shell: sniffing, entry selection, extraction.
//!
//! Everything here is policy around the conversion core: which container
//! formats are accepted, which entries look convertible, and how their
//! bytes are read out. The core never sees the archive.

use serde::Serialize;
use std::io::{Cursor, Read};
use thiserror::Error;
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a zip archive (bad magic)")]
    NotZip,
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("archive has no entries")]
    Empty,
    #[error("no convertible image entries (looked for {})", IMAGE_EXTENSIONS.join(", "))]
    NoMatches,
}

/// Entry extensions the converter accepts, matched case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["heic", "heif", "avif"];

/// All zip magics start "PK": local file header, empty archive, spanned.
pub fn is_zip(data: &[u8]) -> bool {
    data.starts_with(b"PK\x03\x04")
        || data.starts_with(b"PK\x05\x06")
        || data.starts_with(b"PK\x07\x08")
}

/// One convertible entry, as reported by `list`.
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u64,
}

/// An opened zip archive held fully in memory.
pub struct Archive {
    inner: ZipArchive<Cursor<Vec<u8>>>,
}

impl Archive {
    pub fn open(data: Vec<u8>) -> Result<Self, ArchiveError> {
        if !is_zip(&data) {
            return Err(ArchiveError::NotZip);
        }
        let inner = ZipArchive::new(Cursor::new(data))?;
        if inner.is_empty() {
            return Err(ArchiveError::Empty);
        }
        Ok(Self { inner })
    }

    /// Names of entries that look like convertible images, sorted for
    /// deterministic output ordering.
    pub fn image_entries(&self, filter: Option<&str>) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .file_names()
            .filter(|name| is_image_entry(name))
            .filter(|name| filter.is_none_or(|f| name.contains(f)))
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    /// Listing with uncompressed sizes, same selection as [`image_entries`].
    ///
    /// [`image_entries`]: Self::image_entries
    pub fn image_entry_infos(
        &mut self,
        filter: Option<&str>,
    ) -> Result<Vec<EntryInfo>, ArchiveError> {
        let names = self.image_entries(filter);
        let mut infos = Vec::with_capacity(names.len());
        for name in names {
            let size = self.inner.by_name(&name)?.size();
            infos.push(EntryInfo { name, size });
        }
        Ok(infos)
    }

    /// Read one entry's full contents.
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        let mut entry = self.inner.by_name(name)?;
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Does this entry name look like an image we can convert?
///
/// Skips directories and macOS resource-fork cruft (`__MACOSX/._foo.heic`
/// entries are AppleDouble data, not images).
pub fn is_image_entry(name: &str) -> bool {
    if name.ends_with('/') {
        return false;
    }
    let base = name.rsplit('/').next().unwrap_or(name);
    if base.starts_with("._") || base == ".DS_Store" {
        return false;
    }
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Build an in-memory zip with the given (name, contents) entries.
    fn make_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn sniffs_zip_magic() {
        assert!(is_zip(&make_zip(&[("a.heic", b"x")])));
        assert!(!is_zip(b"\xFF\xD8\xFF\xE0 not a zip"));
        assert!(!is_zip(b"PK"));
    }

    #[test]
    fn non_zip_is_rejected() {
        let result = Archive::open(b"just some text".to_vec());
        assert!(matches!(result, Err(ArchiveError::NotZip)));
    }

    #[test]
    fn empty_zip_is_rejected() {
        let result = Archive::open(make_zip(&[]));
        assert!(matches!(result, Err(ArchiveError::Empty)));
    }

    #[test]
    fn selects_image_entries_case_insensitively() {
        let zip = make_zip(&[
            ("IMG_0001.HEIC", b"a"),
            ("photo.avif", b"b"),
            ("notes.txt", b"c"),
            ("nested/IMG_0002.heif", b"d"),
        ]);
        let archive = Archive::open(zip).unwrap();
        assert_eq!(
            archive.image_entries(None),
            vec!["IMG_0001.HEIC", "nested/IMG_0002.heif", "photo.avif"]
        );
    }

    #[test]
    fn filter_narrows_selection() {
        let zip = make_zip(&[("IMG_0001.HEIC", b"a"), ("IMG_0002.HEIC", b"b")]);
        let archive = Archive::open(zip).unwrap();
        assert_eq!(archive.image_entries(Some("0002")), vec!["IMG_0002.HEIC"]);
        assert!(archive.image_entries(Some("zzz")).is_empty());
    }

    #[test]
    fn skips_macos_cruft() {
        assert!(!is_image_entry("__MACOSX/._IMG_0001.heic"));
        assert!(!is_image_entry(".DS_Store"));
        assert!(!is_image_entry("album/"));
        assert!(!is_image_entry(".heic"));
        assert!(is_image_entry("album/IMG_0001.heic"));
    }

    #[test]
    fn reads_entry_bytes() {
        let zip = make_zip(&[("photo.avif", b"payload")]);
        let mut archive = Archive::open(zip).unwrap();
        assert_eq!(archive.read_entry("photo.avif").unwrap(), b"payload");
    }

    #[test]
    fn listing_reports_uncompressed_sizes() {
        let zip = make_zip(&[("photo.avif", &[0u8; 100]), ("skip.txt", b"x")]);
        let mut archive = Archive::open(zip).unwrap();
        let infos = archive.image_entry_infos(None).unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "photo.avif");
        assert_eq!(infos[0].size, 100);
    }
}
