//! CLI output formatting.
//!
//! One line per entry, information first: the entry name, then what became
//! of it. Paths and byte counts are secondary detail on the same line so
//! the output reads as a conversion inventory.

use crate::archive::EntryInfo;
use crate::convert::Conversion;
use std::path::Path;

/// Render a byte count the way humans read it.
pub fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// One successful conversion: `IMG_0001.HEIC → out/IMG_0001.jpg (212.4 KB, exif: 2.1 KB)`
pub fn converted_line(entry: &str, dest: &Path, conversion: &Conversion) -> String {
    let exif = match conversion.exif_len {
        Some(len) => format!(", exif: {}", human_size(len as u64)),
        None => ", no exif".to_string(),
    };
    format!(
        "{entry} → {} ({}{exif})",
        dest.display(),
        human_size(conversion.jpeg.len() as u64),
    )
}

/// One failed conversion: `IMG_0002.HEIC: decode failed: ...`
pub fn failed_line(entry: &str, error: &dyn std::fmt::Display) -> String {
    format!("{entry}: {error}")
}

/// Listing block for the `list` subcommand.
pub fn listing_lines(infos: &[EntryInfo]) -> Vec<String> {
    let mut lines: Vec<String> = infos
        .iter()
        .map(|info| format!("{} ({})", info.name, human_size(info.size)))
        .collect();
    lines.push(format!(
        "{} convertible {}",
        infos.len(),
        if infos.len() == 1 { "entry" } else { "entries" }
    ));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn human_size_picks_units() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn converted_line_reports_exif() {
        let conversion = Conversion {
            jpeg: vec![0; 1024],
            exif_len: Some(100),
        };
        let line = converted_line("a.heic", &PathBuf::from("out/a.jpg"), &conversion);
        assert_eq!(line, "a.heic → out/a.jpg (1.0 KB, exif: 100 B)");
    }

    #[test]
    fn converted_line_without_exif() {
        let conversion = Conversion {
            jpeg: vec![0; 10],
            exif_len: None,
        };
        let line = converted_line("a.avif", &PathBuf::from("a.jpg"), &conversion);
        assert_eq!(line, "a.avif → a.jpg (10 B, no exif)");
    }

    #[test]
    fn listing_has_summary_line() {
        let infos = vec![EntryInfo {
            name: "x.heic".into(),
            size: 3,
        }];
        let lines = listing_lines(&infos);
        assert_eq!(lines, vec!["x.heic (3 B)", "1 convertible entry"]);
    }
}
