//! Chart image corpus loading.
//!
//! Chart screenshots are named `YYYY-MM-DD_HH-MM-SS_<suffix>.<ext>`.
//! Lexicographic filename order is chronological order, so the corpus is
//! sorted by name and the timestamp parsed straight off the prefix.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::error::{ExtractError, Result};
use crate::types::ChartImage;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const TIMESTAMP_LEN: usize = 19;

/// Load every chart image for a given date prefix, in chronological order.
///
/// Files whose names carry no parseable timestamp, and files that fail to
/// decode, are logged and skipped. An entirely empty result is an error.
pub fn load_corpus(folder: &Path, date: &str) -> Result<Vec<ChartImage>> {
    let mut names: Vec<PathBuf> = fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(date))
        })
        .collect();
    names.sort();

    let mut frames = Vec::with_capacity(names.len());
    for path in names {
        let timestamp = match parse_timestamp(&path) {
            Ok(ts) => ts,
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping file");
                continue;
            }
        };
        let pixels = match image::open(&path) {
            Ok(img) => img.to_rgb8(),
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping undecodable image");
                continue;
            }
        };
        debug!(path = %path.display(), %timestamp, "loaded frame");
        frames.push(ChartImage::new(pixels, timestamp));
    }

    if frames.is_empty() {
        return Err(ExtractError::EmptyCorpus(format!(
            "{} in {}",
            date,
            folder.display()
        )));
    }
    Ok(frames)
}

/// Parse the `YYYY-MM-DD_HH-MM-SS` prefix of a chart filename.
pub fn parse_timestamp(path: &Path) -> Result<NaiveDateTime> {
    let name = path
        .file_stem()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ExtractError::FilenameParse(path.to_path_buf()))?;
    if name.len() < TIMESTAMP_LEN {
        return Err(ExtractError::FilenameParse(path.to_path_buf()));
    }
    NaiveDateTime::parse_from_str(&name[..TIMESTAMP_LEN], TIMESTAMP_FORMAT)
        .map_err(|_| ExtractError::FilenameParse(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb as Px, RgbImage};

    #[test]
    fn test_parse_timestamp_prefix() {
        let ts = parse_timestamp(Path::new("2026-03-01_10-05-00_chart.png")).unwrap();
        assert_eq!(ts.format("%H:%M:%S").to_string(), "10:05:00");
    }

    #[test]
    fn test_parse_rejects_short_and_garbled_names() {
        assert!(parse_timestamp(Path::new("chart.png")).is_err());
        assert!(parse_timestamp(Path::new("2026-03-01_xx-yy-zz_chart.png")).is_err());
    }

    #[test]
    fn test_corpus_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbImage::from_pixel(4, 4, Px([255, 255, 255]));
        for name in [
            "2026-03-01_10-10-00_b.png",
            "2026-03-01_10-05-00_a.png",
            "2026-03-02_09-00-00_other_day.png",
        ] {
            img.save(dir.path().join(name)).unwrap();
        }
        // Name matches the date but carries no timestamp; skipped.
        std::fs::write(dir.path().join("2026-03-01_notes.txt"), "x").unwrap();

        let frames = load_corpus(dir.path(), "2026-03-01").unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].timestamp < frames[1].timestamp);
    }

    #[test]
    fn test_empty_corpus_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_corpus(dir.path(), "2026-03-01");
        assert!(matches!(err, Err(ExtractError::EmptyCorpus(_))));
    }
}
