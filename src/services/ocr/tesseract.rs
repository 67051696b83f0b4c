//! OCR backend that shells out to the `tesseract` binary.
//!
//! Used on real chart corpora where label faces vary too much for the
//! built-in matcher. The band is written to a temporary PNG and read back
//! through tesseract's TSV output, which carries per-word boxes and
//! confidences.

use std::path::PathBuf;
use std::process::Command;

use image::RgbImage;

use crate::error::{ExtractError, Result};
use crate::services::ocr::{OcrBackend, OcrWord};
use crate::types::BoundingBox;

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
        }
    }
}

impl TesseractOcr {
    pub fn with_binary(binary: PathBuf) -> Self {
        Self { binary }
    }
}

impl OcrBackend for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, band: &RgbImage) -> Result<Vec<OcrWord>> {
        let path = std::env::temp_dir().join(format!(
            "chartsight-band-{}-{:x}.png",
            std::process::id(),
            band.as_raw().len()
        ));
        band.save(&path)?;

        let output = Command::new(&self.binary)
            .arg(&path)
            .arg("stdout")
            .args(["--psm", "6"])
            .args(["-c", "tessedit_char_whitelist=0123456789."])
            .arg("tsv")
            .output();
        let _ = std::fs::remove_file(&path);

        let output = output.map_err(|e| ExtractError::Ocr(format!("spawn tesseract: {e}")))?;
        if !output.status.success() {
            return Err(ExtractError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse tesseract TSV output, keeping word-level rows with a usable
/// confidence. Confidence is rescaled from tesseract's 0-100 to 0-1.
fn parse_tsv(tsv: &str) -> Vec<OcrWord> {
    let mut words = Vec::new();
    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 || fields[0] != "5" {
            continue;
        }
        let (Ok(left), Ok(top), Ok(width), Ok(height), Ok(conf)) = (
            fields[6].parse::<u32>(),
            fields[7].parse::<u32>(),
            fields[8].parse::<u32>(),
            fields[9].parse::<u32>(),
            fields[10].parse::<f64>(),
        ) else {
            continue;
        };
        let text = fields[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }
        words.push(OcrWord {
            text: text.to_string(),
            bounds: BoundingBox {
                x: left,
                y: top,
                width,
                height,
            },
            confidence: conf / 100.0,
        });
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_parse_tsv_words() {
        let tsv = format!(
            "{HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t200\t100\t-1\t\n\
             5\t1\t1\t1\t1\t1\t12\t20\t44\t14\t96.5\t6130\n\
             5\t1\t1\t1\t2\t1\t12\t60\t44\t14\t88.0\t6100\n"
        );
        let words = parse_tsv(&tsv);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "6130");
        assert_eq!(words[0].bounds.y, 20);
        assert!((words[0].confidence - 0.965).abs() < 1e-9);
    }

    #[test]
    fn test_parse_tsv_skips_non_word_rows() {
        let tsv = format!(
            "{HEADER}\n\
             4\t1\t1\t1\t1\t0\t12\t20\t44\t14\t-1\t\n\
             5\t1\t1\t1\t1\t1\t12\t20\t44\t14\t-1\t \n"
        );
        assert!(parse_tsv(&tsv).is_empty());
    }

    #[test]
    fn test_parse_tsv_garbage() {
        assert!(parse_tsv("not a tsv at all").is_empty());
    }
}
