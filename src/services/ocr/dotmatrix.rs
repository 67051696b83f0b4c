//! Built-in OCR backend: Otsu binarization, glyph segmentation, and
//! nearest-template matching against a 5x7 dot-matrix digit font.
//!
//! Hermetic by construction, so it is the default backend and the one the
//! test suite exercises end to end.

use image::RgbImage;

use crate::error::Result;
use crate::services::detect::contour::{find_contours, Contour};
use crate::services::detect::mask::BitMask;
use crate::services::ocr::font::{cell, DIGITS, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::services::ocr::{OcrBackend, OcrWord};
use crate::types::BoundingBox;

/// Glyphs matching their best template below this similarity are treated as
/// unreadable.
const MIN_GLYPH_SIMILARITY: f64 = 0.6;

#[derive(Debug, Default)]
pub struct DotMatrixOcr;

impl OcrBackend for DotMatrixOcr {
    fn name(&self) -> &str {
        "dotmatrix"
    }

    fn recognize(&self, band: &RgbImage) -> Result<Vec<OcrWord>> {
        if band.width() == 0 || band.height() == 0 {
            return Ok(Vec::new());
        }

        let mask = binarize(band);
        let glyphs = find_contours(&mask);
        let lines = group_into_lines(glyphs);

        let mut words = Vec::new();
        for line in lines {
            if let Some(word) = read_line(&mask, &line) {
                words.push(word);
            }
        }
        words.sort_by_key(|w| w.bounds.y);
        Ok(words)
    }
}

/// Binarize with Otsu's threshold, taking the minority class as text.
fn binarize(band: &RgbImage) -> BitMask {
    let width = band.width();
    let height = band.height();

    let mut histogram = [0u32; 256];
    let mut gray = Vec::with_capacity((width * height) as usize);
    for p in band.pixels() {
        let luma = crate::types::Rgb::from(*p).luma();
        histogram[luma as usize] += 1;
        gray.push(luma);
    }

    let threshold = otsu_threshold(&histogram, width * height);
    let dark: u32 = histogram[..threshold as usize].iter().sum();
    let text_is_dark = dark * 2 <= width * height;

    let mut mask = BitMask::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let luma = gray[(y * width + x) as usize];
            let is_text = if text_is_dark {
                luma < threshold
            } else {
                luma >= threshold
            };
            mask.set(x, y, is_text);
        }
    }
    mask
}

/// Maximize between-class variance over the gray histogram.
fn otsu_threshold(histogram: &[u32; 256], total: u32) -> u8 {
    if total == 0 {
        return 128;
    }
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(v, n)| v as f64 * *n as f64)
        .sum();

    let mut sum_back = 0.0f64;
    let mut weight_back = 0u32;
    let mut best = (0u8, -1.0f64);

    for t in 0..256usize {
        weight_back += histogram[t];
        if weight_back == 0 {
            continue;
        }
        let weight_fore = total - weight_back;
        if weight_fore == 0 {
            break;
        }
        sum_back += t as f64 * histogram[t] as f64;
        let mean_back = sum_back / weight_back as f64;
        let mean_fore = (sum_all - sum_back) / weight_fore as f64;
        let between = weight_back as f64 * weight_fore as f64 * (mean_back - mean_fore).powi(2);
        if between > best.1 {
            best = (t as u8, between);
        }
    }
    best.0.saturating_add(1)
}

/// Cluster glyph components into horizontal text lines by vertical overlap.
fn group_into_lines(glyphs: Vec<Contour>) -> Vec<Vec<Contour>> {
    let mut lines: Vec<Vec<Contour>> = Vec::new();
    for glyph in glyphs {
        let center = glyph.bounds.y as f64 + glyph.bounds.height as f64 / 2.0;
        let slot = lines.iter_mut().find(|line| {
            let first = &line[0].bounds;
            let line_center = first.y as f64 + first.height as f64 / 2.0;
            (center - line_center).abs() < first.height.max(glyph.bounds.height) as f64 * 0.6
        });
        match slot {
            Some(line) => line.push(glyph),
            None => lines.push(vec![glyph]),
        }
    }
    for line in &mut lines {
        line.sort_by_key(|g| g.bounds.x);
    }
    lines
}

/// Read one text line glyph by glyph.
fn read_line(mask: &BitMask, line: &[Contour]) -> Option<OcrWord> {
    let mut heights: Vec<u32> = line.iter().map(|g| g.bounds.height).collect();
    heights.sort_unstable();
    let line_height = heights[heights.len() / 2];

    let mut text = String::new();
    let mut scores = Vec::new();
    for glyph in line {
        // Small low-slung blobs are decimal points, not digits.
        if glyph.bounds.height <= line_height / 2 && glyph.bounds.width <= line_height / 2 {
            text.push('.');
            scores.push(0.9);
            continue;
        }

        let (digit, similarity) = match_digit(mask, &glyph.bounds);
        if similarity < MIN_GLYPH_SIMILARITY {
            text.push('?');
            scores.push(similarity);
        } else {
            text.push(char::from_digit(digit, 10).unwrap_or('?'));
            scores.push(similarity);
        }
    }

    if text.is_empty() {
        return None;
    }

    let min_x = line.iter().map(|g| g.bounds.x).min()?;
    let min_y = line.iter().map(|g| g.bounds.y).min()?;
    let max_x = line.iter().map(|g| g.bounds.x + g.bounds.width).max()?;
    let max_y = line.iter().map(|g| g.bounds.y + g.bounds.height).max()?;

    Some(OcrWord {
        text,
        bounds: BoundingBox {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        },
        confidence: scores.iter().sum::<f64>() / scores.len() as f64,
    })
}

/// Resample a glyph's bounding box onto the 5x7 template grid and return
/// the best-matching digit with its cell-similarity score.
fn match_digit(mask: &BitMask, bounds: &BoundingBox) -> (u32, f64) {
    let mut grid = [[false; GLYPH_WIDTH as usize]; GLYPH_HEIGHT as usize];
    for row in 0..GLYPH_HEIGHT {
        for col in 0..GLYPH_WIDTH {
            let x0 = bounds.x + col * bounds.width / GLYPH_WIDTH;
            let x1 = (bounds.x + (col + 1) * bounds.width / GLYPH_WIDTH).max(x0 + 1);
            let y0 = bounds.y + row * bounds.height / GLYPH_HEIGHT;
            let y1 = (bounds.y + (row + 1) * bounds.height / GLYPH_HEIGHT).max(y0 + 1);

            let mut on = 0u32;
            let mut sampled = 0u32;
            for y in y0..y1 {
                for x in x0..x1 {
                    sampled += 1;
                    if mask.get(x, y) {
                        on += 1;
                    }
                }
            }
            grid[row as usize][col as usize] = on * 2 >= sampled;
        }
    }

    let cells = (GLYPH_WIDTH * GLYPH_HEIGHT) as f64;
    let mut best = (0u32, -1.0f64);
    for (digit, template) in DIGITS.iter().enumerate() {
        let mut matching = 0u32;
        for row in 0..GLYPH_HEIGHT {
            for col in 0..GLYPH_WIDTH {
                if grid[row as usize][col as usize] == cell(template, col, row) {
                    matching += 1;
                }
            }
        }
        let similarity = matching as f64 / cells;
        if similarity > best.1 {
            best = (digit as u32, similarity);
        }
    }
    best
}
