//! Risk classification against a reference color gradient.
//!
//! The gradient is a vertical strip authored red-top/green-bottom: a marker
//! color's vertical position on the strip places it in a risk tier by
//! thirds.

use std::path::Path;

use image::RgbImage;
use tracing::info;

use crate::error::{ExtractError, Result};
use crate::types::{RiskTier, Rgb};

/// Per-channel tolerance for a near-exact gradient match.
const EXACT_TOLERANCE: i32 = 3;

/// The reference gradient strip, loaded once per run, read-only.
#[derive(Debug, Clone)]
pub struct ReferenceGradient {
    strip: RgbImage,
}

impl ReferenceGradient {
    /// Load a colorbar image and keep its left third, which carries the
    /// clean gradient without tick labels.
    pub fn load(path: &Path) -> Result<Self> {
        let img = image::open(path)
            .map_err(|e| ExtractError::GradientLoad(format!("{}: {e}", path.display())))?
            .to_rgb8();
        let strip_width = (img.width() / 3).max(1);
        let strip = image::imageops::crop_imm(&img, 0, 0, strip_width, img.height()).to_image();
        Self::from_strip(strip)
    }

    pub fn from_strip(strip: RgbImage) -> Result<Self> {
        if strip.width() == 0 || strip.height() < 3 {
            return Err(ExtractError::GradientLoad(format!(
                "strip too small: {}x{}",
                strip.width(),
                strip.height()
            )));
        }
        Ok(Self { strip })
    }

    pub fn height(&self) -> u32 {
        self.strip.height()
    }

    /// Color of the strip's middle column at a given row.
    pub fn sample_at(&self, row: u32) -> Rgb {
        let col = self.strip.width() / 2;
        Rgb::from(*self.strip.get_pixel(col, row.min(self.strip.height() - 1)))
    }
}

/// Maps sampled marker colors to risk tiers via the reference gradient.
pub struct RiskClassifier {
    gradient: ReferenceGradient,
}

impl RiskClassifier {
    pub fn new(gradient: ReferenceGradient) -> Self {
        info!(rows = gradient.height(), "reference gradient loaded");
        Self { gradient }
    }

    /// Find the color's vertical position on the gradient and map it to a
    /// tier by thirds: top third High, middle Medium, bottom Low.
    pub fn classify(&self, color: &Rgb) -> RiskTier {
        let row = self
            .exact_match_row(color)
            .unwrap_or_else(|| self.nearest_match_row(color));

        let height = self.gradient.height();
        let third = height / 3;
        if row < third {
            RiskTier::High
        } else if row < 2 * third {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    /// Average row of all rows with a near-exact color match anywhere in
    /// the strip.
    fn exact_match_row(&self, color: &Rgb) -> Option<u32> {
        let strip = &self.gradient.strip;
        let mut matching_rows: Vec<u32> = Vec::new();
        for row in 0..strip.height() {
            for col in 0..strip.width() {
                let p = Rgb::from(*strip.get_pixel(col, row));
                if (p.r as i32 - color.r as i32).abs() <= EXACT_TOLERANCE
                    && (p.g as i32 - color.g as i32).abs() <= EXACT_TOLERANCE
                    && (p.b as i32 - color.b as i32).abs() <= EXACT_TOLERANCE
                {
                    matching_rows.push(row);
                    break;
                }
            }
        }
        if matching_rows.is_empty() {
            return None;
        }
        Some((matching_rows.iter().map(|r| *r as u64).sum::<u64>()
            / matching_rows.len() as u64) as u32)
    }

    /// Closest color down the strip's middle column, for marker colors the
    /// gradient never contains exactly.
    fn nearest_match_row(&self, color: &Rgb) -> u32 {
        let mut best_row = self.gradient.height() / 2;
        let mut best_distance = f64::INFINITY;
        for row in 0..self.gradient.height() {
            let distance = self.gradient.sample_at(row).distance_to(color);
            if distance < best_distance {
                best_distance = distance;
                best_row = row;
            }
        }
        best_row
    }
}
