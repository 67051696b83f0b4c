//! Y-axis calibration: recover the pixel-row-to-price mapping of one chart
//! image from the OCR-read labels in its axis gutter.

use image::{imageops, RgbImage};
use regex::Regex;
use tracing::{debug, warn};

use crate::config::CalibrationConfig;
use crate::error::Result;
use crate::services::ocr::{backend_for, OcrBackend, OcrWord};
use crate::types::{AxisScale, Calibration, PlotRegion};

/// Per-image axis calibrator.
///
/// Each image is calibrated independently; no state is carried across
/// frames, because the axis range can change in real time.
pub struct AxisCalibrator {
    config: CalibrationConfig,
    backend: Box<dyn OcrBackend>,
    price_pattern: Regex,
    loose_pattern: Regex,
}

impl AxisCalibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        let backend = backend_for(config.backend);
        Self::with_backend(config, backend)
    }

    /// Construct with an explicit OCR backend, bypassing the configured
    /// selection.
    pub fn with_backend(config: CalibrationConfig, backend: Box<dyn OcrBackend>) -> Self {
        Self {
            config,
            backend,
            price_pattern: Regex::new(r"\b\d{4,5}(?:\.\d{1,2})?\b").expect("static pattern"),
            loose_pattern: Regex::new(r"\d{4,}").expect("static pattern"),
        }
    }

    /// Recover the axis scale for one image.
    ///
    /// Never fails hard: any unusable OCR result degrades to the configured
    /// default range so downstream price computation stays defined.
    pub fn calibrate(&self, image: &RgbImage) -> Calibration {
        match self.try_calibrate(image) {
            Ok(Some(scale)) => Calibration {
                scale,
                degraded: false,
            },
            Ok(None) => {
                warn!(
                    backend = self.backend.name(),
                    "axis labels unreadable, using default range"
                );
                Calibration {
                    scale: self.fallback_scale(image),
                    degraded: true,
                }
            }
            Err(e) => {
                warn!(
                    backend = self.backend.name(),
                    error = %e,
                    "OCR backend failed, using default range"
                );
                Calibration {
                    scale: self.fallback_scale(image),
                    degraded: true,
                }
            }
        }
    }

    fn try_calibrate(&self, image: &RgbImage) -> Result<Option<AxisScale>> {
        let gutter_width =
            ((image.width() as f64 * self.config.gutter_fraction) as u32).min(image.width());
        if gutter_width == 0 || image.height() == 0 {
            return Ok(None);
        }

        let band = imageops::crop_imm(image, 0, 0, gutter_width, image.height()).to_image();
        let words = self.backend.recognize(&band)?;

        let mut labels = self.collect_labels(&words, &self.price_pattern);
        if labels.len() < 2 {
            labels = self.collect_labels(&words, &self.loose_pattern);
        }
        if labels.len() < 2 {
            debug!(words = words.len(), labels = labels.len(), "too few labels");
            return Ok(None);
        }

        Ok(self.fit(image, &labels))
    }

    /// Extract `(row, price)` pairs from recognized words.
    fn collect_labels(&self, words: &[OcrWord], pattern: &Regex) -> Vec<(f64, f64)> {
        let mut labels = Vec::new();
        for word in words {
            if word.confidence < self.config.min_confidence {
                continue;
            }
            let Some(m) = pattern.find(&word.text) else {
                continue;
            };
            let Ok(price) = m.as_str().parse::<f64>() else {
                continue;
            };
            if price < self.config.min_plausible_price || price > self.config.max_plausible_price {
                continue;
            }
            labels.push((word.center_row(), price));
        }
        labels
    }

    /// Least-squares line over the `(row, price)` pairs; exactly two labels
    /// reduce to the two-point line.
    fn fit(&self, image: &RgbImage, labels: &[(f64, f64)]) -> Option<AxisScale> {
        let n = labels.len() as f64;
        let sum_r: f64 = labels.iter().map(|(r, _)| r).sum();
        let sum_p: f64 = labels.iter().map(|(_, p)| p).sum();
        let sum_rr: f64 = labels.iter().map(|(r, _)| r * r).sum();
        let sum_rp: f64 = labels.iter().map(|(r, p)| r * p).sum();

        let denom = n * sum_rr - sum_r * sum_r;
        if denom.abs() < f64::EPSILON {
            return None; // all labels on one row
        }
        let a = (n * sum_rp - sum_r * sum_p) / denom;
        let b = (sum_p - a * sum_r) / n;

        // Rows grow downward, so a readable axis has a negative slope.
        if a >= 0.0 {
            debug!(slope = a, "non-decreasing axis fit rejected");
            return None;
        }

        let min_price = labels.iter().map(|(_, p)| *p).fold(f64::INFINITY, f64::min);
        let max_price = labels
            .iter()
            .map(|(_, p)| *p)
            .fold(f64::NEG_INFINITY, f64::max);
        let range = max_price - min_price;
        if range <= 0.0 {
            return None;
        }
        let mean_residual: f64 = labels
            .iter()
            .map(|(r, p)| (p - (a * r + b)).abs())
            .sum::<f64>()
            / n;
        if mean_residual > self.config.max_residual_fraction * range {
            debug!(mean_residual, range, "fit residual too large");
            return None;
        }

        let min_row = labels.iter().map(|(r, _)| *r).fold(f64::INFINITY, f64::min);
        let max_row = labels
            .iter()
            .map(|(r, _)| *r)
            .fold(f64::NEG_INFINITY, f64::max);
        let pad = self.config.label_padding as f64;
        let top = (min_row - pad).max(0.0) as u32;
        let bottom = ((max_row + pad) as u32).min(image.height()).max(top + 1);

        let region = PlotRegion {
            top,
            bottom,
            left: 0,
            right: image.width(),
        };
        let scale = AxisScale {
            price_at_top: a * top as f64 + b,
            price_at_bottom: a * bottom as f64 + b,
            region,
        };
        debug!(
            price_at_top = scale.price_at_top,
            price_at_bottom = scale.price_at_bottom,
            labels = labels.len(),
            "axis calibrated"
        );
        Some(scale)
    }

    fn fallback_scale(&self, image: &RgbImage) -> AxisScale {
        let h = image.height() as f64;
        let top = (h * self.config.default_region_top_fraction) as u32;
        let bottom = ((h * self.config.default_region_bottom_fraction) as u32).max(top + 1);
        AxisScale {
            price_at_top: self.config.default_price_at_top,
            price_at_bottom: self.config.default_price_at_bottom,
            region: PlotRegion {
                top,
                bottom,
                left: 0,
                right: image.width(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use crate::types::BoundingBox;
    use image::Rgb;

    /// Backend stub returning a scripted word list.
    struct FixedOcr(Vec<OcrWord>);

    impl OcrBackend for FixedOcr {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(&self, _band: &RgbImage) -> Result<Vec<OcrWord>> {
            Ok(self.0.clone())
        }
    }

    struct FailingOcr;

    impl OcrBackend for FailingOcr {
        fn name(&self) -> &str {
            "failing"
        }

        fn recognize(&self, _band: &RgbImage) -> Result<Vec<OcrWord>> {
            Err(ExtractError::Ocr("engine unavailable".into()))
        }
    }

    fn word(text: &str, y: u32, confidence: f64) -> OcrWord {
        OcrWord {
            text: text.to_string(),
            bounds: BoundingBox {
                x: 5,
                y,
                width: 40,
                height: 10,
            },
            confidence,
        }
    }

    fn blank(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    #[test]
    fn test_two_point_calibration() {
        let words = vec![word("6130", 35, 0.9), word("6100", 255, 0.9)];
        let calibrator =
            AxisCalibrator::with_backend(CalibrationConfig::default(), Box::new(FixedOcr(words)));
        let cal = calibrator.calibrate(&blank(400, 300));

        assert!(!cal.degraded);
        assert!(cal.scale.price_at_top > cal.scale.price_at_bottom);
        // Label centers at rows 40 and 260 carry 6130 and 6100; padding
        // extends the region 20 px past each.
        assert_eq!(cal.scale.region.top, 20);
        assert_eq!(cal.scale.region.bottom, 280);
        let mid = cal.scale.price_at_row(150.0);
        assert!((mid - 6115.0).abs() < 0.5, "got {}", mid);
    }

    #[test]
    fn test_least_squares_over_three_labels() {
        let words = vec![
            word("6130", 35, 0.9),
            word("6115", 145, 0.9),
            word("6100", 255, 0.9),
        ];
        let calibrator =
            AxisCalibrator::with_backend(CalibrationConfig::default(), Box::new(FixedOcr(words)));
        let cal = calibrator.calibrate(&blank(400, 300));
        assert!(!cal.degraded);
        let price = cal.scale.price_at_row(150.0);
        assert!((price - 6115.0).abs() < 0.5, "got {}", price);
    }

    #[test]
    fn test_zero_labels_degrades_to_default_range() {
        let calibrator =
            AxisCalibrator::with_backend(CalibrationConfig::default(), Box::new(FixedOcr(vec![])));
        let cal = calibrator.calibrate(&blank(400, 300));

        assert!(cal.degraded);
        let config = CalibrationConfig::default();
        assert_eq!(cal.scale.price_at_top, config.default_price_at_top);
        assert_eq!(cal.scale.price_at_bottom, config.default_price_at_bottom);
        assert_eq!(cal.scale.region.top, 45);
        assert_eq!(cal.scale.region.bottom, 255);
    }

    #[test]
    fn test_backend_failure_degrades() {
        let calibrator =
            AxisCalibrator::with_backend(CalibrationConfig::default(), Box::new(FailingOcr));
        let cal = calibrator.calibrate(&blank(400, 300));
        assert!(cal.degraded);
        assert!(cal.scale.price_at_top > cal.scale.price_at_bottom);
    }

    #[test]
    fn test_low_confidence_labels_ignored() {
        let words = vec![word("6130", 35, 0.05), word("6100", 255, 0.05)];
        let calibrator =
            AxisCalibrator::with_backend(CalibrationConfig::default(), Box::new(FixedOcr(words)));
        let cal = calibrator.calibrate(&blank(400, 300));
        assert!(cal.degraded);
    }

    #[test]
    fn test_implausible_prices_ignored() {
        // Volume figures and timestamps read out of the gutter must not
        // calibrate the axis.
        let words = vec![word("123456", 35, 0.9), word("99999", 255, 0.9)];
        let calibrator =
            AxisCalibrator::with_backend(CalibrationConfig::default(), Box::new(FixedOcr(words)));
        let cal = calibrator.calibrate(&blank(400, 300));
        assert!(cal.degraded);
    }

    #[test]
    fn test_inverted_axis_rejected() {
        let words = vec![word("6100", 35, 0.9), word("6130", 255, 0.9)];
        let calibrator =
            AxisCalibrator::with_backend(CalibrationConfig::default(), Box::new(FixedOcr(words)));
        let cal = calibrator.calibrate(&blank(400, 300));
        assert!(cal.degraded);
    }

    #[test]
    fn test_outlier_label_degrades_fit() {
        // Three collinear labels plus one gross OCR misread.
        let words = vec![
            word("6130", 35, 0.9),
            word("6115", 145, 0.9),
            word("6900", 150, 0.9),
            word("6100", 255, 0.9),
        ];
        let calibrator =
            AxisCalibrator::with_backend(CalibrationConfig::default(), Box::new(FixedOcr(words)));
        let cal = calibrator.calibrate(&blank(400, 300));
        assert!(cal.degraded);
    }
}
