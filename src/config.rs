use std::env;
use std::str::FromStr;

/// Which OCR backend the axis calibrator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrBackendKind {
    /// Built-in dot-matrix digit matcher, no external dependencies.
    DotMatrix,
    /// External `tesseract` binary invoked over the axis band.
    Tesseract,
}

impl OcrBackendKind {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dotmatrix" | "builtin" => Some(OcrBackendKind::DotMatrix),
            "tesseract" => Some(OcrBackendKind::Tesseract),
            _ => None,
        }
    }
}

/// Axis calibration configuration.
#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    /// Width of the y-axis label gutter as a fraction of image width.
    pub gutter_fraction: f64,
    /// Lowest price an OCR-read label may plausibly carry.
    pub min_plausible_price: f64,
    /// Highest price an OCR-read label may plausibly carry.
    pub max_plausible_price: f64,
    /// Minimum OCR confidence (0-1) for a label to count.
    pub min_confidence: f64,
    /// Mean absolute fit residual above this fraction of the fitted range
    /// marks the calibration degraded.
    pub max_residual_fraction: f64,
    /// Vertical padding (px) applied beyond the extreme label rows.
    pub label_padding: u32,
    /// Price at the region top when calibration falls back.
    pub default_price_at_top: f64,
    /// Price at the region bottom when calibration falls back.
    pub default_price_at_bottom: f64,
    /// Fallback region top as a fraction of image height.
    pub default_region_top_fraction: f64,
    /// Fallback region bottom as a fraction of image height.
    pub default_region_bottom_fraction: f64,
    /// Selected OCR backend.
    pub backend: OcrBackendKind,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            gutter_fraction: 0.35,
            min_plausible_price: 4000.0,
            max_plausible_price: 7000.0,
            min_confidence: 0.1,
            max_residual_fraction: 0.02,
            label_padding: 20,
            default_price_at_top: 6200.0,
            default_price_at_bottom: 5800.0,
            default_region_top_fraction: 0.15,
            default_region_bottom_fraction: 0.85,
            backend: OcrBackendKind::DotMatrix,
        }
    }
}

/// Shape detection configuration.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Plot region bounds as fractions of image dimensions.
    pub region_left_fraction: f64,
    pub region_right_fraction: f64,
    pub region_top_fraction: f64,
    pub region_bottom_fraction: f64,
    /// Accepted contour area bounds in px².
    pub min_area: f64,
    pub max_area: f64,
    /// Maximum bounding-box aspect ratio (long side / short side).
    pub max_aspect_ratio: f64,
    /// Candidates whose centroids lie within this radius are duplicates.
    pub dedup_radius: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            region_left_fraction: 0.4,
            region_right_fraction: 0.98,
            region_top_fraction: 0.1,
            region_bottom_fraction: 0.9,
            min_area: 30.0,
            max_area: 10_000.0,
            max_aspect_ratio: 3.0,
            dedup_radius: 30.0,
        }
    }
}

/// Marker color sampling configuration.
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    /// Pixels with luma below this are treated as line overlay, not fill.
    pub brightness_threshold: u8,
    /// Square radius (px) around the centroid for the fallback sample.
    pub fallback_radius: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            brightness_threshold: 80,
            fallback_radius: 5,
        }
    }
}

/// Cross-frame tracking configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Centroid distance (px) within which a candidate matches an
    /// already-emitted marker in a later frame.
    pub match_tolerance: f64,
    /// Fan per-frame calibration and detection out to a worker pool,
    /// re-joining in input order before sequential tracking.
    pub parallel_analysis: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            match_tolerance: 8.0,
            parallel_analysis: true,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub calibration: CalibrationConfig,
    pub detection: DetectionConfig,
    pub sampling: SamplingConfig,
    pub tracker: TrackerConfig,
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// built-in defaults for anything unset.
    pub fn from_env() -> Self {
        let cal = CalibrationConfig::default();
        let det = DetectionConfig::default();
        let sam = SamplingConfig::default();
        let trk = TrackerConfig::default();

        Self {
            calibration: CalibrationConfig {
                gutter_fraction: env_parse("AXIS_GUTTER_FRACTION", cal.gutter_fraction),
                min_plausible_price: env_parse("AXIS_MIN_PRICE", cal.min_plausible_price),
                max_plausible_price: env_parse("AXIS_MAX_PRICE", cal.max_plausible_price),
                min_confidence: env_parse("OCR_MIN_CONFIDENCE", cal.min_confidence),
                max_residual_fraction: env_parse(
                    "AXIS_MAX_RESIDUAL_FRACTION",
                    cal.max_residual_fraction,
                ),
                label_padding: env_parse("AXIS_LABEL_PADDING", cal.label_padding),
                default_price_at_top: env_parse("AXIS_DEFAULT_TOP", cal.default_price_at_top),
                default_price_at_bottom: env_parse(
                    "AXIS_DEFAULT_BOTTOM",
                    cal.default_price_at_bottom,
                ),
                default_region_top_fraction: env_parse(
                    "AXIS_DEFAULT_REGION_TOP",
                    cal.default_region_top_fraction,
                ),
                default_region_bottom_fraction: env_parse(
                    "AXIS_DEFAULT_REGION_BOTTOM",
                    cal.default_region_bottom_fraction,
                ),
                backend: env::var("OCR_BACKEND")
                    .ok()
                    .and_then(|v| OcrBackendKind::parse(&v))
                    .unwrap_or(cal.backend),
            },
            detection: DetectionConfig {
                region_left_fraction: env_parse("PLOT_LEFT_FRACTION", det.region_left_fraction),
                region_right_fraction: env_parse("PLOT_RIGHT_FRACTION", det.region_right_fraction),
                region_top_fraction: env_parse("PLOT_TOP_FRACTION", det.region_top_fraction),
                region_bottom_fraction: env_parse(
                    "PLOT_BOTTOM_FRACTION",
                    det.region_bottom_fraction,
                ),
                min_area: env_parse("TRIANGLE_MIN_AREA", det.min_area),
                max_area: env_parse("TRIANGLE_MAX_AREA", det.max_area),
                max_aspect_ratio: env_parse("TRIANGLE_MAX_ASPECT", det.max_aspect_ratio),
                dedup_radius: env_parse("TRIANGLE_DEDUP_RADIUS", det.dedup_radius),
            },
            sampling: SamplingConfig {
                brightness_threshold: env_parse("SAMPLE_BRIGHTNESS_THRESHOLD", sam.brightness_threshold),
                fallback_radius: env_parse("SAMPLE_FALLBACK_RADIUS", sam.fallback_radius),
            },
            tracker: TrackerConfig {
                match_tolerance: env_parse("MARKER_MATCH_TOLERANCE", trk.match_tolerance),
                parallel_analysis: env::var("PARALLEL_ANALYSIS")
                    .ok()
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(trk.parallel_analysis),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_detection_bounds() {
        let config = DetectionConfig::default();
        assert_eq!(config.min_area, 30.0);
        assert_eq!(config.max_area, 10_000.0);
        assert_eq!(config.max_aspect_ratio, 3.0);
    }

    #[test]
    fn test_default_calibration_range_is_monotone() {
        let config = CalibrationConfig::default();
        assert!(config.default_price_at_top > config.default_price_at_bottom);
        assert!(config.default_region_top_fraction < config.default_region_bottom_fraction);
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(
            OcrBackendKind::parse("tesseract"),
            Some(OcrBackendKind::Tesseract)
        );
        assert_eq!(
            OcrBackendKind::parse("DotMatrix"),
            Some(OcrBackendKind::DotMatrix)
        );
        assert_eq!(OcrBackendKind::parse("easyocr"), None);
    }

    #[test]
    fn test_sampling_defaults() {
        let config = SamplingConfig::default();
        assert_eq!(config.brightness_threshold, 80);
        assert_eq!(config.fallback_radius, 5);
    }
}
