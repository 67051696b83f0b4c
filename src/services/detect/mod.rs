//! Triangle marker detection.
//!
//! No single heuristic separates markers from chart noise (gridlines, text,
//! antialiasing) across every observed rendering, so detection runs a set of
//! independent strategies over the same region, unions their candidates, and
//! removes near-duplicates afterwards.

pub mod bright;
pub mod contour;
pub mod edges;
pub mod mask;
pub mod palette;
pub mod saturation;

pub use bright::BrightHueStrategy;
pub use edges::EdgeStrategy;
pub use palette::PaletteStrategy;
pub use saturation::SaturationStrategy;

use image::RgbImage;
use tracing::debug;

use crate::config::DetectionConfig;
use crate::services::detect::contour::{approx_polygon, find_contours, Contour};
use crate::services::detect::mask::BitMask;
use crate::types::{BoundingBox, Orientation, PlotRegion, Point, TriangleCandidate};

/// Polygon approximation tolerances, as fractions of the contour perimeter,
/// tried loosest-fit-first until one yields exactly three vertices.
const EPSILON_FACTORS: [f64; 4] = [0.02, 0.03, 0.04, 0.05];

/// Capability interface for one detection heuristic: produce a binary mask
/// of probable marker pixels over the plot region.
pub trait DetectionStrategy: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Candidate-pixel mask in region-local coordinates.
    fn mask(&self, image: &RgbImage, region: &PlotRegion) -> BitMask;
}

/// The full strategy set, in union order.
pub fn default_strategies() -> Vec<Box<dyn DetectionStrategy>> {
    vec![
        Box::new(SaturationStrategy),
        Box::new(BrightHueStrategy),
        Box::new(PaletteStrategy),
        Box::new(EdgeStrategy),
    ]
}

/// Derive the active plot region of an image from the configured fractions.
pub fn plot_region(width: u32, height: u32, config: &DetectionConfig) -> PlotRegion {
    PlotRegion {
        top: (height as f64 * config.region_top_fraction) as u32,
        bottom: (height as f64 * config.region_bottom_fraction) as u32,
        left: (width as f64 * config.region_left_fraction) as u32,
        right: (width as f64 * config.region_right_fraction) as u32,
    }
}

/// Multi-strategy triangle detector.
pub struct ShapeDetector {
    config: DetectionConfig,
    strategies: Vec<Box<dyn DetectionStrategy>>,
}

impl ShapeDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self::with_strategies(config, default_strategies())
    }

    pub fn with_strategies(
        config: DetectionConfig,
        strategies: Vec<Box<dyn DetectionStrategy>>,
    ) -> Self {
        Self { config, strategies }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detect triangle candidates within the plot region, deduplicated and
    /// ordered left to right.
    pub fn detect(&self, image: &RgbImage, region: &PlotRegion) -> Vec<TriangleCandidate> {
        let mut candidates: Vec<TriangleCandidate> = Vec::new();

        for strategy in &self.strategies {
            let mask = strategy.mask(image, region).close(2).open(1);
            let mut kept = 0usize;
            for contour in find_contours(&mask) {
                if contour.area < self.config.min_area || contour.area > self.config.max_area {
                    continue;
                }
                if contour.bounds.aspect_ratio() > self.config.max_aspect_ratio {
                    continue;
                }
                if let Some(candidate) = self.approximate_triangle(&contour, region) {
                    candidates.push(candidate);
                    kept += 1;
                }
            }
            debug!(
                strategy = strategy.name(),
                candidates = kept,
                "detection strategy pass"
            );
        }

        let mut unique: Vec<TriangleCandidate> = Vec::new();
        for candidate in candidates {
            let duplicate = unique.iter().any(|existing| {
                existing.centroid.distance_to(&candidate.centroid) < self.config.dedup_radius
            });
            if !duplicate {
                unique.push(candidate);
            }
        }

        unique.sort_by(|a, b| a.centroid.x.total_cmp(&b.centroid.x));
        unique
    }

    /// Reduce a contour to a triangle, sweeping the approximation tolerance
    /// until exactly three vertices survive.
    fn approximate_triangle(
        &self,
        contour: &Contour,
        region: &PlotRegion,
    ) -> Option<TriangleCandidate> {
        let perimeter = contour.perimeter();
        for factor in EPSILON_FACTORS {
            let approx = approx_polygon(&contour.boundary, factor * perimeter);
            if approx.len() != 3 {
                continue;
            }

            let vertices = [
                Point::new(approx[0].0 + region.left as f64, approx[0].1 + region.top as f64),
                Point::new(approx[1].0 + region.left as f64, approx[1].1 + region.top as f64),
                Point::new(approx[2].0 + region.left as f64, approx[2].1 + region.top as f64),
            ];

            let mut ys = [approx[0].1, approx[1].1, approx[2].1];
            ys.sort_by(|a, b| a.total_cmp(b));
            let dist_to_top = (ys[1] - ys[0]).abs();
            let dist_to_bottom = (ys[1] - ys[2]).abs();
            // Middle vertex hugging the bottom means the base is at the
            // bottom, so the apex points up.
            let orientation = if dist_to_bottom < dist_to_top {
                Orientation::Up
            } else {
                Orientation::Down
            };

            return Some(TriangleCandidate {
                vertices,
                centroid: Point::new(
                    contour.centroid.0 + region.left as f64,
                    contour.centroid.1 + region.top as f64,
                ),
                area: contour.area,
                orientation,
                bounds: BoundingBox {
                    x: contour.bounds.x + region.left,
                    y: contour.bounds.y + region.top,
                    width: contour.bounds.width,
                    height: contour.bounds.height,
                },
            });
        }
        None
    }
}
