//! Marker color sampling.
//!
//! Charts draw price lines and gridlines straight through markers, so the
//! representative fill color comes from the triangle interior with dark
//! line pixels masked out and a per-channel median over what remains.

use image::RgbImage;
use tracing::debug;

use crate::config::SamplingConfig;
use crate::types::{Point, Rgb, TriangleCandidate};

/// Which sampling path produced the color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplePath {
    /// Median over bright interior pixels, the normal case.
    Interior,
    /// Interior fully occluded; median over a widened box around the
    /// centroid.
    WidenedRadius,
    /// Everything occluded; raw mean as a last resort.
    RawMean,
}

/// A sampled color plus how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSample {
    pub color: Rgb,
    pub path: SamplePath,
}

impl ColorSample {
    /// Whether a fallback path was taken.
    pub fn is_fallback(&self) -> bool {
        self.path != SamplePath::Interior
    }
}

pub struct ColorSampler {
    config: SamplingConfig,
}

impl ColorSampler {
    pub fn new(config: SamplingConfig) -> Self {
        Self { config }
    }

    /// Extract a representative interior color for a triangle marker.
    pub fn sample(&self, image: &RgbImage, triangle: &TriangleCandidate) -> ColorSample {
        let interior = self.interior_pixels(image, triangle);

        let bright: Vec<Rgb> = interior
            .iter()
            .filter(|c| c.luma() >= self.config.brightness_threshold)
            .copied()
            .collect();
        if !bright.is_empty() {
            return ColorSample {
                color: median_color(&bright),
                path: SamplePath::Interior,
            };
        }

        // Interior fully overlapped by lines: widen around the centroid.
        let widened = self.centroid_box(image, triangle);
        let bright: Vec<Rgb> = widened
            .iter()
            .filter(|c| c.luma() >= self.config.brightness_threshold)
            .copied()
            .collect();
        if !bright.is_empty() {
            debug!("interior occluded, sampling widened radius");
            return ColorSample {
                color: median_color(&bright),
                path: SamplePath::WidenedRadius,
            };
        }

        debug!("widened sample occluded too, falling back to raw mean");
        let pool = if !interior.is_empty() { interior } else { widened };
        ColorSample {
            color: mean_color(&pool),
            path: SamplePath::RawMean,
        }
    }

    /// Pixels whose centers fall inside the closed triangle.
    fn interior_pixels(&self, image: &RgbImage, triangle: &TriangleCandidate) -> Vec<Rgb> {
        let b = &triangle.bounds;
        let mut pixels = Vec::new();
        for y in b.y..(b.y + b.height).min(image.height()) {
            for x in b.x..(b.x + b.width).min(image.width()) {
                let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if point_in_triangle(&center, &triangle.vertices) {
                    pixels.push(Rgb::from(*image.get_pixel(x, y)));
                }
            }
        }
        pixels
    }

    /// Square window of the configured radius around the centroid, clipped
    /// to the image.
    fn centroid_box(&self, image: &RgbImage, triangle: &TriangleCandidate) -> Vec<Rgb> {
        let r = self.config.fallback_radius as i64;
        let cx = triangle.centroid.x.round() as i64;
        let cy = triangle.centroid.y.round() as i64;
        let mut pixels = Vec::new();
        for y in (cy - r).max(0)..=(cy + r).min(image.height() as i64 - 1) {
            for x in (cx - r).max(0)..=(cx + r).min(image.width() as i64 - 1) {
                pixels.push(Rgb::from(*image.get_pixel(x as u32, y as u32)));
            }
        }
        pixels
    }
}

/// Point-in-triangle by sign tests, winding-agnostic; boundary counts as
/// inside.
fn point_in_triangle(p: &Point, vertices: &[Point; 3]) -> bool {
    let sign = |a: &Point, b: &Point, c: &Point| -> f64 {
        (a.x - c.x) * (b.y - c.y) - (b.x - c.x) * (a.y - c.y)
    };
    let d1 = sign(p, &vertices[0], &vertices[1]);
    let d2 = sign(p, &vertices[1], &vertices[2]);
    let d3 = sign(p, &vertices[2], &vertices[0]);

    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Per-channel median, robust to anti-aliased edge pixels and partial line
/// overlap.
fn median_color(pixels: &[Rgb]) -> Rgb {
    let mut r: Vec<u8> = pixels.iter().map(|c| c.r).collect();
    let mut g: Vec<u8> = pixels.iter().map(|c| c.g).collect();
    let mut b: Vec<u8> = pixels.iter().map(|c| c.b).collect();
    r.sort_unstable();
    g.sort_unstable();
    b.sort_unstable();
    let mid = pixels.len() / 2;
    Rgb::new(r[mid], g[mid], b[mid])
}

fn mean_color(pixels: &[Rgb]) -> Rgb {
    if pixels.is_empty() {
        return Rgb::new(0, 0, 0);
    }
    let n = pixels.len() as u64;
    let r: u64 = pixels.iter().map(|c| c.r as u64).sum();
    let g: u64 = pixels.iter().map(|c| c.g as u64).sum();
    let b: u64 = pixels.iter().map(|c| c.b as u64).sum();
    Rgb::new((r / n) as u8, (g / n) as u8, (b / n) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Orientation};
    use image::Rgb as Px;

    fn triangle_at(cx: f64, cy: f64) -> TriangleCandidate {
        TriangleCandidate {
            vertices: [
                Point::new(cx, cy - 6.0),
                Point::new(cx - 7.0, cy + 5.0),
                Point::new(cx + 7.0, cy + 5.0),
            ],
            centroid: Point::new(cx, cy),
            area: 80.0,
            orientation: Orientation::Up,
            bounds: BoundingBox {
                x: (cx - 7.0) as u32,
                y: (cy - 6.0) as u32,
                width: 15,
                height: 12,
            },
        }
    }

    fn filled_image(triangle: &TriangleCandidate, fill: Px<u8>) -> RgbImage {
        let mut img = RgbImage::from_pixel(60, 60, Px([255, 255, 255]));
        for y in 0..60 {
            for x in 0..60 {
                let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if point_in_triangle(&center, &triangle.vertices) {
                    img.put_pixel(x, y, fill);
                }
            }
        }
        img
    }

    #[test]
    fn test_clean_interior_median() {
        let tri = triangle_at(30.0, 30.0);
        let img = filled_image(&tri, Px([0, 200, 83]));
        let sampler = ColorSampler::new(SamplingConfig::default());
        let sample = sampler.sample(&img, &tri);
        assert_eq!(sample.path, SamplePath::Interior);
        assert_eq!(sample.color, crate::types::Rgb::new(0, 200, 83));
    }

    #[test]
    fn test_median_survives_line_overlap() {
        let tri = triangle_at(30.0, 30.0);
        let mut img = filled_image(&tri, Px([0, 200, 83]));
        // A dark price line straight through the middle.
        for x in 0..60 {
            img.put_pixel(x, 30, Px([30, 30, 30]));
            img.put_pixel(x, 31, Px([30, 30, 30]));
        }
        let sampler = ColorSampler::new(SamplingConfig::default());
        let sample = sampler.sample(&img, &tri);
        assert_eq!(sample.path, SamplePath::Interior);
        assert_eq!(sample.color, crate::types::Rgb::new(0, 200, 83));
    }

    #[test]
    fn test_fully_occluded_interior_widens() {
        let tri = triangle_at(30.0, 30.0);
        // Dark chart background and a fully occluded interior; the only
        // bright pixels sit outside the triangle, inside the widened
        // centroid box.
        let mut img = RgbImage::from_pixel(60, 60, Px([20, 20, 20]));
        for y in 25..28u32 {
            img.put_pixel(25, y, Px([255, 152, 0]));
        }
        let sampler = ColorSampler::new(SamplingConfig::default());
        let sample = sampler.sample(&img, &tri);
        assert_eq!(sample.path, SamplePath::WidenedRadius);
        assert_eq!(sample.color, crate::types::Rgb::new(255, 152, 0));
    }

    #[test]
    fn test_raw_mean_last_resort() {
        let tri = triangle_at(30.0, 30.0);
        let img = RgbImage::from_pixel(60, 60, Px([40, 40, 40]));
        let sampler = ColorSampler::new(SamplingConfig::default());
        let sample = sampler.sample(&img, &tri);
        assert_eq!(sample.path, SamplePath::RawMean);
        assert_eq!(sample.color, crate::types::Rgb::new(40, 40, 40));
    }

    #[test]
    fn test_point_in_triangle_boundary() {
        let vertices = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        assert!(point_in_triangle(&Point::new(2.0, 2.0), &vertices));
        assert!(point_in_triangle(&Point::new(5.0, 0.0), &vertices));
        assert!(!point_in_triangle(&Point::new(8.0, 8.0), &vertices));
    }
}
