//! High-saturation detection strategy.

use image::RgbImage;

use crate::services::detect::mask::{rgb_to_hsv, BitMask};
use crate::services::detect::DetectionStrategy;
use crate::types::PlotRegion;

/// Isolates strongly saturated, mid-brightness pixels irrespective of hue,
/// catching markers drawn outside the curated palette.
pub struct SaturationStrategy;

impl DetectionStrategy for SaturationStrategy {
    fn name(&self) -> &str {
        "saturation"
    }

    fn mask(&self, image: &RgbImage, region: &PlotRegion) -> BitMask {
        let mut mask = BitMask::new(region.width(), region.height());
        for y in region.top..region.bottom {
            for x in region.left..region.right {
                let p = image.get_pixel(x, y);
                let (_, s, v) = rgb_to_hsv(p.0[0], p.0[1], p.0[2]);
                if s > 80 && v > 80 && v < 240 {
                    mask.set(x - region.left, y - region.top, true);
                }
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_saturation_ignores_background_and_white() {
        let region = PlotRegion {
            top: 0,
            bottom: 1,
            left: 0,
            right: 3,
        };
        let mut img = RgbImage::new(3, 1);
        img.put_pixel(0, 0, Rgb([0, 180, 200])); // saturated cyan marker
        img.put_pixel(1, 0, Rgb([255, 255, 255])); // white background
        img.put_pixel(2, 0, Rgb([20, 20, 20])); // dark gridline

        let mask = SaturationStrategy.mask(&img, &region);
        assert!(mask.get(0, 0));
        assert!(!mask.get(1, 0));
        assert!(!mask.get(2, 0));
    }
}
