//! Bright off-cyan hue detection strategy.

use image::RgbImage;

use crate::services::detect::mask::{rgb_to_hsv, BitMask};
use crate::services::detect::DetectionStrategy;
use crate::types::PlotRegion;

/// Isolates bright pixels whose hue sits well away from the chart's own
/// cyan/blue line color (hue ~90 on the 0-180 scale).
pub struct BrightHueStrategy;

impl DetectionStrategy for BrightHueStrategy {
    fn name(&self) -> &str {
        "bright-hue"
    }

    fn mask(&self, image: &RgbImage, region: &PlotRegion) -> BitMask {
        let mut mask = BitMask::new(region.width(), region.height());
        for y in region.top..region.bottom {
            for x in region.left..region.right {
                let p = image.get_pixel(x, y);
                let (h, _, v) = rgb_to_hsv(p.0[0], p.0[1], p.0[2]);
                if (h as i32 - 90).abs() > 20 && v > 100 {
                    mask.set(x - region.left, y - region.top, true);
                }
            }
        }
        mask
    }
}
