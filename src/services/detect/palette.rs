//! Curated-palette detection strategy.

use image::RgbImage;

use crate::services::detect::mask::{rgb_to_hsv, BitMask};
use crate::services::detect::DetectionStrategy;
use crate::types::PlotRegion;

/// Isolates pixels whose hue falls in the curated bands marker fills are
/// drawn with: greens, yellows, oranges, and both ends of the red wrap.
pub struct PaletteStrategy;

impl DetectionStrategy for PaletteStrategy {
    fn name(&self) -> &str {
        "palette"
    }

    fn mask(&self, image: &RgbImage, region: &PlotRegion) -> BitMask {
        let mut mask = BitMask::new(region.width(), region.height());
        for y in region.top..region.bottom {
            for x in region.left..region.right {
                let p = image.get_pixel(x, y);
                let (h, s, v) = rgb_to_hsv(p.0[0], p.0[1], p.0[2]);
                let hue_hit = (40..=80).contains(&h)    // green
                    || (15..40).contains(&h)            // yellow
                    || h < 15                           // orange/red
                    || h > 160; // red (hue wraps)
                if hue_hit && s > 50 && v > 80 {
                    mask.set(x - region.left, y - region.top, true);
                }
            }
        }
        mask
    }
}
