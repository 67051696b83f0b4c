//! Binary pixel masks and the raster operations the detection strategies
//! share: HSV conversion, 3x3 morphology, and gradient edge maps.

use image::RgbImage;

use crate::types::PlotRegion;

/// A binary mask over a plot region, in region-local coordinates.
#[derive(Debug, Clone)]
pub struct BitMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl BitMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.bits[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            self.bits[(y * self.width + x) as usize] = value;
        }
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// 3x3 dilation.
    pub fn dilate(&self) -> BitMask {
        let mut out = BitMask::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.any_neighbor(x, y) {
                    out.set(x, y, true);
                }
            }
        }
        out
    }

    /// 3x3 erosion.
    pub fn erode(&self) -> BitMask {
        let mut out = BitMask::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.all_neighbors(x, y) {
                    out.set(x, y, true);
                }
            }
        }
        out
    }

    /// Morphological closing (dilate then erode), repeated `iterations`
    /// times. Bridges the single-pixel gaps antialiasing leaves in marker
    /// fills.
    pub fn close(&self, iterations: usize) -> BitMask {
        let mut mask = self.clone();
        for _ in 0..iterations {
            mask = mask.dilate();
        }
        for _ in 0..iterations {
            mask = mask.erode();
        }
        mask
    }

    /// Morphological opening (erode then dilate), repeated `iterations`
    /// times. Drops isolated speckle pixels.
    pub fn open(&self, iterations: usize) -> BitMask {
        let mut mask = self.clone();
        for _ in 0..iterations {
            mask = mask.erode();
        }
        for _ in 0..iterations {
            mask = mask.dilate();
        }
        mask
    }

    fn any_neighbor(&self, x: u32, y: u32) -> bool {
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx >= 0 && ny >= 0 && self.get(nx as u32, ny as u32) {
                    return true;
                }
            }
        }
        false
    }

    fn all_neighbors(&self, x: u32, y: u32) -> bool {
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx < 0 || ny < 0 || !self.get(nx as u32, ny as u32) {
                    return false;
                }
            }
        }
        true
    }
}

/// RGB to HSV on OpenCV's 8-bit scale: H in 0..=180, S and V in 0..=255.
///
/// The detection thresholds were tuned against charts on this scale, so the
/// conversion keeps it rather than the 0-360 convention.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let rf = r as f64 / 255.0;
    let gf = g as f64 / 255.0;
    let bf = b as f64 / 255.0;
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let v = max * 255.0;
    let s = if max > 0.0 { delta / max * 255.0 } else { 0.0 };
    let h_deg = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (((gf - bf) / delta).rem_euclid(6.0))
    } else if max == gf {
        60.0 * ((bf - rf) / delta + 2.0)
    } else {
        60.0 * ((rf - gf) / delta + 4.0)
    };

    (
        (h_deg / 2.0).round().min(180.0) as u8,
        s.round().min(255.0) as u8,
        v.round().min(255.0) as u8,
    )
}

/// Grayscale copy of a plot region, row-major, region-local.
pub fn gray_region(image: &RgbImage, region: &PlotRegion) -> Vec<u8> {
    let mut gray = Vec::with_capacity((region.width() * region.height()) as usize);
    for y in region.top..region.bottom {
        for x in region.left..region.right {
            let p = image.get_pixel(x, y);
            gray.push(crate::types::Rgb::from(*p).luma());
        }
    }
    gray
}

/// Sobel gradient-magnitude edge map of a plot region.
///
/// Stands in for a full hysteresis edge detector: markers whose fill blends
/// into the background still produce a strong outline gradient.
pub fn sobel_edges(image: &RgbImage, region: &PlotRegion, threshold: f64) -> BitMask {
    let width = region.width();
    let height = region.height();
    let gray = gray_region(image, region);
    let at = |x: i64, y: i64| -> f64 {
        let x = x.clamp(0, width as i64 - 1);
        let y = y.clamp(0, height as i64 - 1);
        gray[(y * width as i64 + x) as usize] as f64
    };

    let mut mask = BitMask::new(width, height);
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let gx = -at(x - 1, y - 1) - 2.0 * at(x - 1, y) - at(x - 1, y + 1)
                + at(x + 1, y - 1)
                + 2.0 * at(x + 1, y)
                + at(x + 1, y + 1);
            let gy = -at(x - 1, y - 1) - 2.0 * at(x, y - 1) - at(x + 1, y - 1)
                + at(x - 1, y + 1)
                + 2.0 * at(x, y + 1)
                + at(x + 1, y + 1);
            if (gx * gx + gy * gy).sqrt() >= threshold {
                mask.set(x as u32, y as u32, true);
            }
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(rgb_to_hsv(255, 0, 0), (0, 255, 255));
        assert_eq!(rgb_to_hsv(0, 255, 0), (60, 255, 255));
        assert_eq!(rgb_to_hsv(0, 0, 255), (120, 255, 255));
    }

    #[test]
    fn test_hsv_achromatic() {
        let (_, s, v) = rgb_to_hsv(255, 255, 255);
        assert_eq!((s, v), (0, 255));
        let (_, s, v) = rgb_to_hsv(0, 0, 0);
        assert_eq!((s, v), (0, 0));
    }

    #[test]
    fn test_hsv_marker_green() {
        // The typical marker fill lands in the 40-80 green hue band.
        let (h, s, v) = rgb_to_hsv(0, 200, 83);
        assert!((40..=80).contains(&h), "hue {}", h);
        assert!(s > 80 && v > 80);
    }

    #[test]
    fn test_close_bridges_gap() {
        let mut mask = BitMask::new(9, 9);
        for x in 2..=6 {
            for y in 2..=6 {
                mask.set(x, y, true);
            }
        }
        mask.set(4, 4, false);
        let closed = mask.close(1);
        assert!(closed.get(4, 4));
    }

    #[test]
    fn test_open_removes_speckle() {
        let mut mask = BitMask::new(9, 9);
        mask.set(4, 4, true);
        let opened = mask.open(1);
        assert_eq!(opened.count(), 0);
    }

    #[test]
    fn test_sobel_finds_block_outline() {
        let mut img = image::RgbImage::from_pixel(20, 20, Rgb([255, 255, 255]));
        for y in 5..15 {
            for x in 5..15 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        let region = PlotRegion {
            top: 0,
            bottom: 20,
            left: 0,
            right: 20,
        };
        let edges = sobel_edges(&img, &region, 120.0);
        assert!(edges.get(5, 10) || edges.get(4, 10));
        assert!(!edges.get(10, 10));
    }
}
