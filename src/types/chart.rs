use chrono::NaiveDateTime;
use image::RgbImage;

use crate::types::PlotRegion;

/// A chart screenshot together with its filename-derived timestamp.
///
/// Immutable once loaded; owned exclusively by the processing step
/// handling it.
#[derive(Debug, Clone)]
pub struct ChartImage {
    pub pixels: RgbImage,
    pub timestamp: NaiveDateTime,
}

impl ChartImage {
    pub fn new(pixels: RgbImage, timestamp: NaiveDateTime) -> Self {
        Self { pixels, timestamp }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Linear mapping from pixel row to price for one chart image.
///
/// Invariant: `price_at_top > price_at_bottom` (charts are
/// y-increasing-upward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisScale {
    pub price_at_top: f64,
    pub price_at_bottom: f64,
    pub region: PlotRegion,
}

impl AxisScale {
    /// Convert a pixel row to a price value.
    ///
    /// Rows outside the calibrated region clamp to its edges, so markers
    /// drawn into the chart margin still read as the nearest axis price.
    pub fn price_at_row(&self, row: f64) -> f64 {
        let span = (self.region.bottom.saturating_sub(self.region.top)).max(1) as f64;
        let normalized = ((row - self.region.top as f64) / span).clamp(0.0, 1.0);
        self.price_at_top - normalized * (self.price_at_top - self.price_at_bottom)
    }
}

/// Outcome of axis calibration for one image.
///
/// Calibration never fails hard: when OCR cannot recover the axis the
/// configured default range is substituted and `degraded` is set, so
/// downstream price computation always has a valid scale to consume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub scale: AxisScale,
    pub degraded: bool,
}
