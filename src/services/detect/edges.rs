//! Edge-based detection strategy.

use image::RgbImage;

use crate::services::detect::mask::{sobel_edges, BitMask};
use crate::services::detect::DetectionStrategy;
use crate::types::PlotRegion;

/// Gradient magnitude above this marks an edge pixel.
const EDGE_THRESHOLD: f64 = 150.0;

/// Finds marker outlines by gradient magnitude, catching triangles whose
/// fill color blends into the background or gridlines.
pub struct EdgeStrategy;

impl DetectionStrategy for EdgeStrategy {
    fn name(&self) -> &str {
        "edges"
    }

    fn mask(&self, image: &RgbImage, region: &PlotRegion) -> BitMask {
        // One dilation thickens the outline enough for the closing pass in
        // the detector to fill small marker interiors.
        sobel_edges(image, region, EDGE_THRESHOLD).dilate()
    }
}
