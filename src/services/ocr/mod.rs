//! Optical character recognition for axis-label bands.
//!
//! Calibration must keep working whichever OCR engine is available, so the
//! engines sit behind a narrow capability interface and are selected by
//! configuration, never hard-wired into the calibrator.

pub mod dotmatrix;
pub mod font;
pub mod tesseract;

pub use dotmatrix::DotMatrixOcr;
pub use tesseract::TesseractOcr;

use image::RgbImage;

use crate::config::OcrBackendKind;
use crate::error::Result;
use crate::types::BoundingBox;

/// One recognized word and where it sits in the scanned band.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    /// Bounds in the coordinates of the scanned band.
    pub bounds: BoundingBox,
    /// Recognition confidence, 0 to 1.
    pub confidence: f64,
}

impl OcrWord {
    /// Vertical center of the word's bounding box.
    pub fn center_row(&self) -> f64 {
        self.bounds.y as f64 + self.bounds.height as f64 / 2.0
    }
}

/// Capability interface over an OCR engine.
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Recognize text in an image band, returning words with bounds.
    fn recognize(&self, band: &RgbImage) -> Result<Vec<OcrWord>>;
}

/// Instantiate the configured backend.
pub fn backend_for(kind: OcrBackendKind) -> Box<dyn OcrBackend> {
    match kind {
        OcrBackendKind::DotMatrix => Box::new(DotMatrixOcr::default()),
        OcrBackendKind::Tesseract => Box::new(TesseractOcr::default()),
    }
}
