use std::path::PathBuf;
use thiserror::Error;

/// Application error types.
///
/// Failures are scoped to the single image or signal they affect; only a
/// fully empty corpus aborts a run. Degraded calibration and occluded color
/// sampling are modeled as flags on their result types, not errors.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unusable timestamp in filename: {0}")]
    FilenameParse(PathBuf),

    #[error("reference gradient unusable: {0}")]
    GradientLoad(String),

    #[error("OCR backend failure: {0}")]
    Ocr(String),

    #[error("no usable images for {0}")]
    EmptyCorpus(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
