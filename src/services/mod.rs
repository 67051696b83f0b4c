pub mod calibrate;
pub mod detect;
pub mod export;
pub mod ocr;
pub mod risk;
pub mod sample;
pub mod tracker;

pub use calibrate::AxisCalibrator;
pub use detect::ShapeDetector;
pub use risk::{ReferenceGradient, RiskClassifier};
pub use sample::ColorSampler;
pub use tracker::SignalTracker;
