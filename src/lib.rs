//! Chartsight - Trading-signal extraction from rendered chart screenshots

pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{ExtractError, Result};
pub use services::{
    AxisCalibrator, ColorSampler, ReferenceGradient, RiskClassifier, ShapeDetector, SignalTracker,
};
pub use types::*;
