//! Cross-frame marker tracking.
//!
//! Each chart frame is calibrated and scanned for triangle markers
//! independently, then the frames are diffed in chronological order: a
//! marker whose centroid sits within a small tolerance of one already
//! emitted is the same marker rendered again, not a new signal.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::services::calibrate::AxisCalibrator;
use crate::services::detect::{plot_region, ShapeDetector};
use crate::services::risk::RiskClassifier;
use crate::services::sample::{ColorSample, ColorSampler};
use crate::types::{Calibration, ChartImage, Point, RiskTier, Signal, TriangleCandidate};

/// Per-frame result of the stateless analysis stage.
struct FrameAnalysis {
    timestamp: NaiveDateTime,
    calibration: Calibration,
    candidates: Vec<(TriangleCandidate, ColorSample)>,
}

/// Tracks markers across an ordered frame sequence and emits each one as a
/// signal exactly once. Fresh per run; no state survives between runs.
pub struct SignalTracker {
    calibrator: AxisCalibrator,
    detector: ShapeDetector,
    sampler: ColorSampler,
    classifier: Option<RiskClassifier>,
    match_tolerance: f64,
    parallel: bool,
    seen_markers: Vec<Point>,
    next_sequence: u32,
}

impl SignalTracker {
    pub fn new(config: &Config, classifier: Option<RiskClassifier>) -> Self {
        Self {
            calibrator: AxisCalibrator::new(config.calibration.clone()),
            detector: ShapeDetector::new(config.detection.clone()),
            sampler: ColorSampler::new(config.sampling.clone()),
            classifier,
            match_tolerance: config.tracker.match_tolerance,
            parallel: config.tracker.parallel_analysis,
            seen_markers: Vec::new(),
            next_sequence: 1,
        }
    }

    /// Analyze an ordered frame sequence and return the newly-appeared
    /// signals, numbered in order of first appearance.
    pub fn run(&mut self, frames: &[ChartImage]) -> Vec<Signal> {
        let analyses: Vec<FrameAnalysis> = if self.parallel {
            frames.par_iter().map(|f| self.analyze(f)).collect()
        } else {
            frames.iter().map(|f| self.analyze(f)).collect()
        };

        let mut signals = Vec::new();
        for analysis in analyses {
            let before = signals.len();
            self.diff_frame(analysis, &mut signals);
            debug!(new = signals.len() - before, total = signals.len(), "frame diffed");
        }
        info!(frames = frames.len(), signals = signals.len(), "tracking complete");
        signals
    }

    /// Stateless per-frame stage: calibrate, detect, sample. Safe to run
    /// on frames in any order.
    fn analyze(&self, frame: &ChartImage) -> FrameAnalysis {
        let calibration = self.calibrator.calibrate(&frame.pixels);
        if calibration.degraded {
            warn!(timestamp = %frame.timestamp, "axis calibration degraded, using default price range");
        }

        let region = plot_region(frame.pixels.width(), frame.pixels.height(), self.detector.config());
        let detected = self.detector.detect(&frame.pixels, &region);
        if detected.is_empty() {
            info!(timestamp = %frame.timestamp, "no triangle markers found");
        }

        let candidates = detected
            .into_iter()
            .map(|candidate| {
                let sample = self.sampler.sample(&frame.pixels, &candidate);
                if sample.is_fallback() {
                    debug!(
                        x = candidate.centroid.x,
                        y = candidate.centroid.y,
                        path = ?sample.path,
                        "color sample fell back"
                    );
                }
                (candidate, sample)
            })
            .collect();

        FrameAnalysis {
            timestamp: frame.timestamp,
            calibration,
            candidates,
        }
    }

    /// Sequential stage: emit every candidate not yet in the positional
    /// registry. Candidates arrive sorted left to right.
    fn diff_frame(&mut self, analysis: FrameAnalysis, signals: &mut Vec<Signal>) {
        for (candidate, sample) in analysis.candidates {
            if self.already_seen(&candidate.centroid) {
                continue;
            }
            self.seen_markers.push(candidate.centroid);
            signals.push(self.emit(&candidate, &sample, &analysis.calibration, analysis.timestamp));
        }
    }

    fn already_seen(&self, centroid: &Point) -> bool {
        self.seen_markers
            .iter()
            .any(|m| m.distance_to(centroid) <= self.match_tolerance)
    }

    fn emit(
        &mut self,
        candidate: &TriangleCandidate,
        sample: &ColorSample,
        calibration: &Calibration,
        timestamp: NaiveDateTime,
    ) -> Signal {
        let price = calibration.scale.price_at_row(candidate.price_row());
        let risk = match &self.classifier {
            Some(classifier) => classifier.classify(&sample.color),
            None => RiskTier::Unknown,
        };
        let signal = Signal {
            sequence_number: self.next_sequence,
            timestamp,
            price: Some(price),
            direction: candidate.orientation.direction(),
            color: sample.color,
            risk,
        };
        let rounded = format!("{price:.2}");
        info!(
            seq = signal.sequence_number,
            direction = %signal.direction,
            price = %rounded,
            risk = %signal.risk,
            "signal emitted"
        );
        self.next_sequence += 1;
        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Orientation};
    use image::{Rgb as Px, RgbImage};

    fn candidate_at(x: f64, y: f64) -> TriangleCandidate {
        TriangleCandidate {
            vertices: [
                Point::new(x - 10.0, y - 8.0),
                Point::new(x + 10.0, y - 8.0),
                Point::new(x, y + 8.0),
            ],
            centroid: Point::new(x, y),
            area: 160.0,
            orientation: Orientation::Up,
            bounds: BoundingBox {
                x: (x - 10.0) as u32,
                y: (y - 8.0) as u32,
                width: 20,
                height: 16,
            },
        }
    }

    fn tracker() -> SignalTracker {
        SignalTracker::new(&Config::default(), None)
    }

    #[test]
    fn test_marker_within_tolerance_is_same() {
        let t = tracker();
        let mut t = t;
        t.seen_markers.push(Point::new(100.0, 200.0));
        assert!(t.already_seen(&Point::new(104.0, 203.0)));
        assert!(!t.already_seen(&Point::new(100.0, 212.0)));
    }

    #[test]
    fn test_sequence_numbers_start_at_one() {
        let mut t = tracker();
        let frame = ChartImage::new(
            RgbImage::from_pixel(40, 40, Px([255, 255, 255])),
            NaiveDateTime::parse_from_str("2026-03-01_10-00-00", "%Y-%m-%d_%H-%M-%S").unwrap(),
        );
        let calibration = t.calibrator.calibrate(&frame.pixels);
        let sample = ColorSample {
            color: crate::types::Rgb::new(30, 200, 90),
            path: crate::services::sample::SamplePath::Interior,
        };
        let a = t.emit(&candidate_at(20.0, 20.0), &sample, &calibration, frame.timestamp);
        let b = t.emit(&candidate_at(60.0, 20.0), &sample, &calibration, frame.timestamp);
        assert_eq!(a.sequence_number, 1);
        assert_eq!(b.sequence_number, 2);
        assert_eq!(a.risk, RiskTier::Unknown);
    }

    #[test]
    fn test_diff_skips_repeated_marker() {
        let mut t = tracker();
        let ts = NaiveDateTime::parse_from_str("2026-03-01_10-00-00", "%Y-%m-%d_%H-%M-%S").unwrap();
        let calibration = Calibration {
            scale: crate::types::AxisScale {
                price_at_top: 6130.0,
                price_at_bottom: 6100.0,
                region: crate::types::PlotRegion {
                    top: 0,
                    bottom: 300,
                    left: 0,
                    right: 400,
                },
            },
            degraded: false,
        };
        let sample = ColorSample {
            color: crate::types::Rgb::new(30, 200, 90),
            path: crate::services::sample::SamplePath::Interior,
        };

        let first = FrameAnalysis {
            timestamp: ts,
            calibration: calibration.clone(),
            candidates: vec![(candidate_at(100.0, 150.0), sample.clone())],
        };
        let second = FrameAnalysis {
            timestamp: ts,
            calibration,
            // Same marker, jittered by a couple of pixels, plus one new.
            candidates: vec![
                (candidate_at(102.0, 149.0), sample.clone()),
                (candidate_at(200.0, 150.0), sample),
            ],
        };

        let mut signals = Vec::new();
        t.diff_frame(first, &mut signals);
        t.diff_frame(second, &mut signals);

        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].sequence_number, 1);
        assert_eq!(signals[1].sequence_number, 2);
        assert!((signals[1].price.unwrap() - signals[0].price.unwrap()).abs() < 1e-9);
    }
}
