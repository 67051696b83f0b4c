use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{BoundingBox, Point};

/// An RGB color sampled from a marker's interior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Rec. 601 luma, used to separate marker fill from dark line overlays.
    pub fn luma(&self) -> u8 {
        let y = 0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64;
        y.round().min(255.0) as u8
    }

    /// Euclidean distance to another color in RGB space.
    pub fn distance_to(&self, other: &Rgb) -> f64 {
        let dr = self.r as f64 - other.r as f64;
        let dg = self.g as f64 - other.g as f64;
        let db = self.b as f64 - other.b as f64;
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

impl From<image::Rgb<u8>> for Rgb {
    fn from(p: image::Rgb<u8>) -> Self {
        Self {
            r: p.0[0],
            g: p.0[1],
            b: p.0[2],
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Geometric orientation of a triangle marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Apex above base.
    Up,
    /// Apex below base (inverted triangle).
    Down,
}

impl Orientation {
    /// Trading direction implied by the marker's orientation.
    pub fn direction(&self) -> Direction {
        match self {
            Orientation::Up => Direction::Buy,
            Orientation::Down => Direction::Sell,
        }
    }
}

/// Trading direction of an emitted signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "Buy"),
            Direction::Sell => write!(f, "Sell"),
        }
    }
}

/// Risk tier derived from the marker color's position on the reference
/// gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    /// Reference gradient unavailable for the run.
    Unknown,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTier::Low => write!(f, "low"),
            RiskTier::Medium => write!(f, "medium"),
            RiskTier::High => write!(f, "high"),
            RiskTier::Unknown => write!(f, "unknown"),
        }
    }
}

/// A triangle marker candidate produced by shape detection.
///
/// Vertex coordinates are absolute image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleCandidate {
    pub vertices: [Point; 3],
    pub centroid: Point,
    pub area: f64,
    pub orientation: Orientation,
    pub bounds: BoundingBox,
}

impl TriangleCandidate {
    /// Row whose axis price the marker actually indicates.
    ///
    /// The market-significant coordinate is where the marker's base touches
    /// the price line, not its apex, so the reference row is shifted from
    /// the geometric center toward the base: downward for an upward (Buy)
    /// triangle, upward for an inverted (Sell) one.
    pub fn price_row(&self) -> f64 {
        let mut ys = [
            self.vertices[0].y,
            self.vertices[1].y,
            self.vertices[2].y,
        ];
        ys.sort_by(|a, b| a.total_cmp(b));
        let (y_min, y_max) = (ys[0], ys[2]);
        match self.orientation {
            Orientation::Up => (y_min + 2.0 * y_max) / 3.0,
            Orientation::Down => (2.0 * y_min + y_max) / 3.0,
        }
    }
}

/// One extracted trading signal.
///
/// Created exactly once when a marker is first observed across the ordered
/// image sequence; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub sequence_number: u32,
    pub timestamp: NaiveDateTime,
    /// Absent when the chart left no usable row-to-price mapping at all.
    pub price: Option<f64>,
    pub direction: Direction,
    pub color: Rgb,
    pub risk: RiskTier,
}
