pub mod chart;
pub mod geometry;
pub mod signal;

pub use chart::*;
pub use geometry::*;
pub use signal::*;
