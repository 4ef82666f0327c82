pub mod point;
pub mod trend;

pub use point::PointAnomaly;
pub use trend::TrendPeriod;
