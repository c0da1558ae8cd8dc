pub mod config;
pub mod geometry;
pub mod params;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{CanvasConfig, ModelConfig, OutputConfig, SimulationConfig, TimingConfig};
pub use geometry::{ColorTag, Geometry, Marker, Point, Segment};
pub use params::{Angle, CanvasSize, InitialData, ModelParams, ParamsError};
pub use snapshot::Snapshot;
