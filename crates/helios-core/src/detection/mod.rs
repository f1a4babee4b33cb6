pub mod config;
pub mod edges;
pub mod magnitude;
pub mod sun;

pub use config::{EdgeDetectionConfig, MagnitudeDetectionConfig};
pub use edges::{find_edges, find_edges_above, EdgeRange};
pub use magnitude::{MagnitudeDetection, MagnitudeEdgeDetector};
pub use sun::{detect_sun_edges, EdgeDetection, SunEdgeDetector};
