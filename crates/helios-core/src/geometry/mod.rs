pub mod config;
pub mod correction;
pub mod crop;
pub mod flip;
pub mod rotate;

pub use config::{AutoCropConfig, GeometryConfig};
pub use correction::{apply_geometry_correction, GeometryCorrection};
pub use crop::{autocrop, default_black_point, preview_geometry};
pub use flip::vertical_flip;
pub use rotate::rotate;
