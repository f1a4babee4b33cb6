use serde::{Deserialize, Serialize};

use crate::detection::{EdgeDetectionConfig, MagnitudeDetectionConfig};
use crate::ellipse::EllipseFitConfig;
use crate::geometry::{AutoCropConfig, GeometryConfig};
use crate::scan::ScanConfig;

/// Every tunable of the processing chain, serialized as one document.
/// Missing sections take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub edge_detection: EdgeDetectionConfig,
    #[serde(default)]
    pub magnitude_detection: MagnitudeDetectionConfig,
    #[serde(default)]
    pub ellipse: EllipseFitConfig,
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub autocrop: AutoCropConfig,
}
