use serde::{Deserialize, Serialize};

use crate::consts::{MAGNITUDE_EDGE_SENSITIVITY, SUN_CONTRAST_THRESHOLD};

/// Configuration for contrast-based sun edge detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeDetectionConfig {
    /// A frame shows the sun when `stddev > contrast_threshold * mean`.
    #[serde(default = "default_contrast_threshold")]
    pub contrast_threshold: f64,
    /// Channel whose statistics are tested.
    #[serde(default)]
    pub channel: usize,
}

fn default_contrast_threshold() -> f64 {
    SUN_CONTRAST_THRESHOLD
}

impl Default for EdgeDetectionConfig {
    fn default() -> Self {
        Self {
            contrast_threshold: SUN_CONTRAST_THRESHOLD,
            channel: 0,
        }
    }
}

/// Configuration for the FFT magnitude edge detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MagnitudeDetectionConfig {
    /// Threshold is the score amplitude divided by this value.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
}

fn default_sensitivity() -> f64 {
    MAGNITUDE_EDGE_SENSITIVITY
}

impl Default for MagnitudeDetectionConfig {
    fn default() -> Self {
        Self {
            sensitivity: MAGNITUDE_EDGE_SENSITIVITY,
        }
    }
}
