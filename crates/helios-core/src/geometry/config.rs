use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_AUTOCROP_FACTOR, DEFAULT_AUTOCROP_ROUNDING};

/// Configuration for the shear/rescale geometry correction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Only ever upscale: when the circle would be reached by shrinking one
    /// axis, the other one is stretched instead.
    #[serde(default)]
    pub disallow_downsampling: bool,
    /// Fill value for pixels with no source. Defaults to the 1st percentile
    /// of the image histogram.
    #[serde(default)]
    pub black_point: Option<f32>,
    /// Tilt to correct instead of the fitted ellipse rotation (radians).
    #[serde(default)]
    pub forced_tilt: Option<f64>,
    /// X/Y ratio to apply instead of the one derived from the ellipse.
    #[serde(default)]
    pub forced_xy_ratio: Option<f64>,
}

/// Configuration for cropping around the solar disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutoCropConfig {
    /// Crop side relative to the disk bounding box.
    #[serde(default = "default_margin_factor")]
    pub margin_factor: f64,
    /// Crop side is rounded to the nearest multiple of this value.
    #[serde(default = "default_rounding")]
    pub rounding: usize,
    /// Invert every pixel outside the fitted disk.
    #[serde(default = "default_true")]
    pub invert_outside_disk: bool,
    /// Fill value for pixels outside the source. Defaults to the 1st
    /// percentile of the image histogram.
    #[serde(default)]
    pub black_point: Option<f32>,
}

fn default_margin_factor() -> f64 {
    DEFAULT_AUTOCROP_FACTOR
}
fn default_rounding() -> usize {
    DEFAULT_AUTOCROP_ROUNDING
}
fn default_true() -> bool {
    true
}

impl Default for AutoCropConfig {
    fn default() -> Self {
        Self {
            margin_factor: DEFAULT_AUTOCROP_FACTOR,
            rounding: DEFAULT_AUTOCROP_ROUNDING,
            invert_outside_disk: true,
            black_point: None,
        }
    }
}
