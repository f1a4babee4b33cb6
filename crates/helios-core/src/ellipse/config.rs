use serde::{Deserialize, Serialize};

use crate::consts::{ELLIPSE_DUPLICATE_THRESHOLD, ELLIPSE_EDGE_SENSITIVITY, LIMB_SHRINK_FACTOR};

/// Configuration for limb sampling and ellipse fitting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EllipseFitConfig {
    /// Edge threshold is the profile amplitude divided by this value.
    #[serde(default = "default_edge_sensitivity")]
    pub edge_sensitivity: f64,
    /// An edge moving by this many pixels or less from the previous accepted
    /// edge on the same side is dropped.
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: usize,
    /// Factor applied to both semi-axes of the refined fit.
    #[serde(default = "default_limb_shrink")]
    pub limb_shrink: f64,
}

fn default_edge_sensitivity() -> f64 {
    ELLIPSE_EDGE_SENSITIVITY
}
fn default_duplicate_threshold() -> usize {
    ELLIPSE_DUPLICATE_THRESHOLD
}
fn default_limb_shrink() -> f64 {
    LIMB_SHRINK_FACTOR
}

impl Default for EllipseFitConfig {
    fn default() -> Self {
        Self {
            edge_sensitivity: ELLIPSE_EDGE_SENSITIVITY,
            duplicate_threshold: ELLIPSE_DUPLICATE_THRESHOLD,
            limb_shrink: LIMB_SHRINK_FACTOR,
        }
    }
}
