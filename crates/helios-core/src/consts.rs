use std::time::Duration;

/// Upper bound of the nominal pixel range of reconstructed images.
pub const MAX_PIXEL_VALUE: f32 = 65_535.0;

/// A frame contains the sun when `stddev > SUN_CONTRAST_THRESHOLD * mean`.
/// Empirically calibrated on spectroheliograph scans.
pub const SUN_CONTRAST_THRESHOLD: f64 = 0.42;

/// Number of histogram bins used for channel statistics.
pub const HISTOGRAM_BINS: usize = 256;

/// Maximum in-flight scan tasks per available core. Each task owns a copy of
/// its frame, so this trades memory for throughput.
pub const SCAN_TASKS_PER_CORE: usize = 8;

/// Ceiling on the time spent draining the scan pool before giving up.
pub const SCAN_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3600);

/// Edge threshold for limb sampling is `amplitude / ELLIPSE_EDGE_SENSITIVITY`.
pub const ELLIPSE_EDGE_SENSITIVITY: f64 = 10.0;

/// Edge samples closer than this (in pixels) to the previous accepted sample
/// on the same side are dropped.
pub const ELLIPSE_DUPLICATE_THRESHOLD: usize = 3;

/// Factor applied to both semi-axes of the refined fit so the ellipse stays
/// inside the limb.
pub const LIMB_SHRINK_FACTOR: f64 = 0.99;

/// Minimum number of samples for a conic regression (5 degrees of freedom).
pub const MIN_ELLIPSE_SAMPLES: usize = 6;

/// Frame range threshold for the FFT magnitude detector is
/// `amplitude / MAGNITUDE_EDGE_SENSITIVITY`.
pub const MAGNITUDE_EDGE_SENSITIVITY: f64 = 50.0;

/// Default margin applied to the disk bounding box when auto-cropping.
pub const DEFAULT_AUTOCROP_FACTOR: f64 = 1.1;

/// Auto-crop square sizes are rounded to the nearest multiple of this value.
pub const DEFAULT_AUTOCROP_ROUNDING: usize = 16;

/// Percentile of the intensity histogram used as the default black point.
pub const BLACK_POINT_PERCENTILE: f64 = 0.01;

/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// ITU-R BT.601 luminance coefficient for the red channel.
pub const LUMINANCE_R: f32 = 0.299;

/// ITU-R BT.601 luminance coefficient for the green channel.
pub const LUMINANCE_G: f32 = 0.587;

/// ITU-R BT.601 luminance coefficient for the blue channel.
pub const LUMINANCE_B: f32 = 0.114;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f64 = 1e-12;
