use ndarray::{Array2, ArrayView1, Axis};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::config::EllipseFitConfig;
use super::regression::fit_ellipse_regression;
use super::types::{Ellipse, Point2D};
use crate::consts::{MIN_ELLIPSE_SAMPLES, PARALLEL_PIXEL_THRESHOLD};
use crate::detection::edges::{find_edges_above, min_max};
use crate::error::{HeliosError, Result};
use crate::image::ImageBuffer;

/// Fitted disk outline together with the limb samples of the first pass.
#[derive(Clone, Debug)]
pub struct EllipseFit {
    pub ellipse: Ellipse,
    pub samples: Vec<Point2D>,
}

/// Gradient magnitude of a row centered in a buffer of `padded_len`.
///
/// The padding repeats the first and last row pixel, so it adds no step of
/// its own. Entry `i` is `|v[i + 1] - v[i]|` of the padded row and describes
/// the boundary between padded pixels `i` and `i + 1`. Returns the profile
/// and the padding offset of the first row pixel.
pub fn magnitude_profile(row: ArrayView1<f32>, padded_len: usize) -> (Vec<f32>, usize) {
    let padded_len = padded_len.max(row.len());
    let offset = (padded_len - row.len()) / 2;
    let (Some(&first), Some(&last)) = (row.iter().next(), row.iter().next_back()) else {
        return (vec![0.0; padded_len], offset);
    };
    let mut padded = vec![first; offset];
    padded.extend(row.iter().copied());
    padded.resize(padded_len, last);

    let mut profile: Vec<f32> = padded.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    profile.push(0.0);
    (profile, offset)
}

/// Median of the gradients between neighbouring row pixels, over the whole
/// image. Zero when there are none.
fn gradient_noise(profiles: &[(Vec<f32>, usize)], width: usize) -> f32 {
    let steps = width.saturating_sub(1);
    let mut interior: Vec<f32> = profiles
        .iter()
        .flat_map(|(p, offset)| p[*offset..*offset + steps].iter().copied())
        .filter(|v| !v.is_nan())
        .collect();
    if interior.is_empty() {
        return 0.0;
    }
    let mid = interior.len() / 2;
    let (_, median, _) = interior.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *median
}

/// Sample the left and right limb on every row of `image`.
///
/// Edges are the first and last profile entries reaching the row amplitude
/// divided by `edge_sensitivity`. The noise floor, `edge_sensitivity` times
/// the median image gradient, bounds that threshold from below, and a row
/// whose amplitude does not exceed it is skipped. On a noise-free background
/// the floor is zero. Each side keeps the last accepted edge and drops new
/// ones within `duplicate_threshold` pixels of it.
pub fn collect_edge_samples(image: &Array2<f32>, config: &EllipseFitConfig) -> Vec<Point2D> {
    let (h, w) = image.dim();
    if h == 0 || w == 0 {
        return Vec::new();
    }
    let padded_len = w.next_power_of_two();

    let profiles: Vec<(Vec<f32>, usize)> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h)
            .into_par_iter()
            .map(|y| magnitude_profile(image.row(y), padded_len))
            .collect()
    } else {
        image
            .axis_iter(Axis(0))
            .map(|row| magnitude_profile(row, padded_len))
            .collect()
    };

    let sensitivity = config.edge_sensitivity as f32;
    let noise_floor = gradient_noise(&profiles, w) * sensitivity;

    let mut samples = Vec::new();
    let mut skipped = 0usize;
    let mut last_left: Option<usize> = None;
    let mut last_right: Option<usize> = None;
    for (y, (profile, offset)) in profiles.iter().enumerate() {
        let amplitude = min_max(profile).map_or(0.0, |(lo, hi)| hi - lo);
        if amplitude <= noise_floor {
            skipped += 1;
            continue;
        }
        let threshold = (amplitude / sensitivity).max(noise_floor);
        let Some((left, right)) = find_edges_above(profile, threshold) else {
            continue;
        };
        let to_sample = |index: usize| Point2D::new(index as f64 + 0.5 - *offset as f64, y as f64);

        if last_left.map_or(true, |last| left.abs_diff(last) > config.duplicate_threshold) {
            samples.push(to_sample(left));
            last_left = Some(left);
        }
        if last_right.map_or(true, |last| right.abs_diff(last) > config.duplicate_threshold) {
            samples.push(to_sample(right));
            last_right = Some(right);
        }
    }

    debug!(
        samples = samples.len(),
        rows = h,
        skipped,
        noise_floor,
        "Collected limb samples"
    );
    samples
}

fn validate(config: &EllipseFitConfig) -> Result<()> {
    if !(config.edge_sensitivity > 0.0 && config.edge_sensitivity.is_finite()) {
        return Err(HeliosError::InvalidArgument(format!(
            "edge sensitivity must be positive, got {}",
            config.edge_sensitivity
        )));
    }
    if !(config.limb_shrink > 0.0 && config.limb_shrink.is_finite()) {
        return Err(HeliosError::InvalidArgument(format!(
            "limb shrink must be positive, got {}",
            config.limb_shrink
        )));
    }
    Ok(())
}

/// Fit the solar disk of a mono image.
///
/// The first pass fits every sample. The second pass refits on the samples
/// inside the first ellipse (when enough remain) and shrinks the result by
/// `limb_shrink`.
pub fn fit_ellipse(image: &Array2<f32>, config: &EllipseFitConfig) -> Result<EllipseFit> {
    validate(config)?;
    let samples = collect_edge_samples(image, config);
    let first = fit_ellipse_regression(&samples)?;

    let inside: Vec<Point2D> = samples
        .iter()
        .filter(|p| first.contains(p))
        .copied()
        .collect();
    let refined = if inside.len() >= MIN_ELLIPSE_SAMPLES {
        match fit_ellipse_regression(&inside) {
            Ok(refined) => refined,
            Err(e) => {
                warn!(
                    error = %e,
                    kept = inside.len(),
                    "Second fitting pass failed, keeping first fit"
                );
                first
            }
        }
    } else {
        debug!(kept = inside.len(), "Too few samples inside first fit, keeping it");
        first
    };
    let ellipse = refined.scale(config.limb_shrink);

    info!(
        cx = ellipse.center.x,
        cy = ellipse.center.y,
        a = ellipse.semi_axis_a,
        b = ellipse.semi_axis_b,
        rotation = ellipse.rotation,
        samples = samples.len(),
        kept = inside.len(),
        "Fitted solar disk"
    );

    Ok(EllipseFit { ellipse, samples })
}

/// Fits the disk of an image buffer and records it in the buffer metadata.
#[derive(Clone, Debug, Default)]
pub struct EllipseFitter {
    pub config: EllipseFitConfig,
}

impl EllipseFitter {
    pub fn new(config: EllipseFitConfig) -> Self {
        Self { config }
    }

    /// Color buffers are fitted on their luminance.
    pub fn fit_buffer(&self, buffer: &mut ImageBuffer) -> Result<EllipseFit> {
        let fit = match &*buffer {
            ImageBuffer::Mono(m) => fit_ellipse(&m.data, &self.config)?,
            ImageBuffer::Rgb(_) => fit_ellipse(&buffer.luminance(), &self.config)?,
        };
        buffer.set_ellipse(fit.ellipse);
        Ok(fit)
    }
}
