//! Shear and anisotropic rescale turning a fitted ellipse into a circle.
//!
//! A spectroheliograph scan distorts the disk in two ways: a tilt of the
//! slit shears the rows horizontally, and a scan speed mismatch stretches
//! one axis. The correction undoes both with a horizontal shear
//! `x' = x - shift + y * shear` followed by an axis-aligned rescale.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::rotate::{build_plane, resample};
use crate::consts::EPSILON;
use crate::ellipse::{Ellipse, Point2D};
use crate::error::{HeliosError, Result};
use crate::image::{ImageBuffer, TransformOp};

/// Parameters of a geometry correction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryCorrection {
    pub shear: f64,
    /// Horizontal offset keeping sheared pixels at non-negative x.
    pub shift: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Horizontal displacement of the last row, `height * shear`.
    pub max_dx: f64,
}

impl GeometryCorrection {
    /// Derive the correction mapping `ellipse` to a circle in an image of
    /// `image_height` rows.
    ///
    /// `forced_tilt` replaces the ellipse rotation and `forced_xy_ratio` the
    /// vertical scale derived from the axes. The pair `(sx, sy)` normally
    /// rescales x only; when `disallow_downsampling` is set and that would
    /// shrink x, y is stretched instead.
    pub fn from_ellipse(
        ellipse: &Ellipse,
        image_height: usize,
        disallow_downsampling: bool,
        forced_tilt: Option<f64>,
        forced_xy_ratio: Option<f64>,
    ) -> Result<Self> {
        let theta = forced_tilt.unwrap_or(ellipse.rotation);
        let a = ellipse.semi_axis_a;
        let b = ellipse.semi_axis_b;
        let m = (-theta).tan();
        let (sin, cos) = theta.sin_cos();
        let (a2, b2) = (a * a, b * b);

        let denom = b2 * cos - a2 * m * sin;
        if denom.abs() < EPSILON || !denom.is_finite() {
            return Err(HeliosError::InvalidArgument(format!(
                "cannot derive a geometry correction for tilt {theta}"
            )));
        }
        let shear = (m * cos * a2 + sin * b2) / denom;

        let max_dx = image_height as f64 * shear;
        let shift = max_dx.min(0.0);

        let mut sy = (a * b * ((a2 * m * m + b2) / (a2 * sin * sin + b2 * cos * cos)).sqrt()
            / denom)
            .abs();
        if let Some(ratio) = forced_xy_ratio {
            sy = ratio;
        }
        if sy <= 0.0 || !sy.is_finite() {
            return Err(HeliosError::InvalidArgument(format!(
                "invalid x/y ratio {sy}"
            )));
        }

        let (scale_x, scale_y) = if sy < 1.0 || !disallow_downsampling {
            (1.0 / sy, 1.0)
        } else {
            (1.0, sy)
        };

        Ok(Self {
            shear,
            shift,
            scale_x,
            scale_y,
            max_dx,
        })
    }

    /// Width of the sheared intermediate image.
    pub fn extended_width(&self, width: usize) -> usize {
        width + self.max_dx.abs().ceil() as usize
    }

    /// Output dimensions `(height, width)` for an input of the given size.
    pub fn output_dim(&self, height: usize, width: usize) -> (usize, usize) {
        let ext = self.extended_width(width);
        (
            (height as f64 * self.scale_y) as usize,
            (ext as f64 * self.scale_x) as usize,
        )
    }

    /// The ellipse after the shear and a rescale about the origin.
    ///
    /// This is the closed-form preview of the correction. The rescale of
    /// an actual image is about its center, see
    /// [`apply_geometry_correction`].
    pub fn corrected_ellipse(&self, ellipse: &Ellipse) -> Result<Ellipse> {
        ellipse
            .to_conic()
            .translate(-self.shift, 0.0)
            .shear_x(self.shear)
            .rescale_xy(self.scale_x, self.scale_y)
            .to_ellipse()
            .ok_or_else(|| {
                HeliosError::InvalidArgument("corrected conic is not an ellipse".into())
            })
    }

    fn centers(&self, height: usize, width: usize) -> (Point2D, Point2D) {
        let ext = self.extended_width(width);
        let (out_h, out_w) = self.output_dim(height, width);
        (
            Point2D::new((ext / 2) as f64, (height / 2) as f64),
            Point2D::new((out_w / 2) as f64, (out_h / 2) as f64),
        )
    }
}

/// Apply `correction` to every plane of `image`.
///
/// Rows are sheared by splitting each pixel between its two destination
/// columns; the gaps left and right of a row take the value of its first
/// and last pixel. The sheared image is then rescaled bilinearly about its
/// center, with `black_point` where there is no source.
///
/// Fails when the stored ellipse does not map to an ellipse under the
/// correction.
pub fn apply_geometry_correction(
    image: &ImageBuffer,
    correction: &GeometryCorrection,
    black_point: f32,
) -> Result<ImageBuffer> {
    let (h, w) = image.dim();
    let (out_h, out_w) = correction.output_dim(h, w);
    let (source_center, output_center) = correction.centers(h, w);
    // Rescale about the origin, then move the scaled source center onto the
    // output center.
    let ellipse = image
        .ellipse()
        .map(|e| correction.corrected_ellipse(e))
        .transpose()?
        .map(|e| {
            e.translate(
                output_center.x - source_center.x * correction.scale_x,
                output_center.y - source_center.y * correction.scale_y,
            )
        });

    let mut corrected = image.map_planes(|plane| {
        let sheared = shear_plane(plane, correction);
        resample(
            &sheared,
            0.0,
            correction.scale_x,
            correction.scale_y,
            out_w,
            out_h,
            black_point,
        )
    });

    let metadata = corrected.metadata_mut();
    metadata.ellipse = ellipse;
    metadata.ledger.push(TransformOp::GeometryCorrection {
        shear: correction.shear,
        shift: correction.shift,
        scale_x: correction.scale_x,
        scale_y: correction.scale_y,
        source_center,
        output_center,
    });

    info!(
        shear = correction.shear,
        scale_x = correction.scale_x,
        scale_y = correction.scale_y,
        out_w,
        out_h,
        "Applied geometry correction"
    );
    Ok(corrected)
}

fn shear_plane(plane: &Array2<f32>, correction: &GeometryCorrection) -> Array2<f32> {
    let (h, w) = plane.dim();
    let ext = correction.extended_width(w);

    build_plane(h, ext, |y| {
        let mut out = vec![0.0_f32; ext];
        if w == 0 {
            return out;
        }
        let dx = y as f64 * correction.shear;
        for x in 0..w {
            let v = plane[[y, x]];
            let nx = x as f64 - correction.shift + dx;
            let x1 = nx.floor();
            let factor = (nx - x1) as f32;
            if x1 >= 0.0 && (x1 as usize) + 1 < ext {
                let x1 = x1 as usize;
                out[x1] += (1.0 - factor) * v;
                out[x1 + 1] += factor * v;
            }
            if x == 0 {
                let end = (nx.ceil().max(0.0) as usize).min(ext);
                out[..end].fill(v);
            }
            if x == w - 1 {
                let start = (nx.floor().max(0.0) as usize).min(ext);
                out[start..].fill(v);
            }
        }
        out
    })
}
