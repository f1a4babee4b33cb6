use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::ellipse::Point2D;
use crate::image::{ImageBuffer, TransformOp};

/// Rotate an image by `angle` radians about its center `(w / 2, h / 2)`.
///
/// With `resize` the canvas grows to hold the whole rotated image, otherwise
/// the corners are clipped. Pixels with no source are set to `black_point`.
/// Resampling is bilinear, so a rotation followed by its inverse matches
/// the original away from the clipped borders.
pub fn rotate(image: &ImageBuffer, angle: f64, resize: bool, black_point: f32) -> ImageBuffer {
    let (h, w) = image.dim();
    let (out_w, out_h) = if resize {
        let (sin, cos) = angle.sin_cos();
        let wf = w as f64;
        let hf = h as f64;
        (
            ((wf * cos).abs() + (hf * sin).abs()).round() as usize,
            ((hf * cos).abs() + (wf * sin).abs()).round() as usize,
        )
    } else {
        (w, h)
    };

    let mut rotated = image.map_planes(|plane| {
        resample(plane, angle, 1.0, 1.0, out_w, out_h, black_point)
    });

    let pivot = Point2D::new((w / 2) as f64, (h / 2) as f64);
    let output_center = Point2D::new((out_w / 2) as f64, (out_h / 2) as f64);
    let op = TransformOp::Rotation {
        angle,
        pivot,
        output_center,
    };

    let metadata = rotated.metadata_mut();
    if let Some(ellipse) = metadata.ellipse {
        metadata.ellipse = Some(
            ellipse
                .rotate_about(angle, pivot)
                .translate(output_center.x - pivot.x, output_center.y - pivot.y),
        );
    }
    metadata.ledger.push(op);

    debug!(angle, resize, out_w, out_h, "Rotated image");
    rotated
}

/// Inverse-map every output pixel into `plane` and sample it bilinearly.
///
/// Output pixel `(x, y)` reads the source at
/// `c + R(-angle) ((x - nc) / scale)`, where `c` and `nc` are the integer
/// centers of the source and output grids.
pub(crate) fn resample(
    plane: &Array2<f32>,
    angle: f64,
    scale_x: f64,
    scale_y: f64,
    out_w: usize,
    out_h: usize,
    black_point: f32,
) -> Array2<f32> {
    let (h, w) = plane.dim();
    let (sin, cos) = angle.sin_cos();
    let cx = (w / 2) as f64;
    let cy = (h / 2) as f64;
    let ncx = (out_w / 2) as f64;
    let ncy = (out_h / 2) as f64;

    let row = |y: usize| -> Vec<f32> {
        let ry = (y as f64 - ncy) / scale_y;
        (0..out_w)
            .map(|x| {
                let rx = (x as f64 - ncx) / scale_x;
                let sx = rx * cos + ry * sin + cx;
                let sy = -rx * sin + ry * cos + cy;
                bilinear(plane, sx, sy).unwrap_or(black_point)
            })
            .collect()
    };

    build_plane(out_h, out_w, row)
}

/// Assemble a plane row by row, in parallel for large outputs.
pub(crate) fn build_plane<F>(h: usize, w: usize, row: F) -> Array2<f32>
where
    F: Fn(usize) -> Vec<f32> + Sync,
{
    let rows: Vec<Vec<f32>> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(&row).collect()
    } else {
        (0..h).map(&row).collect()
    };
    Array2::from_shape_fn((h, w), |(y, x)| rows[y][x])
}

/// Bilinear sample at `(x, y)`, `None` outside `[0, w-1] x [0, h-1]`.
pub(crate) fn bilinear(plane: &Array2<f32>, x: f64, y: f64) -> Option<f32> {
    let (h, w) = plane.dim();
    if w == 0 || h == 0 {
        return None;
    }
    if !(x >= 0.0 && y >= 0.0 && x <= (w - 1) as f64 && y <= (h - 1) as f64) {
        return None;
    }

    let x1 = (x.floor() as usize).min(w.saturating_sub(2));
    let y1 = (y.floor() as usize).min(h.saturating_sub(2));
    let x2 = (x1 + 1).min(w - 1);
    let y2 = (y1 + 1).min(h - 1);
    let fx = x - x1 as f64;
    let fy = y - y1 as f64;

    let v11 = plane[[y1, x1]] as f64;
    let v21 = plane[[y1, x2]] as f64;
    let v12 = plane[[y2, x1]] as f64;
    let v22 = plane[[y2, x2]] as f64;
    let value = (1.0 - fx) * (1.0 - fy) * v11
        + fx * (1.0 - fy) * v21
        + (1.0 - fx) * fy * v12
        + fx * fy * v22;
    Some(value as f32)
}
