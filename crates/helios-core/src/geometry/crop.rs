use ndarray::Array2;
use tracing::{debug, info};

use super::config::{AutoCropConfig, GeometryConfig};
use super::correction::{apply_geometry_correction, GeometryCorrection};
use super::rotate::build_plane;
use crate::consts::{BLACK_POINT_PERCENTILE, MAX_PIXEL_VALUE};
use crate::ellipse::Ellipse;
use crate::error::{HeliosError, Result};
use crate::image::ImageBuffer;
use crate::stats::compute_array_histogram;

/// Fill value used when no black point is configured: the 1st percentile of
/// the luminance histogram.
pub fn default_black_point(image: &ImageBuffer) -> f32 {
    compute_array_histogram(&image.luminance()).percentile(BLACK_POINT_PERCENTILE)
}

/// Side of the square crop for a disk with the given bounding box size.
fn crop_side(bbox_w: f64, bbox_h: f64, config: &AutoCropConfig) -> usize {
    let rounding = config.rounding.max(1);
    let raw = bbox_w.max(bbox_h) * config.margin_factor;
    let side = (raw / rounding as f64).round() as usize * rounding;
    side.max(rounding)
}

/// Crop a square around the stored solar disk.
///
/// The square is centered on the disk and may extend past the image, in
/// which case the missing pixels take the black point.
pub fn autocrop(image: &ImageBuffer, config: &AutoCropConfig) -> Result<ImageBuffer> {
    let ellipse = image.ellipse().copied().ok_or_else(|| {
        HeliosError::InvalidArgument("autocrop requires a fitted ellipse".into())
    })?;

    let bbox = ellipse.bounding_box();
    let side = crop_side(bbox.width(), bbox.height(), config);
    let left = ellipse.center.x.floor() as i64 - (side / 2) as i64;
    let top = ellipse.center.y.floor() as i64 - (side / 2) as i64;
    let black_point = config
        .black_point
        .unwrap_or_else(|| default_black_point(image));

    let cropped_ellipse = ellipse.translate(-left as f64, -top as f64);
    let invert = config.invert_outside_disk;

    let mut cropped = image.map_planes(|plane| {
        let mut out = crop_plane(plane, left, top, side, black_point);
        if invert {
            invert_outside(&mut out, &cropped_ellipse);
        }
        out
    });

    let metadata = cropped.metadata_mut();
    metadata.ellipse = Some(cropped_ellipse);
    metadata.ledger.push_crop(left as f64, top as f64);

    info!(side, left, top, black_point, "Cropped around solar disk");
    Ok(cropped)
}

fn crop_plane(plane: &Array2<f32>, left: i64, top: i64, side: usize, black_point: f32) -> Array2<f32> {
    let (h, w) = plane.dim();
    build_plane(side, side, |y| {
        let sy = top + y as i64;
        (0..side)
            .map(|x| {
                let sx = left + x as i64;
                if sx >= 0 && sy >= 0 && (sx as usize) < w && (sy as usize) < h {
                    plane[[sy as usize, sx as usize]]
                } else {
                    black_point
                }
            })
            .collect()
    })
}

fn invert_outside(plane: &mut Array2<f32>, ellipse: &Ellipse) {
    for ((y, x), v) in plane.indexed_iter_mut() {
        if !ellipse.is_within(x as f64, y as f64) {
            *v = MAX_PIXEL_VALUE - *v;
        }
    }
}

/// Preview of the full geometry flow for a candidate ellipse: correct the
/// image, then crop around the corrected disk with the outside inverted.
pub fn preview_geometry(
    image: &ImageBuffer,
    ellipse: &Ellipse,
    config: &GeometryConfig,
    crop: &AutoCropConfig,
) -> Result<ImageBuffer> {
    let correction = GeometryCorrection::from_ellipse(
        ellipse,
        image.height(),
        config.disallow_downsampling,
        config.forced_tilt,
        config.forced_xy_ratio,
    )?;
    debug!(?correction, "Previewing geometry correction");

    let mut source = image.clone();
    source.set_ellipse(*ellipse);
    let black_point = config
        .black_point
        .unwrap_or_else(|| default_black_point(&source));
    let corrected = apply_geometry_correction(&source, &correction, black_point)?;

    let crop = AutoCropConfig {
        invert_outside_disk: true,
        black_point: crop.black_point.or(Some(black_point)),
        ..crop.clone()
    };
    autocrop(&corrected, &crop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ellipse::Point2D;
    use crate::image::TransformOp;

    #[test]
    fn test_side_rounds_to_nearest_multiple() {
        let config = AutoCropConfig::default();
        // 100 * 1.1 = 110 -> 112
        assert_eq!(crop_side(100.0, 80.0, &config), 112);
        assert_eq!(crop_side(1.0, 1.0, &config), 16);
    }

    #[test]
    fn test_autocrop_requires_ellipse() {
        let img = ImageBuffer::mono(Array2::zeros((8, 8)));
        assert!(matches!(
            autocrop(&img, &AutoCropConfig::default()),
            Err(HeliosError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_autocrop_pads_with_black_point() {
        let mut img = ImageBuffer::mono(Array2::from_elem((20, 20), 100.0));
        img.set_ellipse(Ellipse::circle(Point2D::new(2.0, 10.0), 7.0));
        let config = AutoCropConfig {
            invert_outside_disk: false,
            black_point: Some(5.0),
            ..AutoCropConfig::default()
        };
        let out = autocrop(&img, &config).unwrap();
        assert_eq!(out.dim(), (16, 16));
        // left = 2 - 8 = -6: the first six columns lie outside the source.
        let plane = out.planes()[0];
        assert_eq!(plane[[8, 0]], 5.0);
        assert_eq!(plane[[8, 6]], 100.0);
        assert_eq!(
            out.metadata().ledger.ops(),
            &[TransformOp::Crop { x: -6.0, y: 2.0 }]
        );
        let e = out.ellipse().unwrap();
        assert_eq!(e.center, Point2D::new(8.0, 8.0));
    }
}
