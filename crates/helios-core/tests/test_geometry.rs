#[allow(dead_code)]
mod common;

use ndarray::Array2;

use common::assert_close;
use helios_core::consts::MAX_PIXEL_VALUE;
use helios_core::ellipse::{Ellipse, Point2D};
use helios_core::geometry::{
    apply_geometry_correction, autocrop, preview_geometry, rotate, vertical_flip,
    AutoCropConfig, GeometryConfig, GeometryCorrection,
};
use helios_core::image::{ImageBuffer, TransformOp};

fn ramp(h: usize, w: usize) -> Array2<f32> {
    Array2::from_shape_fn((h, w), |(y, x)| (x + 2 * y) as f32)
}

#[test]
fn test_rotation_round_trip_preserves_interior() {
    let plane = ramp(64, 64);
    let image = ImageBuffer::mono(plane.clone());
    let there = rotate(&image, 0.3, false, -1.0);
    let back = rotate(&there, -0.3, false, -1.0);

    let out = back.planes()[0];
    for y in 0..64 {
        for x in 0..64 {
            let dx = x as f64 - 32.0;
            let dy = y as f64 - 32.0;
            if dx.hypot(dy) < 20.0 {
                assert_close(out[[y, x]] as f64, plane[[y, x]] as f64, 1e-2);
            }
        }
    }
    assert_eq!(back.metadata().ledger.len(), 2);
}

#[test]
fn test_rotation_moves_stored_ellipse_with_pixels() {
    let disk = Ellipse::new(Point2D::new(70.0, 40.0), 20.0, 12.0, 0.1);
    let mut image = ImageBuffer::mono(common::elliptic_disk_image(100, 120, &disk, 1000.0));
    image.set_ellipse(disk);

    let rotated = rotate(&image, 0.5, true, 0.0);
    let moved = rotated.ellipse().unwrap();
    let mapped = rotated.metadata().ledger.map_to_output(disk.center);
    assert_close(moved.center.x, mapped.x, 1e-9);
    assert_close(moved.center.y, mapped.y, 1e-9);
    assert_close(moved.rotation, 0.6, 1e-9);

    // The rotated pixels agree with the rotated ellipse.
    let plane = rotated.planes()[0];
    let cx = moved.center.x.round() as usize;
    let cy = moved.center.y.round() as usize;
    assert!(plane[[cy, cx]] > 900.0);
}

#[test]
fn test_double_flip_is_exact() {
    let plane = ramp(7, 5);
    let mut image = ImageBuffer::mono(plane.clone());
    image.set_ellipse(Ellipse::circle(Point2D::new(2.0, 1.0), 1.0));
    vertical_flip(&mut image);
    assert_close(image.ellipse().unwrap().center.y, 5.0, 1e-12);
    vertical_flip(&mut image);

    assert_eq!(image.planes()[0], &plane);
    assert_eq!(image.metadata().ledger.len(), 2);
    assert_close(image.ellipse().unwrap().center.y, 1.0, 1e-12);
}

#[test]
fn test_ledger_maps_output_pixels_back() {
    let mut image = ImageBuffer::mono(ramp(40, 60));
    image.set_ellipse(Ellipse::circle(Point2D::new(30.0, 20.0), 10.0));
    vertical_flip(&mut image);
    let rotated = rotate(&image, 0.2, true, 0.0);
    let cropped = autocrop(
        &rotated,
        &AutoCropConfig {
            invert_outside_disk: false,
            ..AutoCropConfig::default()
        },
    )
    .unwrap();

    let ledger = &cropped.metadata().ledger;
    assert_eq!(ledger.len(), 3);
    let source = Point2D::new(30.0, 20.0);
    let out = ledger.map_to_output(source);
    let e = cropped.ellipse().unwrap();
    assert_close(out.x, e.center.x, 1e-9);
    assert_close(out.y, e.center.y, 1e-9);

    let back = ledger.map_to_source(out);
    assert_close(back.x, source.x, 1e-9);
    assert_close(back.y, source.y, 1e-9);
}

#[test]
fn test_autocrop_inverts_outside_disk() {
    let center = Point2D::new(50.0, 50.0);
    let mut image = ImageBuffer::mono(common::disk_image(100, 100, center, 30.0, 20_000.0));
    image.set_ellipse(Ellipse::circle(center, 30.0));

    let cropped = autocrop(&image, &AutoCropConfig::default()).unwrap();
    // 60 * 1.1 = 66 -> 64
    assert_eq!(cropped.dim(), (64, 64));
    let plane = cropped.planes()[0];
    assert_eq!(plane[[32, 32]], 20_000.0);
    assert_eq!(plane[[0, 0]], MAX_PIXEL_VALUE);
    assert_eq!(
        cropped.metadata().ledger.ops(),
        &[TransformOp::Crop { x: 18.0, y: 18.0 }]
    );
}

#[test]
fn test_correction_turns_tilted_disk_into_circle() {
    let disk = Ellipse::new(Point2D::new(160.0, 120.0), 90.0, 70.0, 0.25);
    let mut image = ImageBuffer::mono(common::elliptic_disk_image(240, 320, &disk, 10_000.0));
    image.set_ellipse(disk);

    let correction = GeometryCorrection::from_ellipse(&disk, 240, false, None, None).unwrap();
    let corrected = apply_geometry_correction(&image, &correction, 0.0).unwrap();
    let (h, w) = correction.output_dim(240, 320);
    assert_eq!(corrected.dim(), (h, w));

    let circle = corrected.ellipse().unwrap();
    assert_close(circle.semi_axis_a, circle.semi_axis_b, 1e-6);

    // Points of the input outline land on the stored output ellipse.
    let ledger = &corrected.metadata().ledger;
    for i in 0..16 {
        let p = ledger.map_to_output(disk.point_at(i as f64 * 0.4));
        assert!(circle.scale(1.001).contains(&p));
        assert!(!circle.scale(0.999).contains(&p));
    }

    // And the pixels follow: the center is bright, far outside is dark.
    let plane = corrected.planes()[0];
    let cx = circle.center.x.round() as usize;
    let cy = circle.center.y.round() as usize;
    assert!(plane[[cy, cx]] > 9_000.0);
    let outside_x = (circle.center.x + circle.semi_axis_a * 1.2).round() as usize;
    assert!(plane[[cy, outside_x.min(w - 1)]] < 1_000.0);
}

#[test]
fn test_preview_produces_square_crop() {
    let disk = Ellipse::new(Point2D::new(100.0, 80.0), 60.0, 45.0, -0.1);
    let image = ImageBuffer::mono(common::elliptic_disk_image(160, 200, &disk, 10_000.0));

    let preview = preview_geometry(
        &image,
        &disk,
        &GeometryConfig::default(),
        &AutoCropConfig::default(),
    )
    .unwrap();
    let (h, w) = preview.dim();
    assert_eq!(h, w);
    assert_eq!(h % 16, 0);
    let ops = preview.metadata().ledger.ops();
    assert!(matches!(ops[0], TransformOp::GeometryCorrection { .. }));
    assert!(matches!(ops[1], TransformOp::Crop { .. }));
}
