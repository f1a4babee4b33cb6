use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use serde::{Deserialize, Serialize};

use crate::consts::EPSILON;

/// A point in image coordinates (x to the right, y down).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// General conic `a x² + b xy + c y² + d x + e y + f = 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Conic(pub [f64; 6]);

impl Conic {
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        let [a, b, c, d, e, f] = self.0;
        a * x * x + b * x * y + c * y * y + d * x + e * y + f
    }

    /// `b² - 4ac`, negative for an ellipse.
    pub fn discriminant(&self) -> f64 {
        let [a, b, c, ..] = self.0;
        b * b - 4.0 * a * c
    }

    pub fn is_ellipse(&self) -> bool {
        self.discriminant() < 0.0
    }

    /// Whether `(x, y)` lies inside or on the curve, independently of the
    /// overall sign of the coefficients.
    pub fn is_within(&self, x: f64, y: f64) -> bool {
        let a = self.0[0];
        let value = self.evaluate(x, y);
        (a >= 0.0 && value <= 0.0) || (a <= 0.0 && value >= 0.0)
    }

    /// The same curve moved by `(u, v)`.
    pub fn translate(&self, u: f64, v: f64) -> Conic {
        let [a, b, c, d, e, f] = self.0;
        Conic([
            a,
            b,
            c,
            d - 2.0 * a * u - b * v,
            e - 2.0 * c * v - b * u,
            a * u * u + b * u * v + c * v * v - d * u - e * v + f,
        ])
    }

    /// Image of the curve under the horizontal shear `x' = x + k y`.
    pub fn shear_x(&self, k: f64) -> Conic {
        let [a, b, c, d, e, f] = self.0;
        Conic([
            a,
            b - 2.0 * a * k,
            c + a * k * k - b * k,
            d,
            e - d * k,
            f,
        ])
    }

    /// Image of the curve under `x' = sx x`, `y' = sy y` (about the origin).
    /// The result is scaled by `sx² sy²` to stay polynomial.
    pub fn rescale_xy(&self, sx: f64, sy: f64) -> Conic {
        let [a, b, c, d, e, f] = self.0;
        let (sx2, sy2) = (sx * sx, sy * sy);
        Conic([
            a * sy2,
            b * sx * sy,
            c * sx2,
            d * sy2 * sx,
            e * sx2 * sy,
            f * sx2 * sy2,
        ])
    }

    /// Mirror about the horizontal line `y = height / 2`, i.e. `y' = height - y`.
    pub fn vflip(&self, height: f64) -> Conic {
        let [a, b, c, d, e, f] = self.0;
        Conic([
            a,
            -b,
            c,
            b * height + d,
            -2.0 * c * height - e,
            c * height * height + e * height + f,
        ])
    }

    /// Geometric parameters of the conic, or `None` if it is not a real,
    /// non-degenerate ellipse.
    pub fn to_ellipse(&self) -> Option<Ellipse> {
        let [a, b, c, d, e, f] = self.0;
        if !self.0.iter().all(|v| v.is_finite()) || !self.is_ellipse() {
            return None;
        }

        let denom = 4.0 * a * c - b * b;
        let cx = (b * e - 2.0 * c * d) / denom;
        let cy = (b * d - 2.0 * a * e) / denom;

        let angle = 0.5 * b.atan2(a - c);
        let sum = a + c;
        let diff = ((a - c).powi(2) + b * b).sqrt();
        // lambda_along belongs to the axis pointing at `angle`.
        let lambda_along = (sum + diff) / 2.0;
        let lambda_across = (sum - diff) / 2.0;

        let f_center = a * cx * cx + b * cx * cy + c * cy * cy + d * cx + e * cy + f;
        if f_center.abs() < EPSILON * (a.abs() + c.abs()).max(EPSILON) {
            return None;
        }

        let a_sq = -f_center / lambda_along;
        let b_sq = -f_center / lambda_across;
        if !(a_sq > 0.0 && b_sq > 0.0) {
            return None;
        }

        Some(Ellipse::new(
            Point2D::new(cx, cy),
            a_sq.sqrt(),
            b_sq.sqrt(),
            angle,
        ))
    }
}

/// Axis-aligned bounds of an ellipse.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// A fitted solar disk outline.
///
/// `semi_axis_a` runs along `rotation`, `semi_axis_b` across it. The rotation
/// is kept in `(-π/4, π/4]` so `semi_axis_a` is always the near-horizontal
/// axis; a circle therefore has rotation 0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub center: Point2D,
    pub semi_axis_a: f64,
    pub semi_axis_b: f64,
    pub rotation: f64,
}

impl Ellipse {
    pub fn new(center: Point2D, semi_axis_a: f64, semi_axis_b: f64, rotation: f64) -> Self {
        let (semi_axis_a, semi_axis_b, rotation) =
            normalize_axes(semi_axis_a, semi_axis_b, rotation);
        Self {
            center,
            semi_axis_a,
            semi_axis_b,
            rotation,
        }
    }

    pub fn circle(center: Point2D, radius: f64) -> Self {
        Self::new(center, radius, radius, 0.0)
    }

    pub fn to_conic(&self) -> Conic {
        let (sin, cos) = self.rotation.sin_cos();
        let a2 = self.semi_axis_a * self.semi_axis_a;
        let b2 = self.semi_axis_b * self.semi_axis_b;
        let (cx, cy) = (self.center.x, self.center.y);

        let a = cos * cos / a2 + sin * sin / b2;
        let b = 2.0 * cos * sin * (1.0 / a2 - 1.0 / b2);
        let c = sin * sin / a2 + cos * cos / b2;
        Conic([
            a,
            b,
            c,
            -2.0 * a * cx - b * cy,
            -b * cx - 2.0 * c * cy,
            a * cx * cx + b * cx * cy + c * cy * cy - 1.0,
        ])
    }

    pub fn from_conic(conic: &Conic) -> Option<Self> {
        conic.to_ellipse()
    }

    /// Whether `(x, y)` lies inside or on the ellipse.
    pub fn is_within(&self, x: f64, y: f64) -> bool {
        let (sin, cos) = self.rotation.sin_cos();
        let dx = x - self.center.x;
        let dy = y - self.center.y;
        let u = (dx * cos + dy * sin) / self.semi_axis_a;
        let v = (-dx * sin + dy * cos) / self.semi_axis_b;
        u * u + v * v <= 1.0
    }

    pub fn contains(&self, p: &Point2D) -> bool {
        self.is_within(p.x, p.y)
    }

    /// Both semi-axes multiplied by `factor`, keeping center and rotation.
    pub fn scale(&self, factor: f64) -> Ellipse {
        Ellipse {
            semi_axis_a: self.semi_axis_a * factor,
            semi_axis_b: self.semi_axis_b * factor,
            ..*self
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Ellipse {
        Ellipse {
            center: Point2D::new(self.center.x + dx, self.center.y + dy),
            ..*self
        }
    }

    /// Rotate the ellipse by `angle` radians about `pivot`, in image
    /// coordinates (a positive angle turns +x towards +y).
    pub fn rotate_about(&self, angle: f64, pivot: Point2D) -> Ellipse {
        let (sin, cos) = angle.sin_cos();
        let dx = self.center.x - pivot.x;
        let dy = self.center.y - pivot.y;
        Ellipse::new(
            Point2D::new(pivot.x + dx * cos - dy * sin, pivot.y + dx * sin + dy * cos),
            self.semi_axis_a,
            self.semi_axis_b,
            self.rotation + angle,
        )
    }

    /// Mirror about the line `y = axis / 2`, i.e. `y' = axis - y`.
    pub fn vflip(&self, axis: f64) -> Ellipse {
        Ellipse::new(
            Point2D::new(self.center.x, axis - self.center.y),
            self.semi_axis_a,
            self.semi_axis_b,
            -self.rotation,
        )
    }

    pub fn bounding_box(&self) -> Bounds {
        let (sin, cos) = self.rotation.sin_cos();
        let a2 = self.semi_axis_a * self.semi_axis_a;
        let b2 = self.semi_axis_b * self.semi_axis_b;
        let half_w = (a2 * cos * cos + b2 * sin * sin).sqrt();
        let half_h = (a2 * sin * sin + b2 * cos * cos).sqrt();
        Bounds {
            min_x: self.center.x - half_w,
            max_x: self.center.x + half_w,
            min_y: self.center.y - half_h,
            max_y: self.center.y + half_h,
        }
    }

    /// Point of the outline at parametric angle `t`.
    pub fn point_at(&self, t: f64) -> Point2D {
        let (sin_t, cos_t) = t.sin_cos();
        let (sin_r, cos_r) = self.rotation.sin_cos();
        let a = self.semi_axis_a;
        let b = self.semi_axis_b;
        Point2D::new(
            self.center.x + a * cos_t * cos_r - b * sin_t * sin_r,
            self.center.y + a * cos_t * sin_r + b * sin_t * cos_r,
        )
    }

    pub fn eccentricity(&self) -> f64 {
        let major = self.semi_axis_a.max(self.semi_axis_b);
        let minor = self.semi_axis_a.min(self.semi_axis_b);
        (1.0 - (minor * minor) / (major * major)).sqrt()
    }

    /// Ratio of the across-rotation axis to the along-rotation axis.
    pub fn xy_ratio(&self) -> f64 {
        self.semi_axis_b / self.semi_axis_a
    }

    /// The two x coordinates where the outline crosses row `y`.
    pub fn find_x(&self, y: f64) -> Option<(f64, f64)> {
        let [a, b, c, d, e, f] = self.to_conic().0;
        let qb = b * y + d;
        let qc = c * y * y + e * y + f;
        let disc = qb * qb - 4.0 * a * qc;
        if disc < 0.0 || a == 0.0 {
            return None;
        }
        let sqrt = disc.sqrt();
        Some(((-qb - sqrt) / (2.0 * a), (-qb + sqrt) / (2.0 * a)))
    }
}

/// Bring `rotation` into `(-π/4, π/4]`, swapping the axes on quarter turns.
fn normalize_axes(a: f64, b: f64, rotation: f64) -> (f64, f64, f64) {
    let mut rotation = rotation.rem_euclid(PI);
    if rotation > FRAC_PI_2 {
        rotation -= PI;
    }
    // rotation is now in (-π/2, π/2].
    if rotation > FRAC_PI_4 {
        (b, a, rotation - FRAC_PI_2)
    } else if rotation <= -FRAC_PI_4 {
        (b, a, rotation + FRAC_PI_2)
    } else {
        (a, b, rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rotation_is_normalized() {
        let e = Ellipse::new(Point2D::new(0.0, 0.0), 120.0, 100.0, FRAC_PI_2);
        assert_abs_diff_eq!(e.rotation, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(e.semi_axis_a, 100.0);
        assert_abs_diff_eq!(e.semi_axis_b, 120.0);

        let e = Ellipse::new(Point2D::new(0.0, 0.0), 120.0, 100.0, 0.3 + PI);
        assert_abs_diff_eq!(e.rotation, 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(e.semi_axis_a, 120.0);
    }

    #[test]
    fn test_conic_round_trip() {
        let e = Ellipse::new(Point2D::new(300.0, 250.0), 120.0, 100.0, 0.3);
        let back = e.to_conic().to_ellipse().unwrap();
        assert_abs_diff_eq!(back.center.x, 300.0, epsilon = 1e-6);
        assert_abs_diff_eq!(back.center.y, 250.0, epsilon = 1e-6);
        assert_abs_diff_eq!(back.semi_axis_a, 120.0, epsilon = 1e-6);
        assert_abs_diff_eq!(back.semi_axis_b, 100.0, epsilon = 1e-6);
        assert_abs_diff_eq!(back.rotation, 0.3, epsilon = 1e-9);
    }

    #[test]
    fn test_hyperbola_is_not_an_ellipse() {
        let hyperbola = Conic([1.0, 0.0, -1.0, 0.0, 0.0, -1.0]);
        assert!(hyperbola.to_ellipse().is_none());
    }

    #[test]
    fn test_conic_translate_moves_center() {
        let e = Ellipse::new(Point2D::new(10.0, 20.0), 5.0, 3.0, 0.2);
        let moved = e.to_conic().translate(7.0, -4.0).to_ellipse().unwrap();
        assert_abs_diff_eq!(moved.center.x, 17.0, epsilon = 1e-9);
        assert_abs_diff_eq!(moved.center.y, 16.0, epsilon = 1e-9);
    }

    #[test]
    fn test_conic_vflip_matches_geometric_flip() {
        let e = Ellipse::new(Point2D::new(40.0, 30.0), 20.0, 12.0, 0.25);
        let by_conic = e.to_conic().vflip(100.0).to_ellipse().unwrap();
        let by_geometry = e.vflip(100.0);
        assert_abs_diff_eq!(by_conic.center.y, by_geometry.center.y, epsilon = 1e-9);
        assert_abs_diff_eq!(by_conic.rotation, by_geometry.rotation, epsilon = 1e-9);
        assert_abs_diff_eq!(by_conic.semi_axis_a, by_geometry.semi_axis_a, epsilon = 1e-9);
    }

    #[test]
    fn test_is_within_agrees_with_conic() {
        let e = Ellipse::new(Point2D::new(0.0, 0.0), 10.0, 5.0, 0.4);
        let conic = e.to_conic();
        for &(x, y) in &[(0.0, 0.0), (9.0, 3.0), (0.0, 6.0), (-3.0, -2.0), (12.0, 0.0)] {
            assert_eq!(e.is_within(x, y), conic.is_within(x, y), "({x}, {y})");
        }
    }

    #[test]
    fn test_bounding_box_of_rotated_ellipse() {
        let e = Ellipse::new(Point2D::new(0.0, 0.0), 10.0, 5.0, FRAC_PI_2);
        let bb = e.bounding_box();
        assert_abs_diff_eq!(bb.width(), 20.0 * 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(bb.height(), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_find_x_on_circle() {
        let e = Ellipse::circle(Point2D::new(50.0, 50.0), 10.0);
        let (left, right) = e.find_x(50.0).unwrap();
        assert_abs_diff_eq!(left, 40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(right, 60.0, epsilon = 1e-9);
        assert!(e.find_x(61.0).is_none());
    }
}
