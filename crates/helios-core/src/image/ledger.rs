//! Coordinate transform ledger.
//!
//! Every geometric operation applied to an [`ImageBuffer`](super::ImageBuffer)
//! appends one entry. The ledger is a structural log: entries are never
//! merged or simplified, so replaying it forward or backward is exact up to
//! floating point.

use serde::{Deserialize, Serialize};

use crate::ellipse::Point2D;

/// One recorded geometric operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TransformOp {
    /// `out = output_center + R(angle) (p - pivot)`.
    Rotation {
        angle: f64,
        pivot: Point2D,
        output_center: Point2D,
    },
    /// Rows reversed: `y' = height - 1 - y`.
    VerticalFlip { height: usize },
    /// The output origin is at `(x, y)` of the input.
    Crop { x: f64, y: f64 },
    /// Horizontal shear `x' = x - shift + y * shear`, then an axis-aligned
    /// rescale about `source_center` onto `output_center`.
    GeometryCorrection {
        shear: f64,
        shift: f64,
        scale_x: f64,
        scale_y: f64,
        source_center: Point2D,
        output_center: Point2D,
    },
}

impl TransformOp {
    /// Position of input point `p` after this operation.
    pub fn forward(&self, p: Point2D) -> Point2D {
        match *self {
            Self::Rotation {
                angle,
                pivot,
                output_center,
            } => {
                let (sin, cos) = angle.sin_cos();
                let dx = p.x - pivot.x;
                let dy = p.y - pivot.y;
                Point2D::new(
                    output_center.x + dx * cos - dy * sin,
                    output_center.y + dx * sin + dy * cos,
                )
            }
            Self::VerticalFlip { height } => Point2D::new(p.x, (height as f64 - 1.0) - p.y),
            Self::Crop { x, y } => Point2D::new(p.x - x, p.y - y),
            Self::GeometryCorrection {
                shear,
                shift,
                scale_x,
                scale_y,
                source_center,
                output_center,
            } => {
                let sheared_x = p.x - shift + p.y * shear;
                Point2D::new(
                    (sheared_x - source_center.x) * scale_x + output_center.x,
                    (p.y - source_center.y) * scale_y + output_center.y,
                )
            }
        }
    }

    /// Position in the input of output point `p`.
    pub fn inverse(&self, p: Point2D) -> Point2D {
        match *self {
            Self::Rotation {
                angle,
                pivot,
                output_center,
            } => {
                let (sin, cos) = angle.sin_cos();
                let dx = p.x - output_center.x;
                let dy = p.y - output_center.y;
                Point2D::new(
                    pivot.x + dx * cos + dy * sin,
                    pivot.y - dx * sin + dy * cos,
                )
            }
            Self::VerticalFlip { .. } => self.forward(p),
            Self::Crop { x, y } => Point2D::new(p.x + x, p.y + y),
            Self::GeometryCorrection {
                shear,
                shift,
                scale_x,
                scale_y,
                source_center,
                output_center,
            } => {
                let y = (p.y - output_center.y) / scale_y + source_center.y;
                let sheared_x = (p.x - output_center.x) / scale_x + source_center.x;
                Point2D::new(sheared_x + shift - y * shear, y)
            }
        }
    }
}

/// Append-only list of the operations applied to an image.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformLedger {
    ops: Vec<TransformOp>,
}

impl TransformLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: TransformOp) {
        self.ops.push(op);
    }

    pub fn push_crop(&mut self, x: f64, y: f64) {
        self.push(TransformOp::Crop { x, y });
    }

    pub fn ops(&self) -> &[TransformOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Replay the ledger in application order.
    pub fn map_to_output(&self, p: Point2D) -> Point2D {
        self.ops.iter().fold(p, |acc, op| op.forward(acc))
    }

    /// Undo the ledger in reverse order, mapping an output pixel back to the
    /// coordinates of the original reconstruction.
    pub fn map_to_source(&self, p: Point2D) -> Point2D {
        self.ops.iter().rev().fold(p, |acc, op| op.inverse(acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_ledger() -> TransformLedger {
        let mut ledger = TransformLedger::new();
        ledger.push(TransformOp::Rotation {
            angle: 0.3,
            pivot: Point2D::new(50.0, 40.0),
            output_center: Point2D::new(60.0, 55.0),
        });
        ledger.push(TransformOp::VerticalFlip { height: 110 });
        ledger.push(TransformOp::GeometryCorrection {
            shear: 0.05,
            shift: -3.0,
            scale_x: 1.2,
            scale_y: 1.0,
            source_center: Point2D::new(62.0, 55.0),
            output_center: Point2D::new(74.0, 55.0),
        });
        ledger.push_crop(10.0, 7.0);
        ledger
    }

    #[test]
    fn test_round_trip() {
        let ledger = sample_ledger();
        assert_eq!(ledger.len(), 4);
        for &(x, y) in &[(0.0, 0.0), (12.5, 33.0), (99.0, 79.0)] {
            let p = Point2D::new(x, y);
            let back = ledger.map_to_source(ledger.map_to_output(p));
            assert_abs_diff_eq!(back.x, x, epsilon = 1e-9);
            assert_abs_diff_eq!(back.y, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_double_flip_is_identity() {
        let mut ledger = TransformLedger::new();
        ledger.push(TransformOp::VerticalFlip { height: 10 });
        ledger.push(TransformOp::VerticalFlip { height: 10 });
        let p = Point2D::new(3.0, 2.0);
        assert_eq!(ledger.map_to_output(p), p);
        assert_eq!(ledger.ops().len(), 2);
    }

    #[test]
    fn test_crop_offsets_add_back() {
        let mut ledger = TransformLedger::new();
        ledger.push_crop(100.0, 50.0);
        let src = ledger.map_to_source(Point2D::new(1.0, 2.0));
        assert_eq!(src, Point2D::new(101.0, 52.0));
    }
}
