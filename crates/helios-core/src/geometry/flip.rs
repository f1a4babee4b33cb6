use ndarray::{s, Zip};

use crate::error::Result;
use crate::image::{ImageBuffer, StoredImage, TransformOp};

/// Reverse the row order of every plane in place.
///
/// The stored ellipse is mirrored with the rows, and the flip is recorded in
/// the ledger even when it cancels a previous one.
pub fn vertical_flip(image: &mut ImageBuffer) {
    let height = image.height();
    for plane in image.planes_mut() {
        for y in 0..height / 2 {
            let (mut upper, mut lower) = plane.multi_slice_mut((s![y, ..], s![height - 1 - y, ..]));
            Zip::from(&mut upper)
                .and(&mut lower)
                .for_each(|a, b| std::mem::swap(a, b));
        }
    }

    let metadata = image.metadata_mut();
    if let Some(ellipse) = metadata.ellipse {
        metadata.ellipse = Some(ellipse.vflip(height as f64 - 1.0));
    }
    metadata.ledger.push(TransformOp::VerticalFlip { height });
}

impl StoredImage {
    /// Flip a stored image, loading file-backed pixels into memory first.
    pub fn vertical_flip(self) -> Result<ImageBuffer> {
        let mut image = self.materialize()?;
        vertical_flip(&mut image);
        Ok(image)
    }
}
