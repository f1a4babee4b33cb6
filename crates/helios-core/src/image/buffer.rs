use ndarray::Array2;

use super::ledger::TransformLedger;
use crate::consts::{LUMINANCE_B, LUMINANCE_G, LUMINANCE_R};
use crate::ellipse::Ellipse;
use crate::error::{HeliosError, Result};

/// Domain metadata carried along with every image buffer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageMetadata {
    /// Current best fit of the solar disk, in this buffer's coordinates.
    pub ellipse: Option<Ellipse>,
    pub ledger: TransformLedger,
}

/// Single-channel image, samples in `[0, MAX_PIXEL_VALUE]`.
#[derive(Clone, Debug)]
pub struct MonoImage {
    pub data: Array2<f32>,
    pub metadata: ImageMetadata,
}

/// Three-plane color image. All planes have the same shape.
#[derive(Clone, Debug)]
pub struct RgbImage {
    pub red: Array2<f32>,
    pub green: Array2<f32>,
    pub blue: Array2<f32>,
    pub metadata: ImageMetadata,
}

/// A reconstructed image in memory.
#[derive(Clone, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum ImageBuffer {
    Mono(MonoImage),
    Rgb(RgbImage),
}

impl ImageBuffer {
    pub fn mono(data: Array2<f32>) -> Self {
        Self::Mono(MonoImage {
            data,
            metadata: ImageMetadata::default(),
        })
    }

    pub fn rgb(red: Array2<f32>, green: Array2<f32>, blue: Array2<f32>) -> Result<Self> {
        if red.dim() != green.dim() || red.dim() != blue.dim() {
            return Err(HeliosError::InvalidArgument(format!(
                "color planes differ in shape: {:?}, {:?}, {:?}",
                red.dim(),
                green.dim(),
                blue.dim()
            )));
        }
        Ok(Self::Rgb(RgbImage {
            red,
            green,
            blue,
            metadata: ImageMetadata::default(),
        }))
    }

    /// `(height, width)`.
    pub fn dim(&self) -> (usize, usize) {
        match self {
            Self::Mono(m) => m.data.dim(),
            Self::Rgb(c) => c.red.dim(),
        }
    }

    pub fn width(&self) -> usize {
        self.dim().1
    }

    pub fn height(&self) -> usize {
        self.dim().0
    }

    pub fn channels(&self) -> usize {
        match self {
            Self::Mono(_) => 1,
            Self::Rgb(_) => 3,
        }
    }

    pub fn metadata(&self) -> &ImageMetadata {
        match self {
            Self::Mono(m) => &m.metadata,
            Self::Rgb(c) => &c.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ImageMetadata {
        match self {
            Self::Mono(m) => &mut m.metadata,
            Self::Rgb(c) => &mut c.metadata,
        }
    }

    pub fn ellipse(&self) -> Option<&Ellipse> {
        self.metadata().ellipse.as_ref()
    }

    pub fn set_ellipse(&mut self, ellipse: Ellipse) {
        self.metadata_mut().ellipse = Some(ellipse);
    }

    pub fn planes(&self) -> Vec<&Array2<f32>> {
        match self {
            Self::Mono(m) => vec![&m.data],
            Self::Rgb(c) => vec![&c.red, &c.green, &c.blue],
        }
    }

    pub fn planes_mut(&mut self) -> Vec<&mut Array2<f32>> {
        match self {
            Self::Mono(m) => vec![&mut m.data],
            Self::Rgb(c) => vec![&mut c.red, &mut c.green, &mut c.blue],
        }
    }

    /// Mono data as is, or the BT.601 luminance of a color image.
    pub fn luminance(&self) -> Array2<f32> {
        match self {
            Self::Mono(m) => m.data.clone(),
            Self::Rgb(c) => {
                let mut out = c.red.mapv(|v| v * LUMINANCE_R);
                out.zip_mut_with(&c.green, |o, &g| *o += g * LUMINANCE_G);
                out.zip_mut_with(&c.blue, |o, &b| *o += b * LUMINANCE_B);
                out
            }
        }
    }

    /// Apply `f` to every plane, color planes in parallel. Metadata is
    /// copied unchanged; callers record their own transform.
    pub fn map_planes<F>(&self, f: F) -> ImageBuffer
    where
        F: Fn(&Array2<f32>) -> Array2<f32> + Sync,
    {
        match self {
            Self::Mono(m) => Self::Mono(MonoImage {
                data: f(&m.data),
                metadata: m.metadata.clone(),
            }),
            Self::Rgb(c) => {
                let (red, (green, blue)) =
                    rayon::join(|| f(&c.red), || rayon::join(|| f(&c.green), || f(&c.blue)));
                Self::Rgb(RgbImage {
                    red,
                    green,
                    blue,
                    metadata: c.metadata.clone(),
                })
            }
        }
    }
}
