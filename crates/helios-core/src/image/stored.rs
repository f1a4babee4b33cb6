//! Images that may live on disk between processing steps.
//!
//! Spill format (little endian): one kind byte (`0` mono, `2` RGB), the
//! height and width as `u32`, then each plane as row-major `f32`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use memmap2::Mmap;
use ndarray::Array2;
use tracing::debug;

use super::buffer::{ImageBuffer, ImageMetadata, MonoImage, RgbImage};
use crate::error::{HeliosError, Result};

const KIND_MONO: u8 = 0;
const KIND_RGB: u8 = 2;
const HEADER_SIZE: usize = 9;

/// An image kept either in memory or in a spill file.
#[derive(Debug)]
#[allow(clippy::large_enum_variant)]
pub enum StoredImage {
    InMemory(ImageBuffer),
    FileBacked(FileBackedImage),
}

impl StoredImage {
    /// Load the pixels into memory. In-memory images are returned as is.
    pub fn materialize(self) -> Result<ImageBuffer> {
        match self {
            Self::InMemory(image) => Ok(image),
            Self::FileBacked(file) => file.materialize(),
        }
    }

    pub fn metadata(&self) -> &ImageMetadata {
        match self {
            Self::InMemory(image) => image.metadata(),
            Self::FileBacked(file) => file.metadata(),
        }
    }

    /// `(height, width)`.
    pub fn dim(&self) -> (usize, usize) {
        match self {
            Self::InMemory(image) => image.dim(),
            Self::FileBacked(file) => (file.height, file.width),
        }
    }

    pub fn is_file_backed(&self) -> bool {
        matches!(self, Self::FileBacked(_))
    }
}

impl From<ImageBuffer> for StoredImage {
    fn from(image: ImageBuffer) -> Self {
        Self::InMemory(image)
    }
}

/// Pixels dumped to an anonymous temporary file, metadata kept in memory.
/// The file is removed when the value is dropped.
#[derive(Debug)]
pub struct FileBackedImage {
    file: File,
    kind: u8,
    width: usize,
    height: usize,
    metadata: ImageMetadata,
}

impl FileBackedImage {
    /// Write `image` to a temporary file in the system temp directory.
    pub fn spill(image: &ImageBuffer) -> Result<Self> {
        Self::write_to(tempfile::tempfile()?, image)
    }

    /// Write `image` to a temporary file in `dir`.
    pub fn spill_in(dir: &Path, image: &ImageBuffer) -> Result<Self> {
        Self::write_to(tempfile::tempfile_in(dir)?, image)
    }

    fn write_to(file: File, image: &ImageBuffer) -> Result<Self> {
        let (height, width) = image.dim();
        let kind = match image {
            ImageBuffer::Mono(_) => KIND_MONO,
            ImageBuffer::Rgb(_) => KIND_RGB,
        };

        {
            let mut writer = BufWriter::new(&file);
            writer.write_u8(kind)?;
            writer.write_u32::<LittleEndian>(to_u32(height)?)?;
            writer.write_u32::<LittleEndian>(to_u32(width)?)?;
            for plane in image.planes() {
                for &v in plane.iter() {
                    writer.write_f32::<LittleEndian>(v)?;
                }
            }
            writer.flush()?;
        }

        debug!(width, height, channels = image.channels(), "Spilled image to disk");

        Ok(Self {
            file,
            kind,
            width,
            height,
            metadata: image.metadata().clone(),
        })
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Read the pixels back. Each call decodes the file again.
    pub fn materialize(&self) -> Result<ImageBuffer> {
        let mmap = unsafe { Mmap::map(&self.file)? };
        if mmap.len() < HEADER_SIZE {
            return Err(HeliosError::InvalidArgument(
                "spill file too small for its header".into(),
            ));
        }

        let kind = mmap[0];
        let height = LittleEndian::read_u32(&mmap[1..5]) as usize;
        let width = LittleEndian::read_u32(&mmap[5..9]) as usize;
        if kind != self.kind || height != self.height || width != self.width {
            return Err(HeliosError::InvalidArgument(
                "spill file header does not match the stored image".into(),
            ));
        }

        let planes = if kind == KIND_RGB { 3 } else { 1 };
        let plane_len = width * height;
        let expected = HEADER_SIZE + planes * plane_len * 4;
        if mmap.len() < expected {
            return Err(HeliosError::InvalidArgument(format!(
                "spill file truncated: expected {expected} bytes, got {}",
                mmap.len()
            )));
        }

        let read_plane = |index: usize| -> Result<Array2<f32>> {
            let start = HEADER_SIZE + index * plane_len * 4;
            let mut values = vec![0.0_f32; plane_len];
            LittleEndian::read_f32_into(&mmap[start..start + plane_len * 4], &mut values);
            Array2::from_shape_vec((height, width), values)
                .map_err(|e| HeliosError::InvalidArgument(e.to_string()))
        };

        let metadata = self.metadata.clone();
        let image = if kind == KIND_RGB {
            ImageBuffer::Rgb(RgbImage {
                red: read_plane(0)?,
                green: read_plane(1)?,
                blue: read_plane(2)?,
                metadata,
            })
        } else {
            ImageBuffer::Mono(MonoImage {
                data: read_plane(0)?,
                metadata,
            })
        };
        Ok(image)
    }
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| HeliosError::InvalidArgument(format!("dimension {value} too large")))
}
