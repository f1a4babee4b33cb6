use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::consts::MAX_PIXEL_VALUE;
use crate::error::{HeliosError, Result};

/// Pixel layout of a raw capture frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelLayout {
    Mono8,
    Mono16 { little_endian: bool },
    Rgb8,
    Rgb16 { little_endian: bool },
}

impl PixelLayout {
    /// Number of interleaved channels per pixel.
    pub fn channels(&self) -> usize {
        match self {
            Self::Mono8 | Self::Mono16 { .. } => 1,
            Self::Rgb8 | Self::Rgb16 { .. } => 3,
        }
    }

    /// Bytes used by a single channel sample.
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::Mono8 | Self::Rgb8 => 1,
            Self::Mono16 { .. } | Self::Rgb16 { .. } => 2,
        }
    }
}

/// Capture geometry of every frame in a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: usize,
    pub height: usize,
    pub layout: PixelLayout,
}

impl FrameGeometry {
    pub fn mono8(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            layout: PixelLayout::Mono8,
        }
    }

    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Number of decoded samples (pixels × channels).
    pub fn sample_count(&self) -> usize {
        self.pixel_count() * self.channels()
    }

    /// Size in bytes of one raw frame.
    pub fn frame_byte_size(&self) -> usize {
        self.sample_count() * self.layout.bytes_per_sample()
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(HeliosError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Sequential reader of raw capture frames (typically a SER video reader).
///
/// The slice returned by [`FrameSource::next_frame`] is the source's internal
/// buffer and is overwritten by the next call. Anything that must outlive the
/// call has to be copied first.
pub trait FrameSource {
    fn frame_count(&self) -> usize;

    fn geometry(&self) -> FrameGeometry;

    fn next_frame(&mut self) -> Result<&[u8]>;
}

/// Pixel-format specific conversion of a raw frame into interleaved f32
/// samples in the nominal `[0, MAX_PIXEL_VALUE]` range.
pub trait FrameDecoder: Send + Sync {
    fn decode(
        &self,
        frame_index: usize,
        raw: &[u8],
        geometry: &FrameGeometry,
        out: &mut [f32],
    ) -> Result<()>;
}

/// Decoder for uncompressed mono and RGB frames.
///
/// 8-bit samples are stretched to the 16-bit range, 16-bit samples are kept
/// as is.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawDecoder;

impl FrameDecoder for RawDecoder {
    fn decode(
        &self,
        frame_index: usize,
        raw: &[u8],
        geometry: &FrameGeometry,
        out: &mut [f32],
    ) -> Result<()> {
        let samples = geometry.sample_count();
        if raw.len() < geometry.frame_byte_size() {
            return Err(HeliosError::InvalidArgument(format!(
                "frame {frame_index}: expected {} bytes, got {}",
                geometry.frame_byte_size(),
                raw.len()
            )));
        }
        if out.len() != samples {
            return Err(HeliosError::InvalidArgument(format!(
                "frame {frame_index}: output buffer holds {} samples, expected {samples}",
                out.len()
            )));
        }

        match geometry.layout {
            PixelLayout::Mono8 | PixelLayout::Rgb8 => {
                let scale = MAX_PIXEL_VALUE / u8::MAX as f32;
                for (dst, &src) in out.iter_mut().zip(raw) {
                    *dst = src as f32 * scale;
                }
            }
            PixelLayout::Mono16 { little_endian } | PixelLayout::Rgb16 { little_endian } => {
                for (dst, pair) in out.iter_mut().zip(raw.chunks_exact(2)) {
                    let v = if little_endian {
                        LittleEndian::read_u16(pair)
                    } else {
                        BigEndian::read_u16(pair)
                    };
                    *dst = v as f32;
                }
            }
        }
        Ok(())
    }
}
