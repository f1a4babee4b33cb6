use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use tracing::{info, warn};

use super::config::MagnitudeDetectionConfig;
use super::edges::{find_edges, EdgeRange};
use crate::error::Result;
use crate::frame::{FrameDecoder, FrameGeometry, FrameSource};
use crate::pipeline::ProgressReporter;
use crate::scan::{CancellationToken, FrameScanner};

/// Frame range and the per-frame spectral scores it was derived from.
#[derive(Clone, Debug)]
pub struct MagnitudeDetection {
    pub range: Option<EdgeRange>,
    /// Peak spectral magnitude of each frame's first row.
    pub scores: Vec<Option<f64>>,
    pub failures: usize,
    pub cancelled: bool,
}

/// Edge detector scoring each frame by the peak FFT magnitude of its first
/// row. Frames crossing the sun have a far stronger spectrum than the sky.
pub struct MagnitudeEdgeDetector {
    config: MagnitudeDetectionConfig,
    decoder: Arc<dyn FrameDecoder>,
}

impl MagnitudeEdgeDetector {
    pub fn new(config: MagnitudeDetectionConfig, decoder: Arc<dyn FrameDecoder>) -> Self {
        Self { config, decoder }
    }

    pub fn detect(
        &self,
        source: &mut dyn FrameSource,
        scanner: &FrameScanner,
        cancel: &CancellationToken,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<MagnitudeDetection> {
        let geometry = source.geometry();
        geometry.validate()?;

        let fft = FftPlanner::<f64>::new().plan_fft_forward(geometry.width.next_power_of_two());
        let decoder = Arc::clone(&self.decoder);
        let outcome = scanner.scan(
            source,
            move |index, raw| {
                let mut samples = vec![0.0_f32; geometry.sample_count()];
                decoder.decode(index, raw, &geometry, &mut samples)?;
                Ok(first_row_score(&samples, &geometry, fft.as_ref()))
            },
            cancel,
            reporter,
        )?;

        // Failed frames become NaN, which `find_edges` never selects.
        let profile: Vec<f64> = outcome
            .results
            .iter()
            .map(|s| s.unwrap_or(f64::NAN))
            .collect();
        let range = find_edges(&profile, self.config.sensitivity)
            .map(|(start, end)| EdgeRange { start, end });
        match range {
            Some(r) => info!(start = r.start, end = r.end, "Detected sun edges from magnitudes"),
            None => warn!("Frame magnitudes are flat, no sun edges found"),
        }

        Ok(MagnitudeDetection {
            range,
            scores: outcome.results,
            failures: outcome.failures,
            cancelled: outcome.cancelled,
        })
    }
}

/// Peak `|X[k]|` of the first row (channel 0), left-padded with zeros to
/// the FFT length.
fn first_row_score(samples: &[f32], geometry: &FrameGeometry, fft: &dyn Fft<f64>) -> f64 {
    let len = geometry.width.next_power_of_two();
    let padding = len - geometry.width;
    let channels = geometry.channels();

    let mut line = vec![Complex::new(0.0, 0.0); len];
    for (dst, &v) in line[padding..]
        .iter_mut()
        .zip(samples.iter().step_by(channels).take(geometry.width))
    {
        *dst = Complex::new(v as f64, 0.0);
    }
    fft.process(&mut line);

    line.iter().map(|c| c.norm()).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_of_constant_row_is_dc() {
        let geometry = FrameGeometry::mono8(4, 1);
        let fft = FftPlanner::<f64>::new().plan_fft_forward(4);
        let score = first_row_score(&[2.0; 4], &geometry, fft.as_ref());
        assert!((score - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_uses_first_channel_of_rgb() {
        let geometry = FrameGeometry {
            width: 2,
            height: 1,
            layout: crate::frame::PixelLayout::Rgb8,
        };
        let fft = FftPlanner::<f64>::new().plan_fft_forward(2);
        let samples = [1.0, 100.0, 100.0, 1.0, 100.0, 100.0];
        let score = first_row_score(&samples, &geometry, fft.as_ref());
        assert!((score - 2.0).abs() < 1e-9);
    }
}
