use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::consts::{HISTOGRAM_BINS, MAX_PIXEL_VALUE};
use crate::error::{HeliosError, Result};

/// Intensity statistics of one channel of one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation.
    pub stddev: f64,
}

/// Compute per-channel statistics of an interleaved sample buffer.
///
/// The number of channels is `data.len() / (width * height)`. The mean is
/// accumulated in a first pass with a running update, the standard deviation
/// in a second pass over the same samples.
pub fn compute_channel_stats(data: &[f32], width: usize, height: usize) -> Result<Vec<ChannelStats>> {
    let channel_size = width * height;
    if channel_size == 0 {
        return Err(HeliosError::InvalidDimensions { width, height });
    }
    if data.is_empty() {
        return Err(HeliosError::InvalidArgument(
            "cannot compute statistics of an empty buffer".into(),
        ));
    }
    if data.len() % channel_size != 0 {
        return Err(HeliosError::InvalidArgument(format!(
            "buffer of {} samples is not a whole number of {width}x{height} channels",
            data.len()
        )));
    }

    let channels = data.len() / channel_size;
    let stats = (0..channels)
        .map(|channel| {
            let samples = || data.iter().skip(channel).step_by(channels).map(|&v| v as f64);

            let mut mean = 0.0_f64;
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for (i, v) in samples().enumerate() {
                mean += (v - mean) / (i + 1) as f64;
                min = min.min(v);
                max = max.max(v);
            }

            let sum_sq: f64 = samples().map(|v| (v - mean) * (v - mean)).sum();
            ChannelStats {
                min,
                max,
                mean,
                stddev: (sum_sq / channel_size as f64).sqrt(),
            }
        })
        .collect();

    Ok(stats)
}

/// Statistics of a single-channel image plane.
pub fn compute_array_stats(data: &Array2<f32>) -> Result<ChannelStats> {
    let (h, w) = data.dim();
    let stats = match data.as_slice() {
        Some(slice) => compute_channel_stats(slice, w, h)?,
        None => {
            let owned: Vec<f32> = data.iter().copied().collect();
            compute_channel_stats(&owned, w, h)?
        }
    };
    Ok(stats[0])
}

/// Fixed-width intensity histogram over `[0, MAX_PIXEL_VALUE]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    counts: Vec<u64>,
    total: u64,
}

impl Histogram {
    pub fn new(bins: usize) -> Self {
        Self {
            counts: vec![0; bins.max(1)],
            total: 0,
        }
    }

    pub fn record(&mut self, value: f32) {
        let bins = self.counts.len();
        let normalized = (value / MAX_PIXEL_VALUE).clamp(0.0, 1.0);
        let bin = ((normalized * bins as f32) as usize).min(bins - 1);
        self.counts[bin] += 1;
        self.total += 1;
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Running sum of the bin counts.
    pub fn cumulative(&self) -> Vec<u64> {
        self.counts
            .iter()
            .scan(0u64, |acc, &c| {
                *acc += c;
                Some(*acc)
            })
            .collect()
    }

    /// Lower bound of the bin holding the `p`-th fraction of samples.
    pub fn percentile(&self, p: f64) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        let target = (p.clamp(0.0, 1.0) * self.total as f64).ceil().max(1.0) as u64;
        let bins = self.counts.len();
        let bin = self
            .cumulative()
            .iter()
            .position(|&c| c >= target)
            .unwrap_or(bins - 1);
        bin as f32 * MAX_PIXEL_VALUE / bins as f32
    }
}

/// Histogram of one channel of an interleaved buffer.
pub fn compute_histogram(data: &[f32], channel: usize, channels: usize) -> Histogram {
    let mut histogram = Histogram::new(HISTOGRAM_BINS);
    for &v in data.iter().skip(channel).step_by(channels.max(1)) {
        histogram.record(v);
    }
    histogram
}

/// Histogram of a whole image plane.
pub fn compute_array_histogram(data: &Array2<f32>) -> Histogram {
    let mut histogram = Histogram::new(HISTOGRAM_BINS);
    for &v in data.iter() {
        histogram.record(v);
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_stats() {
        let data = [0.0, 0.0, 1.0, 1.0];
        let stats = compute_channel_stats(&data, 2, 2).unwrap();
        assert_eq!(stats.len(), 1);
        assert!((stats[0].mean - 0.5).abs() < 1e-12);
        assert!((stats[0].stddev - 0.5).abs() < 1e-12);
        assert_eq!(stats[0].min, 0.0);
        assert_eq!(stats[0].max, 1.0);
    }

    #[test]
    fn test_interleaved_channels() {
        // Two pixels, RGB interleaved.
        let data = [1.0, 10.0, 100.0, 3.0, 30.0, 300.0];
        let stats = compute_channel_stats(&data, 2, 1).unwrap();
        assert_eq!(stats.len(), 3);
        assert!((stats[0].mean - 2.0).abs() < 1e-12);
        assert!((stats[1].mean - 20.0).abs() < 1e-12);
        assert!((stats[2].mean - 200.0).abs() < 1e-12);
        assert!((stats[2].stddev - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_buffer_is_invalid() {
        let err = compute_channel_stats(&[], 4, 4).unwrap_err();
        assert!(matches!(err, HeliosError::InvalidArgument(_)));
    }

    #[test]
    fn test_ragged_buffer_is_invalid() {
        assert!(compute_channel_stats(&[1.0; 5], 2, 2).is_err());
    }

    #[test]
    fn test_histogram_percentile() {
        let mut h = Histogram::new(256);
        for _ in 0..99 {
            h.record(MAX_PIXEL_VALUE);
        }
        h.record(0.0);
        assert_eq!(h.total(), 100);
        assert_eq!(h.percentile(0.01), 0.0);
        assert!(h.percentile(0.5) > 60_000.0);
        assert_eq!(*h.cumulative().last().unwrap(), 100);
    }
}
