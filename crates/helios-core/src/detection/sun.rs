use std::sync::Arc;

use tracing::{info, warn};

use super::config::EdgeDetectionConfig;
use super::edges::EdgeRange;
use crate::error::Result;
use crate::frame::{FrameDecoder, FrameSource};
use crate::pipeline::ProgressReporter;
use crate::scan::{CancellationToken, FrameScanner};
use crate::stats::{compute_channel_stats, ChannelStats};

/// Per-frame statistics of a scan and the frame range showing the sun.
#[derive(Clone, Debug)]
pub struct EdgeDetection {
    pub range: Option<EdgeRange>,
    /// One entry per frame, `None` where processing failed or was skipped.
    pub stats: Vec<Option<Vec<ChannelStats>>>,
    pub failures: usize,
    pub cancelled: bool,
}

/// First and last frame whose contrast exceeds the threshold.
///
/// A frame qualifies when `stddev > contrast_threshold * mean` on the
/// configured channel. Missing frames are skipped and do not split the
/// range.
pub fn detect_sun_edges(
    stats: &[Option<Vec<ChannelStats>>],
    config: &EdgeDetectionConfig,
) -> Option<EdgeRange> {
    let mut qualifying = stats.iter().enumerate().filter_map(|(i, slot)| {
        let channel = slot.as_ref()?.get(config.channel)?;
        (channel.stddev > config.contrast_threshold * channel.mean).then_some(i)
    });
    let start = qualifying.next()?;
    let end = qualifying.last().unwrap_or(start);
    Some(EdgeRange { start, end })
}

/// Scans a frame source for the frames in which the sun is visible.
pub struct SunEdgeDetector {
    config: EdgeDetectionConfig,
    decoder: Arc<dyn FrameDecoder>,
}

impl SunEdgeDetector {
    pub fn new(config: EdgeDetectionConfig, decoder: Arc<dyn FrameDecoder>) -> Self {
        Self { config, decoder }
    }

    pub fn config(&self) -> &EdgeDetectionConfig {
        &self.config
    }

    pub fn detect(
        &self,
        source: &mut dyn FrameSource,
        scanner: &FrameScanner,
        cancel: &CancellationToken,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<EdgeDetection> {
        let geometry = source.geometry();
        geometry.validate()?;

        let decoder = Arc::clone(&self.decoder);
        let outcome = scanner.scan(
            source,
            move |index, raw| {
                let mut samples = vec![0.0_f32; geometry.sample_count()];
                decoder.decode(index, raw, &geometry, &mut samples)?;
                compute_channel_stats(&samples, geometry.width, geometry.height)
            },
            cancel,
            reporter,
        )?;

        let range = detect_sun_edges(&outcome.results, &self.config);
        match range {
            Some(r) => info!(start = r.start, end = r.end, "Detected sun edges"),
            None => warn!("No frame shows the sun"),
        }

        Ok(EdgeDetection {
            range,
            stats: outcome.results,
            failures: outcome.failures,
            cancelled: outcome.cancelled,
        })
    }
}
