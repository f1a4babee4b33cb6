use tracing::info;

use super::config::ProcessConfig;
use super::types::{NoOpReporter, PipelineStage, ProcessedImage, ProgressReporter};
use crate::ellipse::EllipseFitter;
use crate::error::Result;
use crate::geometry::{
    apply_geometry_correction, autocrop, default_black_point, AutoCropConfig, GeometryCorrection,
};
use crate::image::ImageBuffer;

/// Fit, correct and crop a reconstructed image.
pub fn process_reconstruction(image: ImageBuffer, config: &ProcessConfig) -> Result<ProcessedImage> {
    process_reconstruction_reported(image, config, &NoOpReporter)
}

/// Fit the solar disk, undo the scan geometry and crop around the disk,
/// reporting each stage. A failed fit aborts the chain.
pub fn process_reconstruction_reported(
    mut image: ImageBuffer,
    config: &ProcessConfig,
    reporter: &dyn ProgressReporter,
) -> Result<ProcessedImage> {
    let (height, width) = image.dim();
    info!(width, height, channels = image.channels(), "Processing reconstruction");

    reporter.begin_stage(PipelineStage::EllipseFitting, None);
    let fit = EllipseFitter::new(config.ellipse.clone()).fit_buffer(&mut image)?;
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::GeometryCorrection, None);
    let geometry = &config.geometry;
    let correction = GeometryCorrection::from_ellipse(
        &fit.ellipse,
        height,
        geometry.disallow_downsampling,
        geometry.forced_tilt,
        geometry.forced_xy_ratio,
    )?;
    let black_point = geometry
        .black_point
        .unwrap_or_else(|| default_black_point(&image));
    let corrected = apply_geometry_correction(&image, &correction, black_point)?;
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Cropping, None);
    let crop = AutoCropConfig {
        black_point: config.autocrop.black_point.or(Some(black_point)),
        ..config.autocrop.clone()
    };
    let cropped = autocrop(&corrected, &crop)?;
    reporter.finish_stage();

    info!(
        width = cropped.width(),
        height = cropped.height(),
        "Reconstruction processed"
    );
    Ok(ProcessedImage {
        image: cropped,
        fit,
        correction,
    })
}
