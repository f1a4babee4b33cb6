#[allow(dead_code)]
mod common;

use std::sync::Mutex;

use common::assert_close;
use helios_core::ellipse::{Ellipse, Point2D};
use helios_core::error::HeliosError;
use helios_core::image::{ImageBuffer, TransformOp};
use helios_core::pipeline::{
    process_reconstruction, process_reconstruction_reported, PipelineStage, ProcessConfig,
    ProgressReporter,
};

#[derive(Default)]
struct StageLog(Mutex<Vec<PipelineStage>>);

impl ProgressReporter for StageLog {
    fn begin_stage(&self, stage: PipelineStage, _total_items: Option<usize>) {
        self.0.lock().unwrap().push(stage);
    }
}

#[test]
fn test_tilted_disk_is_corrected_and_cropped() {
    let disk = Ellipse::new(Point2D::new(160.0, 120.0), 95.0, 80.0, 0.15);
    let image = ImageBuffer::mono(common::elliptic_disk_image(240, 320, &disk, 20_000.0));
    let log = StageLog::default();

    let processed =
        process_reconstruction_reported(image, &ProcessConfig::default(), &log).unwrap();

    assert_eq!(
        *log.0.lock().unwrap(),
        vec![
            PipelineStage::EllipseFitting,
            PipelineStage::GeometryCorrection,
            PipelineStage::Cropping,
        ]
    );

    let fitted = processed.fit.ellipse;
    assert_close(fitted.center.x, 160.0, 1.5);
    assert_close(fitted.center.y, 120.0, 1.5);
    assert_close(fitted.rotation, 0.15, 0.02);

    let (h, w) = processed.image.dim();
    assert_eq!(h, w);
    assert_eq!(h % 16, 0);

    let final_disk = processed.image.ellipse().unwrap();
    assert!(final_disk.eccentricity() < 0.05);

    let ops = processed.image.metadata().ledger.ops();
    assert_eq!(ops.len(), 2);
    assert!(matches!(ops[0], TransformOp::GeometryCorrection { .. }));
    assert!(matches!(ops[1], TransformOp::Crop { .. }));
}

#[test]
fn test_fit_failure_aborts_processing() {
    let image = ImageBuffer::mono(ndarray::Array2::zeros((32, 32)));
    assert!(matches!(
        process_reconstruction(image, &ProcessConfig::default()),
        Err(HeliosError::InsufficientData { .. })
    ));
}
