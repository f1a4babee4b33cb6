use crate::ellipse::EllipseFit;
use crate::geometry::GeometryCorrection;
use crate::image::ImageBuffer;

/// Processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Scanning,
    EllipseFitting,
    GeometryCorrection,
    Cropping,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scanning => write!(f, "Scanning frames"),
            Self::EllipseFitting => write!(f, "Fitting solar disk"),
            Self::GeometryCorrection => write!(f, "Correcting geometry"),
            Self::Cropping => write!(f, "Cropping"),
        }
    }
}

/// Thread-safe progress reporting.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items in
    /// this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// Work items completed so far within the current stage.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// Progress reporter that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Output of [`process_reconstruction`](super::process_reconstruction).
#[derive(Clone, Debug)]
pub struct ProcessedImage {
    /// Corrected and cropped image. Its metadata holds the final ellipse and
    /// the full transform ledger.
    pub image: ImageBuffer,
    /// Fit on the uncorrected input.
    pub fit: EllipseFit,
    pub correction: GeometryCorrection,
}
