pub mod buffer;
pub mod ledger;
pub mod stored;

pub use buffer::{ImageBuffer, ImageMetadata, MonoImage, RgbImage};
pub use ledger::{TransformLedger, TransformOp};
pub use stored::{FileBackedImage, StoredImage};
