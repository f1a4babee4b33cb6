pub mod consts;
pub mod detection;
pub mod ellipse;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod image;
pub mod pipeline;
pub mod scan;
pub mod stats;
