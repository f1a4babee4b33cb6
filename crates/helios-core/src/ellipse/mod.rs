pub mod config;
pub mod fitter;
pub mod regression;
pub mod types;

pub use config::EllipseFitConfig;
pub use fitter::{collect_edge_samples, fit_ellipse, magnitude_profile, EllipseFit, EllipseFitter};
pub use regression::fit_ellipse_regression;
pub use types::{Bounds, Conic, Ellipse, Point2D};
