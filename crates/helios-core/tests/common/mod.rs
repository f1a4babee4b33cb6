use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use helios_core::ellipse::{Ellipse, Point2D};
use helios_core::error::{HeliosError, Result};
use helios_core::frame::{FrameGeometry, FrameSource};

/// In-memory frame source that behaves like a video reader: every frame is
/// written into one shared buffer, which is scribbled over again right
/// after it has been handed out. Anything a consumer fails to copy shows up
/// as garbage.
pub struct ReusingSource {
    frames: Vec<Vec<u8>>,
    geometry: FrameGeometry,
    buffer: Vec<u8>,
    next: usize,
    /// Fail with a source error when this frame is requested.
    pub fail_at: Option<usize>,
}

impl ReusingSource {
    pub fn new(geometry: FrameGeometry, frames: Vec<Vec<u8>>) -> Self {
        let size = geometry.frame_byte_size();
        assert!(frames.iter().all(|f| f.len() == size));
        Self {
            frames,
            geometry,
            buffer: vec![0; size],
            next: 0,
            fail_at: None,
        }
    }
}

impl FrameSource for ReusingSource {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    fn next_frame(&mut self) -> Result<&[u8]> {
        let index = self.next;
        if self.fail_at == Some(index) {
            return Err(HeliosError::FrameSource(format!("frame {index} unreadable")));
        }
        // Scribble over the previous frame before loading the next one.
        self.buffer.fill(0xAA);
        let frame = self
            .frames
            .get(index)
            .ok_or_else(|| HeliosError::FrameSource("read past the end".into()))?;
        self.buffer.copy_from_slice(frame);
        self.next += 1;
        Ok(&self.buffer)
    }
}

/// Mono8 frames where every byte of frame `i` equals `i % 256`.
pub fn indexed_frames(count: usize, width: usize, height: usize) -> ReusingSource {
    let geometry = FrameGeometry::mono8(width, height);
    let frames = (0..count)
        .map(|i| vec![(i % 256) as u8; geometry.frame_byte_size()])
        .collect();
    ReusingSource::new(geometry, frames)
}

/// Filled disk of `value` on a black background.
pub fn disk_image(height: usize, width: usize, center: Point2D, radius: f64, value: f32) -> Array2<f32> {
    let ellipse = Ellipse::circle(center, radius);
    elliptic_disk_image(height, width, &ellipse, value)
}

/// Filled ellipse of `value` on a black background.
pub fn elliptic_disk_image(height: usize, width: usize, ellipse: &Ellipse, value: f32) -> Array2<f32> {
    Array2::from_shape_fn((height, width), |(y, x)| {
        if ellipse.is_within(x as f64, y as f64) {
            value
        } else {
            0.0
        }
    })
}

/// Standard normal samples via Box-Muller.
pub fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// `count` points of `ellipse` with Gaussian noise of `sigma` pixels.
pub fn noisy_outline(ellipse: &Ellipse, count: usize, sigma: f64, seed: u64) -> Vec<Point2D> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let t = i as f64 / count as f64 * std::f64::consts::TAU;
            let p = ellipse.point_at(t);
            Point2D::new(p.x + sigma * gaussian(&mut rng), p.y + sigma * gaussian(&mut rng))
        })
        .collect()
}

/// `image` raised by `background` with Gaussian pixel noise of `sigma`.
pub fn add_noise(image: &Array2<f32>, background: f32, sigma: f64, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    image.mapv(|v| v + background + (sigma * gaussian(&mut rng)) as f32)
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} +/- {tolerance}, got {actual}"
    );
}
