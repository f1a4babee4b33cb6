use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Inclusive range of frame indices in which the sun is visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRange {
    pub start: usize,
    pub end: usize,
}

impl EdgeRange {
    /// Number of frames in the range.
    pub fn frame_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }
}

/// First and last index whose value reaches `(max - min) / sensitivity`.
///
/// Returns `None` for an empty or flat profile.
pub fn find_edges<T: Float>(profile: &[T], sensitivity: T) -> Option<(usize, usize)> {
    let (min, max) = min_max(profile)?;
    let amplitude = max - min;
    if amplitude == T::zero() {
        return None;
    }
    find_edges_above(profile, amplitude / sensitivity)
}

/// First and last index whose value is at least `threshold`.
pub fn find_edges_above<T: Float>(profile: &[T], threshold: T) -> Option<(usize, usize)> {
    let start = profile.iter().position(|&v| v >= threshold)?;
    let end = profile.iter().rposition(|&v| v >= threshold)?;
    Some((start, end))
}

/// Minimum and maximum of a profile, ignoring NaN.
pub fn min_max<T: Float>(profile: &[T]) -> Option<(T, T)> {
    profile
        .iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
