//! Value traits shared by sampling and keyframe compression.

use crate::math::Point2D;

/// Numeric tolerance for value comparisons.
pub const EPSILON: f64 = 1e-9;

/// A value that can be compared for redundancy during sparsification.
pub trait SampleValue: Clone {
    /// Equality within [`EPSILON`] (element-wise for vectors, exact for strings).
    fn same_as(&self, other: &Self) -> bool;
}

/// A value that can be interpolated between keyframes.
pub trait Animatable: SampleValue {
    fn lerp(&self, other: &Self, t: f64) -> Self;
}

impl SampleValue for f64 {
    fn same_as(&self, other: &Self) -> bool {
        (self - other).abs() <= EPSILON
    }
}

impl Animatable for f64 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t
    }
}

impl SampleValue for Point2D {
    fn same_as(&self, other: &Self) -> bool {
        self.x.same_as(&other.x) && self.y.same_as(&other.y)
    }
}

impl Animatable for Point2D {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Point2D::lerp(self, other, t)
    }
}

impl SampleValue for String {
    fn same_as(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T: SampleValue> SampleValue for Option<T> {
    fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_as(b),
            (None, None) => true,
            _ => false,
        }
    }
}
