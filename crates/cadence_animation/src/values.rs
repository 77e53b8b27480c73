//! Animatable value types
//!
//! Provides the [`Interpolate`] capability and its implementations for
//! scalars, geometry and colors. Animations and interpolations are generic
//! over it, so there is one engine per algorithm rather than one per payload.

use cadence_core::{Color, Point, Rect, Size, Vec2, Vec3};

use crate::easing::Easing;

/// Default convergence tolerance
pub const EPSILON: f64 = 1e-6;

/// Trait for values that can be linearly interpolated
pub trait Interpolate: Clone + Send + Sync + 'static {
    /// Linearly interpolate between self and other by factor t
    ///
    /// `t` outside `[0, 1]` extrapolates, which overshooting easings rely on.
    fn lerp(&self, other: &Self, t: f64) -> Self;

    /// Check if two values are within `epsilon` of each other (inclusive)
    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool;

    /// Sample `easing` between two values
    fn eased(start: &Self, end: &Self, easing: &Easing, progress: f64) -> Self {
        start.lerp(end, easing.apply(0.0, 1.0, progress))
    }

    /// Like [`Interpolate::eased`], but never leaves the range between the two values
    fn eased_clamped(start: &Self, end: &Self, easing: &Easing, progress: f64) -> Self {
        start.lerp(end, easing.apply_clamped(0.0, 1.0, progress))
    }
}

// ============================================================================
// Scalars
// ============================================================================

impl Interpolate for f64 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        (self - other).abs() <= epsilon
    }

    // Scalars hand their endpoints straight to the easing, so easings built
    // with `Easing::new` see the real range
    fn eased(start: &Self, end: &Self, easing: &Easing, progress: f64) -> Self {
        easing.apply(*start, *end, progress)
    }

    fn eased_clamped(start: &Self, end: &Self, easing: &Easing, progress: f64) -> Self {
        easing.apply_clamped(*start, *end, progress)
    }
}

impl Interpolate for f32 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        (*self as f64).lerp(&(*other as f64), t) as f32
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        ((self - other).abs() as f64) <= epsilon
    }

    fn eased(start: &Self, end: &Self, easing: &Easing, progress: f64) -> Self {
        easing.apply(*start as f64, *end as f64, progress) as f32
    }

    fn eased_clamped(start: &Self, end: &Self, easing: &Easing, progress: f64) -> Self {
        easing.apply_clamped(*start as f64, *end as f64, progress) as f32
    }
}

// ============================================================================
// Geometry
// ============================================================================

impl Interpolate for Point {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Point::new(self.x.lerp(&other.x, t), self.y.lerp(&other.y, t))
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.distance_to(*other) <= epsilon
    }
}

impl Interpolate for Vec2 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Vec2::new(self.x.lerp(&other.x, t), self.y.lerp(&other.y, t))
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.distance_to(*other) <= epsilon
    }
}

impl Interpolate for Vec3 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Vec3::new(
            self.x.lerp(&other.x, t),
            self.y.lerp(&other.y, t),
            self.z.lerp(&other.z, t),
        )
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.distance_to(*other) <= epsilon
    }
}

impl Interpolate for Size {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Size::new(
            self.width.lerp(&other.width, t),
            self.height.lerp(&other.height, t),
        )
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.width.approx_eq(&other.width, epsilon) && self.height.approx_eq(&other.height, epsilon)
    }
}

impl Interpolate for Rect {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Rect::from_origin_size(
            self.origin.lerp(&other.origin, t),
            self.size.lerp(&other.size, t),
        )
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.origin.x.approx_eq(&other.origin.x, epsilon)
            && self.origin.y.approx_eq(&other.origin.y, epsilon)
            && self.size.approx_eq(&other.size, epsilon)
    }
}

// ============================================================================
// Color
// ============================================================================

impl Interpolate for Color {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Color::rgba(
            self.r.lerp(&other.r, t),
            self.g.lerp(&other.g, t),
            self.b.lerp(&other.b, t),
            self.a.lerp(&other.a, t),
        )
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| a.approx_eq(b, epsilon))
    }
}
