//! Easing functions
//!
//! An [`Easing`] maps `(start, end, progress)` to a value. Most easings follow
//! `start + (end - start) * mapped(progress)`, which is what [`Easing::map`]
//! builds; the combinators below compose easings without ever mutating one.
//!
//! Out-of-range thresholds and blend factors are clamped into `[0, 1]`; every
//! combinator accepts every input.
//!
//! ```rust
//! use cadence_animation::Easing;
//!
//! let linear = Easing::linear();
//! assert_eq!(linear.apply(0.0, 100.0, 0.25), 25.0);
//!
//! // Play forward for the first 30%, then back for the rest
//! let there_and_back = linear.append(&linear.opposite(), 0.3);
//! assert_eq!(there_and_back.apply(0.0, 100.0, 0.15), 50.0);
//! ```

use std::fmt;
use std::sync::Arc;

type EasingFn = dyn Fn(f64, f64, f64) -> f64 + Send + Sync;

/// A pure `(start, end, progress) -> value` function
///
/// Cheap to clone; clones share the same underlying function.
#[derive(Clone)]
pub struct Easing {
    func: Arc<EasingFn>,
}

impl Easing {
    /// Wrap an arbitrary `(start, end, progress)` function
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(f64, f64, f64) -> f64 + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Build an easing from a progress mapper: `start + (end - start) * mapper(progress)`
    pub fn map<F>(mapper: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self::new(move |start, end, progress| start + (end - start) * mapper(progress))
    }

    /// `f(x) = x`
    pub fn linear() -> Self {
        Self::map(|progress| progress)
    }

    /// Always the start value
    pub fn zero() -> Self {
        Self::map(|_| 0.0)
    }

    /// Always the end value
    pub fn one() -> Self {
        Self::map(|_| 1.0)
    }

    /// Evaluate the easing
    #[inline]
    pub fn apply(&self, start: f64, end: f64, progress: f64) -> f64 {
        (self.func)(start, end, progress)
    }

    /// Evaluate the easing, keeping the result inside `[min(start, end), max(start, end)]`
    ///
    /// Use this where overshooting curves (back, elastic) must not leave the range.
    pub fn apply_clamped(&self, start: f64, end: f64, progress: f64) -> f64 {
        let value = self.apply(start, end, progress);
        let (low, high) = (start.min(end), start.max(end));
        // `min`/`max` only yield NaN when both endpoints are NaN
        if low.is_nan() || high.is_nan() {
            return value;
        }
        value.clamp(low, high)
    }

    /// Remap the progress before delegating
    pub fn map_progress<F>(&self, mapper: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        let this = self.clone();
        Self::new(move |start, end, progress| this.apply(start, end, mapper(progress)))
    }

    /// Narrow the output range to `[start + range * from, start + range * to]`
    ///
    /// `map_range(0.5, 1.0)` makes the easing begin halfway between start and end.
    pub fn map_range(&self, from: f64, to: f64) -> Self {
        let this = self.clone();
        Self::new(move |start, end, progress| {
            let range = end - start;
            this.apply(start + range * from, start + range * to, progress)
        })
    }

    /// Swap start and end (x-flip)
    pub fn opposite(&self) -> Self {
        let this = self.clone();
        Self::new(move |start, end, progress| this.apply(end, start, progress))
    }

    /// Invert the progress (y-flip)
    pub fn reverse(&self) -> Self {
        let this = self.clone();
        Self::new(move |start, end, progress| this.apply(start, end, 1.0 - progress))
    }

    /// Play forward at double speed, then back from the end at double speed
    pub fn rewind(&self) -> Self {
        let this = self.clone();
        Self::new(move |start, end, progress| {
            if progress <= 0.5 {
                this.apply(start, end, progress * 2.0)
            } else {
                this.apply(end, start, (progress - 0.5) * 2.0)
            }
        })
    }

    /// Feed this easing's output into `after` as its progress
    pub fn and_then(&self, after: &Easing) -> Self {
        let this = self.clone();
        let after = after.clone();
        Self::new(move |start, end, progress| {
            after.apply(start, end, this.apply(start, end, progress))
        })
    }

    /// Feed `before`'s output into this easing as its progress
    pub fn compose(&self, before: &Easing) -> Self {
        before.and_then(self)
    }

    /// Run `self` over `[0, threshold)` and `other` over `[threshold, 1]`
    ///
    /// Each half sees its own progress rescaled to `[0, 1]`.
    pub fn append(&self, other: &Easing, threshold: f64) -> Self {
        split(self.clone(), other.clone(), threshold)
    }

    /// Run `other` over `[0, threshold)` and `self` over `[threshold, 1]`
    pub fn prepend(&self, other: &Easing, threshold: f64) -> Self {
        split(other.clone(), self.clone(), threshold)
    }

    /// Mix with another easing: `self * (1 - factor) + other * factor`
    pub fn blend(&self, other: &Easing, factor: f64) -> Self {
        let factor = clamp_unit(factor);
        let this = self.clone();
        let other = other.clone();
        Self::new(move |start, end, progress| {
            this.apply(start, end, progress) * (1.0 - factor)
                + other.apply(start, end, progress) * factor
        })
    }
}

/// Sequence two easings at a threshold
fn split(first: Easing, second: Easing, threshold: f64) -> Easing {
    let t = clamp_unit(threshold);
    Easing::new(move |start, end, progress| {
        if progress < t {
            // t > 0 here, since progress < t
            first.apply(start, end, progress / t)
        } else if t >= 1.0 {
            second.apply(start, end, 1.0)
        } else {
            second.apply(start, end, (progress - t) / (1.0 - t))
        }
    })
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl Default for Easing {
    fn default() -> Self {
        Self::linear()
    }
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Easing").finish_non_exhaustive()
    }
}
