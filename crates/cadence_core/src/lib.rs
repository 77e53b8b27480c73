//! Cadence Core Types
//!
//! Plain value types that the animation engine moves around:
//!
//! - **Geometry**: [`Point`], [`Size`], [`Rect`], [`Vec2`], [`Vec3`]
//! - **Color**: [`Color`] in linear RGBA
//!
//! These types carry no animation logic of their own. `cadence_animation`
//! implements its `Interpolate` capability for each of them.
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{Point, Rect};
//!
//! let a = Point::new(0.0, 0.0);
//! let b = Point::new(3.0, 4.0);
//! assert_eq!(a.distance_to(b), 5.0);
//!
//! let r = Rect::new(0.0, 0.0, 10.0, 20.0);
//! assert_eq!(r.center(), Point::new(5.0, 10.0));
//! ```

pub mod color;
pub mod geometry;

pub use color::Color;
pub use geometry::{Point, Rect, Size, Vec2, Vec3};
