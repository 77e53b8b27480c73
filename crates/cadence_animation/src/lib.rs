//! Cadence Animation Engine
//!
//! Time-based value transitions that run independently of any renderer.
//!
//! # Features
//!
//! - **Easing Algebra**: Pure `(start, end, progress)` functions with combinators
//!   (reverse, opposite, append, blend, rewind, ...)
//! - **Curve Presets**: Power, back, elastic, bounce, sine, exponential and circular curves
//! - **Animations**: Fixed-duration progress with speed, direction and looping
//! - **Interpolations**: Exponential smoothing toward a target that can move at any time
//! - **Shared Scheduler**: One clock for every instance, driven by a background
//!   thread or stepped explicitly
//! - **Notifications**: Typed lifecycle events with unsubscribe tokens
//! - **Typed Values**: Generic over scalars, geometry, colors and custom types
//!   through [`Interpolate`]
//!
//! Readers never block: every instance publishes its state as an atomically
//! swapped snapshot, so a render loop can call `value()` at any time.

pub mod animation;
pub mod config;
pub mod curves;
pub mod easing;
pub mod error;
pub mod events;
pub mod interpolation;
pub mod scheduler;
pub mod values;

pub use animation::{Animation, AnimationState, Frequency, TimeUnit, Values};
pub use config::{InterpolationOptions, OverrunPolicy, SchedulerConfig};
pub use curves::{Curve, ParseCurveError};
pub use easing::Easing;
pub use error::{Result, SchedulerError};
pub use events::{
    AnimationEvent, EventFilter, InstanceId, InterpolationEvent, ListenerId, Listeners,
    Notification, Subscription,
};
pub use interpolation::Interpolation;
pub use scheduler::{AnimationScheduler, SchedulerHandle, TaskHandle, TaskId, Tick};
pub use values::{Interpolate, EPSILON};
