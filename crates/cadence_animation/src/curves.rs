//! Preset easing curves
//!
//! Parametric constructors (`power_*`, `back_*`, `elastic_*`, [`stairs`],
//! [`switch`]) plus the [`Curve`] enum naming every fixed preset, so that
//! configuration files and the CLI can refer to curves by name.
//!
//! ```rust
//! use cadence_animation::Curve;
//!
//! let ease = "cubic-out".parse::<Curve>().unwrap().easing();
//! assert_eq!(ease.apply(0.0, 1.0, 1.0), 1.0);
//! ```

use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::easing::Easing;

/// Default overshoot of the back curves
pub const BACK_OVERSHOOT: f64 = 1.70158;
/// Default amplitude of the elastic curves
pub const ELASTIC_AMPLITUDE: f64 = 1.0;
/// Default period of the elastic curves
pub const ELASTIC_PERIOD: f64 = 0.3;

// ============================================================================
// Parametric constructors
// ============================================================================

/// `f(x) = x^n`
pub fn power_in(n: f64) -> Easing {
    Easing::map(move |p| p.powf(n))
}

/// `f(x) = 1 - (1 - x)^n`
pub fn power_out(n: f64) -> Easing {
    Easing::map(move |p| 1.0 - (1.0 - p).powf(n))
}

/// `power_in` over the first half, `power_out` over the second
pub fn power_in_out(n: f64) -> Easing {
    Easing::map(move |p| {
        if p < 0.5 {
            (p * 2.0).powf(n) / 2.0
        } else {
            1.0 - ((1.0 - p) * 2.0).powf(n) / 2.0
        }
    })
}

pub fn back_in(overshoot: f64) -> Easing {
    Easing::map(move |p| p * p * ((overshoot + 1.0) * p - overshoot))
}

pub fn back_out(overshoot: f64) -> Easing {
    Easing::map(move |p| {
        let p = p - 1.0;
        p * p * ((overshoot + 1.0) * p + overshoot) + 1.0
    })
}

pub fn back_in_out(overshoot: f64) -> Easing {
    Easing::map(move |p| {
        let p = p * 2.0;
        if p < 1.0 {
            0.5 * (p * p * ((overshoot + 1.0) * p - overshoot))
        } else {
            let p = p - 2.0;
            0.5 * (p * p * ((overshoot + 1.0) * p + overshoot) + 2.0)
        }
    })
}

/// Amplitudes below 1 can't reach the endpoints, so they are raised to 1
fn elastic_shape(amplitude: f64, period: f64) -> (f64, f64) {
    let amplitude = amplitude.max(1.0);
    let phase = period / TAU * (1.0 / amplitude).asin();
    (amplitude, phase)
}

pub fn elastic_in(amplitude: f64, period: f64) -> Easing {
    let (a, s) = elastic_shape(amplitude, period);
    Easing::map(move |p| {
        if p == 0.0 || p == 1.0 {
            return p;
        }
        let p = p - 1.0;
        -(a * 2f64.powf(10.0 * p) * ((p - s) * TAU / period).sin())
    })
}

pub fn elastic_out(amplitude: f64, period: f64) -> Easing {
    let (a, s) = elastic_shape(amplitude, period);
    Easing::map(move |p| {
        if p == 0.0 || p == 1.0 {
            return p;
        }
        a * 2f64.powf(-10.0 * p) * ((p - s) * TAU / period).sin() + 1.0
    })
}

pub fn elastic_in_out(amplitude: f64, period: f64) -> Easing {
    let (a, s) = elastic_shape(amplitude, period);
    Easing::map(move |p| {
        if p == 0.0 || p == 1.0 {
            return p;
        }
        let p = p * 2.0 - 1.0;
        if p < 0.0 {
            -0.5 * (a * 2f64.powf(10.0 * p) * ((p - s) * TAU / period).sin())
        } else {
            a * 2f64.powf(-10.0 * p) * ((p - s) * TAU / period).sin() * 0.5 + 1.0
        }
    })
}

/// Quantize progress into `steps` equal jumps
///
/// Zero steps behaves as one.
pub fn stairs(steps: u32) -> Easing {
    let steps = f64::from(steps.max(1));
    Easing::map(move |p| (p * steps).floor() / steps)
}

/// Start value before `threshold`, end value at and after it
pub fn switch(threshold: f64) -> Easing {
    Easing::one().prepend(&Easing::zero(), threshold)
}

fn bounce_out() -> Easing {
    Easing::map(|p| {
        const K: f64 = 7.5625;
        const D: f64 = 2.75;
        if p < 1.0 / D {
            K * p * p
        } else if p < 2.0 / D {
            let p = p - 1.5 / D;
            K * p * p + 0.75
        } else if p < 2.5 / D {
            let p = p - 2.25 / D;
            K * p * p + 0.9375
        } else {
            let p = p - 2.625 / D;
            K * p * p + 0.984375
        }
    })
}

fn bounce_in() -> Easing {
    bounce_out().opposite().reverse()
}

fn bounce_in_out() -> Easing {
    bounce_in()
        .map_range(0.0, 0.5)
        .append(&bounce_out().map_range(0.5, 1.0), 0.5)
}

// ============================================================================
// Named presets
// ============================================================================

/// Every fixed preset curve, by name
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Curve {
    #[default]
    Linear,
    QuadraticIn,
    QuadraticOut,
    QuadraticInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    QuarticIn,
    QuarticOut,
    QuarticInOut,
    QuinticIn,
    QuinticOut,
    QuinticInOut,
    BackIn,
    BackOut,
    BackInOut,
    ElasticIn,
    ElasticOut,
    ElasticInOut,
    BounceIn,
    BounceOut,
    BounceInOut,
    SineIn,
    SineOut,
    SineInOut,
    ExponentialIn,
    ExponentialOut,
    ExponentialInOut,
    CircularIn,
    CircularOut,
    CircularInOut,
}

impl Curve {
    pub const ALL: [Curve; 31] = [
        Curve::Linear,
        Curve::QuadraticIn,
        Curve::QuadraticOut,
        Curve::QuadraticInOut,
        Curve::CubicIn,
        Curve::CubicOut,
        Curve::CubicInOut,
        Curve::QuarticIn,
        Curve::QuarticOut,
        Curve::QuarticInOut,
        Curve::QuinticIn,
        Curve::QuinticOut,
        Curve::QuinticInOut,
        Curve::BackIn,
        Curve::BackOut,
        Curve::BackInOut,
        Curve::ElasticIn,
        Curve::ElasticOut,
        Curve::ElasticInOut,
        Curve::BounceIn,
        Curve::BounceOut,
        Curve::BounceInOut,
        Curve::SineIn,
        Curve::SineOut,
        Curve::SineInOut,
        Curve::ExponentialIn,
        Curve::ExponentialOut,
        Curve::ExponentialInOut,
        Curve::CircularIn,
        Curve::CircularOut,
        Curve::CircularInOut,
    ];

    /// Build the easing function for this preset
    pub fn easing(self) -> Easing {
        match self {
            Curve::Linear => Easing::linear(),
            Curve::QuadraticIn => power_in(2.0),
            Curve::QuadraticOut => power_out(2.0),
            Curve::QuadraticInOut => power_in_out(2.0),
            Curve::CubicIn => power_in(3.0),
            Curve::CubicOut => power_out(3.0),
            Curve::CubicInOut => power_in_out(3.0),
            Curve::QuarticIn => power_in(4.0),
            Curve::QuarticOut => power_out(4.0),
            Curve::QuarticInOut => power_in_out(4.0),
            Curve::QuinticIn => power_in(5.0),
            Curve::QuinticOut => power_out(5.0),
            Curve::QuinticInOut => power_in_out(5.0),
            Curve::BackIn => back_in(BACK_OVERSHOOT),
            Curve::BackOut => back_out(BACK_OVERSHOOT),
            Curve::BackInOut => back_in_out(BACK_OVERSHOOT),
            Curve::ElasticIn => elastic_in(ELASTIC_AMPLITUDE, ELASTIC_PERIOD),
            Curve::ElasticOut => elastic_out(ELASTIC_AMPLITUDE, ELASTIC_PERIOD),
            Curve::ElasticInOut => elastic_in_out(ELASTIC_AMPLITUDE, ELASTIC_PERIOD),
            Curve::BounceIn => bounce_in(),
            Curve::BounceOut => bounce_out(),
            Curve::BounceInOut => bounce_in_out(),
            Curve::SineIn => Easing::map(|p| 1.0 - (p * FRAC_PI_2).cos()),
            Curve::SineOut => Easing::map(|p| (p * FRAC_PI_2).sin()),
            Curve::SineInOut => Easing::map(|p| (1.0 - (p * PI).cos()) / 2.0),
            Curve::ExponentialIn => Easing::map(|p| 2f64.powf(10.0 * (p - 1.0))),
            Curve::ExponentialOut => Easing::map(|p| 1.0 - 2f64.powf(-10.0 * p)),
            Curve::ExponentialInOut => Easing::map(|p| {
                if p < 0.5 {
                    2f64.powf(10.0 * (p * 2.0 - 1.0)) / 2.0
                } else {
                    (2.0 - 2f64.powf(-10.0 * (p * 2.0 - 1.0))) / 2.0
                }
            }),
            // max(0) keeps progress slightly outside [0, 1] from producing NaN
            Curve::CircularIn => Easing::map(|p| 1.0 - (1.0 - p * p).max(0.0).sqrt()),
            Curve::CircularOut => Easing::map(|p| (1.0 - (p - 1.0).powi(2)).max(0.0).sqrt()),
            Curve::CircularInOut => Easing::map(|p| {
                if p < 0.5 {
                    (1.0 - (1.0 - (p * 2.0).powi(2)).max(0.0).sqrt()) / 2.0
                } else {
                    ((1.0 - (p * 2.0 - 2.0).powi(2)).max(0.0).sqrt() + 1.0) / 2.0
                }
            }),
        }
    }

    /// Kebab-case name, as accepted by [`FromStr`] and serde
    pub fn name(self) -> &'static str {
        match self {
            Curve::Linear => "linear",
            Curve::QuadraticIn => "quadratic-in",
            Curve::QuadraticOut => "quadratic-out",
            Curve::QuadraticInOut => "quadratic-in-out",
            Curve::CubicIn => "cubic-in",
            Curve::CubicOut => "cubic-out",
            Curve::CubicInOut => "cubic-in-out",
            Curve::QuarticIn => "quartic-in",
            Curve::QuarticOut => "quartic-out",
            Curve::QuarticInOut => "quartic-in-out",
            Curve::QuinticIn => "quintic-in",
            Curve::QuinticOut => "quintic-out",
            Curve::QuinticInOut => "quintic-in-out",
            Curve::BackIn => "back-in",
            Curve::BackOut => "back-out",
            Curve::BackInOut => "back-in-out",
            Curve::ElasticIn => "elastic-in",
            Curve::ElasticOut => "elastic-out",
            Curve::ElasticInOut => "elastic-in-out",
            Curve::BounceIn => "bounce-in",
            Curve::BounceOut => "bounce-out",
            Curve::BounceInOut => "bounce-in-out",
            Curve::SineIn => "sine-in",
            Curve::SineOut => "sine-out",
            Curve::SineInOut => "sine-in-out",
            Curve::ExponentialIn => "exponential-in",
            Curve::ExponentialOut => "exponential-out",
            Curve::ExponentialInOut => "exponential-in-out",
            Curve::CircularIn => "circular-in",
            Curve::CircularOut => "circular-out",
            Curve::CircularInOut => "circular-in-out",
        }
    }

    /// Whether the curve leaves `[start, end]` somewhere inside the range
    pub fn overshoots(self) -> bool {
        matches!(
            self,
            Curve::BackIn
                | Curve::BackOut
                | Curve::BackInOut
                | Curve::ElasticIn
                | Curve::ElasticOut
                | Curve::ElasticInOut
        )
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Curve> for Easing {
    fn from(curve: Curve) -> Self {
        curve.easing()
    }
}

/// Returned when parsing an unknown curve name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown curve `{0}`")]
pub struct ParseCurveError(pub String);

impl FromStr for Curve {
    type Err = ParseCurveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Curve::ALL
            .into_iter()
            .find(|curve| curve.name() == wanted)
            .ok_or_else(|| ParseCurveError(s.to_string()))
    }
}
