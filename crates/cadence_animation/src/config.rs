//! Engine configuration
//!
//! Plain serde structs so hosts can keep scheduler and interpolation
//! settings in their own config files. Durations are written in
//! milliseconds (`max_park_ms`, `period_ms`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::values::EPSILON;

/// What the background worker does with ticks it fell behind on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverrunPolicy {
    /// Run a late task once and skip its missed periods
    #[default]
    Drop,
    /// Run every missed period back to back
    CatchUp,
}

/// Background scheduler settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Name of the worker thread
    pub thread_name: String,
    /// Longest the worker sleeps when no task is due
    pub max_park_ms: u64,
    pub overrun: OverrunPolicy,
}

impl SchedulerConfig {
    pub fn max_park(&self) -> Duration {
        Duration::from_millis(self.max_park_ms.max(1))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            thread_name: "cadence-scheduler".to_string(),
            max_park_ms: 100,
            overrun: OverrunPolicy::Drop,
        }
    }
}

/// Settings for an [`Interpolation`](crate::Interpolation)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationOptions {
    /// Fraction of the remaining gap closed per tick, clamped into `(0, 1]`
    pub ratio: f64,
    /// Tick period
    #[serde(rename = "period_ms", with = "millis")]
    pub period: Duration,
    /// Distance at which the value counts as arrived
    pub epsilon: f64,
}

impl InterpolationOptions {
    pub fn with_ratio(ratio: f64) -> Self {
        Self {
            ratio,
            ..Self::default()
        }
    }
}

impl Default for InterpolationOptions {
    fn default() -> Self {
        Self {
            ratio: 0.1,
            period: Duration::from_millis(1),
            epsilon: EPSILON,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
