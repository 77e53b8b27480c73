//! Fixed-duration animations
//!
//! An [`Animation`] moves a progress ratio from 0 to 1 (or 1 to 0 when its
//! speed is negative) over a fixed duration and samples an [`Easing`] to turn
//! that progress into a value.
//!
//! State lives in three records ([`Values`], [`Frequency`], [`AnimationState`])
//! kept together in one snapshot behind an [`ArcSwap`]. The scheduler thread
//! and the caller thread both replace the snapshot wholesale, so a reader
//! such as a render loop calling [`Animation::value`] never blocks and never
//! sees a half-applied change.
//!
//! ```rust
//! use std::time::Duration;
//! use cadence_animation::{Animation, AnimationScheduler, Easing};
//!
//! let scheduler = AnimationScheduler::new();
//! let fade = Animation::new(scheduler.handle(), 0.0_f64, 100.0, 1000, Easing::linear());
//!
//! fade.start();
//! scheduler.advance(Duration::from_millis(250));
//! assert!((fade.value() - 25.0).abs() < 1e-6);
//! ```

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::easing::Easing;
use crate::events::{AnimationEvent, EventFilter, InstanceId, Listeners, Notification, Subscription};
use crate::scheduler::{SchedulerHandle, TaskHandle, Tick};
use crate::values::Interpolate;

// ============================================================================
// Records
// ============================================================================

/// Unit of an animation's duration; one unit is also its tick period
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeUnit {
    #[default]
    Milliseconds,
    Seconds,
    Minutes,
}

impl TimeUnit {
    const fn unit_millis(self) -> u64 {
        match self {
            TimeUnit::Milliseconds => 1,
            TimeUnit::Seconds => 1_000,
            TimeUnit::Minutes => 60_000,
        }
    }

    /// Convert `n` of this unit to milliseconds, saturating
    pub const fn to_millis(self, n: u64) -> u64 {
        n.saturating_mul(self.unit_millis())
    }

    pub const fn to_duration(self, n: u64) -> Duration {
        Duration::from_millis(self.to_millis(n))
    }
}

/// Start, end and progress of an animation
///
/// Progress is clamped into `[0, 1]` on construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Values<T> {
    start: T,
    end: T,
    progress: f64,
}

impl<T> Values<T> {
    pub fn new(start: T, end: T, progress: f64) -> Self {
        Self {
            start,
            end,
            progress: clamp_progress(progress),
        }
    }

    pub fn start(&self) -> &T {
        &self.start
    }

    pub fn end(&self) -> &T {
        &self.end
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }
}

fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// Speed, duration and unit of an animation
///
/// The duration is kept as a magnitude; the sign of the speed sets the
/// playback direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frequency {
    speed: f64,
    duration: u64,
    unit: TimeUnit,
}

impl Frequency {
    pub fn new(speed: f64, duration: i64, unit: TimeUnit) -> Self {
        Self {
            speed,
            duration: duration.unsigned_abs(),
            unit,
        }
    }

    /// Speed 1 over `duration` milliseconds
    pub fn millis(duration: i64) -> Self {
        Self::new(1.0, duration, TimeUnit::Milliseconds)
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Tick period: one unit
    pub fn period(&self) -> Duration {
        self.unit.to_duration(1)
    }

    /// Per-tick progress delta before dividing by the duration, in milliseconds
    pub fn accumulation(&self) -> f64 {
        self.unit.to_millis(1) as f64 * self.speed
    }

    /// Progress added by one tick
    ///
    /// A zero duration moves the whole way in one tick.
    pub fn step(&self) -> f64 {
        let duration = self.unit.to_millis(self.duration);
        if duration == 0 {
            if self.speed == 0.0 {
                0.0
            } else {
                self.speed.signum()
            }
        } else {
            self.accumulation() / duration as f64
        }
    }

    fn with_speed(self, speed: f64) -> Self {
        Self { speed, ..self }
    }
}

/// Easing, flags and the live task of an animation
#[derive(Clone, Debug)]
pub struct AnimationState {
    easing: Easing,
    sensitive: bool,
    looping: bool,
    task: Option<TaskHandle>,
}

impl AnimationState {
    pub fn easing(&self) -> &Easing {
        &self.easing
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn task(&self) -> Option<&TaskHandle> {
        self.task.as_ref()
    }
}

#[derive(Clone)]
struct Snapshot<T> {
    values: Values<T>,
    frequency: Frequency,
    state: AnimationState,
    /// Progress range covered by the latest step
    passed: Option<(f64, f64)>,
}

impl<T> Snapshot<T> {
    fn is_completed(&self) -> bool {
        let speed = self.frequency.speed;
        let progress = self.values.progress;
        (speed > 0.0 && progress >= 1.0) || (speed < 0.0 && progress <= 0.0)
    }

    fn is_playing(&self) -> bool {
        self.state.task.as_ref().is_some_and(|task| !task.is_cancelled())
    }

    fn is_paused(&self) -> bool {
        self.state.task.as_ref().is_some_and(TaskHandle::is_cancelled)
    }

    fn is_passing(&self, at: f64) -> bool {
        if !(0.0..=1.0).contains(&at) {
            return false;
        }
        let Some((from, to)) = self.passed else {
            return false;
        };
        if to > from {
            (at > from || (at == from && from == 0.0)) && at <= to
        } else if to < from {
            (at < from || (at == from && from == 1.0)) && at >= to
        } else {
            false
        }
    }

    fn reset(&mut self) {
        let bound = if self.frequency.speed < 0.0 { 1.0 } else { 0.0 };
        self.values.progress = bound;
        self.passed = None;
    }
}

impl<T: Interpolate> Snapshot<T> {
    fn sample(&self, progress: f64) -> T {
        T::eased(&self.values.start, &self.values.end, &self.state.easing, progress)
    }
}

impl<T: Interpolate + PartialOrd> Snapshot<T> {
    /// Eased value moved across `at` during the latest step, landing on it included
    fn is_passing_value(&self, at: &T) -> bool {
        let Some((from, to)) = self.passed else {
            return false;
        };
        let last = self.sample(from);
        let current = self.sample(to);
        (last < *at && *at <= current) || (last > *at && *at >= current)
    }
}

// ============================================================================
// Shared state
// ============================================================================

struct AnimationShared<T> {
    id: InstanceId,
    scheduler: SchedulerHandle,
    snapshot: ArcSwap<Snapshot<T>>,
    /// Serializes lifecycle transitions and ticks
    control: ReentrantMutex<()>,
    listeners: Listeners<AnimationEvent>,
    weak_self: Weak<Self>,
}

impl<T: Interpolate> AnimationShared<T> {
    fn load(&self) -> Arc<Snapshot<T>> {
        self.snapshot.load_full()
    }

    fn update(&self, mut f: impl FnMut(&mut Snapshot<T>)) {
        self.snapshot.rcu(|current| {
            let mut next = (**current).clone();
            f(&mut next);
            next
        });
    }

    fn emit(&self, event: AnimationEvent) {
        self.listeners.emit(self.id, event);
    }

    fn schedule(&self, initial_delay: Duration) -> Option<TaskHandle> {
        let runner: Weak<dyn Tick> = self.weak_self.clone();
        let period = self.load().frequency.period();
        let task = self.scheduler.register(runner, period, initial_delay);
        if task.is_none() {
            warn!("animation {} not scheduled: scheduler is gone", self.id);
        }
        task
    }

    fn set_task(&self, task: Option<TaskHandle>) {
        self.update(|snap| snap.state.task = task.clone());
    }

    fn start(&self) {
        let _control = self.control.lock();
        if self.load().state.task.is_some() {
            return;
        }
        self.update(Snapshot::reset);
        self.emit(AnimationEvent::Start);
        let task = self.schedule(Duration::ZERO);
        self.set_task(task);
        debug!("animation {} started", self.id);
    }

    fn pause(&self) {
        let _control = self.control.lock();
        let snap = self.load();
        if !snap.is_playing() {
            return;
        }
        self.emit(AnimationEvent::Pause);
        if let Some(task) = &snap.state.task {
            task.cancel();
        }
        debug!("animation {} paused at {:.3}", self.id, snap.values.progress);
    }

    fn resume(&self) {
        let _control = self.control.lock();
        if !self.load().is_paused() {
            return;
        }
        self.emit(AnimationEvent::Resume);
        let task = self.schedule(Duration::ZERO);
        self.set_task(task);
        debug!("animation {} resumed", self.id);
    }

    fn terminate(&self) {
        let _control = self.control.lock();
        let Some(task) = self.load().state.task.clone() else {
            return;
        };
        task.cancel();
        self.set_task(None);
        debug!("animation {} terminated", self.id);
    }

    /// Re-register at the current period so cadence changes apply now
    fn reschedule(&self) {
        let _control = self.control.lock();
        let snap = self.load();
        if !snap.state.sensitive || !snap.is_playing() {
            return;
        }
        if let Some(task) = &snap.state.task {
            task.cancel();
        }
        let task = self.schedule(snap.frequency.period());
        self.set_task(task);
    }

    fn step(&self) {
        self.update(|snap| {
            let from = snap.values.progress;
            let to = clamp_progress(from + snap.frequency.step());
            snap.values.progress = to;
            snap.passed = Some((from, to));
        });
    }
}

impl<T: Interpolate> Tick for AnimationShared<T> {
    fn tick(&self) {
        let _control = self.control.lock();
        if !self.load().is_playing() {
            return;
        }

        self.emit(AnimationEvent::FrameStart);
        let snap = self.load();
        if snap.is_completed() {
            if snap.state.looping {
                self.emit(AnimationEvent::Loop);
                self.update(Snapshot::reset);
                self.step();
            } else {
                self.update(|snap| snap.passed = None);
                self.emit(AnimationEvent::Complete);
                self.terminate();
            }
        } else {
            self.step();
        }
        self.emit(AnimationEvent::FrameComplete);
    }
}

// ============================================================================
// Animation
// ============================================================================

/// A value moving between two endpoints over a fixed duration
///
/// Created idle; [`start`](Self::start) registers it with the scheduler.
/// Dropping the animation cancels its task.
pub struct Animation<T: Interpolate> {
    shared: Arc<AnimationShared<T>>,
}

impl<T: Interpolate> Animation<T> {
    /// Speed 1, `duration` in milliseconds
    pub fn new(
        scheduler: SchedulerHandle,
        start: T,
        end: T,
        duration: i64,
        easing: impl Into<Easing>,
    ) -> Self {
        Self::with_frequency(scheduler, start, end, Frequency::millis(duration), easing)
    }

    pub fn with_frequency(
        scheduler: SchedulerHandle,
        start: T,
        end: T,
        frequency: Frequency,
        easing: impl Into<Easing>,
    ) -> Self {
        let snapshot = Snapshot {
            values: Values::new(start, end, 0.0),
            frequency,
            state: AnimationState {
                easing: easing.into(),
                sensitive: false,
                looping: false,
                task: None,
            },
            passed: None,
        };
        let shared = Arc::new_cyclic(|weak_self| AnimationShared {
            id: InstanceId::next(),
            scheduler,
            snapshot: ArcSwap::from_pointee(snapshot),
            control: ReentrantMutex::new(()),
            listeners: Listeners::new(),
            weak_self: weak_self.clone(),
        });
        Self { shared }
    }

    fn snap(&self) -> Arc<Snapshot<T>> {
        self.shared.load()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> InstanceId {
        self.shared.id
    }

    pub fn values(&self) -> Values<T> {
        self.snap().values.clone()
    }

    pub fn frequency(&self) -> Frequency {
        self.snap().frequency
    }

    pub fn state(&self) -> AnimationState {
        self.snap().state.clone()
    }

    pub fn start_value(&self) -> T {
        self.snap().values.start.clone()
    }

    pub fn end_value(&self) -> T {
        self.snap().values.end.clone()
    }

    pub fn progress(&self) -> f64 {
        self.snap().values.progress
    }

    pub fn speed(&self) -> f64 {
        self.snap().frequency.speed
    }

    pub fn duration(&self) -> u64 {
        self.snap().frequency.duration
    }

    pub fn unit(&self) -> TimeUnit {
        self.snap().frequency.unit
    }

    pub fn period(&self) -> Duration {
        self.snap().frequency.period()
    }

    pub fn accumulation(&self) -> f64 {
        self.snap().frequency.accumulation()
    }

    pub fn easing(&self) -> Easing {
        self.snap().state.easing.clone()
    }

    pub fn is_sensitive(&self) -> bool {
        self.snap().state.sensitive
    }

    pub fn is_looping(&self) -> bool {
        self.snap().state.looping
    }

    /// Current value
    pub fn value(&self) -> T {
        let snap = self.snap();
        self.sample(&snap, snap.values.progress)
    }

    /// Current value, never outside the range between the endpoints
    pub fn value_clamped(&self) -> T {
        let snap = self.snap();
        T::eased_clamped(
            &snap.values.start,
            &snap.values.end,
            &snap.state.easing,
            snap.values.progress,
        )
    }

    /// Value at an arbitrary progress
    pub fn value_at(&self, progress: f64) -> T {
        self.sample(&self.snap(), progress)
    }

    /// Current progress after easing, on a `0..1` scale
    pub fn eased_progress(&self) -> f64 {
        let snap = self.snap();
        snap.state.easing.apply(0.0, 1.0, snap.values.progress)
    }

    fn sample(&self, snap: &Snapshot<T>, progress: f64) -> T {
        snap.sample(progress)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub fn is_positive(&self) -> bool {
        self.speed() > 0.0
    }

    pub fn is_negative(&self) -> bool {
        self.speed() < 0.0
    }

    /// Scheduled and advancing
    pub fn is_playing(&self) -> bool {
        self.snap().is_playing()
    }

    /// Task cancelled by [`pause`](Self::pause), values kept
    pub fn is_paused(&self) -> bool {
        self.snap().is_paused()
    }

    /// Not scheduled at all
    pub fn is_idle(&self) -> bool {
        self.snap().state.task.is_none()
    }

    /// Progress has reached the bound opposite the one it started from
    pub fn is_completed(&self) -> bool {
        self.snap().is_completed()
    }

    /// Whether the latest step moved progress across `at`
    pub fn is_passing(&self, at: f64) -> bool {
        self.snap().is_passing(at)
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    pub fn set_start_value(&self, start: T) {
        self.shared.update(|snap| snap.values.start = start.clone());
    }

    pub fn set_end_value(&self, end: T) {
        self.shared.update(|snap| snap.values.end = end.clone());
    }

    pub fn set_speed(&self, speed: f64) {
        self.shared
            .update(|snap| snap.frequency = snap.frequency.with_speed(speed));
        self.shared.reschedule();
    }

    pub fn negate_speed(&self) {
        self.set_speed(-self.speed());
    }

    pub fn set_speed_direction(&self, positive: bool) {
        let magnitude = self.speed().abs();
        self.set_speed(if positive { magnitude } else { -magnitude });
    }

    /// Negative durations are stored as their magnitude
    pub fn set_duration(&self, duration: i64) {
        self.shared.update(|snap| {
            snap.frequency = Frequency::new(snap.frequency.speed, duration, snap.frequency.unit)
        });
        self.shared.reschedule();
    }

    pub fn set_unit(&self, unit: TimeUnit) {
        self.shared
            .update(|snap| snap.frequency = Frequency { unit, ..snap.frequency });
        self.shared.reschedule();
    }

    pub fn set_easing(&self, easing: impl Into<Easing>) {
        let easing = easing.into();
        self.shared
            .update(|snap| snap.state.easing = easing.clone());
        self.shared.reschedule();
    }

    /// Replace the easing with a function of the current one
    pub fn map_easing(&self, f: impl Fn(&Easing) -> Easing) {
        self.shared
            .update(|snap| snap.state.easing = f(&snap.state.easing));
        self.shared.reschedule();
    }

    /// Apply cadence changes to a running schedule immediately
    pub fn set_sensitive(&self, sensitive: bool) {
        self.shared.update(|snap| snap.state.sensitive = sensitive);
    }

    pub fn set_looping(&self, looping: bool) {
        self.shared.update(|snap| snap.state.looping = looping);
        self.shared.reschedule();
    }

    pub fn toggle_looping(&self) {
        self.shared
            .update(|snap| snap.state.looping = !snap.state.looping);
        self.shared.reschedule();
    }

    /// `progress = 1 - progress`
    pub fn reverse_progress(&self) {
        self.shared.update(|snap| {
            snap.values.progress = clamp_progress(1.0 - snap.values.progress);
            snap.passed = None;
        });
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Reset and schedule; does nothing unless idle
    pub fn start(&self) {
        self.shared.start();
    }

    pub fn pause(&self) {
        self.shared.pause();
    }

    pub fn resume(&self) {
        self.shared.resume();
    }

    pub fn pause_or_resume(&self) {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Cancel the task without emitting any event
    pub fn terminate(&self) {
        self.shared.terminate();
    }

    /// Move progress back to the bound it starts from
    pub fn reset(&self) {
        self.shared.update(Snapshot::reset);
    }

    pub fn replay(&self) {
        let _control = self.shared.control.lock();
        self.shared.terminate();
        self.shared.start();
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    pub fn subscribe<F>(&self, filter: impl Into<EventFilter<AnimationEvent>>, f: F) -> Subscription
    where
        F: Fn(&Notification<AnimationEvent>) + Send + Sync + 'static,
    {
        self.shared.listeners.subscribe(filter, f)
    }

    fn on(&self, event: AnimationEvent, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.subscribe(event, move |_| f())
    }

    pub fn on_start(&self, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.on(AnimationEvent::Start, f)
    }

    pub fn on_pause(&self, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.on(AnimationEvent::Pause, f)
    }

    pub fn on_resume(&self, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.on(AnimationEvent::Resume, f)
    }

    pub fn on_complete(&self, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.on(AnimationEvent::Complete, f)
    }

    pub fn on_loop(&self, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.on(AnimationEvent::Loop, f)
    }

    pub fn on_frame_start(&self, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.on(AnimationEvent::FrameStart, f)
    }

    pub fn on_frame_complete(&self, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.on(AnimationEvent::FrameComplete, f)
    }

    /// Frame-start callback for the frame after progress crosses `at`
    pub fn on_frame_start_at(&self, at: f64, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.on_passing(AnimationEvent::FrameStart, at, f)
    }

    /// Frame-complete callback for the frame in which progress crosses `at`
    pub fn on_frame_complete_at(
        &self,
        at: f64,
        f: impl Fn() + Send + Sync + 'static,
    ) -> Subscription {
        self.on_passing(AnimationEvent::FrameComplete, at, f)
    }

    fn on_passing(
        &self,
        event: AnimationEvent,
        at: f64,
        f: impl Fn() + Send + Sync + 'static,
    ) -> Subscription {
        let shared = Arc::downgrade(&self.shared);
        self.on(event, move || {
            if shared.upgrade().is_some_and(|shared| shared.load().is_passing(at)) {
                f();
            }
        })
    }
}

impl<T: Interpolate + PartialOrd> Animation<T> {
    /// Whether the latest step moved the eased value across `at`
    ///
    /// Works on values rather than progress, so overshooting curves can
    /// pass the same value more than once per run.
    pub fn is_passing_value(&self, at: &T) -> bool {
        self.snap().is_passing_value(at)
    }

    /// Frame-start callback for the frame after the value crosses `at`
    pub fn on_frame_start_at_value(&self, at: T, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.on_passing_value(AnimationEvent::FrameStart, at, f)
    }

    /// Frame-complete callback for the frame in which the value crosses `at`
    pub fn on_frame_complete_at_value(
        &self,
        at: T,
        f: impl Fn() + Send + Sync + 'static,
    ) -> Subscription {
        self.on_passing_value(AnimationEvent::FrameComplete, at, f)
    }

    fn on_passing_value(
        &self,
        event: AnimationEvent,
        at: T,
        f: impl Fn() + Send + Sync + 'static,
    ) -> Subscription {
        let shared = Arc::downgrade(&self.shared);
        self.on(event, move || {
            if shared
                .upgrade()
                .is_some_and(|shared| shared.load().is_passing_value(&at))
            {
                f();
            }
        })
    }
}

impl<T: Interpolate> Drop for Animation<T> {
    fn drop(&mut self) {
        self.shared.terminate();
    }
}

impl<T: Interpolate + fmt::Debug> fmt::Debug for Animation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snap = self.snap();
        f.debug_struct("Animation")
            .field("id", &self.shared.id)
            .field("values", &snap.values)
            .field("frequency", &snap.frequency)
            .field("playing", &snap.is_playing())
            .field("paused", &snap.is_paused())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::Curve;
    use crate::scheduler::AnimationScheduler;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_linear_halfway() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 100.0, 1000, Easing::linear());
        anim.start();

        for _ in 0..5 {
            scheduler.advance(ms(100));
        }
        assert!((anim.progress() - 0.5).abs() < 1e-6);
        assert!((anim.value() - 50.0).abs() < 1e-6);
        assert!(anim.is_playing());
    }

    #[test]
    fn test_completion_fires_once() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 1.0, 10, Easing::linear());
        let (completes, on_complete) = counter();
        anim.on_complete(on_complete);

        anim.start();
        scheduler.advance(ms(50));

        assert_eq!(completes.load(Ordering::SeqCst), 1);
        assert_eq!(anim.progress(), 1.0);
        assert!(anim.is_completed());
        assert!(anim.is_idle());
        assert_eq!(scheduler.task_count(), 0);
    }

    #[test]
    fn test_event_order() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 1.0, 2, Easing::linear());
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();
        let source = anim.id();
        anim.subscribe(EventFilter::Any, move |n| {
            assert_eq!(n.source, source);
            l.lock().push(n.event);
        });

        anim.start();
        scheduler.advance(ms(10));

        use AnimationEvent::*;
        assert_eq!(
            *log.lock(),
            vec![
                Start,
                FrameStart,
                FrameComplete,
                FrameStart,
                FrameComplete,
                FrameStart,
                Complete,
                FrameComplete
            ]
        );
    }

    #[test]
    fn test_looping_progress_is_monotonic_between_loops() {
        let scheduler = AnimationScheduler::new();
        let anim = Arc::new(Animation::new(scheduler.handle(), 0.0_f64, 1.0, 4, Easing::linear()));
        anim.set_looping(true);

        let (loops, on_loop) = counter();
        anim.on_loop(on_loop);

        let samples = Arc::new(Mutex::new(Vec::new()));
        let (s, weak) = (samples.clone(), Arc::downgrade(&anim));
        anim.on_frame_complete(move || {
            if let Some(anim) = weak.upgrade() {
                s.lock().push(anim.progress());
            }
        });

        anim.start();
        scheduler.advance(ms(20));

        assert_eq!(loops.load(Ordering::SeqCst), 4);
        assert!(anim.is_playing());

        let samples = samples.lock();
        assert_eq!(samples.len(), 20);
        for pair in samples.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!((0.0..=1.0).contains(&b));
            // Only a loop may move progress backwards
            assert!(b >= a || a == 1.0, "{a} -> {b}");
        }
    }

    #[test]
    fn test_pause_resume_keeps_progress() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 100.0, 1000, Easing::linear());
        let (pauses, on_pause) = counter();
        let (resumes, on_resume) = counter();
        anim.on_pause(on_pause);
        anim.on_resume(on_resume);

        anim.start();
        scheduler.advance(ms(300));
        anim.pause();
        assert!(anim.is_paused());
        assert!(!anim.is_playing());
        assert!((anim.progress() - 0.3).abs() < 1e-6);

        scheduler.advance(ms(1000));
        assert!((anim.progress() - 0.3).abs() < 1e-6);

        anim.resume();
        assert!(anim.is_playing());
        scheduler.advance(ms(100));
        assert!((anim.progress() - 0.4).abs() < 1e-6);

        // Pausing twice and resuming twice only count once each
        anim.pause();
        anim.pause();
        anim.resume();
        anim.resume();
        assert_eq!(pauses.load(Ordering::SeqCst), 2);
        assert_eq!(resumes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_pause_or_resume_toggles() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 1.0, 100, Easing::linear());
        anim.start();
        anim.pause_or_resume();
        assert!(anim.is_paused());
        anim.pause_or_resume();
        assert!(anim.is_playing());
    }

    #[test]
    fn test_negative_speed_runs_backwards() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 100.0, 1000, Easing::linear());
        anim.set_speed(-1.0);
        assert!(anim.is_negative());

        anim.start();
        assert_eq!(anim.progress(), 1.0);
        scheduler.advance(ms(500));
        assert!((anim.value() - 50.0).abs() < 1e-6);

        scheduler.advance(ms(600));
        assert_eq!(anim.progress(), 0.0);
        assert!(anim.is_completed());
        assert!(anim.is_idle());
    }

    #[test]
    fn test_speed_scales_step() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 1.0, 1000, Easing::linear());
        anim.set_speed(2.0);
        anim.start();
        scheduler.advance(ms(100));
        assert!((anim.progress() - 0.2).abs() < 1e-6);
        assert_eq!(anim.accumulation(), 2.0);
    }

    #[test]
    fn test_zero_duration_completes_in_one_tick() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 10.0, 0, Easing::linear());
        anim.start();
        scheduler.advance(ms(1));
        assert_eq!(anim.value(), 10.0);
        scheduler.advance(ms(1));
        assert!(anim.is_idle());
        assert!(!anim.progress().is_nan());
    }

    #[test]
    fn test_negative_duration_is_magnitude() {
        let frequency = Frequency::new(1.0, -250, TimeUnit::Milliseconds);
        assert_eq!(frequency.duration(), 250);

        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 1.0, 10, Easing::linear());
        anim.set_duration(-40);
        assert_eq!(anim.duration(), 40);
    }

    #[test]
    fn test_time_units() {
        assert_eq!(TimeUnit::Seconds.to_millis(3), 3_000);
        assert_eq!(TimeUnit::Minutes.to_duration(1), Duration::from_secs(60));
        assert_eq!(TimeUnit::Minutes.to_millis(u64::MAX), u64::MAX);

        let frequency = Frequency::new(1.0, 4, TimeUnit::Seconds);
        assert_eq!(frequency.period(), Duration::from_secs(1));
        assert!((frequency.step() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_terminate_is_silent() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 1.0, 100, Easing::linear());
        let (pauses, on_pause) = counter();
        anim.on_pause(on_pause);

        anim.start();
        scheduler.advance(ms(10));
        anim.terminate();

        assert!(anim.is_idle());
        assert_eq!(pauses.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.task_count(), 0);
        let progress = anim.progress();
        scheduler.advance(ms(10));
        assert_eq!(anim.progress(), progress);
    }

    #[test]
    fn test_start_only_from_idle() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 1.0, 100, Easing::linear());
        let (starts, on_start) = counter();
        anim.on_start(on_start);

        anim.start();
        scheduler.advance(ms(10));
        anim.start();
        assert!((anim.progress() - 0.1).abs() < 1e-6);

        anim.pause();
        anim.start();
        assert!(anim.is_paused());
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_replay_restarts() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 1.0, 100, Easing::linear());
        let (starts, on_start) = counter();
        anim.on_start(on_start);

        anim.start();
        scheduler.advance(ms(50));
        anim.replay();

        assert_eq!(anim.progress(), 0.0);
        assert!(anim.is_playing());
        assert_eq!(starts.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.task_count(), 1);
    }

    #[test]
    fn test_sensitive_unit_change_reschedules() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 1.0, 10, Easing::linear());
        anim.start();
        scheduler.advance(ms(2));
        assert!((anim.progress() - 0.2).abs() < 1e-9);

        anim.set_sensitive(true);
        anim.set_unit(TimeUnit::Seconds);
        assert_eq!(anim.period(), Duration::from_secs(1));
        assert!(anim.is_playing());
        assert_eq!(scheduler.task_count(), 1);

        // Next tick lands one second after the change, at 1002ms
        scheduler.advance(ms(999));
        assert!((anim.progress() - 0.2).abs() < 1e-9);
        scheduler.advance(ms(2));
        assert!((anim.progress() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_insensitive_change_keeps_schedule() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 1.0, 10, Easing::linear());
        anim.start();
        let task = anim.state().task().cloned().unwrap();

        anim.set_speed(0.5);
        let same = anim.state().task().cloned().unwrap();
        assert_eq!(task.id(), same.id());
        assert!(!task.is_cancelled());
    }

    #[test]
    fn test_frame_callbacks_at_progress() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 1.0, 10, Easing::linear());
        let (halfway, on_halfway) = counter();
        let (origin, on_origin) = counter();
        anim.on_frame_complete_at(0.5, on_halfway);
        anim.on_frame_complete_at(0.0, on_origin);
        anim.on_frame_complete_at(1.5, || panic!("out of range"));

        anim.start();
        scheduler.advance(ms(20));

        assert_eq!(halfway.load(Ordering::SeqCst), 1);
        assert_eq!(origin.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_frame_callbacks_at_value() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 100.0, 10, Easing::linear());
        let (crossings, on_crossing) = counter();
        anim.on_frame_complete_at_value(55.0, on_crossing);
        anim.on_frame_complete_at_value(-1.0, || panic!("never reached"));

        anim.start();
        scheduler.advance(ms(6));
        // Latest step went from 50 to 60
        assert!(anim.is_passing_value(&55.0));
        assert!(!anim.is_passing_value(&45.0));

        scheduler.advance(ms(20));
        assert_eq!(crossings.load(Ordering::SeqCst), 1);
        assert!(!anim.is_passing_value(&55.0));
    }

    #[test]
    fn test_overshoot_passes_value_twice() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 10.0, 20, Curve::BackIn);
        let (crossings, on_crossing) = counter();
        // BackIn dips below the start before heading to the end
        anim.on_frame_complete_at_value(-0.5, on_crossing);

        anim.start();
        scheduler.advance(ms(30));
        assert_eq!(crossings.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_value_clamped() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 10.0, 100, Curve::BackIn);
        assert!(anim.value_at(0.2) < 0.0);
        anim.start();
        scheduler.advance(ms(20));
        assert!(anim.value() < 0.0);
        assert_eq!(anim.value_clamped(), 0.0);
    }

    #[test]
    fn test_reverse_progress() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 1.0, 10, Easing::linear());
        anim.start();
        scheduler.advance(ms(3));
        anim.reverse_progress();
        assert!((anim.progress() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_endpoints_change_mid_flight() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 10.0, 10, Easing::linear());
        anim.start();
        scheduler.advance(ms(5));
        anim.set_end_value(20.0);
        assert!((anim.value() - 10.0).abs() < 1e-9);
        assert_eq!(anim.end_value(), 20.0);
    }

    #[test]
    fn test_map_easing() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 10.0, 10, Easing::linear());
        anim.map_easing(Easing::opposite);
        assert_eq!(anim.value(), 10.0);
        assert_eq!(anim.eased_progress(), 1.0);
    }

    #[test]
    fn test_drop_cancels_task() {
        let scheduler = AnimationScheduler::new();
        let anim = Animation::new(scheduler.handle(), 0.0_f64, 1.0, 100, Easing::linear());
        anim.start();
        assert_eq!(scheduler.task_count(), 1);
        drop(anim);
        assert_eq!(scheduler.task_count(), 0);
    }

    #[test]
    fn test_start_without_scheduler_stays_idle() {
        let scheduler = AnimationScheduler::new();
        let handle = scheduler.handle();
        drop(scheduler);

        let anim = Animation::new(handle, 0.0, 1.0, 100, Easing::linear());
        anim.start();
        assert!(anim.is_idle());
    }

    #[test]
    fn test_callback_can_drive_animation() {
        let scheduler = AnimationScheduler::new();
        let anim = Arc::new(Animation::new(scheduler.handle(), 0.0_f64, 1.0, 4, Easing::linear()));
        let weak = Arc::downgrade(&anim);
        // Turn around at the end instead of completing
        anim.on_frame_start(move || {
            if let Some(anim) = weak.upgrade() {
                if anim.is_completed() && anim.is_positive() {
                    anim.negate_speed();
                }
            }
        });

        anim.start();
        scheduler.advance(ms(9));
        assert!(anim.is_negative());
        assert!(anim.progress() < 1.0);
    }
}
