//! Target-chasing interpolation
//!
//! An [`Interpolation`] has no duration. Every tick it closes a fixed
//! fraction (the *ratio*) of the remaining gap to its target, which can be
//! moved at any time. It stays registered indefinitely: once it arrives it
//! idles at the target, and a new target sets it moving again.
//!
//! ```rust
//! use std::time::Duration;
//! use cadence_animation::{AnimationScheduler, Interpolation};
//!
//! let scheduler = AnimationScheduler::new();
//! let follow = Interpolation::new(scheduler.handle(), 0.0_f64, 0.5);
//!
//! follow.set_target(100.0);
//! scheduler.advance(Duration::from_millis(2));
//! assert_eq!(follow.value(), 75.0);
//! ```

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::ReentrantMutex;
use tracing::{debug, warn};

use crate::config::InterpolationOptions;
use crate::events::{
    EventFilter, InstanceId, InterpolationEvent, Listeners, Notification, Subscription,
};
use crate::scheduler::{SchedulerHandle, TaskHandle, Tick};
use crate::values::Interpolate;

fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        1.0
    } else {
        ratio.clamp(f64::EPSILON, 1.0)
    }
}

#[derive(Clone)]
struct Snapshot<T> {
    value: T,
    last: T,
    target: T,
    ratio: f64,
    /// Set by the first target, never cleared
    available: bool,
    /// Set on the tick the value arrives, cleared once it leaves again
    completed: bool,
    task: Option<TaskHandle>,
}

impl<T> Snapshot<T> {
    fn is_playing(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_cancelled())
    }

    fn is_paused(&self) -> bool {
        self.task.as_ref().is_some_and(TaskHandle::is_cancelled)
    }
}

struct InterpolationShared<T> {
    id: InstanceId,
    scheduler: SchedulerHandle,
    period: Duration,
    epsilon: f64,
    snapshot: ArcSwap<Snapshot<T>>,
    control: ReentrantMutex<()>,
    listeners: Listeners<InterpolationEvent>,
    weak_self: Weak<Self>,
}

impl<T: Interpolate> InterpolationShared<T> {
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

    fn emit(&self, event: InterpolationEvent) {
        self.listeners.emit(self.id, event);
    }

    fn is_completed(&self, snap: &Snapshot<T>) -> bool {
        snap.value.approx_eq(&snap.target, self.epsilon)
    }

    fn schedule(&self) {
        let runner: Weak<dyn Tick> = self.weak_self.clone();
        let task = self.scheduler.register(runner, self.period, Duration::ZERO);
        if task.is_none() {
            warn!("interpolation {} not scheduled: scheduler is gone", self.id);
        }
        self.update(|snap| snap.task = task.clone());
    }

    fn set_target(&self, target: T) {
        let _control = self.control.lock();
        let first = !self.load().available;
        self.update(|snap| snap.target = target.clone());
        if first {
            self.schedule();
            // Stays unavailable if the scheduler is gone, so a later target retries
            if self.load().task.is_some() {
                self.update(|snap| snap.available = true);
                debug!("interpolation {} started", self.id);
            }
        }
    }

    fn pause(&self) {
        let _control = self.control.lock();
        let snap = self.load();
        if !snap.is_playing() {
            return;
        }
        self.emit(InterpolationEvent::Pause);
        if let Some(task) = &snap.task {
            task.cancel();
        }
        debug!("interpolation {} paused", self.id);
    }

    fn resume(&self) {
        let _control = self.control.lock();
        if !self.load().is_paused() {
            return;
        }
        self.emit(InterpolationEvent::Resume);
        self.schedule();
        debug!("interpolation {} resumed", self.id);
    }

    fn cancel(&self) {
        let _control = self.control.lock();
        if let Some(task) = &self.load().task {
            task.cancel();
        }
    }
}

impl<T: Interpolate> Tick for InterpolationShared<T> {
    fn tick(&self) {
        let _control = self.control.lock();
        let snap = self.load();
        if !snap.available || !snap.is_playing() {
            return;
        }

        self.emit(InterpolationEvent::FrameStart);

        let snap = self.load();
        if self.is_completed(&snap) {
            if !snap.completed {
                self.update(|snap| snap.completed = true);
                self.emit(InterpolationEvent::Complete);
            }
        } else if snap.completed {
            self.update(|snap| snap.completed = false);
        }

        self.update(|snap| {
            snap.last = snap.value.clone();
            snap.value = snap.value.lerp(&snap.target, snap.ratio);
        });

        self.emit(InterpolationEvent::FrameComplete);
    }
}

/// A value that keeps chasing a movable target
///
/// Idle until the first [`set_target`](Self::set_target); never finishes on
/// its own. Dropping it cancels its task.
pub struct Interpolation<T: Interpolate> {
    shared: Arc<InterpolationShared<T>>,
}

impl<T: Interpolate> Interpolation<T> {
    /// Start at `initial`, closing `ratio` of the gap every millisecond
    pub fn new(scheduler: SchedulerHandle, initial: T, ratio: f64) -> Self {
        Self::with_options(scheduler, initial, InterpolationOptions::with_ratio(ratio))
    }

    pub fn with_options(scheduler: SchedulerHandle, initial: T, options: InterpolationOptions) -> Self {
        let snapshot = Snapshot {
            value: initial.clone(),
            last: initial.clone(),
            target: initial,
            ratio: clamp_ratio(options.ratio),
            available: false,
            completed: false,
            task: None,
        };
        let shared = Arc::new_cyclic(|weak_self| InterpolationShared {
            id: InstanceId::next(),
            scheduler,
            period: options.period,
            epsilon: options.epsilon.abs(),
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

    pub fn id(&self) -> InstanceId {
        self.shared.id
    }

    pub fn value(&self) -> T {
        self.snap().value.clone()
    }

    /// Value before the latest tick
    pub fn last(&self) -> T {
        self.snap().last.clone()
    }

    pub fn target(&self) -> T {
        self.snap().target.clone()
    }

    pub fn ratio(&self) -> f64 {
        self.snap().ratio
    }

    pub fn epsilon(&self) -> f64 {
        self.shared.epsilon
    }

    pub fn period(&self) -> Duration {
        self.shared.period
    }

    /// Whether a target has been set and the interpolation got scheduled
    pub fn is_available(&self) -> bool {
        self.snap().available
    }

    pub fn is_playing(&self) -> bool {
        self.snap().is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.snap().is_paused()
    }

    /// Value within `epsilon` of the target
    pub fn is_completed(&self) -> bool {
        self.shared.is_completed(&self.snap())
    }

    /// Chase a new target; the first call also schedules the interpolation
    pub fn set_target(&self, target: T) {
        self.shared.set_target(target);
    }

    /// Jump to `value` without animating
    pub fn reset(&self, value: T) {
        self.shared.update(|snap| {
            snap.value = value.clone();
            snap.last = value.clone();
        });
    }

    /// Clamped into `(0, 1]`
    pub fn set_ratio(&self, ratio: f64) {
        let ratio = clamp_ratio(ratio);
        self.shared.update(|snap| snap.ratio = ratio);
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

    pub fn subscribe<F>(
        &self,
        filter: impl Into<EventFilter<InterpolationEvent>>,
        f: F,
    ) -> Subscription
    where
        F: Fn(&Notification<InterpolationEvent>) + Send + Sync + 'static,
    {
        self.shared.listeners.subscribe(filter, f)
    }

    fn on(&self, event: InterpolationEvent, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.subscribe(event, move |_| f())
    }

    pub fn on_pause(&self, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.on(InterpolationEvent::Pause, f)
    }

    pub fn on_resume(&self, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.on(InterpolationEvent::Resume, f)
    }

    pub fn on_complete(&self, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.on(InterpolationEvent::Complete, f)
    }

    pub fn on_frame_start(&self, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.on(InterpolationEvent::FrameStart, f)
    }

    pub fn on_frame_complete(&self, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.on(InterpolationEvent::FrameComplete, f)
    }
}

impl<T: Interpolate> Drop for Interpolation<T> {
    fn drop(&mut self) {
        self.shared.cancel();
    }
}

impl<T: Interpolate + fmt::Debug> fmt::Debug for Interpolation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snap = self.snap();
        f.debug_struct("Interpolation")
            .field("id", &self.shared.id)
            .field("value", &snap.value)
            .field("target", &snap.target)
            .field("ratio", &snap.ratio)
            .field("playing", &snap.is_playing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::AnimationScheduler;
    use cadence_core::Point;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_halves_the_gap() {
        let scheduler = AnimationScheduler::new();
        let interp = Interpolation::new(scheduler.handle(), 0.0_f64, 0.5);
        interp.set_target(100.0);

        scheduler.advance(ms(1));
        assert_eq!(interp.value(), 50.0);
        assert_eq!(interp.last(), 0.0);
        assert!(!interp.is_completed());

        scheduler.advance(ms(1));
        assert_eq!(interp.value(), 75.0);
        assert_eq!(interp.last(), 50.0);
        assert!(!interp.is_completed());
    }

    #[test]
    fn test_idle_until_first_target() {
        let scheduler = AnimationScheduler::new();
        let interp = Interpolation::new(scheduler.handle(), 3.0_f64, 0.5);
        assert!(!interp.is_available());
        assert!(!interp.is_playing());

        scheduler.advance(ms(10));
        assert_eq!(scheduler.task_count(), 0);
        assert_eq!(interp.value(), 3.0);

        interp.set_target(4.0);
        assert!(interp.is_available());
        assert!(interp.is_playing());
        interp.set_target(5.0);
        assert_eq!(scheduler.task_count(), 1);
    }

    #[test]
    fn test_completion_is_edge_triggered() {
        let scheduler = AnimationScheduler::new();
        let interp = Interpolation::new(scheduler.handle(), 0.0_f64, 0.5);
        let completes = Arc::new(AtomicUsize::new(0));
        let c = completes.clone();
        interp.on_complete(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        interp.set_target(1.0);
        // 2^-20 < 1e-6, so the gap closes well within 25 ticks
        scheduler.advance(ms(25));
        assert!(interp.is_completed());
        scheduler.advance(ms(2));
        assert_eq!(completes.load(Ordering::SeqCst), 1);

        // Still registered: a new target starts a new approach
        assert!(interp.is_playing());
        interp.set_target(2.0);
        scheduler.advance(ms(30));
        assert_eq!(completes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_gap_never_grows() {
        let scheduler = AnimationScheduler::new();
        let interp = Arc::new(Interpolation::new(scheduler.handle(), -20.0_f64, 0.3));
        let gaps = Arc::new(Mutex::new(Vec::new()));
        let (g, weak) = (gaps.clone(), Arc::downgrade(&interp));
        interp.on_frame_complete(move || {
            if let Some(interp) = weak.upgrade() {
                g.lock().push((interp.value() - interp.target()).abs());
            }
        });

        interp.set_target(10.0);
        scheduler.advance(ms(50));

        let gaps = gaps.lock();
        assert_eq!(gaps.len(), 50);
        assert!(gaps.windows(2).all(|pair| pair[1] <= pair[0]));
        assert!(interp.value() <= 10.0);
    }

    #[test]
    fn test_retarget_mid_flight() {
        let scheduler = AnimationScheduler::new();
        let interp = Interpolation::new(scheduler.handle(), 0.0_f64, 0.5);
        interp.set_target(100.0);
        scheduler.advance(ms(1));

        interp.set_target(-50.0);
        scheduler.advance(ms(1));
        assert_eq!(interp.value(), 0.0);
        assert_eq!(interp.last(), 50.0);
    }

    #[test]
    fn test_ratio_is_clamped() {
        let scheduler = AnimationScheduler::new();
        let interp = Interpolation::new(scheduler.handle(), 0.0_f64, 5.0);
        assert_eq!(interp.ratio(), 1.0);

        interp.set_target(8.0);
        scheduler.advance(ms(1));
        assert_eq!(interp.value(), 8.0);

        interp.set_ratio(-1.0);
        assert!(interp.ratio() > 0.0);
        interp.set_ratio(f64::NAN);
        assert_eq!(interp.ratio(), 1.0);
    }

    #[test]
    fn test_pause_and_resume() {
        let scheduler = AnimationScheduler::new();
        let interp = Interpolation::new(scheduler.handle(), 0.0_f64, 0.5);
        let events = Arc::new(Mutex::new(Vec::new()));
        let e = events.clone();
        interp.subscribe(EventFilter::Any, move |n| {
            if matches!(n.event, InterpolationEvent::Pause | InterpolationEvent::Resume) {
                e.lock().push(n.event);
            }
        });

        interp.set_target(100.0);
        scheduler.advance(ms(1));
        interp.pause();
        assert!(interp.is_paused());
        scheduler.advance(ms(10));
        assert_eq!(interp.value(), 50.0);

        interp.pause_or_resume();
        assert!(interp.is_playing());
        scheduler.advance(ms(1));
        assert_eq!(interp.value(), 75.0);

        assert_eq!(
            *events.lock(),
            vec![InterpolationEvent::Pause, InterpolationEvent::Resume]
        );
    }

    #[test]
    fn test_reset_jumps() {
        let scheduler = AnimationScheduler::new();
        let interp = Interpolation::new(scheduler.handle(), 0.0_f64, 0.5);
        interp.set_target(10.0);
        scheduler.advance(ms(1));

        interp.reset(10.0);
        assert_eq!(interp.value(), 10.0);
        assert_eq!(interp.last(), 10.0);
        assert!(interp.is_completed());
    }

    #[test]
    fn test_point_payload() {
        let scheduler = AnimationScheduler::new();
        let interp = Interpolation::new(scheduler.handle(), Point::ZERO, 0.5);
        interp.set_target(Point::new(8.0, -4.0));

        scheduler.advance(ms(1));
        assert_eq!(interp.value(), Point::new(4.0, -2.0));

        scheduler.advance(ms(40));
        assert!(interp.is_completed());
    }

    #[test]
    fn test_custom_period() {
        let scheduler = AnimationScheduler::new();
        let options = InterpolationOptions {
            ratio: 0.5,
            period: ms(16),
            epsilon: 0.5,
        };
        let interp = Interpolation::with_options(scheduler.handle(), 0.0_f64, options);
        interp.set_target(1.0);

        // First tick runs right away, the second one 16ms later
        scheduler.advance(ms(16));
        assert_eq!(interp.value(), 0.5);
        assert!(interp.is_completed());
        scheduler.advance(ms(1));
        assert_eq!(interp.value(), 0.75);
    }

    #[test]
    fn test_target_without_scheduler_stays_unavailable() {
        let scheduler = AnimationScheduler::new();
        let handle = scheduler.handle();
        drop(scheduler);

        let interp = Interpolation::new(handle, 0.0_f64, 0.5);
        interp.set_target(1.0);
        assert!(!interp.is_available());
        assert!(!interp.is_playing());
        assert_eq!(interp.target(), 1.0);
    }

    #[test]
    fn test_drop_cancels_task() {
        let scheduler = AnimationScheduler::new();
        let interp = Interpolation::new(scheduler.handle(), 0.0_f64, 0.5);
        interp.set_target(1.0);
        assert_eq!(scheduler.task_count(), 1);
        drop(interp);
        assert_eq!(scheduler.task_count(), 0);
    }
}
