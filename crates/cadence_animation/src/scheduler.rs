//! Animation scheduler
//!
//! One shared clock for every animation and interpolation in the process.
//! Instances register a periodic task and get a [`TaskHandle`] back; the
//! scheduler calls their [`Tick::tick`] once per period until the handle is
//! cancelled or the instance is dropped.
//!
//! The scheduler only ever holds a [`Weak`] reference to an instance. It owns
//! no animation state, so cancelling a task never loses progress.
//!
//! There are two ways to drive the clock:
//!
//! - [`AnimationScheduler::start_background`] runs a single named worker
//!   thread that sleeps until the next deadline.
//! - [`AnimationScheduler::advance`] lets a host that owns its own frame
//!   clock (or a test) step time explicitly.
//!
//! Either way only one driver runs ticks at a time, and ticks run one after
//! another in deadline order.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//! use cadence_animation::{AnimationScheduler, Tick};
//!
//! struct Counter(AtomicUsize);
//!
//! impl Tick for Counter {
//!     fn tick(&self) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let scheduler = AnimationScheduler::new();
//! let counter = Arc::new(Counter(AtomicUsize::new(0)));
//! let runner: Arc<dyn Tick> = counter.clone();
//!
//! let task = scheduler
//!     .handle()
//!     .register(Arc::downgrade(&runner), Duration::from_millis(10), Duration::ZERO)
//!     .unwrap();
//!
//! scheduler.advance(Duration::from_millis(100));
//! assert_eq!(counter.0.load(Ordering::SeqCst), 10);
//!
//! task.cancel();
//! scheduler.advance(Duration::from_millis(100));
//! assert_eq!(counter.0.load(Ordering::SeqCst), 10);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, Thread};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, trace};

use crate::config::{OverrunPolicy, SchedulerConfig};
use crate::error::Result;

/// Shortest accepted period
const MIN_PERIOD: Duration = Duration::from_micros(100);

/// Something the scheduler can run once per period
pub trait Tick: Send + Sync {
    fn tick(&self);
}

new_key_type! {
    /// Key of one periodic registration
    pub struct TaskId;
}

struct Task {
    runner: Weak<dyn Tick>,
    period: Duration,
    next_due: Duration,
    cancelled: Arc<AtomicBool>,
}

/// Internal state of the animation scheduler
struct SchedulerInner {
    tasks: SlotMap<TaskId, Task>,
    /// Scheduler time, measured from creation
    now: Duration,
    dropped_ticks: u64,
    /// Background worker, unparked when a task is registered
    worker: Option<Thread>,
}

impl SchedulerInner {
    fn next_deadline(&self) -> Option<Duration> {
        self.tasks.values().map(|task| task.next_due).min()
    }
}

struct Shared {
    inner: Mutex<SchedulerInner>,
    /// Held by whoever is currently running ticks
    driver: Mutex<()>,
    stop_flag: AtomicBool,
}

impl Shared {
    /// Run every tick due strictly before `target`, earliest deadline first
    fn run_until(&self, target: Duration, overrun: OverrunPolicy) -> usize {
        let _driver = self.driver.lock();
        let mut ran = 0;

        loop {
            let (id, runner, cancelled) = {
                let mut inner = self.inner.lock();
                let Some((id, due)) = inner
                    .tasks
                    .iter()
                    .filter(|(_, task)| task.next_due < target)
                    .min_by_key(|(_, task)| task.next_due)
                    .map(|(id, task)| (id, task.next_due))
                else {
                    break;
                };

                inner.now = inner.now.max(due);
                let task = &mut inner.tasks[id];
                task.next_due = due + task.period;

                // Skip every missed deadline still inside [now, target)
                let mut dropped = 0;
                if overrun == OverrunPolicy::Drop && task.next_due < target {
                    let behind = (target - task.next_due).as_nanos();
                    let period = task.period.as_nanos();
                    let missed = behind.div_ceil(period);
                    let skip = u64::try_from(missed * period).unwrap_or(u64::MAX);
                    task.next_due = task.next_due.saturating_add(Duration::from_nanos(skip));
                    dropped = u64::try_from(missed).unwrap_or(u64::MAX);
                }
                let runner = task.runner.clone();
                let cancelled = Arc::clone(&task.cancelled);

                if dropped > 0 {
                    inner.dropped_ticks = inner.dropped_ticks.saturating_add(dropped);
                    trace!("task {:?} fell behind, dropped {} ticks", id, dropped);
                }
                (id, runner, cancelled)
            };

            // Cancellation wins over a tick that was already picked
            let runner = if cancelled.load(Ordering::Acquire) {
                None
            } else {
                runner.upgrade()
            };

            match runner {
                Some(runner) => {
                    runner.tick();
                    ran += 1;
                }
                None => {
                    self.inner.lock().tasks.remove(id);
                    trace!("pruned task {:?}", id);
                }
            }
        }

        let mut inner = self.inner.lock();
        inner.now = inner.now.max(target);
        ran
    }
}

/// The scheduler that ticks every registered animation and interpolation
///
/// Created once by the host and shared through [`SchedulerHandle`]s.
/// Dropping it stops the background worker and makes every handle inert.
pub struct AnimationScheduler {
    shared: Arc<Shared>,
    config: SchedulerConfig,
    /// Background thread handle (if running)
    thread_handle: Option<JoinHandle<()>>,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(SchedulerInner {
                    tasks: SlotMap::with_key(),
                    now: Duration::ZERO,
                    dropped_ticks: 0,
                    worker: None,
                }),
                driver: Mutex::new(()),
                stop_flag: AtomicBool::new(false),
            }),
            config,
            thread_handle: None,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Get a weak handle for registering tasks
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Start ticking on a background thread
    ///
    /// The worker maps real time onto the scheduler clock, sleeps until the
    /// earliest deadline and applies the configured [`OverrunPolicy`] when it
    /// falls behind. Calling this while the worker runs does nothing.
    pub fn start_background(&mut self) -> Result<()> {
        if self.thread_handle.is_some() {
            return Ok(());
        }

        self.shared.stop_flag.store(false, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let max_park = self.config.max_park();
        let overrun = self.config.overrun;

        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || run_worker(shared, max_park, overrun))?;

        debug!("scheduler worker `{}` started", self.config.thread_name);
        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop the background thread and wait for it to exit
    pub fn stop_background(&mut self) {
        let Some(handle) = self.thread_handle.take() else {
            return;
        };
        self.shared.stop_flag.store(true, Ordering::Release);
        handle.thread().unpark();
        let _ = handle.join();
        self.shared.stop_flag.store(false, Ordering::Release);
        debug!("scheduler worker `{}` stopped", self.config.thread_name);
    }

    /// Check if the background thread is running
    pub fn is_background_running(&self) -> bool {
        self.thread_handle.is_some()
    }

    /// Move the clock forward by `dt`, running every tick due in `[now, now + dt)`
    ///
    /// Ticks run in deadline order and nothing is dropped. Returns the number
    /// of ticks run. Must not be called from inside a tick.
    pub fn advance(&self, dt: Duration) -> usize {
        let target = self.now() + dt;
        self.shared.run_until(target, OverrunPolicy::CatchUp)
    }

    /// Current scheduler time, measured from creation
    pub fn now(&self) -> Duration {
        self.shared.inner.lock().now
    }

    /// Number of live registrations
    pub fn task_count(&self) -> usize {
        self.shared.inner.lock().tasks.len()
    }

    /// Ticks skipped by the worker under [`OverrunPolicy::Drop`]
    pub fn dropped_ticks(&self) -> u64 {
        self.shared.inner.lock().dropped_ticks
    }
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AnimationScheduler {
    fn drop(&mut self) {
        self.stop_background();
    }
}

impl fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationScheduler")
            .field("now", &self.now())
            .field("tasks", &self.task_count())
            .field("background", &self.is_background_running())
            .finish()
    }
}

fn run_worker(shared: Arc<Shared>, max_park: Duration, overrun: OverrunPolicy) {
    let origin = Instant::now();
    let base = {
        let mut inner = shared.inner.lock();
        inner.worker = Some(thread::current());
        inner.now
    };

    while !shared.stop_flag.load(Ordering::Acquire) {
        let target = base + origin.elapsed();
        shared.run_until(target, overrun);

        let wait = match shared.inner.lock().next_deadline() {
            Some(due) => due.saturating_sub(base + origin.elapsed()).min(max_park),
            None => max_park,
        };
        if !wait.is_zero() {
            thread::park_timeout(wait);
        }
    }

    shared.inner.lock().worker = None;
}

/// A weak handle to the animation scheduler
///
/// This is passed to every animation and interpolation.
/// It won't prevent the scheduler from being dropped.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Weak<Shared>,
}

impl SchedulerHandle {
    /// Run `runner` every `period`, first after `initial_delay`
    ///
    /// Returns `None` if the scheduler has been dropped. Periods shorter than
    /// 100µs are raised to that.
    pub fn register(
        &self,
        runner: Weak<dyn Tick>,
        period: Duration,
        initial_delay: Duration,
    ) -> Option<TaskHandle> {
        let shared = self.shared.upgrade()?;
        let cancelled = Arc::new(AtomicBool::new(false));

        let id = {
            let mut inner = shared.inner.lock();
            let next_due = inner.now + initial_delay;
            let id = inner.tasks.insert(Task {
                runner,
                period: period.max(MIN_PERIOD),
                next_due,
                cancelled: Arc::clone(&cancelled),
            });
            if let Some(worker) = &inner.worker {
                worker.unpark();
            }
            id
        };

        trace!("registered task {:?} every {:?}", id, period);
        Some(TaskHandle {
            id,
            cancelled,
            shared: self.shared.clone(),
        })
    }

    /// Check if the scheduler is still alive
    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// One periodic registration
///
/// Clones refer to the same registration. Once cancelled it stays cancelled;
/// scheduling again always produces a new handle.
#[derive(Clone)]
pub struct TaskHandle {
    id: TaskId,
    cancelled: Arc<AtomicBool>,
    shared: Weak<Shared>,
}

impl TaskHandle {
    /// Stop future ticks
    ///
    /// A tick already running is allowed to finish. Cancelling twice, or
    /// after the scheduler is gone, does nothing.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            shared.inner.lock().tasks.remove(self.id);
        }
        trace!("cancelled task {:?}", self.id);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
