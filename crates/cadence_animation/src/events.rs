//! Lifecycle notifications
//!
//! Every animation and interpolation owns a [`Listeners`] registry. Callers
//! subscribe with a filter and get back a [`Subscription`] token that removes
//! the callback again. Callbacks receive a [`Notification`] carrying the
//! emitting instance's [`InstanceId`], so one callback can serve many
//! instances and still tell them apart.
//!
//! Callbacks run on whichever thread emits the event (usually the scheduler
//! worker) and outside the registry lock, so they may subscribe, unsubscribe
//! or drive the emitting instance.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

new_key_type! {
    /// Key of one registered callback
    pub struct ListenerId;
}

/// Process-unique identity of an animation or interpolation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Events emitted by an [`Animation`](crate::Animation)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnimationEvent {
    Start,
    Pause,
    Resume,
    Complete,
    Loop,
    FrameStart,
    FrameComplete,
}

/// Events emitted by an [`Interpolation`](crate::Interpolation)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterpolationEvent {
    Pause,
    Resume,
    Complete,
    FrameStart,
    FrameComplete,
}

/// One delivered event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Notification<E> {
    pub source: InstanceId,
    pub event: E,
}

/// Which events a callback wants
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventFilter<E> {
    Any,
    Only(E),
}

impl<E: PartialEq> EventFilter<E> {
    pub fn matches(&self, event: &E) -> bool {
        match self {
            EventFilter::Any => true,
            EventFilter::Only(wanted) => wanted == event,
        }
    }
}

impl<E> From<E> for EventFilter<E> {
    fn from(event: E) -> Self {
        EventFilter::Only(event)
    }
}

type Callback<E> = Arc<dyn Fn(&Notification<E>) + Send + Sync>;

struct Listener<E> {
    filter: EventFilter<E>,
    callback: Callback<E>,
}

type Registry<E> = Mutex<SlotMap<ListenerId, Listener<E>>>;

/// Type-erased removal, so [`Subscription`] needs no event parameter
trait Unsubscribe: Send + Sync {
    fn remove(&self, id: ListenerId) -> bool;
}

impl<E: Send + 'static> Unsubscribe for Registry<E> {
    fn remove(&self, id: ListenerId) -> bool {
        self.lock().remove(id).is_some()
    }
}

/// Callback registry for one event type
pub struct Listeners<E> {
    registry: Arc<Registry<E>>,
}

impl<E> Listeners<E>
where
    E: Copy + PartialEq + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(SlotMap::with_key())),
        }
    }

    /// Register a callback for the events passing `filter`
    pub fn subscribe<F>(&self, filter: impl Into<EventFilter<E>>, callback: F) -> Subscription
    where
        F: Fn(&Notification<E>) + Send + Sync + 'static,
    {
        let id = self.registry.lock().insert(Listener {
            filter: filter.into(),
            callback: Arc::new(callback),
        });
        let registry: Arc<dyn Unsubscribe> = self.registry.clone();
        Subscription {
            registry: Arc::downgrade(&registry),
            id,
        }
    }

    /// Deliver `event` to every matching callback
    pub fn emit(&self, source: InstanceId, event: E) {
        let callbacks: SmallVec<[Callback<E>; 4]> = self
            .registry
            .lock()
            .values()
            .filter(|listener| listener.filter.matches(&event))
            .map(|listener| listener.callback.clone())
            .collect();

        if callbacks.is_empty() {
            return;
        }
        let notification = Notification { source, event };
        for callback in callbacks {
            callback(&notification);
        }
    }

    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.registry.lock().clear();
    }
}

impl<E> Default for Listeners<E>
where
    E: Copy + PartialEq + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.registry.lock().len())
            .finish()
    }
}

/// Token returned by `subscribe`
///
/// Dropping the token leaves the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    registry: Weak<dyn Unsubscribe>,
    id: ListenerId,
}

impl Subscription {
    /// Remove the callback
    ///
    /// Returns `true` if it was still registered. Repeated calls, and calls
    /// after the owning instance is gone, do nothing.
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.id),
            None => false,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
