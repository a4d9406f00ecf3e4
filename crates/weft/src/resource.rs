//! Keyed async resources with stale-while-revalidate caching.
//!
//! Every key owns one state signal and at most one in-flight task.
//! Consumers read the signal; [`Resources::fetch`] dedupes concurrent
//! requests for the same key, serves cached values immediately and
//! revalidates stale ones in the background. Tasks run on a
//! single-threaded pool pumped by [`Resources::tick`], so state writes
//! happen on the caller's thread and feed the signal graph directly.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;
use std::time::Instant;

use futures_executor::{LocalPool, LocalSpawner};
use futures_util::FutureExt;
use futures_util::task::LocalSpawnExt;
use rustc_hash::FxHashMap;
use weft_reactive::{Scope, Signal, TaskHandle, Unsubscriber, supervised};
use weft_scene::{HostAdapter, Node};

use crate::metrics::inc_metric;

/// Why a resource computation did not produce a value.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ResourceError {
    /// The computation returned an error.
    Failed(String),
    /// The computation panicked; the panic was caught and stored.
    Panicked(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Failed(message) => write!(f, "resource failed: {message}"),
            ResourceError::Panicked(message) => write!(f, "resource panicked: {message}"),
        }
    }
}

impl std::error::Error for ResourceError {}

/// Lifecycle of one keyed resource.
#[derive(Clone, PartialEq, Debug)]
pub enum ResourceState<A> {
    /// No value yet; a fetch may or may not be running.
    Pending,
    /// A value is available. `stale` means it has been invalidated and a
    /// fresh value may be on the way.
    Success { value: A, stale: bool },
    /// The latest computation failed. `stale_value` keeps the previous
    /// value, if any, so consumers can keep showing it.
    Failure {
        error: ResourceError,
        stale_value: Option<A>,
    },
}

impl<A> ResourceState<A> {
    pub fn is_pending(&self) -> bool {
        matches!(self, ResourceState::Pending)
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, ResourceState::Success { stale: true, .. })
    }

    /// The best value to display: the fresh one, or the stale survivor
    /// of a failure.
    pub fn value(&self) -> Option<&A> {
        match self {
            ResourceState::Pending => None,
            ResourceState::Success { value, .. } => Some(value),
            ResourceState::Failure { stale_value, .. } => stale_value.as_ref(),
        }
    }
}

/// Type-erased per-key bookkeeping. The closures capture the concrete
/// value type so `invalidate`, `refresh` and `clear` stay non-generic.
#[derive(Clone)]
struct Entry {
    state_any: Rc<dyn Any>,
    in_flight: Rc<Cell<bool>>,
    task: Rc<RefCell<Option<TaskHandle>>>,
    updated_at: Rc<Cell<Option<Instant>>>,
    mark_stale: Rc<dyn Fn()>,
    set_pending: Rc<dyn Fn()>,
    start: Rc<dyn Fn()>,
    listeners: Rc<dyn Fn() -> usize>,
}

struct ResourcesInner {
    entries: RefCell<FxHashMap<String, Entry>>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

/// The resource registry. Single-threaded; owns the task pool.
///
/// A cheap handle like [`Signal`]: clones share the registry. Create one
/// per rendering root so independent roots (parallel tests) stay
/// isolated.
#[derive(Clone)]
pub struct Resources {
    inner: Rc<ResourcesInner>,
}

impl Default for Resources {
    fn default() -> Self {
        Self::new()
    }
}

impl Resources {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            inner: Rc::new(ResourcesInner {
                entries: RefCell::new(FxHashMap::default()),
                pool: RefCell::new(pool),
                spawner,
            }),
        }
    }

    /// Register `key` if unknown and start a fetch when no usable value
    /// exists. Returns the key's state signal.
    ///
    /// With a fetch already in flight the call joins it. A fresh cached
    /// value is served without refetching; a stale one is served and
    /// revalidated in the background.
    pub fn fetch<A, F, Fut>(&self, key: &str, compute: F) -> Signal<ResourceState<A>>
    where
        A: Clone + PartialEq + 'static,
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<A, ResourceError>> + 'static,
    {
        let (state, entry) = self.ensure_entry(key, compute);
        if entry.in_flight.get() {
            inc_metric!(RESOURCE_DEDUP_HITS);
            return state;
        }
        match state.get() {
            ResourceState::Pending => (entry.start)(),
            ResourceState::Success { stale: true, .. } => {
                inc_metric!(RESOURCE_CACHE_HITS);
                (entry.start)();
            }
            _ => {
                inc_metric!(RESOURCE_CACHE_HITS);
            }
        }
        state
    }

    /// Register `key` without starting anything. The signal stays
    /// `Pending` until `fetch` or `refresh` runs the computation.
    pub fn make<A, F, Fut>(&self, key: &str, compute: F) -> Signal<ResourceState<A>>
    where
        A: Clone + PartialEq + 'static,
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<A, ResourceError>> + 'static,
    {
        let (state, _entry) = self.ensure_entry(key, compute);
        state
    }

    /// The state signal for `key`, if registered with value type `A`.
    pub fn state<A>(&self, key: &str) -> Option<Signal<ResourceState<A>>>
    where
        A: Clone + PartialEq + 'static,
    {
        self.inner.entries
            .borrow()
            .get(key)
            .and_then(|entry| entry.state_any.downcast_ref::<Signal<ResourceState<A>>>())
            .cloned()
    }

    /// Mark the cached value stale and refetch. Consumers keep seeing the
    /// stale value until the new one lands. No-op while a fetch is
    /// already in flight.
    pub fn invalidate(&self, key: &str) {
        let entry = self.inner.entries.borrow().get(key).cloned();
        let Some(entry) = entry else {
            log::debug!("resources: invalidate of unknown key `{key}`");
            return;
        };
        if entry.in_flight.get() {
            log::debug!("resources: invalidate of `{key}` skipped, fetch in flight");
            return;
        }
        (entry.mark_stale)();
        (entry.start)();
    }

    /// Drop the cached value, reset to `Pending` and refetch.
    pub fn refresh(&self, key: &str) {
        let entry = self.inner.entries.borrow().get(key).cloned();
        let Some(entry) = entry else {
            log::debug!("resources: refresh of unknown key `{key}`");
            return;
        };
        (entry.set_pending)();
        if !entry.in_flight.get() {
            (entry.start)();
        }
    }

    /// Forget `key` entirely, cancelling any in-flight task. Signals held
    /// by consumers stay valid but will never update again.
    pub fn clear(&self, key: &str) {
        if let Some(entry) = self.inner.entries.borrow_mut().remove(key) {
            if let Some(task) = entry.task.borrow_mut().take() {
                task.cancel();
            }
        }
    }

    /// When `key` last completed successfully.
    pub fn last_updated(&self, key: &str) -> Option<Instant> {
        self.inner.entries
            .borrow()
            .get(key)
            .and_then(|entry| entry.updated_at.get())
    }

    /// Drive pending resource tasks until all are blocked or done.
    /// Re-entrant calls (a resource completion calling back into `tick`)
    /// are skipped.
    pub fn tick(&self) {
        match self.inner.pool.try_borrow_mut() {
            Ok(mut pool) => {
                pool.run_until_stalled();
            }
            Err(_) => log::warn!("resources: re-entrant tick skipped"),
        }
    }

    /// A resource whose key follows a reactive input. The returned
    /// signal is stable; it forwards the state of whichever key the
    /// input currently maps to. Switching keys cancels the old key's
    /// in-flight task, as does closing `scope`; a task another consumer
    /// is still subscribed to keeps running.
    pub fn reactive<I, A, F, Fut>(
        &self,
        input: &Signal<I>,
        key_of: impl Fn(&I) -> String + 'static,
        compute: F,
        scope: &Scope,
    ) -> Signal<ResourceState<A>>
    where
        I: Clone + 'static,
        A: Clone + PartialEq + 'static,
        F: Fn(I) -> Fut + Clone + 'static,
        Fut: Future<Output = Result<A, ResourceError>> + 'static,
    {
        let output = Signal::new(ResourceState::Pending);
        let forward: Rc<RefCell<Option<Unsubscriber>>> = Rc::new(RefCell::new(None));
        let last_key: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));

        let attach: Rc<dyn Fn(&I)> = {
            let resources = self.clone();
            let output = output.clone();
            let forward = forward.clone();
            let last_key = last_key.clone();
            Rc::new(move |value: &I| {
                let key = key_of(value);
                if last_key.borrow().as_deref() == Some(key.as_str()) {
                    return;
                }
                let previous_key = last_key.borrow_mut().replace(key.clone());
                if let Some(previous) = forward.borrow_mut().take() {
                    previous.unsubscribe();
                }
                // Unsubscribed first: the cancel below only fires when no
                // other consumer is still listening to the old key.
                if let Some(previous_key) = previous_key {
                    resources.cancel_in_flight(&previous_key);
                }
                let compute = compute.clone();
                let input_value = value.clone();
                let state = resources.fetch(&key, move || compute(input_value.clone()));
                output.set(state.get());
                let subscription = {
                    let output = output.clone();
                    state.subscribe(move |state| output.set(state.clone()))
                };
                *forward.borrow_mut() = Some(subscription);
            })
        };

        attach(&input.get());
        let subscription = {
            let attach = attach.clone();
            input.subscribe(move |value| attach(value))
        };
        {
            let resources = self.clone();
            let forward = forward.clone();
            let last_key = last_key.clone();
            scope.defer(move || {
                subscription.unsubscribe();
                if let Some(active) = forward.borrow_mut().take() {
                    active.unsubscribe();
                }
                if let Some(key) = last_key.borrow_mut().take() {
                    resources.cancel_in_flight(&key);
                }
            });
        }
        output
    }

    /// Abort `key`'s running task, if any, leaving its state untouched.
    /// A later `fetch` or `refresh` restarts the computation.
    ///
    /// Skipped while the key's state signal still has subscribers: the
    /// entry is shared per key, and aborting it would strand every other
    /// consumer on `Pending` with nothing left to complete it.
    fn cancel_in_flight(&self, key: &str) {
        let Some(entry) = self.inner.entries.borrow().get(key).cloned() else {
            return;
        };
        if (entry.listeners)() > 0 {
            log::debug!("resources: cancel of `{key}` skipped, other consumers listening");
            return;
        }
        if let Some(task) = entry.task.borrow_mut().take() {
            task.cancel();
        }
        entry.in_flight.set(false);
    }

    fn ensure_entry<A, F, Fut>(&self, key: &str, compute: F) -> (Signal<ResourceState<A>>, Entry)
    where
        A: Clone + PartialEq + 'static,
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<A, ResourceError>> + 'static,
    {
        if let Some(entry) = self.inner.entries.borrow().get(key) {
            match entry.state_any.downcast_ref::<Signal<ResourceState<A>>>() {
                Some(state) => return (state.clone(), entry.clone()),
                None => {
                    // Same key registered with another value type. The old
                    // entry is unusable here; replace it.
                    log::warn!("resources: key `{key}` re-registered with a different type");
                }
            }
        }

        let state: Signal<ResourceState<A>> = Signal::new(ResourceState::Pending);
        let in_flight: Rc<Cell<bool>> = Rc::new(Cell::new(false));
        let task: Rc<RefCell<Option<TaskHandle>>> = Rc::new(RefCell::new(None));
        let updated_at: Rc<Cell<Option<Instant>>> = Rc::new(Cell::new(None));

        let mark_stale: Rc<dyn Fn()> = {
            let state = state.clone();
            Rc::new(move || {
                if let ResourceState::Success {
                    value,
                    stale: false,
                } = state.get()
                {
                    state.set(ResourceState::Success { value, stale: true });
                }
            })
        };
        let set_pending: Rc<dyn Fn()> = {
            let state = state.clone();
            Rc::new(move || state.set(ResourceState::Pending))
        };
        let listeners: Rc<dyn Fn() -> usize> = {
            let state = state.clone();
            Rc::new(move || state.listener_count())
        };
        let start: Rc<dyn Fn()> = {
            let state = state.clone();
            let in_flight = in_flight.clone();
            let task = task.clone();
            let updated_at = updated_at.clone();
            let spawner = self.inner.spawner.clone();
            let compute = Rc::new(compute);
            let key = key.to_string();
            Rc::new(move || {
                if in_flight.replace(true) {
                    return;
                }
                inc_metric!(RESOURCE_FETCHES_STARTED);
                let future = compute();
                let state = state.clone();
                let in_flight_done = in_flight.clone();
                let updated_at = updated_at.clone();
                let key_done = key.clone();
                let (wrapped, handle) = supervised(async move {
                    let outcome = AssertUnwindSafe(future).catch_unwind().await;
                    in_flight_done.set(false);
                    match outcome {
                        Ok(Ok(value)) => {
                            updated_at.set(Some(Instant::now()));
                            state.set(ResourceState::Success {
                                value,
                                stale: false,
                            });
                        }
                        Ok(Err(error)) => {
                            inc_metric!(RESOURCE_FAILURES);
                            let stale_value = previous_value(&state.get());
                            state.set(ResourceState::Failure { error, stale_value });
                        }
                        Err(panic) => {
                            inc_metric!(RESOURCE_FAILURES);
                            let message = panic_message(panic.as_ref());
                            log::error!("resources: computation for `{key_done}` panicked: {message}");
                            let stale_value = previous_value(&state.get());
                            state.set(ResourceState::Failure {
                                error: ResourceError::Panicked(message),
                                stale_value,
                            });
                        }
                    }
                });
                *task.borrow_mut() = Some(handle);
                if let Err(error) = spawner.spawn_local(wrapped) {
                    log::error!("resources: spawning fetch for `{key}` failed: {error}");
                    in_flight.set(false);
                }
            })
        };

        let entry = Entry {
            state_any: Rc::new(state.clone()),
            in_flight,
            task,
            updated_at,
            mark_stale,
            set_pending,
            start,
            listeners,
        };
        self.inner.entries
            .borrow_mut()
            .insert(key.to_string(), entry.clone());
        (state, entry)
    }
}

/// The value to carry into a `Failure` state: whatever the consumer was
/// last able to see.
fn previous_value<A: Clone>(state: &ResourceState<A>) -> Option<A> {
    match state {
        ResourceState::Pending => None,
        ResourceState::Success { value, .. } => Some(value.clone()),
        ResourceState::Failure { stale_value, .. } => stale_value.clone(),
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Project a resource state signal onto node descriptions.
///
/// The three builders run per state change; the previous subtree is torn
/// down and the new one mounted in place (swap semantics).
pub fn match_state<H, A>(
    state: &Signal<ResourceState<A>>,
    scope: &Scope,
    on_pending: impl Fn() -> Node<H> + 'static,
    on_success: impl Fn(&A, bool) -> Node<H> + 'static,
    on_failure: impl Fn(&ResourceError, Option<&A>) -> Node<H> + 'static,
) -> Node<H>
where
    H: HostAdapter,
    A: Clone + PartialEq + 'static,
{
    let render = move |state: &ResourceState<A>| match state {
        ResourceState::Pending => on_pending(),
        ResourceState::Success { value, stale } => on_success(value, *stale),
        ResourceState::Failure { error, stale_value } => on_failure(error, stale_value.as_ref()),
    };

    // Descriptions have no useful equality; every state change swaps.
    let node_signal = Signal::always_notify(render(&state.get()));
    let subscription = {
        let node_signal = node_signal.clone();
        state.subscribe(move |state| node_signal.set(render(state)))
    };
    scope.defer(move || subscription.unsubscribe());
    Node::swap(node_signal)
}
