//! Reactive cells with change notification and equality-based suppression.
//!
//! A [`Signal`] is a shared mutable cell. Writers call [`Signal::set`] or
//! [`Signal::update`]; readers either take a plain snapshot with
//! [`Signal::get`] or subscribe a listener with [`Signal::subscribe`].
//! Setting a value that compares equal to the current one is suppressed:
//! no listener runs and the write is recorded as a no-op.
//!
//! Notification is synchronous and sequential: `set` returns only after
//! every listener registered at call time has been invoked. A panicking
//! listener is caught and logged so the remaining listeners still run.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use smallvec::SmallVec;
use ulid::Ulid;

use crate::metrics::inc_metric;

/// Identifies one subscription on one signal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ListenerId(u64);

type ListenerFn<A> = Rc<dyn Fn(&A)>;

struct SignalCell<A> {
    debug_id: Ulid,
    value: RefCell<A>,
    equal: Box<dyn Fn(&A, &A) -> bool>,
    /// Listeners in registration order. Notification walks a snapshot of
    /// this list and re-checks membership per entry, so a listener removed
    /// mid-notification is never invoked.
    listeners: RefCell<SmallVec<[(ListenerId, ListenerFn<A>); 2]>>,
    next_listener: Cell<u64>,
}

/// A reactive cell holding a value of type `A`.
///
/// Cloning a `Signal` clones the handle, not the cell: all clones share
/// value, listeners and identity. Use [`Signal::ptr_eq`] to compare
/// identity.
pub struct Signal<A> {
    cell: Rc<SignalCell<A>>,
}

impl<A> Clone for Signal<A> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<A> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("debug_id", &self.cell.debug_id)
            .field("listeners", &self.cell.listeners.borrow().len())
            .finish()
    }
}

impl<A: Clone + 'static> Signal<A> {
    /// Create a signal with structural equality suppression.
    pub fn new(initial: A) -> Self
    where
        A: PartialEq,
    {
        Self::with_equal(initial, |a, b| a == b)
    }

    /// Create a signal with a custom equality predicate.
    ///
    /// `set` skips notification when `equal(current, next)` is true.
    pub fn with_equal(initial: A, equal: impl Fn(&A, &A) -> bool + 'static) -> Self {
        inc_metric!(SIGNALS_CREATED);
        Self {
            cell: Rc::new(SignalCell {
                debug_id: Ulid::new(),
                value: RefCell::new(initial),
                equal: Box::new(equal),
                listeners: RefCell::new(SmallVec::new()),
                next_listener: Cell::new(0),
            }),
        }
    }

    /// Create a signal that treats every `set` as a change.
    ///
    /// Used for payloads without meaningful structural equality, e.g. node
    /// descriptions driving a swap binding.
    pub fn always_notify(initial: A) -> Self {
        Self::with_equal(initial, |_, _| false)
    }

    /// Snapshot of the current value.
    ///
    /// This read is untracked. Tracked reads (which subscribe the whole
    /// component to re-run) go through `Ctx::get` during a render phase.
    pub fn get(&self) -> A {
        self.cell.value.borrow().clone()
    }

    /// Store `value` and synchronously notify every listener.
    ///
    /// If `value` compares equal to the current one the write is dropped:
    /// nothing is stored and no listener runs. Listeners are invoked in
    /// registration order; a panic in one is isolated and logged, the rest
    /// still run, and `set` still succeeds. When `set` returns, all
    /// listeners registered at call time have been invoked.
    pub fn set(&self, value: A) {
        {
            let current = self.cell.value.borrow();
            if (self.cell.equal)(&current, &value) {
                inc_metric!(NOTIFICATIONS_SUPPRESSED);
                log::trace!(
                    "signal {}: set suppressed, value compared equal",
                    self.cell.debug_id
                );
                return;
            }
        }
        *self.cell.value.borrow_mut() = value.clone();
        self.notify(&value);
    }

    /// `set(f(current))` with the same equality short-circuit.
    ///
    /// `f` runs on a snapshot of the current value, so it may itself read
    /// or write this signal.
    pub fn update(&self, f: impl FnOnce(&A) -> A) {
        let current = self.get();
        self.set(f(&current));
    }

    /// Register a listener, returning its unsubscriber.
    ///
    /// The unsubscriber is idempotent: calling it more than once is safe.
    pub fn subscribe(&self, listener: impl Fn(&A) + 'static) -> Unsubscriber {
        inc_metric!(LISTENERS_SUBSCRIBED);
        let id = ListenerId(self.cell.next_listener.get());
        self.cell.next_listener.set(id.0 + 1);
        self.cell
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));

        let cell = Rc::downgrade(&self.cell);
        Unsubscriber::new(move || {
            let Some(cell) = cell.upgrade() else { return };
            let mut listeners = cell.listeners.borrow_mut();
            if let Some(position) = listeners.iter().position(|(i, _)| *i == id) {
                listeners.remove(position);
                inc_metric!(LISTENERS_REMOVED);
            }
        })
    }

    fn notify(&self, value: &A) {
        // Snapshot so listeners may subscribe/unsubscribe while we walk.
        let snapshot: Vec<(ListenerId, ListenerFn<A>)> =
            self.cell.listeners.borrow().iter().cloned().collect();
        for (id, listener) in snapshot {
            let still_registered = self
                .cell
                .listeners
                .borrow()
                .iter()
                .any(|(i, _)| *i == id);
            if !still_registered {
                continue;
            }
            inc_metric!(NOTIFICATIONS_SENT);
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener(value))) {
                inc_metric!(LISTENER_PANICS);
                log::error!(
                    "signal {}: listener panicked: {}; remaining listeners still run",
                    self.cell.debug_id,
                    panic_message(&payload)
                );
            }
        }
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.cell.listeners.borrow().len()
    }

    /// Identity comparison: do both handles point at the same cell?
    pub fn ptr_eq(&self, other: &Signal<A>) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// Stable debug identity of this signal.
    pub fn debug_id(&self) -> Ulid {
        self.cell.debug_id
    }
}

/// Removes one subscription when called. Idempotent and clonable.
#[derive(Clone)]
pub struct Unsubscriber(Rc<dyn Fn()>);

impl Unsubscriber {
    pub(crate) fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Remove the subscription. Calling this twice is safe.
    pub fn unsubscribe(&self) {
        (self.0)()
    }
}

impl fmt::Debug for Unsubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unsubscriber")
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
