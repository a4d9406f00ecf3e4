//! Render phase: positional slot arena per component instance.
//!
//! Each component instance owns a [`PhaseArena`]. Every execution of the
//! component's thunk runs with a fresh [`Ctx`] whose cursor starts at
//! slot 0; `Ctx::slot` advances the cursor, reusing the signal already
//! stored at that position from a prior render. Slot *n* therefore yields
//! the same signal on every re-render, giving signals stable identity
//! without explicit keys.
//!
//! Contract: a component must make the same `slot` calls, in the same
//! order, on every execution. This is a caller obligation and is not
//! enforced at runtime; the `debug-phase` feature promotes detected
//! violations (slot type mismatch, call-count drift) to a panic.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use ulid::Ulid;

use crate::metrics::inc_metric;
use crate::scope::Scope;
use crate::signal::{Signal, Unsubscriber};

/// Ordered slot storage for one component instance.
///
/// The arena outlives individual renders: it is created at mount and
/// reused by every subsequent render phase of the same instance.
#[derive(Default)]
pub struct PhaseArena {
    slots: Vec<Box<dyn Any>>,
    /// Slot count observed by the previous completed render.
    previous_count: Option<usize>,
}

impl PhaseArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// A tracked read recorded during one component execution.
///
/// The reconciler subscribes the instance's re-render trigger through
/// `subscribe` once the thunk returns.
pub struct Accessed {
    /// Identity of the signal that was read (for per-render dedup).
    pub id: Ulid,
    /// Attaches a listener invoking the trigger on every notification.
    pub subscribe: Box<dyn FnOnce(Rc<dyn Fn()>) -> Unsubscriber>,
}

/// Execution context handed to a component thunk.
///
/// Carries the instance's slot arena, the render scope (owner of
/// everything this execution creates), and the set of signals accessed
/// via tracked reads.
pub struct Ctx {
    arena: Rc<RefCell<PhaseArena>>,
    scope: Scope,
    cursor: usize,
    accessed_ids: FxHashSet<Ulid>,
    accessed: Vec<Accessed>,
}

impl Ctx {
    pub fn new(arena: Rc<RefCell<PhaseArena>>, scope: Scope) -> Self {
        Self {
            arena,
            scope,
            cursor: 0,
            accessed_ids: FxHashSet::default(),
            accessed: Vec::new(),
        }
    }

    /// The scope owning this execution's subscriptions and tasks.
    ///
    /// Closed on re-render and on unmount; pass it to `derive` and to
    /// resource bindings created inside the component.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Positional signal creation.
    ///
    /// The first render allocates a signal initialized with `init()`;
    /// every later render returns the signal stored at the same position,
    /// reference-identical across renders.
    pub fn slot<A: Clone + PartialEq + 'static>(&mut self, init: impl FnOnce() -> A) -> Signal<A> {
        let index = self.cursor;
        self.cursor += 1;
        let mut arena = self.arena.borrow_mut();
        let reused = arena
            .slots
            .get(index)
            .and_then(|slot| slot.downcast_ref::<Signal<A>>().cloned());
        if let Some(signal) = reused {
            inc_metric!(SLOTS_REUSED);
            return signal;
        }
        if index < arena.slots.len() {
            // Slot type changed between renders: call-order contract
            // violation. Identity alignment is undefined from here on.
            #[cfg(feature = "debug-phase")]
            panic!("render phase: slot {index} changed type between renders");
            #[cfg(not(feature = "debug-phase"))]
            {
                log::warn!(
                    "render phase: slot {index} changed type between renders; \
                     replacing the slot, positional identity is lost"
                );
                let signal = Signal::new(init());
                arena.slots[index] = Box::new(signal.clone());
                return signal;
            }
        }
        inc_metric!(SLOTS_ALLOCATED);
        let signal = Signal::new(init());
        debug_assert!(index == arena.slots.len());
        arena.slots.push(Box::new(signal.clone()));
        signal
    }

    /// Tracked read: returns the current value and subscribes the whole
    /// component to re-run when `signal` next notifies.
    ///
    /// Reading the same signal more than once per execution registers a
    /// single listener. For a fine-grained binding that updates one host
    /// attribute or text node without re-running the component, pass the
    /// signal itself into the node description instead.
    pub fn get<A: Clone + 'static>(&mut self, signal: &Signal<A>) -> A {
        let id = signal.debug_id();
        if self.accessed_ids.insert(id) {
            let handle = signal.clone();
            self.accessed.push(Accessed {
                id,
                subscribe: Box::new(move |trigger: Rc<dyn Fn()>| {
                    handle.subscribe(move |_| trigger())
                }),
            });
        }
        signal.get()
    }

    /// Finish the execution, yielding the tracked reads.
    ///
    /// Also checks slot-count stability against the previous render.
    pub fn finish(self) -> Vec<Accessed> {
        let mut arena = self.arena.borrow_mut();
        if let Some(previous) = arena.previous_count {
            if previous != self.cursor {
                #[cfg(feature = "debug-phase")]
                panic!(
                    "render phase: slot count changed between renders ({previous} -> {})",
                    self.cursor
                );
                #[cfg(not(feature = "debug-phase"))]
                log::warn!(
                    "render phase: slot count changed between renders ({previous} -> {}); \
                     positional identity is undefined",
                    self.cursor
                );
            }
        }
        arena.previous_count = Some(self.cursor);
        self.accessed
    }
}
