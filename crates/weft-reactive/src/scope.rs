//! Hierarchical cleanup scopes.
//!
//! A [`Scope`] owns finalizers: unsubscribe callbacks, task cancellations,
//! host-node detachments. Closing a scope runs them in reverse-registration
//! order, children included. Ownership is push-only: scopes hold disposer
//! callbacks, while signals hold only listener callbacks with no
//! back-reference to the scope that created them, so no reference cycle
//! forms between the two.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::metrics::inc_metric;

struct ScopeInner {
    finalizers: RefCell<Vec<Box<dyn FnOnce()>>>,
    closed: Cell<bool>,
}

/// A cleanup/ownership unit. Cloning shares the same scope.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl Scope {
    /// Create an unparented scope.
    pub fn root() -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                finalizers: RefCell::new(Vec::new()),
                closed: Cell::new(false),
            }),
        }
    }

    /// Create a child scope that closes together with this one.
    pub fn child(&self) -> Scope {
        let child = Scope::root();
        let handle = child.clone();
        self.defer(move || handle.close());
        child
    }

    /// Register a finalizer.
    ///
    /// Finalizers run in reverse-registration order on [`Scope::close`].
    /// Registering against an already closed scope runs the finalizer
    /// immediately.
    pub fn defer(&self, f: impl FnOnce() + 'static) {
        if self.inner.closed.get() {
            f();
            return;
        }
        self.inner.finalizers.borrow_mut().push(Box::new(f));
    }

    /// Run all finalizers in reverse-registration order. Idempotent.
    pub fn close(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        inc_metric!(SCOPES_CLOSED);
        let mut finalizers: Vec<Box<dyn FnOnce()>> =
            self.inner.finalizers.borrow_mut().drain(..).collect();
        while let Some(finalizer) = finalizers.pop() {
            finalizer();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("closed", &self.inner.closed.get())
            .field("finalizers", &self.inner.finalizers.borrow().len())
            .finish()
    }
}
