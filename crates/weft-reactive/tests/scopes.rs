//! Scope cleanup ordering and hierarchy.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weft_reactive::Scope;

#[test]
fn finalizers_run_in_reverse_registration_order() {
    let scope = Scope::root();
    let order: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));

    for n in 0..3 {
        let order = order.clone();
        scope.defer(move || order.borrow_mut().push(n));
    }

    scope.close();
    assert_eq!(*order.borrow(), vec![2, 1, 0]);
}

#[test]
fn close_is_idempotent() {
    let scope = Scope::root();
    let runs = Rc::new(Cell::new(0));
    {
        let runs = runs.clone();
        scope.defer(move || runs.set(runs.get() + 1));
    }

    scope.close();
    scope.close();
    assert_eq!(runs.get(), 1);
    assert!(scope.is_closed());
}

#[test]
fn child_closes_with_parent() {
    let parent = Scope::root();
    let child = parent.child();
    let child_cleaned = Rc::new(Cell::new(false));
    {
        let child_cleaned = child_cleaned.clone();
        child.defer(move || child_cleaned.set(true));
    }

    parent.close();
    assert!(child.is_closed());
    assert!(child_cleaned.get());
}

#[test]
fn child_can_close_before_parent() {
    let parent = Scope::root();
    let child = parent.child();
    child.close();
    assert!(child.is_closed());
    assert!(!parent.is_closed());

    // Parent close still works; the child's registered close is a no-op.
    parent.close();
}

#[test]
fn defer_on_closed_scope_runs_immediately() {
    let scope = Scope::root();
    scope.close();

    let ran = Rc::new(Cell::new(false));
    {
        let ran = ran.clone();
        scope.defer(move || ran.set(true));
    }
    assert!(ran.get());
}

#[test]
fn grandchildren_cascade() {
    let root = Scope::root();
    let child = root.child();
    let grandchild = child.child();

    root.close();
    assert!(child.is_closed());
    assert!(grandchild.is_closed());
}
