//! Derived signals: recomputation and scope-bound release.

use weft_reactive::{Scope, Signal, derive, derive_all};

#[test]
fn derived_follows_source() {
    let scope = Scope::root();
    let count = Signal::new(0u32);
    let label = derive(&count, |n| format!("count: {n}"), &scope);

    assert_eq!(label.get(), "count: 0");
    count.set(3);
    assert_eq!(label.get(), "count: 3");
    scope.close();
}

#[test]
fn closing_scope_freezes_derived() {
    let scope = Scope::root();
    let count = Signal::new(1u32);
    let doubled = derive(&count, |n| n * 2, &scope);

    scope.close();
    assert_eq!(count.listener_count(), 0);

    count.set(10);
    assert_eq!(doubled.get(), 2);
}

#[test]
fn derived_suppresses_equal_results() {
    let scope = Scope::root();
    let count = Signal::new(1u32);
    let parity = derive(&count, |n| n % 2, &scope);

    let mut notifications = 0u32;
    let counter = std::rc::Rc::new(std::cell::Cell::new(0u32));
    let subscription = {
        let counter = counter.clone();
        parity.subscribe(move |_| counter.set(counter.get() + 1))
    };

    count.set(3); // parity unchanged
    count.set(4); // parity flips
    notifications += counter.get();
    assert_eq!(notifications, 1);

    subscription.unsubscribe();
    scope.close();
}

#[test]
fn derive_all_recomputes_on_any_source() {
    let scope = Scope::root();
    let a = Signal::new(1u32);
    let b = Signal::new(2u32);
    let sum = derive_all(&[a.clone(), b.clone()], |values| values.iter().sum::<u32>(), &scope);

    assert_eq!(sum.get(), 3);
    a.set(10);
    assert_eq!(sum.get(), 12);
    b.set(5);
    assert_eq!(sum.get(), 15);

    scope.close();
    a.set(100);
    assert_eq!(sum.get(), 15);
}
