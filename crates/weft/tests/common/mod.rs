//! Shared harness for reconciler and resource scenarios.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use futures_channel::oneshot;
use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use weft::{HeadlessAdapter, HeadlessNode, Reconciler, ResourceError, Scope};

pub fn setup() -> (Rc<HeadlessAdapter>, Reconciler<HeadlessAdapter>, Scope) {
    let _ = env_logger::builder().is_test(true).try_init();
    let adapter = Rc::new(HeadlessAdapter::new());
    let reconciler = Reconciler::new(adapter.clone());
    (adapter, reconciler, Scope::root())
}

/// Text of a mounted element's first child text node.
pub fn text_of(node: &HeadlessNode) -> String {
    node.child(0).map(|child| child.text()).unwrap_or_default()
}

/// A resource computation whose responses are released through oneshot
/// channels, one per invocation. Calls beyond the supplied gates never
/// resolve. `calls` counts invocations.
pub fn gated<A: Clone + 'static>(
    gates: Vec<oneshot::Receiver<Result<A, ResourceError>>>,
    calls: Rc<Cell<usize>>,
) -> impl Fn() -> LocalBoxFuture<'static, Result<A, ResourceError>> {
    let gates: Rc<RefCell<VecDeque<_>>> = Rc::new(RefCell::new(gates.into()));
    move || {
        calls.set(calls.get() + 1);
        let gate = gates.borrow_mut().pop_front();
        async move {
            match gate {
                Some(gate) => match gate.await {
                    Ok(result) => result,
                    Err(_) => Err(ResourceError::Failed("response channel dropped".into())),
                },
                None => std::future::pending().await,
            }
        }
        .boxed_local()
    }
}

/// A computation resolving immediately with `value`, counting calls.
pub fn immediate<A: Clone + 'static>(
    value: A,
    calls: Rc<Cell<usize>>,
) -> impl Fn() -> LocalBoxFuture<'static, Result<A, ResourceError>> {
    move || {
        calls.set(calls.get() + 1);
        let value = value.clone();
        async move { Ok(value) }.boxed_local()
    }
}
