//! Supervised tasks: completion and cooperative cancellation.

use std::cell::Cell;
use std::rc::Rc;

use futures_executor::LocalPool;
use futures_util::task::LocalSpawnExt;
use weft_reactive::supervised;

#[test]
fn task_runs_to_completion() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let finished = Rc::new(Cell::new(false));

    let (future, handle) = supervised({
        let finished = finished.clone();
        async move { finished.set(true) }
    });
    spawner.spawn_local(future).unwrap();
    pool.run_until_stalled();

    assert!(finished.get());
    assert!(!handle.is_cancelled());
    // completed() resolves once the body ran.
    pool.run_until(handle.completed());
}

#[test]
fn cancel_stops_the_body() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let (gate_tx, gate_rx) = futures_channel::oneshot::channel::<()>();
    let finished = Rc::new(Cell::new(false));

    let (future, handle) = supervised({
        let finished = finished.clone();
        async move {
            let _ = gate_rx.await;
            finished.set(true);
        }
    });
    spawner.spawn_local(future).unwrap();
    pool.run_until_stalled();

    handle.cancel();
    assert!(handle.is_cancelled());
    let _ = gate_tx.send(());
    pool.run_until_stalled();

    // The body past the await never ran, but completion still resolves.
    assert!(!finished.get());
    pool.run_until(handle.completed());
}

#[test]
fn cancel_is_idempotent() {
    let (_future, handle) = supervised(async {});
    handle.cancel();
    handle.cancel();
    assert!(handle.is_cancelled());
}

#[test]
fn cancel_after_completion_is_a_noop() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let (future, handle) = supervised(async {});
    spawner.spawn_local(future).unwrap();
    pool.run_until_stalled();

    handle.cancel();
    pool.run_until(handle.completed());
}
