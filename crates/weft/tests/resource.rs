//! Resource registry: dedup, stale-while-revalidate, failures, clearing.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use futures_channel::oneshot;
use futures_util::FutureExt;
use weft::{ResourceError, ResourceState, Resources, Scope, Signal};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn fetch_moves_pending_to_success() {
    init_logger();
    let resources = Resources::new();
    let calls = Rc::new(Cell::new(0));

    let state = resources.fetch("user", common::immediate(42u32, calls.clone()));
    assert!(state.get().is_pending());
    assert_eq!(calls.get(), 1);

    resources.tick();
    assert_eq!(
        state.get(),
        ResourceState::Success {
            value: 42,
            stale: false
        }
    );
    assert!(resources.last_updated("user").is_some());
}

#[test]
fn concurrent_fetches_share_one_computation() {
    init_logger();
    let resources = Resources::new();
    let calls = Rc::new(Cell::new(0));
    let (gate_tx, gate_rx) = oneshot::channel();

    let first = resources.fetch("user", common::gated(vec![gate_rx], calls.clone()));
    let second = resources.fetch("user", common::immediate(999u32, Rc::new(Cell::new(0))));
    assert_eq!(calls.get(), 1);
    assert!(first.ptr_eq(&second));

    gate_tx.send(Ok(7u32)).unwrap();
    resources.tick();
    assert_eq!(
        first.get(),
        ResourceState::Success {
            value: 7,
            stale: false
        }
    );
}

#[test]
fn cached_value_is_served_without_refetch() {
    init_logger();
    let resources = Resources::new();
    let calls = Rc::new(Cell::new(0));

    resources.fetch("user", common::immediate(1u32, calls.clone()));
    resources.tick();

    let state = resources.fetch("user", common::immediate(1u32, calls.clone()));
    assert_eq!(calls.get(), 1);
    assert_eq!(
        state.get(),
        ResourceState::Success {
            value: 1,
            stale: false
        }
    );
}

#[test]
fn invalidate_marks_stale_and_revalidates() {
    init_logger();
    let resources = Resources::new();
    let calls = Rc::new(Cell::new(0));
    let (first_tx, first_rx) = oneshot::channel();
    let (second_tx, second_rx) = oneshot::channel();

    let state = resources.fetch("user", common::gated(vec![first_rx, second_rx], calls.clone()));
    first_tx.send(Ok(1u32)).unwrap();
    resources.tick();

    resources.invalidate("user");
    // The old value stays visible, marked stale, while the refetch runs.
    assert_eq!(
        state.get(),
        ResourceState::Success {
            value: 1,
            stale: true
        }
    );
    assert_eq!(calls.get(), 2);

    second_tx.send(Ok(2u32)).unwrap();
    resources.tick();
    assert_eq!(
        state.get(),
        ResourceState::Success {
            value: 2,
            stale: false
        }
    );
}

#[test]
fn invalidate_during_flight_is_a_noop() {
    init_logger();
    let resources = Resources::new();
    let calls = Rc::new(Cell::new(0));
    let (gate_tx, gate_rx) = oneshot::channel();

    let state = resources.fetch("user", common::gated(vec![gate_rx], calls.clone()));
    resources.invalidate("user");
    assert_eq!(calls.get(), 1);

    gate_tx.send(Ok(5u32)).unwrap();
    resources.tick();
    assert_eq!(
        state.get(),
        ResourceState::Success {
            value: 5,
            stale: false
        }
    );
}

#[test]
fn refresh_resets_to_pending() {
    init_logger();
    let resources = Resources::new();
    let calls = Rc::new(Cell::new(0));
    let (first_tx, first_rx) = oneshot::channel();
    let (second_tx, second_rx) = oneshot::channel();

    let state = resources.fetch("user", common::gated(vec![first_rx, second_rx], calls.clone()));
    first_tx.send(Ok(1u32)).unwrap();
    resources.tick();

    resources.refresh("user");
    // Unlike invalidate, refresh drops the cached value immediately.
    assert!(state.get().is_pending());
    assert_eq!(calls.get(), 2);

    second_tx.send(Ok(9u32)).unwrap();
    resources.tick();
    assert_eq!(state.get().value().copied(), Some(9));
}

#[test]
fn failure_keeps_the_stale_value() {
    init_logger();
    let resources = Resources::new();
    let calls = Rc::new(Cell::new(0));
    let (first_tx, first_rx) = oneshot::channel();
    let (second_tx, second_rx) = oneshot::channel();

    let state = resources.fetch("user", common::gated(vec![first_rx, second_rx], calls.clone()));
    first_tx.send(Ok(1u32)).unwrap();
    resources.tick();

    resources.invalidate("user");
    second_tx
        .send(Err(ResourceError::Failed("backend down".into())))
        .unwrap();
    resources.tick();

    assert_eq!(
        state.get(),
        ResourceState::Failure {
            error: ResourceError::Failed("backend down".into()),
            stale_value: Some(1),
        }
    );
    assert_eq!(state.get().value().copied(), Some(1));
}

#[test]
fn failure_without_prior_value_has_no_stale_value() {
    init_logger();
    let resources = Resources::new();
    let calls = Rc::new(Cell::new(0));
    let (gate_tx, gate_rx) = oneshot::channel::<Result<u32, ResourceError>>();

    let state = resources.fetch("user", common::gated(vec![gate_rx], calls.clone()));
    gate_tx
        .send(Err(ResourceError::Failed("nope".into())))
        .unwrap();
    resources.tick();

    assert_eq!(
        state.get(),
        ResourceState::Failure {
            error: ResourceError::Failed("nope".into()),
            stale_value: None,
        }
    );
}

#[test]
fn make_registers_without_starting() {
    init_logger();
    let resources = Resources::new();
    let calls = Rc::new(Cell::new(0));

    let state = resources.make("user", common::immediate(3u32, calls.clone()));
    resources.tick();
    assert_eq!(calls.get(), 0);
    assert!(state.get().is_pending());

    let fetched = resources.fetch("user", common::immediate(99u32, Rc::new(Cell::new(0))));
    assert!(state.ptr_eq(&fetched));
    assert_eq!(calls.get(), 1);
    resources.tick();
    assert_eq!(state.get().value().copied(), Some(3));
}

#[test]
fn clear_cancels_the_in_flight_task() {
    init_logger();
    let resources = Resources::new();
    let calls = Rc::new(Cell::new(0));
    let (gate_tx, gate_rx) = oneshot::channel();

    let state = resources.fetch("user", common::gated(vec![gate_rx], calls.clone()));
    resources.clear("user");

    let _ = gate_tx.send(Ok(1u32));
    resources.tick();
    // The cancelled task never wrote its result.
    assert!(state.get().is_pending());
    assert!(resources.state::<u32>("user").is_none());
}

#[test]
fn state_changes_notify_subscribers() {
    init_logger();
    let resources = Resources::new();
    let calls = Rc::new(Cell::new(0));
    let observed = Rc::new(Cell::new(0u32));

    let state = resources.fetch("user", common::immediate(11u32, calls.clone()));
    let subscription = {
        let observed = observed.clone();
        state.subscribe(move |state: &ResourceState<u32>| {
            if let Some(value) = state.value() {
                observed.set(*value);
            }
        })
    };

    resources.tick();
    assert_eq!(observed.get(), 11);
    subscription.unsubscribe();
}

#[test]
fn reactive_key_switch_cancels_the_previous_fetch() {
    init_logger();
    let resources = Resources::new();
    let scope = Scope::root();
    let key = Signal::new("slow".to_string());
    let (gate_tx, gate_rx) = oneshot::channel::<Result<u32, ResourceError>>();
    let gate = Rc::new(std::cell::RefCell::new(Some(gate_rx)));

    let state = resources.reactive(
        &key,
        |key: &String| key.clone(),
        {
            let gate = gate.clone();
            move |key: String| {
                let gate = gate.clone();
                async move {
                    if key == "slow" {
                        match gate.borrow_mut().take() {
                            Some(response) => response
                                .await
                                .unwrap_or(Err(ResourceError::Failed("dropped".into()))),
                            None => std::future::pending().await,
                        }
                    } else {
                        Ok(1u32)
                    }
                }
                .boxed_local()
            }
        },
        &scope,
    );
    resources.tick();
    assert!(state.get().is_pending());

    key.set("fast".to_string());
    resources.tick();
    assert_eq!(state.get().value().copied(), Some(1));

    // The slow task was aborted: its response channel is gone and its
    // entry never left Pending.
    assert!(gate_tx.send(Ok(99)).is_err());
    assert!(
        resources
            .state::<u32>("slow")
            .is_some_and(|slow| slow.get().is_pending())
    );
}

#[test]
fn reactive_key_switch_spares_a_fetch_with_other_listeners() {
    init_logger();
    let resources = Resources::new();
    let scope = Scope::root();
    let key = Signal::new("slow".to_string());
    let (gate_tx, gate_rx) = oneshot::channel::<Result<u32, ResourceError>>();
    let gate = Rc::new(std::cell::RefCell::new(Some(gate_rx)));

    // An independent consumer of the same key, subscribed and waiting.
    let shared = resources.fetch("slow", {
        let gate = gate.clone();
        move || {
            let gate = gate.clone();
            async move {
                match gate.borrow_mut().take() {
                    Some(response) => response
                        .await
                        .unwrap_or(Err(ResourceError::Failed("dropped".into()))),
                    None => std::future::pending().await,
                }
            }
        }
    });
    let observed = Rc::new(Cell::new(0u32));
    let subscription = {
        let observed = observed.clone();
        shared.subscribe(move |state: &ResourceState<u32>| {
            if let Some(value) = state.value() {
                observed.set(*value);
            }
        })
    };

    let state = resources.reactive(
        &key,
        |key: &String| key.clone(),
        |key: String| async move { Ok(key.len() as u32) },
        &scope,
    );
    resources.tick();
    assert!(state.get().is_pending());

    key.set("fast".to_string());
    resources.tick();
    assert_eq!(state.get().value().copied(), Some(4));

    // The shared fetch survived the switch and still completes.
    assert!(gate_tx.send(Ok(7)).is_ok());
    resources.tick();
    assert_eq!(observed.get(), 7);
    subscription.unsubscribe();
}

#[test]
fn reactive_scope_close_cancels_the_in_flight_fetch() {
    init_logger();
    let resources = Resources::new();
    let scope = Scope::root();
    let key = Signal::new("k".to_string());
    let (gate_tx, gate_rx) = oneshot::channel::<Result<u32, ResourceError>>();
    let gate = Rc::new(std::cell::RefCell::new(Some(gate_rx)));

    let state = resources.reactive(
        &key,
        |key: &String| key.clone(),
        {
            let gate = gate.clone();
            move |_key: String| {
                let gate = gate.clone();
                async move {
                    match gate.borrow_mut().take() {
                        Some(response) => response
                            .await
                            .unwrap_or(Err(ResourceError::Failed("dropped".into()))),
                        None => std::future::pending().await,
                    }
                }
                .boxed_local()
            }
        },
        &scope,
    );
    resources.tick();

    scope.close();
    resources.tick();
    assert!(gate_tx.send(Ok(5)).is_err());
    assert!(state.get().is_pending());
}

#[test]
fn reactive_resource_follows_its_input() {
    init_logger();
    let resources = Resources::new();
    let scope = Scope::root();
    let user_id = Signal::new(1u32);

    let state = resources.reactive(
        &user_id,
        |id| format!("user/{id}"),
        |id: u32| async move { Ok(id * 10) },
        &scope,
    );
    resources.tick();
    assert_eq!(state.get().value().copied(), Some(10));

    user_id.set(2);
    assert!(state.get().is_pending());
    resources.tick();
    assert_eq!(state.get().value().copied(), Some(20));

    // Switching back serves the first key's cache without refetching.
    user_id.set(1);
    assert_eq!(state.get().value().copied(), Some(10));

    scope.close();
    assert_eq!(user_id.listener_count(), 0);
}
