//! Swap bindings: signal-driven remounting in place.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use weft::{HeadlessAdapter, HostAdapter, Node, Signal};

fn visible_tags(adapter: &weft::HeadlessAdapter) -> Vec<String> {
    adapter
        .root()
        .visible_children()
        .iter()
        .map(|node| node.tag().to_string())
        .collect()
}

#[test]
fn initial_content_mounts() {
    let (adapter, reconciler, scope) = common::setup();
    let content: Signal<Node<HeadlessAdapter>> =
        Signal::always_notify(Node::host("first").build());

    reconciler.mount(&Node::swap(content), &scope).unwrap();
    assert_eq!(visible_tags(&adapter), vec!["first"]);
}

#[test]
fn setting_the_signal_swaps_content() {
    let (adapter, reconciler, scope) = common::setup();
    let content: Signal<Node<HeadlessAdapter>> =
        Signal::always_notify(Node::host("first").build());
    reconciler.mount(&Node::swap(content.clone()), &scope).unwrap();

    content.set(Node::host("second").build());
    assert_eq!(visible_tags(&adapter), vec!["second"]);

    content.set(Node::text("plain"));
    let children = adapter.root().visible_children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].text(), "plain");
}

#[test]
fn swap_keeps_its_position_between_siblings() {
    let (adapter, reconciler, scope) = common::setup();
    let content: Signal<Node<HeadlessAdapter>> =
        Signal::always_notify(Node::host("middle").build());

    let description: Node<HeadlessAdapter> = Node::fragment(vec![
        Node::host("before").build(),
        Node::Swap {
            signal: content.clone(),
            on_swap: None,
        },
        Node::host("after").build(),
    ]);
    reconciler.mount(&description, &scope).unwrap();
    assert_eq!(visible_tags(&adapter), vec!["before", "middle", "after"]);

    content.set(Node::host("replacement").build());
    assert_eq!(visible_tags(&adapter), vec!["before", "replacement", "after"]);
}

#[test]
fn on_swap_fires_before_teardown() {
    let (_adapter, reconciler, scope) = common::setup();
    let events: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let first: Node<HeadlessAdapter> = Node::component({
        let events = events.clone();
        move |ctx| {
            let events = events.clone();
            ctx.scope().defer(move || events.borrow_mut().push("teardown"));
            Node::host("first").build()
        }
    });
    let content = Signal::always_notify(first);

    let description = Node::Swap {
        signal: content.clone(),
        on_swap: Some(Rc::new({
            let events = events.clone();
            move || events.borrow_mut().push("on_swap")
        })),
    };
    reconciler.mount(&description, &scope).unwrap();

    content.set(Node::host("second").build());
    assert_eq!(*events.borrow(), vec!["on_swap", "teardown"]);
}

#[test]
fn old_generation_is_fully_released() {
    let (_adapter, reconciler, scope) = common::setup();
    let bound = Signal::new("x".to_string());
    let content: Signal<Node<HeadlessAdapter>> =
        Signal::always_notify(Node::host("div").child(Node::text_signal(bound.clone())).build());

    reconciler.mount(&Node::swap(content.clone()), &scope).unwrap();
    assert_eq!(bound.listener_count(), 1);

    content.set(Node::host("plain").build());
    assert_eq!(bound.listener_count(), 0);
}

#[test]
fn unmount_removes_content_and_subscription() {
    let (adapter, reconciler, scope) = common::setup();
    let content: Signal<Node<HeadlessAdapter>> =
        Signal::always_notify(Node::host("only").build());

    let mounted = reconciler.mount(&Node::swap(content.clone()), &scope).unwrap();
    mounted.unmount();

    assert_eq!(adapter.root().child_count(), 0);
    assert_eq!(content.listener_count(), 0);

    // A late write must not resurrect anything.
    content.set(Node::host("ghost").build());
    assert_eq!(adapter.root().child_count(), 0);
}
