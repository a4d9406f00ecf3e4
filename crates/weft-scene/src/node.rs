//! Node descriptions: the declarative tree the reconciler consumes.
//!
//! A [`Node`] is an immutable value describing what should exist in the
//! host tree. The front-end layer produces these; the reconciler mounts
//! them. The enum is closed on purpose: adding a variant is a compile
//! error until every consumer handles it.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use weft_reactive::{Ctx, Signal};

use crate::host::HostAdapter;

/// Identity of a keyed child within a list.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Key(pub String);

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key(value)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static text, or a fine-grained binding updating only this text node.
#[derive(Clone)]
pub enum TextContent {
    Static(String),
    Reactive(Signal<String>),
}

/// Static attribute value, or a fine-grained binding updating only this
/// attribute.
#[derive(Clone)]
pub enum PropValue {
    Static(String),
    Reactive(Signal<String>),
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Static(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Static(value)
    }
}

impl From<Signal<String>> for PropValue {
    fn from(signal: Signal<String>) -> Self {
        PropValue::Reactive(signal)
    }
}

/// Component body: runs inside a render phase, produces a description.
pub type Thunk<H> = Rc<dyn Fn(&mut Ctx) -> Node<H>>;

/// Where a portal mounts its children.
pub enum PortalTarget<H: HostAdapter> {
    /// A direct host-node reference.
    Node(H::Node),
    /// A name resolved through `HostAdapter::resolve_target`.
    Named(String),
}

impl<H: HostAdapter> Clone for PortalTarget<H> {
    fn clone(&self) -> Self {
        match self {
            PortalTarget::Node(node) => PortalTarget::Node(node.clone()),
            PortalTarget::Named(name) => PortalTarget::Named(name.clone()),
        }
    }
}

/// Portal visibility: absent means visible.
#[derive(Clone)]
pub enum Visibility {
    Static(bool),
    Reactive(Signal<bool>),
}

/// One keyed entry of a [`Node::List`].
///
/// Equality compares keys only; the list signal's structural equality
/// therefore suppresses writes that keep the key sequence unchanged.
pub struct ListItem<H: HostAdapter> {
    pub key: Key,
    pub build: Thunk<H>,
}

impl<H: HostAdapter> ListItem<H> {
    pub fn new(key: impl Into<Key>, build: impl Fn(&mut Ctx) -> Node<H> + 'static) -> Self {
        Self {
            key: key.into(),
            build: Rc::new(build),
        }
    }
}

impl<H: HostAdapter> Clone for ListItem<H> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            build: self.build.clone(),
        }
    }
}

impl<H: HostAdapter> PartialEq for ListItem<H> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<H: HostAdapter> fmt::Debug for ListItem<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListItem").field("key", &self.key).finish()
    }
}

/// Keyed list driven by a signal of items.
///
/// Items retained across a change keep their mounted node and internal
/// state; the reconciler reorders them with a minimal number of moves.
pub struct KeyedList<H: HostAdapter> {
    pub items: Signal<Vec<ListItem<H>>>,
}

impl<H: HostAdapter> KeyedList<H> {
    /// Build a list from a fixed item set, rejecting duplicate keys
    /// before anything mounts.
    pub fn try_new(items: Vec<ListItem<H>>) -> Result<Self, BuildError> {
        let mut seen: FxHashSet<Key> = FxHashSet::default();
        for item in &items {
            if !seen.insert(item.key.clone()) {
                return Err(BuildError::DuplicateKey(item.key.clone()));
            }
        }
        Ok(Self {
            items: Signal::new(items),
        })
    }

    /// Build a list over an externally owned item signal. The caller is
    /// responsible for keeping keys unique.
    pub fn from_signal(items: Signal<Vec<ListItem<H>>>) -> Self {
        Self { items }
    }
}

impl<H: HostAdapter> Clone for KeyedList<H> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

/// Description construction error: fails before mount, never at render.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BuildError {
    DuplicateKey(Key),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::DuplicateKey(key) => write!(f, "duplicate list key `{key}`"),
        }
    }
}

impl std::error::Error for BuildError {}

/// A declarative node description.
pub enum Node<H: HostAdapter> {
    /// A platform element with attributes and children.
    Host {
        tag: String,
        props: Vec<(String, PropValue)>,
        children: Vec<Node<H>>,
        key: Option<Key>,
    },
    /// A text node.
    Text(TextContent),
    /// A component instance: its thunk runs inside its own scope and
    /// render phase.
    Component { thunk: Thunk<H>, key: Option<Key> },
    /// Children mounted in order with no host wrapper.
    Fragment(Vec<Node<H>>),
    /// Keyed list with minimal-move reordering.
    List(KeyedList<H>),
    /// A subtree rendered somewhere other than its logical parent. An
    /// anchor marker stays in the original position.
    Portal {
        target: Option<PortalTarget<H>>,
        children: Vec<Node<H>>,
        visible: Option<Visibility>,
    },
    /// Mounts whatever description the signal currently holds; on change
    /// the old subtree is torn down and the new one mounted in place.
    Swap {
        signal: Signal<Node<H>>,
        on_swap: Option<Rc<dyn Fn()>>,
    },
}

impl<H: HostAdapter> Clone for Node<H> {
    fn clone(&self) -> Self {
        match self {
            Node::Host {
                tag,
                props,
                children,
                key,
            } => Node::Host {
                tag: tag.clone(),
                props: props.clone(),
                children: children.clone(),
                key: key.clone(),
            },
            Node::Text(content) => Node::Text(content.clone()),
            Node::Component { thunk, key } => Node::Component {
                thunk: thunk.clone(),
                key: key.clone(),
            },
            Node::Fragment(children) => Node::Fragment(children.clone()),
            Node::List(list) => Node::List(list.clone()),
            Node::Portal {
                target,
                children,
                visible,
            } => Node::Portal {
                target: target.clone(),
                children: children.clone(),
                visible: visible.clone(),
            },
            Node::Swap { signal, on_swap } => Node::Swap {
                signal: signal.clone(),
                on_swap: on_swap.clone(),
            },
        }
    }
}

impl<H: HostAdapter> Node<H> {
    /// Start a host element description.
    pub fn host(tag: impl Into<String>) -> HostBuilder<H> {
        HostBuilder::new(tag)
    }

    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(TextContent::Static(content.into()))
    }

    /// Fine-grained text binding: only this text node updates on change.
    pub fn text_signal(signal: Signal<String>) -> Self {
        Node::Text(TextContent::Reactive(signal))
    }

    pub fn component(thunk: impl Fn(&mut Ctx) -> Node<H> + 'static) -> Self {
        Node::Component {
            thunk: Rc::new(thunk),
            key: None,
        }
    }

    pub fn fragment(children: Vec<Node<H>>) -> Self {
        Node::Fragment(children)
    }

    pub fn list(list: KeyedList<H>) -> Self {
        Node::List(list)
    }

    /// Portal without a target: a dedicated container is created under
    /// the global root on first mount and destroyed with the scope.
    pub fn portal(children: Vec<Node<H>>) -> Self {
        Node::Portal {
            target: None,
            children,
            visible: None,
        }
    }

    pub fn portal_named(name: impl Into<String>, children: Vec<Node<H>>) -> Self {
        Node::Portal {
            target: Some(PortalTarget::Named(name.into())),
            children,
            visible: None,
        }
    }

    pub fn swap(signal: Signal<Node<H>>) -> Self {
        Node::Swap {
            signal,
            on_swap: None,
        }
    }

    /// Variant name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Host { .. } => "host",
            Node::Text(_) => "text",
            Node::Component { .. } => "component",
            Node::Fragment(_) => "fragment",
            Node::List(_) => "list",
            Node::Portal { .. } => "portal",
            Node::Swap { .. } => "swap",
        }
    }
}

/// Chainable construction of a [`Node::Host`] description.
pub struct HostBuilder<H: HostAdapter> {
    tag: String,
    props: Vec<(String, PropValue)>,
    children: Vec<Node<H>>,
    key: Option<Key>,
}

impl<H: HostAdapter> HostBuilder<H> {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            props: Vec::new(),
            children: Vec::new(),
            key: None,
        }
    }

    /// Set an attribute. Setting the same name twice keeps the last
    /// value.
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        let name = name.into();
        self.props.retain(|(existing, _)| *existing != name);
        self.props.push((name, value.into()));
        self
    }

    /// Fine-grained attribute binding: only this attribute updates on
    /// change, the owning component does not re-run.
    pub fn prop_signal(self, name: impl Into<String>, signal: Signal<String>) -> Self {
        self.prop(name, PropValue::Reactive(signal))
    }

    pub fn child(mut self, child: Node<H>) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node<H>>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn build(self) -> Node<H> {
        Node::Host {
            tag: self.tag,
            props: self.props,
            children: self.children,
            key: self.key,
        }
    }
}
